//! Per-sensor calibration records and their on-disk field layouts.
//!
//! Each sensor kind owns a fixed named set of arrays; the record as a
//! whole is complete or absent. Save writes one raw `f32` dump per field
//! and load reconstructs shapes from the sensor constants, failing on
//! any missing file or length mismatch.

use std::io;
use std::path::Path;

use nalgebra::Matrix4;

use crate::calibration::blob::{mat4_from_rows, mat4_to_rows, read_pod, write_pod};
use crate::geometry::lut::PixelMap;
use crate::sensors::{
    SensorKind, SensorPort, AHAT_HEIGHT, AHAT_WIDTH, GRAY_HEIGHT, GRAY_WIDTH, LONGTHROW_HEIGHT,
    LONGTHROW_WIDTH,
};

const UV2XY_FILE: &str = "uv2xy.bin";
const EXTRINSICS_FILE: &str = "extrinsics.bin";
const UNDISTORT_MAP_FILE: &str = "undistort_map.bin";
const INTRINSICS_FILE: &str = "intrinsics.bin";
const SCALE_FILE: &str = "scale.bin";
const ALIAS_FILE: &str = "alias.bin";

fn save_lut(dir: &Path, file: &str, lut: &PixelMap) -> io::Result<()> {
    write_pod(&dir.join(file), lut.as_flat())
}

fn load_lut(dir: &Path, file: &str, width: usize, height: usize) -> io::Result<PixelMap> {
    let flat = read_pod::<f32>(&dir.join(file), width * height * 2)?;
    PixelMap::from_flat(width, height, flat).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, format!("{file}: shape mismatch"))
    })
}

fn save_mat4(dir: &Path, file: &str, m: &Matrix4<f32>) -> io::Result<()> {
    write_pod(&dir.join(file), &mat4_to_rows(m))
}

fn load_mat4(dir: &Path, file: &str) -> io::Result<Matrix4<f32>> {
    Ok(mat4_from_rows(&read_pod::<f32>(&dir.join(file), 16)?))
}

fn save_scalar(dir: &Path, file: &str, value: f32) -> io::Result<()> {
    write_pod(&dir.join(file), &[value])
}

fn load_scalar(dir: &Path, file: &str) -> io::Result<f32> {
    Ok(read_pod::<f32>(&dir.join(file), 1)?[0])
}

// ============================================================================
// Record variants
// ============================================================================

/// Grayscale camera calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayCalibration {
    pub uv2xy: PixelMap,
    pub extrinsics: Matrix4<f32>,
    pub undistort_map: PixelMap,
    pub intrinsics: Matrix4<f32>,
}

impl GrayCalibration {
    fn save(&self, dir: &Path) -> io::Result<()> {
        save_lut(dir, UV2XY_FILE, &self.uv2xy)?;
        save_mat4(dir, EXTRINSICS_FILE, &self.extrinsics)?;
        save_lut(dir, UNDISTORT_MAP_FILE, &self.undistort_map)?;
        save_mat4(dir, INTRINSICS_FILE, &self.intrinsics)
    }

    fn load(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            uv2xy: load_lut(dir, UV2XY_FILE, GRAY_WIDTH, GRAY_HEIGHT)?,
            extrinsics: load_mat4(dir, EXTRINSICS_FILE)?,
            undistort_map: load_lut(dir, UNDISTORT_MAP_FILE, GRAY_WIDTH, GRAY_HEIGHT)?,
            intrinsics: load_mat4(dir, INTRINSICS_FILE)?,
        })
    }
}

/// Short-throw (AHAT) depth calibration. `scale` converts raw depth to
/// meters; `alias` is the wrap-around period of the aliased range.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthAhatCalibration {
    pub uv2xy: PixelMap,
    pub extrinsics: Matrix4<f32>,
    pub scale: f32,
    pub alias: f32,
    pub undistort_map: PixelMap,
    pub intrinsics: Matrix4<f32>,
}

impl DepthAhatCalibration {
    fn save(&self, dir: &Path) -> io::Result<()> {
        save_lut(dir, UV2XY_FILE, &self.uv2xy)?;
        save_mat4(dir, EXTRINSICS_FILE, &self.extrinsics)?;
        save_scalar(dir, SCALE_FILE, self.scale)?;
        save_scalar(dir, ALIAS_FILE, self.alias)?;
        save_lut(dir, UNDISTORT_MAP_FILE, &self.undistort_map)?;
        save_mat4(dir, INTRINSICS_FILE, &self.intrinsics)
    }

    fn load(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            uv2xy: load_lut(dir, UV2XY_FILE, AHAT_WIDTH, AHAT_HEIGHT)?,
            extrinsics: load_mat4(dir, EXTRINSICS_FILE)?,
            scale: load_scalar(dir, SCALE_FILE)?,
            alias: load_scalar(dir, ALIAS_FILE)?,
            undistort_map: load_lut(dir, UNDISTORT_MAP_FILE, AHAT_WIDTH, AHAT_HEIGHT)?,
            intrinsics: load_mat4(dir, INTRINSICS_FILE)?,
        })
    }
}

/// Long-throw depth calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthLongThrowCalibration {
    pub uv2xy: PixelMap,
    pub extrinsics: Matrix4<f32>,
    pub scale: f32,
    pub undistort_map: PixelMap,
    pub intrinsics: Matrix4<f32>,
}

impl DepthLongThrowCalibration {
    fn save(&self, dir: &Path) -> io::Result<()> {
        save_lut(dir, UV2XY_FILE, &self.uv2xy)?;
        save_mat4(dir, EXTRINSICS_FILE, &self.extrinsics)?;
        save_scalar(dir, SCALE_FILE, self.scale)?;
        save_lut(dir, UNDISTORT_MAP_FILE, &self.undistort_map)?;
        save_mat4(dir, INTRINSICS_FILE, &self.intrinsics)
    }

    fn load(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            uv2xy: load_lut(dir, UV2XY_FILE, LONGTHROW_WIDTH, LONGTHROW_HEIGHT)?,
            extrinsics: load_mat4(dir, EXTRINSICS_FILE)?,
            scale: load_scalar(dir, SCALE_FILE)?,
            undistort_map: load_lut(dir, UNDISTORT_MAP_FILE, LONGTHROW_WIDTH, LONGTHROW_HEIGHT)?,
            intrinsics: load_mat4(dir, INTRINSICS_FILE)?,
        })
    }
}

/// Inertial sensor calibration: only the rig extrinsics.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuCalibration {
    pub extrinsics: Matrix4<f32>,
}

impl ImuCalibration {
    fn save(&self, dir: &Path) -> io::Result<()> {
        save_mat4(dir, EXTRINSICS_FILE, &self.extrinsics)
    }

    fn load(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            extrinsics: load_mat4(dir, EXTRINSICS_FILE)?,
        })
    }
}

/// Color camera calibration for one capture profile.
///
/// The hand-eye `extrinsics` are persisted separately (profile
/// independent, under the sensor's own directory) and merged in by the
/// store; they are not part of this record's save/load layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCalibration {
    pub focal_length: [f32; 2],
    pub principal_point: [f32; 2],
    pub radial_distortion: [f32; 3],
    pub tangential_distortion: [f32; 2],
    pub projection: Matrix4<f32>,
    pub intrinsics: Matrix4<f32>,
    pub extrinsics: Option<Matrix4<f32>>,
}

impl ColorCalibration {
    pub(crate) fn save(&self, dir: &Path) -> io::Result<()> {
        write_pod(&dir.join("focal_length.bin"), &self.focal_length)?;
        write_pod(&dir.join("principal_point.bin"), &self.principal_point)?;
        write_pod(&dir.join("radial_distortion.bin"), &self.radial_distortion)?;
        write_pod(
            &dir.join("tangential_distortion.bin"),
            &self.tangential_distortion,
        )?;
        save_mat4(dir, "projection.bin", &self.projection)?;
        save_mat4(dir, INTRINSICS_FILE, &self.intrinsics)
    }

    pub(crate) fn load(dir: &Path) -> io::Result<Self> {
        let focal_length = read_pod::<f32>(&dir.join("focal_length.bin"), 2)?;
        let principal_point = read_pod::<f32>(&dir.join("principal_point.bin"), 2)?;
        let radial = read_pod::<f32>(&dir.join("radial_distortion.bin"), 3)?;
        let tangential = read_pod::<f32>(&dir.join("tangential_distortion.bin"), 2)?;
        Ok(Self {
            focal_length: [focal_length[0], focal_length[1]],
            principal_point: [principal_point[0], principal_point[1]],
            radial_distortion: [radial[0], radial[1], radial[2]],
            tangential_distortion: [tangential[0], tangential[1]],
            projection: load_mat4(dir, "projection.bin")?,
            intrinsics: load_mat4(dir, INTRINSICS_FILE)?,
            extrinsics: None,
        })
    }
}

// ============================================================================
// Tagged record
// ============================================================================

/// Calibration record for the non-color sensors, tagged by kind.
///
/// The color camera's record is profile-keyed and handled by its own
/// store entry point, so it is not part of this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationRecord {
    Gray(GrayCalibration),
    DepthAhat(DepthAhatCalibration),
    DepthLongThrow(DepthLongThrowCalibration),
    Imu(ImuCalibration),
}

impl CalibrationRecord {
    pub fn kind(&self) -> SensorKind {
        match self {
            CalibrationRecord::Gray(_) => SensorKind::Grayscale,
            CalibrationRecord::DepthAhat(_) => SensorKind::DepthAhat,
            CalibrationRecord::DepthLongThrow(_) => SensorKind::DepthLongThrow,
            CalibrationRecord::Imu(_) => SensorKind::Imu,
        }
    }

    pub(crate) fn save(&self, dir: &Path) -> io::Result<()> {
        match self {
            CalibrationRecord::Gray(c) => c.save(dir),
            CalibrationRecord::DepthAhat(c) => c.save(dir),
            CalibrationRecord::DepthLongThrow(c) => c.save(dir),
            CalibrationRecord::Imu(c) => c.save(dir),
        }
    }

    pub(crate) fn load(port: SensorPort, dir: &Path) -> io::Result<Self> {
        match port.kind() {
            SensorKind::Grayscale => GrayCalibration::load(dir).map(CalibrationRecord::Gray),
            SensorKind::DepthAhat => {
                DepthAhatCalibration::load(dir).map(CalibrationRecord::DepthAhat)
            }
            SensorKind::DepthLongThrow => {
                DepthLongThrowCalibration::load(dir).map(CalibrationRecord::DepthLongThrow)
            }
            SensorKind::Imu => ImuCalibration::load(dir).map(CalibrationRecord::Imu),
            SensorKind::Color => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "color calibration is profile-keyed; use the color store entry point",
            )),
        }
    }
}
