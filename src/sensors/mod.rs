//! Sensor identities and fixed per-sensor parameters.
//!
//! Every sensor on the rig is addressed by a [`SensorPort`]. The port
//! determines the sensor kind, the fixed image resolution, the cache
//! directory name and (for the grayscale cameras) the mounting rotation
//! needed to present the image upright.

use std::fmt;

/// Image rotation applied to a grayscale camera to present it upright.
///
/// The four grayscale cameras are mounted sideways; two need a 90°
/// clockwise rotation and two a 90° counter-clockwise rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountRotation {
    Clockwise90,
    CounterClockwise90,
}

/// Sensor kind, one per calibration record variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Grayscale,
    DepthAhat,
    DepthLongThrow,
    Imu,
    Color,
}

/// A sensor endpoint on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorPort {
    GrayLeftFront,
    GrayLeftLeft,
    GrayRightFront,
    GrayRightRight,
    DepthAhat,
    DepthLongThrow,
    ImuAccelerometer,
    ImuGyroscope,
    Color,
}

/// Grayscale camera resolution.
pub const GRAY_WIDTH: usize = 640;
pub const GRAY_HEIGHT: usize = 480;

/// Short-throw (AHAT) depth camera resolution.
pub const AHAT_WIDTH: usize = 512;
pub const AHAT_HEIGHT: usize = 512;

/// Long-throw depth camera resolution.
pub const LONGTHROW_WIDTH: usize = 320;
pub const LONGTHROW_HEIGHT: usize = 288;

/// Normalization divisor for raw 16-bit depth values.
pub const DEPTH_RAW_MAX: f32 = 65535.0;

impl SensorPort {
    /// Sensor kind served by this port.
    pub fn kind(self) -> SensorKind {
        match self {
            SensorPort::GrayLeftFront
            | SensorPort::GrayLeftLeft
            | SensorPort::GrayRightFront
            | SensorPort::GrayRightRight => SensorKind::Grayscale,
            SensorPort::DepthAhat => SensorKind::DepthAhat,
            SensorPort::DepthLongThrow => SensorKind::DepthLongThrow,
            SensorPort::ImuAccelerometer | SensorPort::ImuGyroscope => SensorKind::Imu,
            SensorPort::Color => SensorKind::Color,
        }
    }

    /// Stable name used as the on-disk cache directory for this sensor.
    pub fn name(self) -> &'static str {
        match self {
            SensorPort::GrayLeftFront => "gray_leftfront",
            SensorPort::GrayLeftLeft => "gray_leftleft",
            SensorPort::GrayRightFront => "gray_rightfront",
            SensorPort::GrayRightRight => "gray_rightright",
            SensorPort::DepthAhat => "depth_ahat",
            SensorPort::DepthLongThrow => "depth_longthrow",
            SensorPort::ImuAccelerometer => "imu_accelerometer",
            SensorPort::ImuGyroscope => "imu_gyroscope",
            SensorPort::Color => "color",
        }
    }

    /// Fixed image resolution `(width, height)` for image-bearing sensors.
    ///
    /// The color camera resolution depends on the capture profile, and the
    /// IMUs carry no image, so both return `None`.
    pub fn resolution(self) -> Option<(usize, usize)> {
        match self.kind() {
            SensorKind::Grayscale => Some((GRAY_WIDTH, GRAY_HEIGHT)),
            SensorKind::DepthAhat => Some((AHAT_WIDTH, AHAT_HEIGHT)),
            SensorKind::DepthLongThrow => Some((LONGTHROW_WIDTH, LONGTHROW_HEIGHT)),
            SensorKind::Imu | SensorKind::Color => None,
        }
    }

    /// Mounting rotation for grayscale cameras, `None` for everything else.
    pub fn mount_rotation(self) -> Option<MountRotation> {
        match self {
            SensorPort::GrayLeftFront | SensorPort::GrayRightRight => {
                Some(MountRotation::Clockwise90)
            }
            SensorPort::GrayLeftLeft | SensorPort::GrayRightFront => {
                Some(MountRotation::CounterClockwise90)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SensorPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capture profile of the color camera.
///
/// Color calibration depends on the focus setting and the stream
/// resolution, so the calibration cache is keyed by this profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorProfile {
    pub focus: u32,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

impl ColorProfile {
    /// Cache subdirectory name for this profile.
    pub fn directory_name(&self) -> String {
        format!("{}_{}_{}", self.focus, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_ports_have_rotation_and_resolution() {
        for port in [
            SensorPort::GrayLeftFront,
            SensorPort::GrayLeftLeft,
            SensorPort::GrayRightFront,
            SensorPort::GrayRightRight,
        ] {
            assert_eq!(port.kind(), SensorKind::Grayscale);
            assert!(port.mount_rotation().is_some());
            assert_eq!(port.resolution(), Some((GRAY_WIDTH, GRAY_HEIGHT)));
        }
    }

    #[test]
    fn test_color_profile_directory_name() {
        let profile = ColorProfile {
            focus: 1000,
            width: 1920,
            height: 1080,
            framerate: 30,
        };
        assert_eq!(profile.directory_name(), "1000_1920_1080");
    }

    #[test]
    fn test_port_names_are_unique() {
        let ports = [
            SensorPort::GrayLeftFront,
            SensorPort::GrayLeftLeft,
            SensorPort::GrayRightFront,
            SensorPort::GrayRightRight,
            SensorPort::DepthAhat,
            SensorPort::DepthLongThrow,
            SensorPort::ImuAccelerometer,
            SensorPort::ImuGyroscope,
            SensorPort::Color,
        ];
        for (i, a) in ports.iter().enumerate() {
            for b in &ports[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }
}
