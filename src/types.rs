use std::{fmt, str::FromStr};

use crate::error::ConfigError;

pub const BYTES_PER_PIXEL: u32 = 4;

/// Body-index value meaning no tracked body owns the depth pixel.
pub const NO_BODY: u8 = 0xFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDescription {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl FrameDescription {
    pub const fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        FrameDescription {
            width,
            height,
            bytes_per_pixel,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn byte_len(&self) -> usize {
        self.pixel_count() * self.bytes_per_pixel as usize
    }

    pub fn same_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameSource {
    Infrared,
    Color,
    Depth,
    BodyIndex,
    Body,
}

impl FrameSource {
    pub fn label(&self) -> &'static str {
        match self {
            FrameSource::Infrared => "infrared",
            FrameSource::Color => "color",
            FrameSource::Depth => "depth",
            FrameSource::BodyIndex => "body index",
            FrameSource::Body => "body",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    Infrared,
    #[default]
    Color,
    Depth,
    BodySilhouette,
    BodyJoints,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::Infrared,
        DisplayMode::Color,
        DisplayMode::Depth,
        DisplayMode::BodySilhouette,
        DisplayMode::BodyJoints,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Infrared => "infrared",
            DisplayMode::Color => "color",
            DisplayMode::Depth => "depth",
            DisplayMode::BodySilhouette => "silhouette",
            DisplayMode::BodyJoints => "joints",
        }
    }

    /// The sub-frame whose description sizes this mode's buffers.
    pub fn primary_source(&self) -> FrameSource {
        match self {
            DisplayMode::Infrared => FrameSource::Infrared,
            DisplayMode::Color | DisplayMode::BodySilhouette => FrameSource::Color,
            DisplayMode::Depth | DisplayMode::BodyJoints => FrameSource::Depth,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DisplayMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i" | "ir" | "infrared" => Ok(DisplayMode::Infrared),
            "c" | "color" | "colour" => Ok(DisplayMode::Color),
            "d" | "depth" => Ok(DisplayMode::Depth),
            "s" | "silhouette" | "bodymask" | "body-mask" => Ok(DisplayMode::BodySilhouette),
            "j" | "joints" | "bodyjoints" | "body-joints" => Ok(DisplayMode::BodyJoints),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Depth-image coordinate for one color pixel. Both axes are negative
/// infinity when the color pixel has no depth correspondence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthSpacePoint {
    pub x: f32,
    pub y: f32,
}

impl DepthSpacePoint {
    pub const UNMAPPED: DepthSpacePoint = DepthSpacePoint {
        x: f32::NEG_INFINITY,
        y: f32::NEG_INFINITY,
    };

    pub const fn new(x: f32, y: f32) -> Self {
        DepthSpacePoint { x, y }
    }

    pub fn is_unmapped(&self) -> bool {
        self.x == f32::NEG_INFINITY || self.y == f32::NEG_INFINITY
    }
}

impl Default for DepthSpacePoint {
    fn default() -> Self {
        DepthSpacePoint::UNMAPPED
    }
}

/// Point in camera space, meters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraSpacePoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        CameraSpacePoint { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampledPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SampledPosition {
    pub fn log_line(&self) -> String {
        format!("{} {} {}\n", self.x, self.y, self.z)
    }
}

impl From<CameraSpacePoint> for SampledPosition {
    fn from(point: CameraSpacePoint) -> Self {
        SampledPosition {
            x: point.x,
            y: point.y,
            z: point.z,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReliableRange {
    pub min: u16,
    pub max: u16,
}

impl ReliableRange {
    pub const fn new(min: u16, max: u16) -> Self {
        ReliableRange { min, max }
    }

    pub fn contains(&self, depth: u16) -> bool {
        depth >= self.min && depth <= self.max
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorImageFormat {
    Bgra,
    Rgba,
    Yuy2,
}

impl ColorImageFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorImageFormat::Bgra | ColorImageFormat::Rgba => 4,
            ColorImageFormat::Yuy2 => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SensorStatus {
    Running,
    #[default]
    NotAvailable,
}

impl SensorStatus {
    pub fn from_available(available: bool) -> Self {
        if available {
            SensorStatus::Running
        } else {
            SensorStatus::NotAvailable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensorStatus::Running => "Running",
            SensorStatus::NotAvailable => "Not Available",
        }
    }
}

pub const JOINT_COUNT: usize = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointType {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Joint {
    pub position: CameraSpacePoint,
    pub tracking_state: TrackingState,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body {
    pub tracking_id: u64,
    pub is_tracked: bool,
    pub joints: [Joint; JOINT_COUNT],
}

impl Body {
    pub fn joint(&self, joint: JointType) -> &Joint {
        &self.joints[joint as usize]
    }

    pub fn set_joint(&mut self, joint: JointType, position: CameraSpacePoint, state: TrackingState) {
        self.joints[joint as usize] = Joint {
            position,
            tracking_state: state,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_names_and_aliases() {
        assert_eq!("infrared".parse::<DisplayMode>().unwrap(), DisplayMode::Infrared);
        assert_eq!(" C ".parse::<DisplayMode>().unwrap(), DisplayMode::Color);
        assert_eq!("body-mask".parse::<DisplayMode>().unwrap(), DisplayMode::BodySilhouette);
        assert_eq!("j".parse::<DisplayMode>().unwrap(), DisplayMode::BodyJoints);
        assert!("thermal".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn mode_labels_round_trip_through_parse() {
        for mode in DisplayMode::ALL {
            assert_eq!(mode.label().parse::<DisplayMode>().unwrap(), mode);
        }
    }

    #[test]
    fn unmapped_point_detects_either_axis() {
        assert!(DepthSpacePoint::UNMAPPED.is_unmapped());
        assert!(DepthSpacePoint::new(f32::NEG_INFINITY, 3.0).is_unmapped());
        assert!(DepthSpacePoint::new(2.0, f32::NEG_INFINITY).is_unmapped());
        assert!(!DepthSpacePoint::new(0.0, 0.0).is_unmapped());
    }

    #[test]
    fn log_line_is_space_separated() {
        let position = SampledPosition {
            x: 0.5,
            y: -1.25,
            z: 2.0,
        };
        assert_eq!(position.log_line(), "0.5 -1.25 2\n");
    }
}
