use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::Sender;

use crate::{
    error::SensorError,
    types::{
        Body, CameraSpacePoint, ColorImageFormat, DepthSpacePoint, FrameDescription, FrameSource,
        JointType, NO_BODY, ReliableRange, TrackingState,
    },
};

use super::{
    BodyFrame, BodyIndexFrame, BufferLock, ColorFrame, CoordinateMapper, DepthFrame, FrameBundle,
    InfraredFrame, Sensor, copy_samples,
};

pub const DEPTH_WIDTH: u32 = 512;
pub const DEPTH_HEIGHT: u32 = 424;
pub const BODY_COUNT: usize = 6;

const RELIABLE_RANGE: ReliableRange = ReliableRange::new(500, 4500);
const BACKGROUND_DEPTH_MM: u16 = 3500;
const BODY_DEPTH_M: f32 = 2.0;

// Depth camera intrinsics close to a Kinect v2.
const DEPTH_FOCAL: f32 = 365.0;
const DEPTH_CX: f32 = 256.0;
const DEPTH_CY: f32 = 212.0;

// Horizontal share of the color image that the depth camera also sees.
const COLOR_OVERLAP_START: f32 = 0.12;
const COLOR_OVERLAP_END: f32 = 0.88;

// Spine-relative pose in meters.
const POSE: &[(JointType, f32, f32)] = &[
    (JointType::SpineBase, 0.0, 0.0),
    (JointType::SpineMid, 0.0, 0.30),
    (JointType::SpineShoulder, 0.0, 0.55),
    (JointType::Neck, 0.0, 0.62),
    (JointType::Head, 0.0, 0.75),
    (JointType::ShoulderLeft, -0.18, 0.52),
    (JointType::ElbowLeft, -0.28, 0.28),
    (JointType::WristLeft, -0.32, 0.05),
    (JointType::HandLeft, -0.33, -0.02),
    (JointType::HandTipLeft, -0.34, -0.10),
    (JointType::ThumbLeft, -0.30, -0.04),
    (JointType::ShoulderRight, 0.18, 0.52),
    (JointType::ElbowRight, 0.28, 0.28),
    (JointType::WristRight, 0.32, 0.05),
    (JointType::HandRight, 0.33, -0.02),
    (JointType::HandTipRight, 0.34, -0.10),
    (JointType::ThumbRight, 0.30, -0.04),
    (JointType::HipLeft, -0.09, -0.04),
    (JointType::KneeLeft, -0.10, -0.45),
    (JointType::AnkleLeft, -0.10, -0.85),
    (JointType::FootLeft, -0.10, -0.92),
    (JointType::HipRight, 0.09, -0.04),
    (JointType::KneeRight, 0.10, -0.45),
    (JointType::AnkleRight, 0.10, -0.85),
    (JointType::FootRight, 0.10, -0.92),
];

#[derive(Clone, Debug)]
pub struct SyntheticMapper {
    color: FrameDescription,
    depth: FrameDescription,
}

impl CoordinateMapper for SyntheticMapper {
    fn map_color_frame_to_depth_space(
        &self,
        depth: &[u16],
        out: &mut [DepthSpacePoint],
    ) -> Result<(), SensorError> {
        if depth.len() != self.depth.pixel_count() || out.len() != self.color.pixel_count() {
            return Err(SensorError::Mapping(format!(
                "expected {} depth samples and {} points, got {} and {}",
                self.depth.pixel_count(),
                self.color.pixel_count(),
                depth.len(),
                out.len()
            )));
        }

        let color_w = self.color.width as usize;
        let span = COLOR_OVERLAP_END - COLOR_OVERLAP_START;
        for (index, point) in out.iter_mut().enumerate() {
            let u = (index % color_w) as f32 / self.color.width as f32;
            let v = (index / color_w) as f32 / self.color.height as f32;
            *point = if (COLOR_OVERLAP_START..COLOR_OVERLAP_END).contains(&u) {
                DepthSpacePoint::new(
                    (u - COLOR_OVERLAP_START) / span * self.depth.width as f32,
                    v * self.depth.height as f32,
                )
            } else {
                DepthSpacePoint::UNMAPPED
            };
        }
        Ok(())
    }

    fn map_camera_point_to_depth_space(&self, point: CameraSpacePoint) -> DepthSpacePoint {
        if point.z <= 0.0 {
            return DepthSpacePoint::UNMAPPED;
        }
        DepthSpacePoint::new(
            DEPTH_CX + DEPTH_FOCAL * point.x / point.z,
            DEPTH_CY - DEPTH_FOCAL * point.y / point.z,
        )
    }
}

/// Deterministic stand-in for a depth camera: one person swaying left and
/// right in front of a flat wall.
#[derive(Clone, Debug)]
pub struct SyntheticSensor {
    open: bool,
    reported: Option<bool>,
    tick: u64,
    mapper: SyntheticMapper,
}

impl SyntheticSensor {
    pub fn new(color_width: u32, color_height: u32) -> Self {
        SyntheticSensor {
            open: false,
            reported: None,
            tick: 0,
            mapper: SyntheticMapper {
                color: FrameDescription::new(color_width, color_height, 2),
                depth: FrameDescription::new(DEPTH_WIDTH, DEPTH_HEIGHT, 2),
            },
        }
    }

    /// Produces the bundle for the next tick. Every `drop_every`-th bundle
    /// arrives without a color frame, the way frames expire under load.
    pub fn next_bundle(&mut self, drop_every: Option<u64>) -> SyntheticBundle {
        let tick = self.tick;
        self.tick += 1;

        let sway = (tick as f32 * 0.05).sin() * 0.4;
        let spine = CameraSpacePoint::new(sway, -0.1, BODY_DEPTH_M);
        let body = posed_body(spine);

        let depth_desc = self.mapper.depth;
        let mut depth = vec![BACKGROUND_DEPTH_MM; depth_desc.pixel_count()];
        let mut body_index = vec![NO_BODY; depth_desc.pixel_count()];
        let mut infrared = vec![2_000u16; depth_desc.pixel_count()];
        let body_mm = (BODY_DEPTH_M * 1000.0) as u16;
        for joint in &body.joints {
            let center = self.mapper.map_camera_point_to_depth_space(joint.position);
            stamp(depth_desc, center, 9, |i| {
                depth[i] = body_mm;
                body_index[i] = 0;
                infrared[i] = 12_000;
            });
        }

        let color_desc = self.mapper.color;
        let color = (0..color_desc.pixel_count() / 2)
            .flat_map(|pair| {
                let x = (pair * 2) % color_desc.width as usize;
                let luma = 40 + (x * 160 / color_desc.width as usize) as u8;
                [luma, 110, luma, 150]
            })
            .collect();

        let color_present = drop_every.is_none_or(|n| n == 0 || tick % n != 0);

        let mut bodies = vec![Body::default(); BODY_COUNT];
        bodies[2] = body;

        SyntheticBundle {
            infrared_desc: depth_desc,
            depth_desc,
            color_desc: FrameDescription::new(color_desc.width, color_desc.height, 2),
            infrared,
            depth,
            body_index,
            color: color_present.then_some(color),
            bodies,
        }
    }
}

impl Sensor for SyntheticSensor {
    fn open(&mut self) -> Result<(), SensorError> {
        self.open = true;
        log::info!("synthetic sensor opened");
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        log::info!("synthetic sensor closed");
    }

    fn is_available(&self) -> bool {
        self.open
    }

    fn availability_change(&mut self) -> Option<bool> {
        if self.reported == Some(self.open) {
            return None;
        }
        self.reported = Some(self.open);
        Some(self.open)
    }

    fn frame_description(&self, source: FrameSource) -> FrameDescription {
        match source {
            FrameSource::Color => FrameDescription::new(
                self.mapper.color.width,
                self.mapper.color.height,
                4,
            ),
            FrameSource::BodyIndex => FrameDescription::new(DEPTH_WIDTH, DEPTH_HEIGHT, 1),
            FrameSource::Infrared | FrameSource::Depth | FrameSource::Body => self.mapper.depth,
        }
    }

    fn body_count(&self) -> usize {
        BODY_COUNT
    }

    fn coordinate_mapper(&self) -> &dyn CoordinateMapper {
        &self.mapper
    }
}

#[derive(Debug)]
pub struct FrameStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FrameStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Emits one bundle per `interval` on a capture thread. Bundles are dropped
/// when the consumer has not picked up the previous one.
pub fn start_synthetic_stream(
    mut sensor: SyntheticSensor,
    interval: Duration,
    drop_every: Option<u64>,
    bundle_tx: Sender<SyntheticBundle>,
) -> FrameStream {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        while !stop_flag.load(Ordering::Relaxed) {
            let bundle = sensor.next_bundle(drop_every);
            if bundle_tx.is_full() {
                log::trace!("consumer busy, dropping bundle");
            }
            let _ = bundle_tx.try_send(bundle);
            thread::sleep(interval);
        }
    });

    FrameStream {
        stop,
        handle: Some(handle),
    }
}

fn posed_body(spine: CameraSpacePoint) -> Body {
    let mut body = Body {
        tracking_id: 72_057_594_037_928_000,
        is_tracked: true,
        ..Body::default()
    };
    for &(joint, dx, dy) in POSE {
        let state = match joint {
            JointType::ThumbLeft | JointType::ThumbRight => TrackingState::Inferred,
            _ => TrackingState::Tracked,
        };
        body.set_joint(
            joint,
            CameraSpacePoint::new(spine.x + dx, spine.y + dy, spine.z),
            state,
        );
    }
    body
}

fn stamp(desc: FrameDescription, center: DepthSpacePoint, radius: i32, mut write: impl FnMut(usize)) {
    if !center.x.is_finite() || !center.y.is_finite() {
        return;
    }
    let (cx, cy) = (center.x as i32, center.y as i32);
    for y in (cy - radius)..=(cy + radius) {
        for x in (cx - radius)..=(cx + radius) {
            if x < 0 || y < 0 || x >= desc.width as i32 || y >= desc.height as i32 {
                continue;
            }
            write(y as usize * desc.width as usize + x as usize);
        }
    }
}

/// Owned sub-frames for one synthetic tick.
#[derive(Clone, Debug)]
pub struct SyntheticBundle {
    infrared_desc: FrameDescription,
    depth_desc: FrameDescription,
    color_desc: FrameDescription,
    infrared: Vec<u16>,
    depth: Vec<u16>,
    body_index: Vec<u8>,
    color: Option<Vec<u8>>,
    bodies: Vec<Body>,
}

struct SyntheticInfrared<'a> {
    desc: FrameDescription,
    data: &'a [u16],
}

impl InfraredFrame for SyntheticInfrared<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn copy_frame_data(&self, dst: &mut [u16]) -> Result<(), SensorError> {
        copy_samples(FrameSource::Infrared, self.data, dst)
    }
}

struct SyntheticColor<'a> {
    desc: FrameDescription,
    data: &'a [u8],
}

impl ColorFrame for SyntheticColor<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn raw_format(&self) -> ColorImageFormat {
        ColorImageFormat::Yuy2
    }

    fn raw_data(&self) -> &[u8] {
        self.data
    }
}

struct SyntheticDepth<'a> {
    desc: FrameDescription,
    data: &'a [u16],
}

impl DepthFrame for SyntheticDepth<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn reliable_range(&self) -> ReliableRange {
        RELIABLE_RANGE
    }

    fn copy_frame_data(&self, dst: &mut [u16]) -> Result<(), SensorError> {
        copy_samples(FrameSource::Depth, self.data, dst)
    }

    fn lock_image_buffer(&self) -> Result<BufferLock<'_, u16>, SensorError> {
        Ok(BufferLock::new(self.data))
    }
}

struct SyntheticBodyIndex<'a> {
    desc: FrameDescription,
    data: &'a [u8],
}

impl BodyIndexFrame for SyntheticBodyIndex<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn lock_image_buffer(&self) -> Result<BufferLock<'_, u8>, SensorError> {
        Ok(BufferLock::new(self.data))
    }
}

struct SyntheticBodies<'a> {
    bodies: &'a [Body],
}

impl BodyFrame for SyntheticBodies<'_> {
    fn refresh_body_data(&self, bodies: &mut Vec<Body>) {
        bodies.clear();
        bodies.extend_from_slice(self.bodies);
    }
}

impl FrameBundle for SyntheticBundle {
    fn acquire_infrared(&self) -> Option<Box<dyn InfraredFrame + '_>> {
        Some(Box::new(SyntheticInfrared {
            desc: self.infrared_desc,
            data: &self.infrared,
        }))
    }

    fn acquire_color(&self) -> Option<Box<dyn ColorFrame + '_>> {
        let data = self.color.as_deref()?;
        Some(Box::new(SyntheticColor {
            desc: self.color_desc,
            data,
        }))
    }

    fn acquire_depth(&self) -> Option<Box<dyn DepthFrame + '_>> {
        Some(Box::new(SyntheticDepth {
            desc: self.depth_desc,
            data: &self.depth,
        }))
    }

    fn acquire_body_index(&self) -> Option<Box<dyn BodyIndexFrame + '_>> {
        Some(Box::new(SyntheticBodyIndex {
            desc: FrameDescription::new(self.depth_desc.width, self.depth_desc.height, 1),
            data: &self.body_index,
        }))
    }

    fn acquire_body(&self) -> Option<Box<dyn BodyFrame + '_>> {
        Some(Box::new(SyntheticBodies {
            bodies: &self.bodies,
        }))
    }
}
