//! Seams to the depth camera. A device backend implements these traits; the
//! rest of the crate only sees borrowed sub-frames for the current tick.

pub mod synthetic;

use std::ops::Deref;

use crate::{
    error::SensorError,
    types::{
        Body, CameraSpacePoint, ColorImageFormat, DepthSpacePoint, FrameDescription, FrameSource,
        ReliableRange,
    },
};

/// Read-only view into a sub-frame's native buffer. The lock is released
/// when the view is dropped.
pub struct BufferLock<'a, T> {
    data: &'a [T],
    release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a, T> BufferLock<'a, T> {
    pub fn new(data: &'a [T]) -> Self {
        BufferLock {
            data,
            release: None,
        }
    }

    pub fn with_release(data: &'a [T], release: impl FnOnce() + 'a) -> Self {
        BufferLock {
            data,
            release: Some(Box::new(release)),
        }
    }
}

impl<T> Deref for BufferLock<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.data
    }
}

impl<T> Drop for BufferLock<'_, T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

pub trait InfraredFrame {
    fn description(&self) -> FrameDescription;
    fn copy_frame_data(&self, dst: &mut [u16]) -> Result<(), SensorError>;
}

pub trait ColorFrame {
    fn description(&self) -> FrameDescription;
    fn raw_format(&self) -> ColorImageFormat;
    fn raw_data(&self) -> &[u8];
}

pub trait DepthFrame {
    fn description(&self) -> FrameDescription;
    fn reliable_range(&self) -> ReliableRange;
    fn copy_frame_data(&self, dst: &mut [u16]) -> Result<(), SensorError>;
    fn lock_image_buffer(&self) -> Result<BufferLock<'_, u16>, SensorError>;
}

pub trait BodyIndexFrame {
    fn description(&self) -> FrameDescription;
    fn lock_image_buffer(&self) -> Result<BufferLock<'_, u8>, SensorError>;
}

pub trait BodyFrame {
    /// Replaces the contents of `bodies` with this frame's body slots.
    fn refresh_body_data(&self, bodies: &mut Vec<Body>);
}

/// One tick's synchronized sub-frames. Each `acquire_*` returns `None` when
/// the sub-frame is absent or already expired; dropping the returned frame
/// releases it.
pub trait FrameBundle {
    fn acquire_infrared(&self) -> Option<Box<dyn InfraredFrame + '_>>;
    fn acquire_color(&self) -> Option<Box<dyn ColorFrame + '_>>;
    fn acquire_depth(&self) -> Option<Box<dyn DepthFrame + '_>>;
    fn acquire_body_index(&self) -> Option<Box<dyn BodyIndexFrame + '_>>;
    fn acquire_body(&self) -> Option<Box<dyn BodyFrame + '_>>;
}

pub trait CoordinateMapper {
    fn map_color_frame_to_depth_space(
        &self,
        depth: &[u16],
        out: &mut [DepthSpacePoint],
    ) -> Result<(), SensorError>;

    fn map_camera_point_to_depth_space(&self, point: CameraSpacePoint) -> DepthSpacePoint;
}

pub trait Sensor {
    fn open(&mut self) -> Result<(), SensorError>;
    fn close(&mut self);
    fn is_available(&self) -> bool;
    /// Returns the new availability when it changed since the previous call.
    fn availability_change(&mut self) -> Option<bool>;
    fn frame_description(&self, source: FrameSource) -> FrameDescription;
    fn body_count(&self) -> usize;
    fn coordinate_mapper(&self) -> &dyn CoordinateMapper;
}

/// Copies `src` into `dst` after checking both hold the same sample count.
pub fn copy_samples<T: Copy>(
    source: FrameSource,
    src: &[T],
    dst: &mut [T],
) -> Result<(), SensorError> {
    if src.len() != dst.len() {
        return Err(SensorError::SizeMismatch {
            source_kind: source.label(),
            expected: dst.len(),
            actual: src.len(),
        });
    }
    dst.copy_from_slice(src);
    Ok(())
}
