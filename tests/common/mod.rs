#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use kinect_position_mapper::{
    error::SensorError,
    pipeline::PixelBuffer,
    presenter::Renderer,
    sensor::{
        BodyFrame, BodyIndexFrame, BufferLock, ColorFrame, CoordinateMapper, DepthFrame,
        FrameBundle, InfraredFrame, Sensor, copy_samples,
    },
    types::{
        Body, CameraSpacePoint, ColorImageFormat, DepthSpacePoint, FrameDescription, FrameSource,
        ReliableRange,
    },
};

/// Counts acquisitions and releases per sub-frame kind.
#[derive(Default, Debug)]
pub struct Ledger {
    acquired: RefCell<HashMap<&'static str, usize>>,
    released: RefCell<HashMap<&'static str, usize>>,
}

impl Ledger {
    fn acquire(&self, what: &'static str) {
        *self.acquired.borrow_mut().entry(what).or_default() += 1;
    }

    fn release(&self, what: &'static str) {
        *self.released.borrow_mut().entry(what).or_default() += 1;
    }

    pub fn acquired(&self, what: &str) -> usize {
        self.acquired.borrow().get(what).copied().unwrap_or(0)
    }

    pub fn released(&self, what: &str) -> usize {
        self.released.borrow().get(what).copied().unwrap_or(0)
    }

    pub fn total_acquired(&self) -> usize {
        self.acquired.borrow().values().sum()
    }

    pub fn all_released(&self) -> bool {
        *self.acquired.borrow() == *self.released.borrow()
    }
}

struct Guard {
    ledger: Rc<Ledger>,
    what: &'static str,
}

impl Guard {
    fn new(ledger: &Rc<Ledger>, what: &'static str) -> Self {
        ledger.acquire(what);
        Guard {
            ledger: ledger.clone(),
            what,
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        self.ledger.release(self.what);
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeBundle {
    pub ledger: Rc<Ledger>,
    pub infrared: Option<(FrameDescription, Vec<u16>)>,
    pub color: Option<(FrameDescription, ColorImageFormat, Vec<u8>)>,
    pub depth: Option<(FrameDescription, ReliableRange, Vec<u16>)>,
    pub body_index: Option<(FrameDescription, Vec<u8>)>,
    pub bodies: Option<Vec<Body>>,
    pub fail_depth_lock: bool,
    pub fail_body_index_lock: bool,
}

struct FakeInfrared<'a> {
    _guard: Guard,
    desc: FrameDescription,
    data: &'a [u16],
}

impl InfraredFrame for FakeInfrared<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn copy_frame_data(&self, dst: &mut [u16]) -> Result<(), SensorError> {
        copy_samples(FrameSource::Infrared, self.data, dst)
    }
}

struct FakeColor<'a> {
    _guard: Guard,
    desc: FrameDescription,
    format: ColorImageFormat,
    data: &'a [u8],
}

impl ColorFrame for FakeColor<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn raw_format(&self) -> ColorImageFormat {
        self.format
    }

    fn raw_data(&self) -> &[u8] {
        self.data
    }
}

struct FakeDepth<'a> {
    _guard: Guard,
    ledger: Rc<Ledger>,
    desc: FrameDescription,
    range: ReliableRange,
    data: &'a [u16],
    fail_lock: bool,
}

impl DepthFrame for FakeDepth<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn reliable_range(&self) -> ReliableRange {
        self.range
    }

    fn copy_frame_data(&self, dst: &mut [u16]) -> Result<(), SensorError> {
        copy_samples(FrameSource::Depth, self.data, dst)
    }

    fn lock_image_buffer(&self) -> Result<BufferLock<'_, u16>, SensorError> {
        if self.fail_lock {
            return Err(SensorError::buffer_lock(FrameSource::Depth, "device busy"));
        }
        let guard = Guard::new(&self.ledger, "depth lock");
        Ok(BufferLock::with_release(self.data, move || drop(guard)))
    }
}

struct FakeBodyIndex<'a> {
    _guard: Guard,
    ledger: Rc<Ledger>,
    desc: FrameDescription,
    data: &'a [u8],
    fail_lock: bool,
}

impl BodyIndexFrame for FakeBodyIndex<'_> {
    fn description(&self) -> FrameDescription {
        self.desc
    }

    fn lock_image_buffer(&self) -> Result<BufferLock<'_, u8>, SensorError> {
        if self.fail_lock {
            return Err(SensorError::buffer_lock(FrameSource::BodyIndex, "device busy"));
        }
        let guard = Guard::new(&self.ledger, "body index lock");
        Ok(BufferLock::with_release(self.data, move || drop(guard)))
    }
}

struct FakeBodies<'a> {
    _guard: Guard,
    bodies: &'a [Body],
}

impl BodyFrame for FakeBodies<'_> {
    fn refresh_body_data(&self, bodies: &mut Vec<Body>) {
        bodies.clear();
        bodies.extend_from_slice(self.bodies);
    }
}

impl FrameBundle for FakeBundle {
    fn acquire_infrared(&self) -> Option<Box<dyn InfraredFrame + '_>> {
        let (desc, data) = self.infrared.as_ref()?;
        Some(Box::new(FakeInfrared {
            _guard: Guard::new(&self.ledger, "infrared"),
            desc: *desc,
            data,
        }))
    }

    fn acquire_color(&self) -> Option<Box<dyn ColorFrame + '_>> {
        let (desc, format, data) = self.color.as_ref()?;
        Some(Box::new(FakeColor {
            _guard: Guard::new(&self.ledger, "color"),
            desc: *desc,
            format: *format,
            data,
        }))
    }

    fn acquire_depth(&self) -> Option<Box<dyn DepthFrame + '_>> {
        let (desc, range, data) = self.depth.as_ref()?;
        Some(Box::new(FakeDepth {
            _guard: Guard::new(&self.ledger, "depth"),
            ledger: self.ledger.clone(),
            desc: *desc,
            range: *range,
            data,
            fail_lock: self.fail_depth_lock,
        }))
    }

    fn acquire_body_index(&self) -> Option<Box<dyn BodyIndexFrame + '_>> {
        let (desc, data) = self.body_index.as_ref()?;
        Some(Box::new(FakeBodyIndex {
            _guard: Guard::new(&self.ledger, "body index"),
            ledger: self.ledger.clone(),
            desc: *desc,
            data,
            fail_lock: self.fail_body_index_lock,
        }))
    }

    fn acquire_body(&self) -> Option<Box<dyn BodyFrame + '_>> {
        let bodies = self.bodies.as_ref()?;
        Some(Box::new(FakeBodies {
            _guard: Guard::new(&self.ledger, "body"),
            bodies,
        }))
    }
}

/// Maps every color pixel to a fixed, caller-supplied depth point.
#[derive(Debug, Default)]
pub struct TableMapper {
    pub table: RefCell<Vec<DepthSpacePoint>>,
    pub calls: Cell<usize>,
}

impl CoordinateMapper for TableMapper {
    fn map_color_frame_to_depth_space(
        &self,
        _depth: &[u16],
        out: &mut [DepthSpacePoint],
    ) -> Result<(), SensorError> {
        self.calls.set(self.calls.get() + 1);
        let table = self.table.borrow();
        if table.len() != out.len() {
            return Err(SensorError::Mapping("table size differs".to_string()));
        }
        out.copy_from_slice(&table);
        Ok(())
    }

    fn map_camera_point_to_depth_space(&self, point: CameraSpacePoint) -> DepthSpacePoint {
        DepthSpacePoint::new(point.x, point.y)
    }
}

#[derive(Debug)]
pub struct FakeSensor {
    pub descriptions: HashMap<FrameSource, FrameDescription>,
    pub mapper: TableMapper,
    pub queries: Cell<usize>,
    pub available: bool,
    pub pending_availability: Option<bool>,
}

impl FakeSensor {
    pub fn new(color: (u32, u32), depth: (u32, u32)) -> Self {
        let mut descriptions = HashMap::new();
        descriptions.insert(FrameSource::Color, FrameDescription::new(color.0, color.1, 4));
        descriptions.insert(FrameSource::Depth, FrameDescription::new(depth.0, depth.1, 2));
        descriptions.insert(FrameSource::Infrared, FrameDescription::new(depth.0, depth.1, 2));
        descriptions.insert(FrameSource::BodyIndex, FrameDescription::new(depth.0, depth.1, 1));
        descriptions.insert(FrameSource::Body, FrameDescription::new(depth.0, depth.1, 2));
        FakeSensor {
            descriptions,
            mapper: TableMapper::default(),
            queries: Cell::new(0),
            available: true,
            pending_availability: None,
        }
    }
}

impl Sensor for FakeSensor {
    fn open(&mut self) -> Result<(), SensorError> {
        self.available = true;
        Ok(())
    }

    fn close(&mut self) {
        self.available = false;
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn availability_change(&mut self) -> Option<bool> {
        self.pending_availability.take()
    }

    fn frame_description(&self, source: FrameSource) -> FrameDescription {
        self.queries.set(self.queries.get() + 1);
        self.descriptions[&source]
    }

    fn body_count(&self) -> usize {
        6
    }

    fn coordinate_mapper(&self) -> &dyn CoordinateMapper {
        &self.mapper
    }
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub frames: Vec<PixelBuffer>,
    pub clears: usize,
    pub reject: bool,
}

impl Renderer for RecordingRenderer {
    fn present(&mut self, frame: &PixelBuffer) -> anyhow::Result<()> {
        if self.reject {
            anyhow::bail!("display surface lost");
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

pub fn bgra_pixels(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| {
            let v = 10 + i as u8 * 20;
            [v, v + 1, v + 2, 255]
        })
        .collect()
}
