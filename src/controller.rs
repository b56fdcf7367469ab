use crate::{
    error::TickError,
    pipeline::{
        self, PixelBuffer, SharedPosition, composite_silhouette, convert_color_frame,
        convert_depth, convert_infrared,
    },
    presenter::Renderer,
    sensor::{
        BodyIndexFrame, BufferLock, ColorFrame, DepthFrame, FrameBundle, Sensor,
    },
    types::{Body, DepthSpacePoint, DisplayMode, FrameDescription, FrameSource, SensorStatus},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    FrameMissing(FrameSource),
    DimensionMismatch(FrameSource),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Nothing was published this tick. Expected under frame-rate jitter.
    Skipped(SkipReason),
}

/// Buffers owned by the active mode. Replaced wholesale on every switch.
#[derive(Debug)]
enum ModeState {
    Infrared {
        description: FrameDescription,
        samples: Vec<u16>,
        pixels: PixelBuffer,
    },
    Color {
        pixels: PixelBuffer,
    },
    Depth {
        description: FrameDescription,
        samples: Vec<u16>,
        pixels: PixelBuffer,
    },
    BodySilhouette {
        projection: Vec<DepthSpacePoint>,
        pixels: PixelBuffer,
    },
    BodyJoints {
        bodies: Vec<Body>,
        canvas: PixelBuffer,
    },
}

impl ModeState {
    fn allocate(mode: DisplayMode, sensor: &dyn Sensor) -> Self {
        let description = sensor.frame_description(mode.primary_source());
        let pixels = PixelBuffer::for_description(&description);
        match mode {
            DisplayMode::Infrared => ModeState::Infrared {
                description,
                samples: vec![0; description.pixel_count()],
                pixels,
            },
            DisplayMode::Color => ModeState::Color { pixels },
            DisplayMode::Depth => ModeState::Depth {
                description,
                samples: vec![0; description.pixel_count()],
                pixels,
            },
            DisplayMode::BodySilhouette => ModeState::BodySilhouette {
                projection: vec![DepthSpacePoint::UNMAPPED; description.pixel_count()],
                pixels,
            },
            DisplayMode::BodyJoints => ModeState::BodyJoints {
                bodies: Vec::with_capacity(sensor.body_count()),
                canvas: pixels,
            },
        }
    }

    fn mode(&self) -> DisplayMode {
        match self {
            ModeState::Infrared { .. } => DisplayMode::Infrared,
            ModeState::Color { .. } => DisplayMode::Color,
            ModeState::Depth { .. } => DisplayMode::Depth,
            ModeState::BodySilhouette { .. } => DisplayMode::BodySilhouette,
            ModeState::BodyJoints { .. } => DisplayMode::BodyJoints,
        }
    }

    fn output(&self) -> &PixelBuffer {
        match self {
            ModeState::Infrared { pixels, .. }
            | ModeState::Color { pixels }
            | ModeState::Depth { pixels, .. }
            | ModeState::BodySilhouette { pixels, .. } => pixels,
            ModeState::BodyJoints { canvas, .. } => canvas,
        }
    }
}

/// Sub-frames held by a silhouette tick. Dropping it releases all of them,
/// whichever step of the tick bailed out.
struct SilhouetteSources<'a> {
    depth: Box<dyn DepthFrame + 'a>,
    color: Box<dyn ColorFrame + 'a>,
    body_index: Box<dyn BodyIndexFrame + 'a>,
}

impl<'a> SilhouetteSources<'a> {
    fn acquire(bundle: &'a dyn FrameBundle) -> Result<Self, SkipReason> {
        let depth = bundle
            .acquire_depth()
            .ok_or(SkipReason::FrameMissing(FrameSource::Depth))?;
        let color = bundle
            .acquire_color()
            .ok_or(SkipReason::FrameMissing(FrameSource::Color))?;
        let body_index = bundle
            .acquire_body_index()
            .ok_or(SkipReason::FrameMissing(FrameSource::BodyIndex))?;
        Ok(SilhouetteSources {
            depth,
            color,
            body_index,
        })
    }
}

// Declared after the sources in each tick so the views drop first.
struct LockedViews<'a> {
    depth: BufferLock<'a, u16>,
    body_index: BufferLock<'a, u8>,
}

/// Selects the active display mode and runs its conversion once per tick.
pub struct ModeController<S, R> {
    sensor: S,
    renderer: R,
    state: ModeState,
    position: SharedPosition,
    status: SensorStatus,
}

impl<S: Sensor, R: Renderer> ModeController<S, R> {
    pub fn new(sensor: S, renderer: R, initial: DisplayMode, position: SharedPosition) -> Self {
        let state = ModeState::allocate(initial, &sensor);
        let status = SensorStatus::from_available(sensor.is_available());
        log::info!("display mode {initial}, sensor {}", status.label());
        ModeController {
            sensor,
            renderer,
            state,
            position,
            status,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.state.mode()
    }

    pub fn status(&self) -> SensorStatus {
        self.status
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn position(&self) -> &SharedPosition {
        &self.position
    }

    /// The buffer the active mode publishes. Sized to its FrameDescription.
    pub fn output(&self) -> &PixelBuffer {
        self.state.output()
    }

    /// The single transition entry point. Returns `false` without touching
    /// any buffer when `mode` is already active.
    pub fn switch_mode(&mut self, mode: DisplayMode) -> bool {
        if self.mode() == mode {
            return false;
        }

        self.renderer.clear();
        self.state = ModeState::allocate(mode, &self.sensor);
        let output = self.state.output();
        log::info!(
            "switched to {mode} display ({}x{})",
            output.width(),
            output.height()
        );
        true
    }

    /// Forwards an availability change reported by the sensor, if any.
    pub fn poll_availability(&mut self) {
        if let Some(available) = self.sensor.availability_change() {
            self.on_availability_changed(available);
        }
    }

    pub fn on_availability_changed(&mut self, available: bool) {
        let status = SensorStatus::from_available(available);
        if status != self.status {
            log::info!("sensor status: {}", status.label());
            self.status = status;
        }
    }

    /// Runs one tick against the mode active when it began. Sub-frames are
    /// acquired on demand and released before returning on every path.
    pub fn handle_bundle(&mut self, bundle: &dyn FrameBundle) -> Result<TickOutcome, TickError> {
        let outcome = match &mut self.state {
            ModeState::Infrared {
                description,
                samples,
                pixels,
            } => show_infrared(bundle, description, samples, pixels)?,
            ModeState::Color { pixels } => show_color(bundle, pixels)?,
            ModeState::Depth {
                description,
                samples,
                pixels,
            } => show_depth(bundle, description, samples, pixels)?,
            ModeState::BodySilhouette { projection, pixels } => {
                show_silhouette(bundle, &self.sensor, projection, pixels)?
            }
            ModeState::BodyJoints { bodies, canvas } => {
                show_body_joints(bundle, &self.sensor, &self.position, bodies, canvas)
            }
        };

        if outcome == TickOutcome::Rendered {
            self.renderer
                .present(self.state.output())
                .map_err(TickError::Render)?;
        }
        Ok(outcome)
    }
}

fn show_infrared(
    bundle: &dyn FrameBundle,
    description: &FrameDescription,
    samples: &mut [u16],
    pixels: &mut PixelBuffer,
) -> Result<TickOutcome, TickError> {
    let Some(frame) = bundle.acquire_infrared() else {
        return Ok(TickOutcome::Skipped(SkipReason::FrameMissing(FrameSource::Infrared)));
    };
    let frame_description = frame.description();
    if frame_description.pixel_count() != samples.len()
        || !frame_description.same_size(description.width, description.height)
        || !pixels.matches(&frame_description)
    {
        return Ok(TickOutcome::Skipped(SkipReason::DimensionMismatch(FrameSource::Infrared)));
    }

    frame.copy_frame_data(samples)?;
    drop(frame);

    convert_infrared(samples, pixels)?;
    Ok(TickOutcome::Rendered)
}

fn show_color(bundle: &dyn FrameBundle, pixels: &mut PixelBuffer) -> Result<TickOutcome, TickError> {
    let Some(frame) = bundle.acquire_color() else {
        return Ok(TickOutcome::Skipped(SkipReason::FrameMissing(FrameSource::Color)));
    };
    if !pixels.matches(&frame.description()) {
        return Ok(TickOutcome::Skipped(SkipReason::DimensionMismatch(FrameSource::Color)));
    }

    convert_color_frame(frame.raw_format(), frame.raw_data(), pixels)?;
    Ok(TickOutcome::Rendered)
}

fn show_depth(
    bundle: &dyn FrameBundle,
    description: &FrameDescription,
    samples: &mut [u16],
    pixels: &mut PixelBuffer,
) -> Result<TickOutcome, TickError> {
    let Some(frame) = bundle.acquire_depth() else {
        return Ok(TickOutcome::Skipped(SkipReason::FrameMissing(FrameSource::Depth)));
    };
    let frame_description = frame.description();
    if frame_description.pixel_count() != samples.len()
        || !frame_description.same_size(description.width, description.height)
        || !pixels.matches(&frame_description)
    {
        return Ok(TickOutcome::Skipped(SkipReason::DimensionMismatch(FrameSource::Depth)));
    }

    frame.copy_frame_data(samples)?;
    let range = frame.reliable_range();
    drop(frame);

    convert_depth(samples, range, pixels)?;
    Ok(TickOutcome::Rendered)
}

fn show_silhouette(
    bundle: &dyn FrameBundle,
    sensor: &dyn Sensor,
    projection: &mut [DepthSpacePoint],
    pixels: &mut PixelBuffer,
) -> Result<TickOutcome, TickError> {
    let sources = match SilhouetteSources::acquire(bundle) {
        Ok(sources) => sources,
        Err(reason) => return Ok(TickOutcome::Skipped(reason)),
    };

    let color_description = sources.color.description();
    let depth_description = sources.depth.description();
    if !pixels.matches(&color_description) || projection.len() != pixels.pixel_count() {
        return Ok(TickOutcome::Skipped(SkipReason::DimensionMismatch(FrameSource::Color)));
    }
    if !sources
        .body_index
        .description()
        .same_size(depth_description.width, depth_description.height)
    {
        return Ok(TickOutcome::Skipped(SkipReason::DimensionMismatch(FrameSource::BodyIndex)));
    }

    let views = LockedViews {
        depth: sources.depth.lock_image_buffer()?,
        body_index: sources.body_index.lock_image_buffer()?,
    };
    if views.depth.len() != depth_description.pixel_count() {
        return Ok(TickOutcome::Skipped(SkipReason::DimensionMismatch(FrameSource::Depth)));
    }
    if views.body_index.len() != depth_description.pixel_count() {
        return Ok(TickOutcome::Skipped(SkipReason::DimensionMismatch(FrameSource::BodyIndex)));
    }

    sensor
        .coordinate_mapper()
        .map_color_frame_to_depth_space(&views.depth, projection)?;
    convert_color_frame(
        sources.color.raw_format(),
        sources.color.raw_data(),
        pixels,
    )?;
    composite_silhouette(
        pixels.data_mut(),
        projection,
        &views.body_index,
        depth_description.width,
        depth_description.height,
    )?;

    Ok(TickOutcome::Rendered)
}

fn show_body_joints(
    bundle: &dyn FrameBundle,
    sensor: &dyn Sensor,
    position: &SharedPosition,
    bodies: &mut Vec<Body>,
    canvas: &mut PixelBuffer,
) -> TickOutcome {
    let Some(frame) = bundle.acquire_body() else {
        return TickOutcome::Skipped(SkipReason::FrameMissing(FrameSource::Body));
    };
    frame.refresh_body_data(bodies);
    drop(frame);

    let mapper = sensor.coordinate_mapper();
    pipeline::draw_bodies(canvas, bodies, |point| {
        mapper.map_camera_point_to_depth_space(point)
    });
    pipeline::sample_spine_base(bodies, position);
    TickOutcome::Rendered
}
