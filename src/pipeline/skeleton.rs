use std::sync::{Arc, Mutex, PoisonError};

use super::PixelBuffer;
use crate::types::{
    Body, CameraSpacePoint, DepthSpacePoint, JointType, SampledPosition, TrackingState,
};

pub const BONES: &[(JointType, JointType)] = &[
    // Torso
    (JointType::Head, JointType::Neck),
    (JointType::Neck, JointType::SpineShoulder),
    (JointType::SpineShoulder, JointType::SpineMid),
    (JointType::SpineMid, JointType::SpineBase),
    (JointType::SpineShoulder, JointType::ShoulderRight),
    (JointType::SpineShoulder, JointType::ShoulderLeft),
    (JointType::SpineBase, JointType::HipRight),
    (JointType::SpineBase, JointType::HipLeft),
    // Right arm
    (JointType::ShoulderRight, JointType::ElbowRight),
    (JointType::ElbowRight, JointType::WristRight),
    (JointType::WristRight, JointType::HandRight),
    (JointType::HandRight, JointType::HandTipRight),
    (JointType::WristRight, JointType::ThumbRight),
    // Left arm
    (JointType::ShoulderLeft, JointType::ElbowLeft),
    (JointType::ElbowLeft, JointType::WristLeft),
    (JointType::WristLeft, JointType::HandLeft),
    (JointType::HandLeft, JointType::HandTipLeft),
    (JointType::WristLeft, JointType::ThumbLeft),
    // Right leg
    (JointType::HipRight, JointType::KneeRight),
    (JointType::KneeRight, JointType::AnkleRight),
    (JointType::AnkleRight, JointType::FootRight),
    // Left leg
    (JointType::HipLeft, JointType::KneeLeft),
    (JointType::KneeLeft, JointType::AnkleLeft),
    (JointType::AnkleLeft, JointType::FootLeft),
];

pub const TRACKED_BONE_THICKNESS: i32 = 5;
const INFERRED_BONE_THICKNESS: i32 = 1;
const JOINT_RADIUS: i32 = 3;

// BGRA
const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const TRACKED_BONE_COLOR: [u8; 4] = [129, 185, 16, 255];
const INFERRED_BONE_COLOR: [u8; 4] = [128, 128, 128, 255];
const TRACKED_JOINT_COLOR: [u8; 4] = [68, 192, 68, 255];
const INFERRED_JOINT_COLOR: [u8; 4] = [0, 255, 255, 255];

/// Latest sampled spine position, shared between the tick handler and the
/// position logger. Readers always see a whole `SampledPosition`.
#[derive(Clone, Debug, Default)]
pub struct SharedPosition {
    inner: Arc<Mutex<SampledPosition>>,
}

impl SharedPosition {
    pub fn new(initial: SampledPosition) -> Self {
        SharedPosition {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn store(&self, position: SampledPosition) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }

    pub fn snapshot(&self) -> SampledPosition {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Overwrites `shared` with the spine base of the last tracked body.
///
/// With several tracked bodies the last one in iteration order wins; there is
/// no nearest-body or identity tie-break. Returns whether anything was stored.
pub fn sample_spine_base(bodies: &[Body], shared: &SharedPosition) -> bool {
    let Some(body) = bodies.iter().rev().find(|body| body.is_tracked) else {
        return false;
    };
    shared.store(body.joint(JointType::SpineBase).position.into());
    true
}

/// Draws every tracked body as a stick figure over a cleared canvas.
pub fn draw_bodies<F>(canvas: &mut PixelBuffer, bodies: &[Body], project: F)
where
    F: Fn(CameraSpacePoint) -> DepthSpacePoint,
{
    canvas.fill(BACKGROUND);

    for body in bodies.iter().filter(|body| body.is_tracked) {
        let points: Vec<Option<(f32, f32)>> = body
            .joints
            .iter()
            .map(|joint| {
                if joint.tracking_state == TrackingState::NotTracked {
                    return None;
                }
                let point = project(joint.position);
                (point.x.is_finite() && point.y.is_finite()).then_some((point.x, point.y))
            })
            .collect();

        for &(a, b) in BONES {
            let (Some(pa), Some(pb)) = (points[a as usize], points[b as usize]) else {
                continue;
            };
            let both_tracked = body.joint(a).tracking_state == TrackingState::Tracked
                && body.joint(b).tracking_state == TrackingState::Tracked;
            let (color, thickness) = if both_tracked {
                (TRACKED_BONE_COLOR, TRACKED_BONE_THICKNESS)
            } else {
                (INFERRED_BONE_COLOR, INFERRED_BONE_THICKNESS)
            };
            draw_line(canvas, pa, pb, color, thickness);
        }

        for (joint, point) in body.joints.iter().zip(&points) {
            let Some((x, y)) = *point else { continue };
            let color = match joint.tracking_state {
                TrackingState::Tracked => TRACKED_JOINT_COLOR,
                _ => INFERRED_JOINT_COLOR,
            };
            draw_circle(canvas, (x as i32, y as i32), JOINT_RADIUS, color);
        }
    }
}

fn draw_line(
    canvas: &mut PixelBuffer,
    p0: (f32, f32),
    p1: (f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        for ox in -radius..=radius {
            for oy in -radius..=radius {
                if ox.abs() + oy.abs() <= radius {
                    put_pixel_safe(canvas, x0 + ox, y0 + oy, color);
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(canvas: &mut PixelBuffer, center: (i32, i32), radius: i32, color: [u8; 4]) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(canvas: &mut PixelBuffer, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= canvas.width() || uy >= canvas.height() {
        return;
    }
    let idx = (uy as usize * canvas.width() as usize + ux as usize) * 4;
    if let Some(px) = canvas.data_mut().get_mut(idx..idx + 4) {
        px.copy_from_slice(&color);
    }
}
