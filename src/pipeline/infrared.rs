use rayon::prelude::*;

use super::PixelBuffer;
use crate::error::PipelineError;

const INFRARED_SOURCE_VALUE_MAXIMUM: f32 = u16::MAX as f32;

// Fixed exposure normalization; not recomputed from the live scene.
const INFRARED_SCENE_VALUE_AVERAGE: f32 = 0.08;
const INFRARED_SCENE_STANDARD_DEVIATIONS: f32 = 3.0;

const INFRARED_OUTPUT_VALUE_MINIMUM: f32 = 0.01;
const INFRARED_OUTPUT_VALUE_MAXIMUM: f32 = 1.0;

// Full-scale output is 225, not 255. Kept as-is pending calibration review.
const INFRARED_OUTPUT_SCALE: f32 = 225.0;

/// Gray level for one infrared sample.
pub fn infrared_intensity(sample: u16) -> u8 {
    let ratio = sample as f32 / INFRARED_SOURCE_VALUE_MAXIMUM;
    let ratio = ratio / (INFRARED_SCENE_VALUE_AVERAGE * INFRARED_SCENE_STANDARD_DEVIATIONS);
    let ratio = ratio.clamp(INFRARED_OUTPUT_VALUE_MINIMUM, INFRARED_OUTPUT_VALUE_MAXIMUM);
    (ratio * INFRARED_OUTPUT_SCALE).round() as u8
}

/// Converts `samples` (one per pixel) into opaque gray BGRA pixels.
pub fn convert_infrared(samples: &[u16], out: &mut PixelBuffer) -> Result<(), PipelineError> {
    PipelineError::check_len("infrared samples", out.pixel_count(), samples.len())?;

    out.data_mut()
        .par_chunks_exact_mut(4)
        .zip(samples.par_iter().copied())
        .for_each(|(dst, sample)| {
            let intensity = infrared_intensity(sample);
            dst[0] = intensity;
            dst[1] = intensity;
            dst[2] = intensity;
            dst[3] = 255;
        });

    Ok(())
}
