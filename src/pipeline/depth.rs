use rayon::prelude::*;

use super::PixelBuffer;
use crate::{error::PipelineError, types::ReliableRange};

/// Integer divisor mapping reliable depth onto a byte. Zero when
/// `max_reliable < 256`, in which case every pixel renders black.
pub fn depth_scale(range: ReliableRange) -> u16 {
    range.max / 256
}

/// Gray level for one depth sample. Samples outside the reliable range are
/// black; quotients above 255 saturate.
pub fn depth_intensity(depth: u16, range: ReliableRange, scale: u16) -> u8 {
    if scale == 0 || !range.contains(depth) {
        return 0;
    }
    (depth / scale).min(u8::MAX as u16) as u8
}

pub fn convert_depth(
    samples: &[u16],
    range: ReliableRange,
    out: &mut PixelBuffer,
) -> Result<(), PipelineError> {
    PipelineError::check_len("depth samples", out.pixel_count(), samples.len())?;

    let scale = depth_scale(range);
    if scale == 0 {
        log::debug!(
            "depth reliable max {} below 256, rendering frame black",
            range.max
        );
    }

    out.data_mut()
        .par_chunks_exact_mut(4)
        .zip(samples.par_iter().copied())
        .for_each(|(dst, depth)| {
            let intensity = depth_intensity(depth, range, scale);
            dst[0] = intensity;
            dst[1] = intensity;
            dst[2] = intensity;
            dst[3] = 255;
        });

    Ok(())
}
