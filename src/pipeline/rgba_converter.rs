use rayon::prelude::*;
use yuv::{YuvPackedImage, YuvRange, YuvStandardMatrix, yuyv422_to_rgba};

use super::PixelBuffer;
use crate::{error::PipelineError, types::ColorImageFormat};

/// Writes a raw color frame into `out` as BGRA, the display format.
pub fn convert_color_frame(
    format: ColorImageFormat,
    data: &[u8],
    out: &mut PixelBuffer,
) -> Result<(), PipelineError> {
    let expected_len = out.pixel_count() * format.bytes_per_pixel();
    PipelineError::check_len("color frame bytes", expected_len, data.len())?;

    match format {
        ColorImageFormat::Bgra => out.data_mut().copy_from_slice(data),
        ColorImageFormat::Rgba => {
            out.data_mut().copy_from_slice(data);
            swap_red_blue(out.data_mut());
        }
        ColorImageFormat::Yuy2 => {
            yuy2_to_bgra(data, out)?;
        }
    }

    Ok(())
}

fn yuy2_to_bgra(data: &[u8], out: &mut PixelBuffer) -> Result<(), PipelineError> {
    let width = out.width();
    let height = out.height();
    let stride = out.stride();
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    yuyv422_to_rgba(
        &packed,
        out.data_mut(),
        stride,
        YuvRange::Limited,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| PipelineError::ColorConversion(format!("YUY2→RGBA failed: {err:?}")))?;

    swap_red_blue(out.data_mut());
    Ok(())
}

fn swap_red_blue(pixels: &mut [u8]) {
    pixels.par_chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
}
