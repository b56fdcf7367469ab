pub mod depth;
pub mod infrared;
pub mod pixel_buffer;
pub mod rgba_converter;
pub mod silhouette;
pub mod skeleton;

// Re-exports for convenience
pub use depth::convert_depth;
pub use infrared::convert_infrared;
pub use pixel_buffer::{PixelBuffer, PixelBufferError};
pub use rgba_converter::convert_color_frame;
pub use silhouette::composite_silhouette;
pub use skeleton::{SharedPosition, draw_bodies, sample_spine_base};
