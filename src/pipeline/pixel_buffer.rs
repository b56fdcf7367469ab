use thiserror::Error;

use crate::types::{BYTES_PER_PIXEL, FrameDescription};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PixelBufferError {
    #[error("expected {expected} bytes for {width}x{height}, got {actual}")]
    BoundsMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// One displayable BGRA image owned by the active display mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        PixelBuffer {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    #[must_use]
    pub fn for_description(description: &FrameDescription) -> Self {
        PixelBuffer::new(description.width, description.height)
    }

    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PixelBufferError> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(PixelBufferError::BoundsMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        BYTES_PER_PIXEL
    }

    pub fn stride(&self) -> u32 {
        self.width * BYTES_PER_PIXEL
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn pixel(&self, index: usize) -> Option<[u8; 4]> {
        let start = index.checked_mul(BYTES_PER_PIXEL as usize)?;
        let end = start.checked_add(BYTES_PER_PIXEL as usize)?;
        let bytes = self.data.get(start..end)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.data.chunks_exact_mut(BYTES_PER_PIXEL as usize)
    }

    /// Whether a sub-frame with this description can be written here.
    pub fn matches(&self, description: &FrameDescription) -> bool {
        description.same_size(self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Fill with one BGRA value.
    pub fn fill(&mut self, bgra: [u8; 4]) {
        for px in self.pixels_mut() {
            px.copy_from_slice(&bgra);
        }
    }

    /// Copy out as RGBA, the channel order image encoders expect.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = self.data.clone();
        for px in rgba.chunks_exact_mut(BYTES_PER_PIXEL as usize) {
            px.swap(0, 2);
        }
        rgba
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL as usize
}
