use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;

use crate::pipeline::PixelBuffer;

/// Displays finished frames. Frames arrive as BGRA.
pub trait Renderer {
    fn present(&mut self, frame: &PixelBuffer) -> Result<()>;

    /// Drops whatever the previous display mode left on screen.
    fn clear(&mut self);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn present(&mut self, frame: &PixelBuffer) -> Result<()> {
        (**self).present(frame)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

/// Counts frames and logs the rate of progress; used when nothing is
/// configured to receive images.
#[derive(Debug, Default)]
pub struct LogRenderer {
    presented: u64,
}

impl LogRenderer {
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Renderer for LogRenderer {
    fn present(&mut self, frame: &PixelBuffer) -> Result<()> {
        self.presented += 1;
        if self.presented % 100 == 1 {
            log::info!(
                "presented {} frames (latest {}x{})",
                self.presented,
                frame.width(),
                frame.height()
            );
        }
        Ok(())
    }

    fn clear(&mut self) {
        log::debug!("display cleared");
    }
}

/// Writes every `every`-th frame into `dir` as a numbered PNG.
#[derive(Debug)]
pub struct FrameDumpRenderer {
    dir: PathBuf,
    every: u64,
    seen: u64,
    written: u64,
}

impl FrameDumpRenderer {
    pub fn new(dir: impl Into<PathBuf>, every: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create frame dump directory {}", dir.display()))?;
        Ok(FrameDumpRenderer {
            dir,
            every: every.max(1),
            seen: 0,
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn frame_path(&self) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", self.written))
    }
}

impl Renderer for FrameDumpRenderer {
    fn present(&mut self, frame: &PixelBuffer) -> Result<()> {
        self.seen += 1;
        if (self.seen - 1) % self.every != 0 {
            return Ok(());
        }

        let path = self.frame_path();
        save_png(frame, &path)?;
        self.written += 1;
        log::debug!("wrote {}", path.display());
        Ok(())
    }

    fn clear(&mut self) {
        self.seen = 0;
    }
}

pub fn save_png(frame: &PixelBuffer, path: &Path) -> Result<()> {
    let Some(img) = RgbaImage::from_raw(frame.width(), frame.height(), frame.to_rgba()) else {
        return Err(anyhow!("failed to build RGBA image from frame"));
    };
    img.save(path)
        .with_context(|| format!("failed to write frame to {}", path.display()))
}
