//! Render output.
//!
//! The experience talks to its output through [`Renderer`]. The windowed
//! build uses the GPU renderer; tests and `--headless` runs use
//! [`HeadlessRenderer`], which walks the scene the same way but draws nothing.

use log::debug;

use crate::camera::Camera;
use crate::error::RenderError;
use crate::scene::{Dispose, Scene};

/// Something that turns the scene into frames.
pub trait Renderer: Dispose {
    /// Match a new output size. `pixel_ratio` is already capped.
    fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32);

    /// Draw one frame. Does nothing after dispose.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError>;
}

/// Counts frames and draw calls without touching a GPU.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    frames: u64,
    last_draw_count: usize,
    disposed: bool,
}

impl HeadlessRenderer {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Visible renderables in the last frame.
    pub fn last_draw_count(&self) -> usize {
        self.last_draw_count
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }
}

impl Renderer for HeadlessRenderer {
    fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        if self.disposed {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixel_ratio = pixel_ratio;
    }

    fn render(&mut self, scene: &Scene, _camera: &Camera) -> Result<(), RenderError> {
        if self.disposed {
            return Ok(());
        }
        self.last_draw_count = scene.renderables().len();
        self.frames += 1;
        Ok(())
    }
}

impl Dispose for HeadlessRenderer {
    fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        debug!("Headless renderer disposed after {} frames", self.frames);
        true
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_frames_until_disposed() {
        let scene = Scene::new();
        let camera = Camera::new(1.0);
        let mut renderer = HeadlessRenderer::new(800, 600, 1.0);

        renderer.render(&scene, &camera).unwrap();
        renderer.render(&scene, &camera).unwrap();
        assert_eq!(renderer.frames(), 2);

        assert!(renderer.dispose());
        assert!(!renderer.dispose());
        renderer.render(&scene, &camera).unwrap();
        renderer.resize(10, 10, 2.0);
        assert_eq!(renderer.frames(), 2);
        assert_eq!(renderer.size(), (800, 600));
    }
}
