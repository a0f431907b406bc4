//! The orchestrator.
//!
//! [`Experience`] owns every collaborator: clock, master timeline, viewport
//! [`Sizes`], scene graph, resources, camera, renderer and the composed
//! [`World`]. It subscribes to the clock's tick signal and the sizes' resize
//! signal at construction and drains both each time it is pumped.
//!
//! ```ignore
//! let sizes = Sizes::new(1280, 720, 2.0);
//! let renderer = HeadlessRenderer::new(sizes.width, sizes.height, sizes.pixel_ratio);
//! let mut experience = Experience::new(SceneConfig::default(), Box::new(renderer), sizes)?;
//!
//! loop {
//!     experience.frame()?;
//! }
//! ```

use log::{debug, error, info, trace};

use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::debug::{CommandContext, TunableValue};
use crate::error::{Error, RenderError, TuneError};
use crate::renderer::Renderer;
use crate::resources::Resources;
use crate::scene::{Dispose, DisposeReport, Scene};
use crate::signal::{ListenerId, Signal};
use crate::time::{Clock, Tick};
use crate::timeline::Timeline;
use crate::world::{World, WORLD_FOLDER};

/// Highest device pixel ratio the experience renders at.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Viewport dimensions. Emits an empty payload on every change.
#[derive(Debug)]
pub struct Sizes {
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio, capped at [`MAX_PIXEL_RATIO`].
    pub pixel_ratio: f32,
    pub on_resize: Signal<()>,
}

impl Sizes {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: device_pixel_ratio.min(MAX_PIXEL_RATIO),
            on_resize: Signal::new(),
        }
    }

    pub fn set(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        self.width = width;
        self.height = height;
        self.pixel_ratio = device_pixel_ratio.min(MAX_PIXEL_RATIO);
        self.on_resize.emit(());
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

pub struct Experience {
    config: SceneConfig,
    clock: Clock,
    timeline: Timeline,
    sizes: Sizes,
    scene: Scene,
    resources: Resources,
    camera: Camera,
    renderer: Box<dyn Renderer>,
    world: World,
    tick_listener: Option<ListenerId>,
    resize_listener: Option<ListenerId>,
    frames_rendered: u64,
    destroyed: bool,
}

impl Experience {
    /// Build an experience loading the built-in asset sources.
    pub fn new(config: SceneConfig, renderer: Box<dyn Renderer>, sizes: Sizes) -> Result<Self, Error> {
        Self::with_resources(config, renderer, sizes, Resources::with_default_sources())
    }

    pub fn with_resources(
        config: SceneConfig,
        renderer: Box<dyn Renderer>,
        mut sizes: Sizes,
        mut resources: Resources,
    ) -> Result<Self, Error> {
        config.validate()?;

        let mut clock = Clock::new();
        let tick_listener = Some(clock.on_tick.subscribe());
        let resize_listener = Some(sizes.on_resize.subscribe());
        let world = World::new(&config, &mut resources);
        let camera = Camera::new(sizes.aspect());

        info!(
            "Experience created: {}x{} @ {}x, {} asset source(s)",
            sizes.width,
            sizes.height,
            sizes.pixel_ratio,
            resources.total()
        );

        Ok(Self {
            config,
            clock,
            timeline: Timeline::new(),
            sizes,
            scene: Scene::new(),
            resources,
            camera,
            renderer,
            world,
            tick_listener,
            resize_listener,
            frames_rendered: 0,
            destroyed: false,
        })
    }

    /// Advance by wall-clock time and process everything queued.
    pub fn frame(&mut self) -> Result<(), Error> {
        if self.destroyed {
            trace!("Frame after destroy, ignored");
            return Ok(());
        }
        self.clock.tick();
        self.pump()
    }

    /// Advance by exactly `delta_ms` and process everything queued.
    pub fn step(&mut self, delta_ms: f32) -> Result<(), Error> {
        if self.destroyed {
            trace!("Step after destroy, ignored");
            return Ok(());
        }
        self.clock.advance(delta_ms);
        self.pump()
    }

    fn pump(&mut self) -> Result<(), Error> {
        if !self.resources.is_ready() {
            self.resources.poll()?;
        }
        self.world
            .poll_ready(&mut self.scene, &mut self.resources, self.sizes.pixel_ratio)?;

        if let Some(listener) = self.resize_listener {
            if !self.sizes.on_resize.drain(listener).is_empty() {
                self.resize();
            }
        }
        if let Some(listener) = self.tick_listener {
            for tick in self.clock.on_tick.drain(listener) {
                self.update(tick)?;
            }
        }
        Ok(())
    }

    /// Scrub the timeline to the tick, then update and draw the world.
    pub fn update(&mut self, tick: Tick) -> Result<(), RenderError> {
        if self.destroyed {
            return Ok(());
        }
        self.timeline.seek(tick.seconds());
        self.camera.update();
        self.world.update(&mut self.scene, &self.timeline, &tick);

        match self.renderer.render(&self.scene, &self.camera) {
            Ok(()) => {
                self.frames_rendered += 1;
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!("Render failed: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("Frame skipped: {}", e);
                Ok(())
            }
        }
    }

    /// Record a new viewport size. Applied on the next pump.
    pub fn set_size(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        if self.destroyed {
            return;
        }
        self.sizes.set(width, height, device_pixel_ratio);
    }

    /// Push the current sizes to the camera and renderer.
    pub fn resize(&mut self) {
        if self.destroyed {
            return;
        }
        debug!(
            "Resize to {}x{} @ {}x",
            self.sizes.width, self.sizes.height, self.sizes.pixel_ratio
        );
        self.camera.resize(self.sizes.width, self.sizes.height);
        self.renderer
            .resize(self.sizes.width, self.sizes.height, self.sizes.pixel_ratio);
    }

    pub fn reveal(&mut self) {
        if !self.destroyed {
            self.world.reveal_animation(&self.timeline);
        }
    }

    pub fn hide(&mut self) {
        if !self.destroyed {
            self.world.hide_animation(&self.timeline);
        }
    }

    /// Run a debug command. Folders exist only with `debug` enabled.
    pub fn invoke(&mut self, folder: &str, command: &str) -> Result<(), TuneError> {
        if self.destroyed {
            return Err(TuneError::UnknownFolder(folder.to_string()));
        }
        let mut ctx = CommandContext {
            timeline: &self.timeline,
            scene: &mut self.scene,
        };
        self.world.invoke(folder, command, &mut ctx)
    }

    pub fn set_tunable(&mut self, folder: &str, key: &str, value: TunableValue) -> Result<(), TuneError> {
        if self.destroyed {
            return Err(TuneError::UnknownFolder(folder.to_string()));
        }
        self.world.set_tunable(&mut self.scene, folder, key, value)
    }

    /// Regenerate every field through the world's debug folder.
    pub fn reset_fields(&mut self) -> Result<(), TuneError> {
        self.invoke(WORLD_FOLDER, "reset_fields")
    }

    /// Tear everything down. Returns what was released, or `None` when the
    /// experience was already destroyed.
    pub fn destroy(&mut self) -> Option<DisposeReport> {
        if self.destroyed {
            debug!("Experience already destroyed");
            return None;
        }
        self.destroyed = true;

        if let Some(listener) = self.tick_listener.take() {
            self.clock.on_tick.unsubscribe(listener);
        }
        if let Some(listener) = self.resize_listener.take() {
            self.sizes.on_resize.unsubscribe(listener);
        }
        self.world.detach(&mut self.resources);

        let report = self.scene.release_resources();
        self.camera.controls.dispose();
        self.renderer.dispose();

        info!(
            "Experience destroyed: {} renderables, {} geometries, {} material resources released",
            report.renderables_visited, report.geometries_released, report.material_resources_released
        );
        Some(report)
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn sizes(&self) -> &Sizes {
        &self.sizes
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Frames the renderer accepted.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl Drop for Experience {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessRenderer;

    fn experience() -> Experience {
        let config = SceneConfig {
            field_count: 32,
            ..SceneConfig::default()
        };
        let sizes = Sizes::new(800, 600, 3.0);
        let renderer = HeadlessRenderer::new(sizes.width, sizes.height, sizes.pixel_ratio);
        Experience::new(config, Box::new(renderer), sizes).unwrap()
    }

    #[test]
    fn test_pixel_ratio_capped() {
        assert_eq!(Sizes::new(10, 10, 3.0).pixel_ratio, 2.0);
        assert_eq!(Sizes::new(10, 10, 1.25).pixel_ratio, 1.25);
    }

    #[test]
    fn test_composes_after_first_frames() {
        let mut experience = experience();
        assert!(!experience.world().is_composed());
        experience.step(16.0).unwrap();
        assert!(experience.world().is_composed());
        assert_eq!(experience.frames_rendered(), 1);
        assert!((experience.timeline().time() - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_resize_reaches_camera() {
        let mut experience = experience();
        experience.set_size(1000, 500, 1.0);
        experience.step(16.0).unwrap();
        assert!((experience.camera().aspect - 2.0).abs() < 1e-6);
        assert_eq!(experience.sizes().pixel_ratio, 1.0);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut experience = experience();
        experience.step(16.0).unwrap();
        let report = experience.destroy().unwrap();
        assert!(report.geometries_released > 0);
        assert!(experience.destroy().is_none());

        experience.step(16.0).unwrap();
        experience.set_size(10, 10, 1.0);
        experience.resize();
        assert_eq!(experience.frames_rendered(), 1);
        assert_eq!(experience.clock().frame(), 1);
        assert!((experience.camera().aspect - 800.0 / 600.0).abs() < 1e-6);
    }
}
