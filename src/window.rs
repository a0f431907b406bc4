//! Windowed runner.

use std::sync::Arc;

use log::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::SceneConfig;
use crate::error::Error;
use crate::experience::{Experience, Sizes};
use crate::gpu::GpuRenderer;
use crate::input::{Action, Input};

/// Wheel notches to camera distance.
const ZOOM_PER_LINE: f32 = 0.5;

/// Frames between frame-rate log lines.
const FPS_LOG_INTERVAL: u64 = 300;

pub struct App {
    config: SceneConfig,
    window: Option<Arc<Window>>,
    experience: Option<Experience>,
    input: Input,
    error: Option<Error>,
}

impl App {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            window: None,
            experience: None,
            input: Input::new(),
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Error> {
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = window.inner_size();
        let scale = window.scale_factor() as f32;

        let renderer = pollster::block_on(GpuRenderer::new(window.clone(), self.config.window.vsync))?;
        let sizes = Sizes::new(size.width, size.height, scale);
        let mut experience = Experience::new(self.config.clone(), Box::new(renderer), sizes)?;
        // Push the capped pixel ratio to the renderer before the first frame
        experience.resize();

        self.window = Some(window);
        self.experience = Some(experience);
        Ok(())
    }

    fn apply_input(&mut self) {
        let Some(experience) = self.experience.as_mut() else {
            return;
        };
        for action in self.input.actions() {
            match action {
                Action::Reveal => experience.reveal(),
                Action::Hide => experience.hide(),
                Action::ResetFields => {
                    if let Err(e) = experience.reset_fields() {
                        warn!("Field reset unavailable: {}", e);
                    }
                }
            }
        }
        let drag = self.input.drag_delta();
        let controls = &mut experience.camera_mut().controls;
        controls.rotate(drag.x, drag.y);
        controls.zoom(-self.input.scroll_delta() * ZOOM_PER_LINE);
        self.input.begin_frame();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        error!("{}", err);
        if let Some(experience) = self.experience.as_mut() {
            experience.destroy();
        }
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                if let Some(experience) = self.experience.as_mut() {
                    experience.destroy();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let (Some(experience), Some(window)) = (self.experience.as_mut(), &self.window) {
                    experience.set_size(
                        physical_size.width,
                        physical_size.height,
                        window.scale_factor() as f32,
                    );
                }
            }
            WindowEvent::RedrawRequested => {
                self.apply_input();
                let result = match self.experience.as_mut() {
                    Some(experience) => experience.frame(),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.fail(event_loop, e);
                    return;
                }
                if let Some(experience) = &self.experience {
                    let clock = experience.clock();
                    if clock.frame() % FPS_LOG_INTERVAL == 0 {
                        debug!("{:.1} fps", clock.fps());
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Open a window and run until it is closed.
pub fn run(config: SceneConfig) -> Result<(), Error> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    info!("Event loop finished");

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
