//! Windowed demo application.
//!
//! Drives the renderer from a winit event loop: one opaque mesh and a
//! transparent mesh drawn twice (once mirrored), swaying through each
//! other so the per-pixel sorting is visible from every overlap order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{error, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::RendererConfig;
use crate::draw::{DrawCall, TransparentDraw};
use crate::error::Error;
use crate::geometry;
use crate::gpu::GpuContext;
use crate::mesh::Mesh;
use crate::motion::scene_motion;
use crate::renderer::Renderer;
use crate::scene;

/// Demo settings, filled in from the command line.
pub struct AppConfig {
    pub title: String,
    pub renderer: RendererConfig,
    /// OBJ path for the opaque mesh; a procedural sphere when absent.
    pub opaque_obj: Option<PathBuf>,
    /// OBJ path for the transparent mesh; a procedural torus when absent.
    pub transparent_obj: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "lucent".to_string(),
            renderer: RendererConfig::default(),
            opaque_obj: None,
            transparent_obj: None,
        }
    }
}

pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    renderer: Option<Renderer>,
    opaque_mesh: Option<Mesh>,
    transparent_mesh: Option<Mesh>,
    start_time: Instant,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            gpu: None,
            renderer: None,
            opaque_mesh: None,
            transparent_mesh: None,
            start_time: Instant::now(),
        }
    }

    pub fn run(mut self) -> Result<(), winit::error::EventLoopError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)
    }

    fn load_mesh(gpu: &GpuContext, path: &Path) -> Result<Mesh, Error> {
        Ok(geometry::load_obj(path)?.upload(gpu))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attrs = WindowAttributes::default()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.renderer.width,
                self.config.renderer.height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );

        let gpu = GpuContext::new(window.clone()).expect("failed to initialize GPU");

        let mut config = self.config.renderer;
        config.width = gpu.width();
        config.height = gpu.height();

        let renderer = Renderer::new(&gpu, config, scene::demo_lights())
            .expect("failed to build renderer");

        // The demo has nothing to show without its geometry.
        self.opaque_mesh = Some(match &self.config.opaque_obj {
            Some(path) => Self::load_mesh(&gpu, path)
                .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display())),
            None => Mesh::sphere(&gpu, 1.0, 48, 24),
        });
        self.transparent_mesh = Some(match &self.config.transparent_obj {
            Some(path) => Self::load_mesh(&gpu, path)
                .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display())),
            None => Mesh::torus(&gpu, 1.0, 0.4, 48, 24),
        });

        self.gpu = Some(gpu);
        self.renderer = Some(renderer);
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let (Some(gpu), Some(renderer)) = (&mut self.gpu, &mut self.renderer) {
                    gpu.resize(size.width, size.height);
                    if let Err(e) = renderer.resize(gpu) {
                        error!("resize failed: {e}");
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let (Some(gpu), Some(renderer)) = (&mut self.gpu, &mut self.renderer) else {
                    return;
                };
                let (Some(opaque_mesh), Some(transparent_mesh)) =
                    (&self.opaque_mesh, &self.transparent_mesh)
                else {
                    return;
                };

                let motion = scene_motion(self.start_time.elapsed().as_secs_f32());

                let opaque = [DrawCall {
                    mesh: opaque_mesh,
                    transform: motion.opaque,
                }];
                let transparent = [
                    TransparentDraw {
                        mesh: transparent_mesh,
                        transform: motion.transparent,
                        alpha: motion.alpha,
                    },
                    TransparentDraw {
                        mesh: transparent_mesh,
                        transform: motion.mirrored,
                        alpha: motion.alpha,
                    },
                ];

                match renderer.render(gpu, &opaque, &transparent) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        gpu.reconfigure();
                        if let Err(e) = renderer.resize(gpu) {
                            error!("surface recovery failed: {e}");
                            event_loop.exit();
                        }
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("out of GPU memory");
                        event_loop.exit();
                    }
                    Err(e) => warn!("dropped frame: {e}"),
                }

                self.window.as_ref().unwrap().request_redraw();
            }
            _ => (),
        }
    }
}
