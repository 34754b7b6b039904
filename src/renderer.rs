//! Frame orchestrator: owns the passes and runs them in order.

use log::info;

use crate::abuffer::ABuffer;
use crate::combine::CombinePass;
use crate::config::RendererConfig;
use crate::draw::{DrawCall, TransparentDraw};
use crate::error::Error;
use crate::gbuffer::{GBuffer, OpaquePass};
use crate::gpu::GpuContext;
use crate::scene::{self, Globals, Light};
use crate::transparency::TransparencyPass;

/// Ties the opaque, transparency and combine passes together around a
/// shared A-buffer. One instance per surface.
pub struct Renderer {
    config: RendererConfig,
    lights: Vec<Light>,
    globals: Globals,
    gbuffer: GBuffer,
    abuffer: ABuffer,
    opaque_pass: OpaquePass,
    transparency_pass: TransparencyPass,
    combine_pass: CombinePass,
}

impl Renderer {
    pub fn new(gpu: &GpuContext, config: RendererConfig, lights: Vec<Light>) -> Result<Self, Error> {
        let globals = Globals::new(gpu, &config, &lights);
        let gbuffer = GBuffer::new(gpu);
        let abuffer = ABuffer::new(gpu, &config)?;

        let opaque_pass = OpaquePass::new(gpu, &config, &globals);
        let transparency_pass = TransparencyPass::new(gpu, &globals, &abuffer);
        let combine_pass = CombinePass::new(gpu, &config, &abuffer);

        info!(
            "renderer ready: {}x{}, up to {} transparent layers per pixel",
            gpu.width(),
            gpu.height(),
            config.max_fragments_per_pixel
        );

        Ok(Self {
            config,
            lights,
            globals,
            gbuffer,
            abuffer,
            opaque_pass,
            transparency_pass,
            combine_pass,
        })
    }

    /// Rebuilds the size-dependent resources after the surface changed.
    ///
    /// The pipelines stay as they are; the fresh A-buffer's bind groups
    /// are layout-compatible with the ones they were built against.
    pub fn resize(&mut self, gpu: &GpuContext) -> Result<(), Error> {
        self.config.width = gpu.width();
        self.config.height = gpu.height();
        self.gbuffer.ensure_size(gpu);
        self.abuffer = ABuffer::new(gpu, &self.config)?;
        self.globals
            .upload(gpu, scene::projection(&self.config), &self.lights);
        Ok(())
    }

    /// Renders one frame and presents it.
    ///
    /// Pass order within the encoder matters: the A-buffer reset must
    /// precede the accumulation pass, and the combine pass must start
    /// after the accumulation pass ends so every list write has landed.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        opaque: &[DrawCall],
        transparent: &[TransparentDraw],
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = gpu.surface.get_current_texture()?;
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.opaque_pass
            .render(gpu, &mut encoder, &self.gbuffer, &self.globals, opaque);

        self.abuffer.reset(&gpu.queue, &mut encoder);
        self.transparency_pass.render(
            gpu,
            &mut encoder,
            &surface_view,
            &self.gbuffer,
            &self.globals,
            &self.abuffer,
            transparent,
        );

        self.combine_pass
            .render(gpu, &mut encoder, &surface_view, &self.gbuffer, &self.abuffer);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }
}
