//! Startup-time renderer configuration.
//!
//! All values here are fixed when the renderer is created; nothing is
//! runtime-reconfigurable. The defaults match the demo scene: a 1280x720
//! surface, an eight-deep fragment budget per pixel, and a 70 degree
//! vertical field of view with 0.05/500.0 clip planes.

/// Configuration for the transparency renderer.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Maximum transparent fragments retained per pixel. This bounds both
    /// the fragment pool allocation and the combine pass's list walk.
    pub max_fragments_per_pixel: u32,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Near clip plane distance.
    pub z_near: f32,
    /// Far clip plane distance.
    pub z_far: f32,
    /// When false the combine pass blends accumulated transparency over
    /// black instead of the opaque scene, which isolates the A-buffer
    /// contents for debugging.
    pub show_background: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            max_fragments_per_pixel: 8,
            fov_y_degrees: 70.0,
            z_near: 0.05,
            z_far: 500.0,
            show_background: true,
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn max_fragments_per_pixel(mut self, depth: u32) -> Self {
        self.max_fragments_per_pixel = depth;
        self
    }

    pub fn show_background(mut self, show: bool) -> Self {
        self.show_background = show;
        self
    }

    /// Aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
