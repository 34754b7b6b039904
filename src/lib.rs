//! # Lucent
//!
//! **Order-independent transparency over wgpu.**
//!
//! Lucent renders transparent geometry without sorting a single mesh on
//! the CPU. Every transparent fragment is pushed onto a per-pixel linked
//! list in GPU storage buffers during rasterization; a fullscreen resolve
//! then sorts each pixel's handful of fragments by depth and blends them
//! back to front over the opaque scene. Overlapping, interpenetrating and
//! self-overlapping transparent surfaces all come out correct, whatever
//! order they were drawn in.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lucent::{App, AppConfig};
//!
//! fn main() {
//!     let _ = App::new(AppConfig::default()).run();
//! }
//! ```
//!
//! For custom scenes, build a [`Renderer`] over a [`GpuContext`] and feed
//! it [`DrawCall`]s and [`TransparentDraw`]s each frame.
//!
//! ## How it works
//!
//! - **Opaque pass** shades opaque meshes into offscreen color and linear
//!   depth targets with ordinary depth testing.
//! - **Transparency pass** rasterizes transparent meshes with no depth
//!   attachment; each fragment atomically grabs a pool slot and pushes
//!   itself onto its pixel's list head.
//! - **Combine pass** walks each list, sorts by view depth and blends the
//!   result over the opaque color.

mod abuffer;
mod app;
mod combine;
mod config;
mod draw;
mod error;
mod gbuffer;
mod geometry;
mod gpu;
mod mesh;
mod motion;
mod renderer;
mod scene;
mod transparency;

pub use abuffer::{ABuffer, FRAGMENT_RECORD_SIZE, FragmentRecord, pool_capacity};
pub use app::{App, AppConfig};
pub use combine::CombinePass;
pub use config::RendererConfig;
pub use draw::{DrawCall, TransparentDraw};
pub use error::Error;
pub use gbuffer::{GBuffer, OpaquePass};
pub use geometry::{GeometryError, RawGeometry, load_obj, parse_obj};
pub use gpu::GpuContext;
pub use mesh::{Mesh, Vertex, sphere_geometry, torus_geometry};
pub use motion::{SceneMotion, scene_motion};
pub use renderer::Renderer;
pub use scene::{Globals, Light, MAX_LIGHTS, demo_lights, projection};
pub use transparency::TransparencyPass;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec3, Vec4};
