//! Startup error taxonomy.
//!
//! Everything in this enum is fatal: device acquisition, geometry loading,
//! and the fragment-pool budget are checked once at startup, reported with
//! context, and never retried. Steady-state conditions (fragment overflow,
//! lost surface frames) are handled in place and never reach this type.

use crate::geometry::GeometryError;

/// Errors that can occur while bringing the renderer up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No suitable GPU adapter was found.
    #[error("failed to acquire a GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to create a logical device.
    #[error("failed to create a GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// The window surface could not be created.
    #[error("failed to create the window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    /// Geometry file could not be loaded or parsed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The device's maximum storage binding size cannot hold even a single
    /// fragment record, so the A-buffer cannot be allocated.
    #[error(
        "fragment pool cannot be allocated: device storage binding limit is \
         {limit} bytes, smaller than one fragment record"
    )]
    FragmentPoolTooSmall {
        /// The device's `max_storage_buffer_binding_size`.
        limit: u32,
    },
}
