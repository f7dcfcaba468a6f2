//! wgpu device and window surface.

mod gpu;
mod init;
mod surface;

pub use gpu::Gpu;
pub use init::GpuInit;
pub use surface::{GpuFrame, SurfaceErrorAction};
