use thiserror::Error;

/// Errors raised by the scene owner.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("{count} instances exceed the 24-bit picking key space ({max} max)")]
    PickingKeySpace { count: usize, max: usize },

    #[error("{count} instances need {bytes} bytes of instance data; device limit is {limit}")]
    BufferLimit { count: usize, bytes: u64, limit: u64 },

    #[error("picking readback mapping failed: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),

    #[error("picking readback callback was dropped before completion")]
    ReadbackDropped,

    #[error("device poll failed during picking readback: {0}")]
    Poll(#[from] wgpu::PollError),
}
