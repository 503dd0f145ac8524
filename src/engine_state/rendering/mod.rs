//! Rendering system for the voxel worker.
//!
//! This module turns the voxel grid into GPU geometry and draws it: the
//! face-culling mesher, the per-frame scene state, and the backends that
//! actually present frames (wgpu, or headless for tests and CLI runs).

pub mod backend;
pub mod meshing;
pub mod scene_host;
mod texture;
mod vertex;
pub mod wgpu_backend;

// Re-export commonly used types
pub use backend::{
    FrameUniforms, HeadlessProbe, HeadlessStats, HeadlessSurfaceFactory, RenderBackend,
    SurfaceFactory, SurfaceRequest,
};
pub use scene_host::SceneHost;
pub use vertex::Vertex;
pub use wgpu_backend::{PreparedSurface, WgpuSurfaceFactory};
