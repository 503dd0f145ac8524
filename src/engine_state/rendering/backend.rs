//! Render backends.
//!
//! The scene host talks to the GPU only through [`RenderBackend`]. The wgpu
//! implementation draws to a real surface; [`HeadlessBackend`] keeps counters
//! so the worker can run without a GPU.

use std::sync::{Arc, Mutex};

use cgmath::{InnerSpace, Matrix4, Vector3};
use log::debug;

use super::meshing::Mesh;
use crate::core::{config::LightingConfig, errors::WorkerError};
use crate::engine_state::camera_state::{Camera, Projection};

/// Per-frame uniform block shared by the vertex and fragment stages.
///
/// # Memory Layout
/// - `view_proj`: 64 bytes
/// - `camera_position`, `light_direction`, `light_color`, `ambient_color`: 16 bytes each
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    /// Projection times view
    pub view_proj: [[f32; 4]; 4],
    /// Eye position, `w = 1`
    pub camera_position: [f32; 4],
    /// Unit vector toward the directional light
    pub light_direction: [f32; 4],
    /// Linear directional light color pre-multiplied by intensity
    pub light_color: [f32; 4],
    /// Linear ambient light color pre-multiplied by intensity
    pub ambient_color: [f32; 4],
}

impl FrameUniforms {
    /// Builds the uniforms for one frame.
    ///
    /// # Arguments
    /// * `camera` - View
    /// * `projection` - Perspective settings
    /// * `lighting` - Ambient and directional light
    pub fn new(camera: &Camera, projection: &Projection, lighting: &LightingConfig) -> Self {
        let view_proj: Matrix4<f32> = projection.calc_matrix() * camera.calc_matrix();
        let direction = Vector3::from(lighting.directional_direction);
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            Vector3::unit_y()
        };
        Self {
            view_proj: view_proj.into(),
            camera_position: camera.position.to_homogeneous().into(),
            light_direction: direction.extend(0.0).into(),
            light_color: scaled(lighting.directional_color.to_linear(), lighting.directional_intensity),
            ambient_color: scaled(lighting.ambient_color.to_linear(), lighting.ambient_intensity),
        }
    }
}

fn scaled(color: [f32; 3], intensity: f32) -> [f32; 4] {
    [color[0] * intensity, color[1] * intensity, color[2] * intensity, 1.0]
}

/// Something the scene can be drawn to.
pub trait RenderBackend {
    /// Resizes the drawing surface, in physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Replaces the GPU copy of the mesh. The previous buffers are released
    /// before this returns.
    fn upload_mesh(&mut self, mesh: &Mesh) -> Result<(), WorkerError>;

    /// Draws one frame of the uploaded mesh.
    fn render(&mut self, uniforms: &FrameUniforms) -> Result<(), WorkerError>;

    /// Frees every GPU resource. Later calls are no-ops.
    fn release(&mut self);
}

/// Parameters handed to a [`SurfaceFactory`] by `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRequest {
    /// Opaque host surface handle, if the host sent one
    pub canvas: Option<String>,
    /// Width in physical pixels
    pub width: u32,
    /// Height in physical pixels
    pub height: u32,
    /// RGBA clear color
    pub clear_color: [f32; 4],
}

/// Creates the backend for a starting worker.
pub trait SurfaceFactory {
    /// Creates a backend for `request`.
    fn create(&mut self, request: &SurfaceRequest) -> Result<Box<dyn RenderBackend>, WorkerError>;
}

/// Counters kept by [`HeadlessBackend`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessStats {
    /// Current surface width
    pub width: u32,
    /// Current surface height
    pub height: u32,
    /// Frames drawn
    pub frames_rendered: u64,
    /// Meshes uploaded
    pub meshes_uploaded: u64,
    /// Faces in the live mesh
    pub face_count: usize,
    /// Vertices in the live mesh
    pub vertex_count: usize,
    /// Whether `release` has run
    pub released: bool,
    /// Uniforms of the last frame
    pub last_uniforms: Option<FrameUniforms>,
}

/// Read access to the counters of every backend a factory created.
#[derive(Debug, Clone, Default)]
pub struct HeadlessProbe(Arc<Mutex<HeadlessStats>>);

impl HeadlessProbe {
    /// Copies the current counters.
    pub fn stats(&self) -> HeadlessStats {
        match self.0.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, change: impl FnOnce(&mut HeadlessStats)) {
        match self.0.lock() {
            Ok(mut stats) => change(&mut *stats),
            Err(poisoned) => change(&mut *poisoned.into_inner()),
        }
    }
}

/// A backend that draws nothing and counts what it was asked to do.
#[derive(Debug)]
pub struct HeadlessBackend {
    probe: HeadlessProbe,
}

impl HeadlessBackend {
    /// Creates a backend reporting into `probe`.
    pub fn new(probe: HeadlessProbe, width: u32, height: u32) -> Self {
        probe.update(|stats| {
            *stats = HeadlessStats {
                width,
                height,
                ..Default::default()
            }
        });
        Self { probe }
    }
}

impl RenderBackend for HeadlessBackend {
    fn resize(&mut self, width: u32, height: u32) {
        self.probe.update(|stats| {
            stats.width = width;
            stats.height = height;
        });
    }

    fn upload_mesh(&mut self, mesh: &Mesh) -> Result<(), WorkerError> {
        self.probe.update(|stats| {
            stats.meshes_uploaded += 1;
            stats.face_count = mesh.face_count();
            stats.vertex_count = mesh.vertex_count();
        });
        Ok(())
    }

    fn render(&mut self, uniforms: &FrameUniforms) -> Result<(), WorkerError> {
        let mut released = false;
        self.probe.update(|stats| {
            released = stats.released;
            if !released {
                stats.frames_rendered += 1;
                stats.last_uniforms = Some(*uniforms);
            }
        });
        if released {
            return Err(WorkerError::Resource("render surface has been released".into()));
        }
        Ok(())
    }

    fn release(&mut self) {
        debug!("Releasing headless backend");
        self.probe.update(|stats| {
            stats.released = true;
            stats.face_count = 0;
            stats.vertex_count = 0;
        });
    }
}

/// Creates [`HeadlessBackend`]s that all report into one probe.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurfaceFactory {
    probe: HeadlessProbe,
}

impl HeadlessSurfaceFactory {
    /// Creates a factory with a fresh probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// The probe shared with every backend this factory creates.
    pub fn probe(&self) -> HeadlessProbe {
        self.probe.clone()
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create(&mut self, request: &SurfaceRequest) -> Result<Box<dyn RenderBackend>, WorkerError> {
        Ok(Box::new(HeadlessBackend::new(
            self.probe.clone(),
            request.width,
            request.height,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    #[test]
    fn uniforms_carry_normalized_light_and_scaled_colors() {
        let camera = Camera::framing(15.0);
        let projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        let uniforms = FrameUniforms::new(&camera, &projection, &LightingConfig::default());
        let [x, y, z, w] = uniforms.light_direction;
        assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-6);
        assert_eq!(w, 0.0);
        assert!((uniforms.light_color[0] - 1.0).abs() < 1e-6);
        assert!(uniforms.ambient_color[0] < 0.5);
        assert_eq!(uniforms.camera_position, [10.5, 7.5, 10.5, 1.0]);
    }

    #[test]
    fn headless_backend_counts_work_until_released() {
        let mut factory = HeadlessSurfaceFactory::new();
        let probe = factory.probe();
        let request = SurfaceRequest { canvas: None, width: 320, height: 240, clear_color: [0.0; 4] };
        let mut backend = factory.create(&request).unwrap();
        backend.resize(640, 480);
        backend.upload_mesh(&Mesh::empty()).unwrap();
        backend.render(&bytemuck::Zeroable::zeroed()).unwrap();

        let stats = probe.stats();
        assert_eq!((stats.width, stats.height), (640, 480));
        assert_eq!(stats.meshes_uploaded, 1);
        assert_eq!(stats.frames_rendered, 1);

        backend.release();
        assert!(backend.render(&bytemuck::Zeroable::zeroed()).is_err());
        assert!(probe.stats().released);
    }
}
