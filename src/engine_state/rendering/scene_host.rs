//! # Scene Host
//!
//! Owns everything needed to draw one frame: the render backend, the camera
//! and projection, the lights, the optional orbit controller and the single
//! live mesh.
//!
//! The mesh is swapped whole. A new mesh is uploaded first, the backend drops
//! the previous buffers in the same call, and only then is the CPU copy
//! replaced, so a frame never sees half of either mesh.

use std::mem;

use cgmath::Deg;
use log::{debug, info};

use super::backend::{FrameUniforms, RenderBackend};
use super::meshing::{Mesh, MeshBuilder};
use crate::core::{
    config::{LightingConfig, RenderConfig},
    errors::WorkerError,
    WorkerConfig,
};
use crate::engine_state::camera_state::{Camera, OrbitController, Projection};
use crate::engine_state::proxy::ProxyRegistry;
use crate::engine_state::voxels::VoxelGrid;

/// The drawable scene bound to one render surface.
pub struct SceneHost {
    backend: Box<dyn RenderBackend>,
    camera: Camera,
    projection: Projection,
    render_config: RenderConfig,
    lighting: LightingConfig,
    orbit: Option<OrbitController>,
    builder: MeshBuilder,
    mesh: Mesh,
    size: (u32, u32),
    released: bool,
}

impl SceneHost {
    /// Creates the scene and frames the camera for `grid_size`.
    ///
    /// # Arguments
    /// * `backend` - Where frames are drawn
    /// * `width` - Surface width in pixels
    /// * `height` - Surface height in pixels
    /// * `grid_size` - Side of the displayed grid
    /// * `config` - Camera, light and mesh settings
    /// * `orbit` - Controller to advance every frame, if controls are enabled
    pub fn new(
        backend: Box<dyn RenderBackend>,
        width: u32,
        height: u32,
        grid_size: usize,
        config: &WorkerConfig,
        orbit: Option<OrbitController>,
    ) -> Self {
        let render_config = config.render.clone();
        let camera = Camera::framing(render_config.camera_distance(grid_size));
        let projection = Projection::new(
            width,
            height,
            Deg(render_config.fov_degrees),
            render_config.znear,
            render_config.zfar,
        );
        info!("Scene created at {width}x{height} for grid size {grid_size}");
        Self {
            backend,
            camera,
            projection,
            render_config,
            lighting: config.lighting.clone(),
            orbit,
            builder: MeshBuilder::new(config.population.default_color),
            mesh: Mesh::empty(),
            size: (width, height),
            released: false,
        }
    }

    /// Current camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Current projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// The live mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Surface size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Whether an orbit controller is attached.
    pub fn has_orbit_controls(&self) -> bool {
        self.orbit.is_some()
    }

    /// Resizes the surface and updates the camera aspect.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), WorkerError> {
        self.ensure_live()?;
        self.backend.resize(width, height);
        self.projection.resize(width, height);
        self.size = (width, height);
        info!("Resized canvas to {width}x{height}");
        Ok(())
    }

    /// Reframes the camera and orbit limits for a new grid size.
    pub fn set_grid_size(&mut self, grid_size: usize) {
        self.camera = Camera::framing(self.render_config.camera_distance(grid_size));
        if let Some(orbit) = self.orbit.as_mut() {
            orbit.reset(grid_size);
        }
    }

    /// Meshes `grid` and installs the result.
    pub fn rebuild_mesh(&mut self, grid: &VoxelGrid) -> Result<(), WorkerError> {
        let mesh = self.builder.build(grid)?;
        self.swap_mesh(mesh)
    }

    /// Installs `mesh`, releasing the previous one.
    pub fn swap_mesh(&mut self, mesh: Mesh) -> Result<(), WorkerError> {
        self.ensure_live()?;
        self.backend.upload_mesh(&mesh)?;
        let previous = mem::replace(&mut self.mesh, mesh);
        debug!(
            "Swapped mesh: {} faces replaced by {} faces",
            previous.face_count(),
            self.mesh.face_count()
        );
        Ok(())
    }

    /// Advances the orbit controller and draws one frame.
    ///
    /// # Arguments
    /// * `proxies` - Source of the controller's input events
    pub fn render_frame(&mut self, proxies: &mut ProxyRegistry) -> Result<(), WorkerError> {
        self.ensure_live()?;
        if let Some(orbit) = self.orbit.as_mut() {
            if let Some(entry) = proxies.get_mut(orbit.proxy_id()) {
                orbit.process_events(entry, &self.camera, &self.projection);
            }
            orbit.update(&mut self.camera);
        }
        let uniforms = FrameUniforms::new(&self.camera, &self.projection, &self.lighting);
        self.backend.render(&uniforms)
    }

    /// Releases the backend and the mesh. The scene cannot draw afterwards.
    pub fn dispose(&mut self) {
        if self.released {
            return;
        }
        self.backend.release();
        self.mesh = Mesh::empty();
        self.orbit = None;
        self.released = true;
        info!("Scene resources released");
    }

    fn ensure_live(&self) -> Result<(), WorkerError> {
        if self.released {
            Err(WorkerError::Resource("renderer, scene, or camera not initialized".into()))
        } else {
            Ok(())
        }
    }
}
