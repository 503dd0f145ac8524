//! Mesh data structures and the face-culling mesh builder.
//!
//! The builder rescans the whole grid on every call and emits one quad per
//! solid-cell side that borders an empty or out-of-range neighbor. Internal
//! faces are never emitted. Vertices are not shared between faces: each face
//! adds 4 vertices and 6 indices.
//!
//! All positions are shifted by `-(N / 2 - 0.5)` on each axis so the grid
//! sits around the origin whatever its size.
//!
//! Indices are `u32`. A mesh whose vertex count would leave that range is
//! refused with `WorkerError::Resource` rather than wrapped.

use cgmath::Point3;
use log::{debug, warn};

use super::face::{BlockSide, Face};
use crate::core::errors::WorkerError;
use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::{Rgb, VoxelGrid};

/// Smallest sphere enclosing the mesh, computed around the AABB centre.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingSphere {
    /// Sphere centre
    pub center: [f32; 3],
    /// Sphere radius; zero for an empty mesh
    pub radius: f32,
}

impl BoundingSphere {
    fn from_positions(positions: &[[f32; 3]]) -> Self {
        if positions.is_empty() {
            return Self::default();
        }
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for position in positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }
        let center = [
            (min[0] + max[0]) * 0.5,
            (min[1] + max[1]) * 0.5,
            (min[2] + max[2]) * 0.5,
        ];
        let radius = positions
            .iter()
            .map(|p| {
                let (dx, dy, dz) = (p[0] - center[0], p[1] - center[1], p[2] - center[2]);
                (dx * dx + dy * dy + dz * dz).sqrt()
            })
            .fold(0.0, f32::max);
        Self { center, radius }
    }
}

/// A renderable triangle mesh with per-vertex normals and colors.
///
/// Meshes are rebuilt, never edited in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals, one of the six axis unit vectors
    pub normals: Vec<[f32; 3]>,
    /// Vertex colors, sRGB 0.0-1.0
    pub colors: Vec<[f32; 3]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Bounding volume, valid even when empty
    pub bounds: BoundingSphere,
}

impl Mesh {
    /// A mesh with no geometry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of quad faces.
    pub fn face_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Interleaves the attribute arrays into GPU vertices.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.colors)
            .map(|((position, normal), color)| Vertex {
                position: *position,
                normal: *normal,
                color: *color,
            })
            .collect()
    }

    /// Appends one face, with every vertex sharing `color`.
    ///
    /// # Arguments
    /// * `face` - The quad to append
    /// * `color` - Color of all four vertices
    ///
    /// # Returns
    /// `WorkerError::Resource` when the face's vertices cannot be indexed by `u32`
    pub fn push_face(&mut self, face: &Face, color: [f32; 3]) -> Result<(), WorkerError> {
        let base = index_base(self.positions.len())?;
        let normal = face.block_side.normal();
        for corner in face.corners() {
            self.positions.push(corner.into());
            self.normals.push(normal);
            self.colors.push(color);
        }
        self.indices.extend_from_slice(&Face::indices(base));
        Ok(())
    }
}

/// First index of a face appended after `vertex_count` vertices.
fn index_base(vertex_count: usize) -> Result<u32, WorkerError> {
    vertex_count
        .checked_add(3)
        .and_then(|last| u32::try_from(last).ok())
        .map(|last| last - 3)
        .ok_or_else(|| {
            WorkerError::Resource(format!(
                "mesh has {vertex_count} vertices, more than 32-bit indices can address"
            ))
        })
}

/// Builds meshes from voxel grids.
#[derive(Debug, Clone, Copy)]
pub struct MeshBuilder {
    fallback_color: Rgb,
}

impl MeshBuilder {
    /// Creates a builder.
    ///
    /// # Arguments
    /// * `fallback_color` - Used for cells whose color text does not parse
    pub fn new(fallback_color: Rgb) -> Self {
        Self { fallback_color }
    }

    /// Builds the face-culled mesh of `grid`.
    ///
    /// Cells are scanned Y outermost, then Z, then X.
    ///
    /// # Returns
    /// The mesh, or `WorkerError::Resource` when it outgrows `u32` indices
    pub fn build(&self, grid: &VoxelGrid) -> Result<Mesh, WorkerError> {
        let n = grid.size();
        let center_offset = n as f32 / 2.0 - 0.5;
        let mut mesh = Mesh::empty();

        for y in 0..n {
            for z in 0..n {
                for x in 0..n {
                    let (xi, yi, zi) = (x as i64, y as i64, z as i64);
                    let Some(cell_color) = grid.get(xi, yi, zi).color() else {
                        continue;
                    };
                    let color = cell_color.resolve().unwrap_or_else(|err| {
                        warn!("{err} at ({x},{y},{z}), using {}", self.fallback_color);
                        self.fallback_color
                    });

                    let origin = Point3::new(
                        x as f32 - center_offset,
                        y as f32 - center_offset,
                        z as f32 - center_offset,
                    );
                    for side in BlockSide::all() {
                        let step = side.offset();
                        if grid.is_solid(xi + step.x, yi + step.y, zi + step.z) {
                            continue;
                        }
                        mesh.push_face(&Face::new(origin, side), color.to_array())?;
                    }
                }
            }
        }

        mesh.bounds = BoundingSphere::from_positions(&mesh.positions);
        debug!("Voxel mesh built with {} faces", mesh.face_count());
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::ColorCell;

    fn builder() -> MeshBuilder {
        MeshBuilder::new(Rgb::GREEN)
    }

    #[test]
    fn empty_grid_gives_empty_mesh() {
        let grid = VoxelGrid::new(3).unwrap();
        let mesh = builder().build(&grid).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.bounds, BoundingSphere::default());
    }

    #[test]
    fn single_cell_emits_six_centred_faces() {
        let mut grid = VoxelGrid::new(1).unwrap();
        grid.set(0, 0, 0, ColorCell::css("#ff0000"));
        let mesh = builder().build(&grid).unwrap();
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.colors.iter().all(|c| *c == [1.0, 0.0, 0.0]));
        assert_eq!(mesh.bounds.center, [0.5, 0.5, 0.5]);
        assert!((mesh.bounds.radius - 0.75_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn shared_faces_are_culled() {
        let mut grid = VoxelGrid::new(2).unwrap();
        grid.set(0, 0, 0, ColorCell::rgb(Rgb::GREEN));
        grid.set(1, 0, 0, ColorCell::rgb(Rgb::GREEN));
        assert_eq!(builder().build(&grid).unwrap().face_count(), 10);
    }

    #[test]
    fn unparseable_color_falls_back_for_that_cell_only() {
        let mut grid = VoxelGrid::new(3).unwrap();
        grid.set(0, 0, 0, ColorCell::css("definitely-not-a-color"));
        grid.set(2, 2, 2, ColorCell::css("blue"));
        let mesh = MeshBuilder::new(Rgb::new(0.0, 1.0, 0.0)).build(&grid).unwrap();
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.colors.iter().filter(|c| **c == [0.0, 1.0, 0.0]).count(), 24);
        assert_eq!(mesh.colors.iter().filter(|c| **c == [0.0, 0.0, 1.0]).count(), 24);
    }

    #[test]
    fn full_grid_is_centred_on_the_origin() {
        let mut grid = VoxelGrid::new(4).unwrap();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    grid.set(x, y, z, ColorCell::rgb(Rgb::GREEN));
                }
            }
        }
        let mesh = builder().build(&grid).unwrap();
        assert_eq!(mesh.face_count(), 6 * 16);
        let (min, max) = mesh.positions.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
            (lo.min(p[0]).min(p[1]).min(p[2]), hi.max(p[0]).max(p[1]).max(p[2]))
        });
        assert_eq!(min, -1.5);
        assert_eq!(max, 2.5);
    }

    #[test]
    fn index_base_stops_at_the_u32_range() {
        assert_eq!(index_base(0), Ok(0));
        assert_eq!(index_base(u32::MAX as usize - 3), Ok(u32::MAX - 3));
        assert!(matches!(
            index_base(u32::MAX as usize - 2),
            Err(WorkerError::Resource(_))
        ));
        assert!(matches!(index_base(usize::MAX), Err(WorkerError::Resource(_))));
    }

    #[test]
    fn interleaved_vertices_follow_attributes() {
        let mut grid = VoxelGrid::new(1).unwrap();
        grid.set(0, 0, 0, ColorCell::rgb(Rgb::GREEN));
        let mesh = builder().build(&grid).unwrap();
        let vertices = mesh.vertices();
        assert_eq!(vertices.len(), mesh.vertex_count());
        assert_eq!(vertices[5].position, mesh.positions[5]);
        assert_eq!(vertices[5].normal, mesh.normals[5]);
    }
}
