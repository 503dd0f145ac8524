//! # Meshing
//!
//! Turns a voxel grid into a renderable mesh by naive face culling: every
//! solid cell contributes one quad per side that touches empty space.
//!
//! * `face` - The six block sides and the quad geometry for each
//! * `mesh` - The `Mesh` container and the `MeshBuilder`

pub mod face;
pub mod mesh;

pub use face::{BlockSide, Face};
pub use mesh::{BoundingSphere, Mesh, MeshBuilder};
