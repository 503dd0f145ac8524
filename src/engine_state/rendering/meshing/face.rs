//! # Block Sides and Faces
//!
//! The six axis-aligned sides of a voxel and the quad emitted for each.
//!
//! Corners are listed upper-left, lower-left, upper-right, lower-right as seen
//! from outside the cube, so the two triangles `(ul, ll, ur)` and
//! `(ur, ll, lr)` wind counter-clockwise when viewed from outside.

use cgmath::{Point3, Vector3};

/// Represents the six faces of a voxel.
///
/// The order is: [LEFT, RIGHT, BOTTOM, TOP, BACK, FRONT], i.e. −X, +X, −Y, +Y, −Z, +Z.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The left face (facing negative X)
    LEFT = 0,
    /// The right face (facing positive X)
    RIGHT = 1,
    /// The bottom face (facing negative Y)
    BOTTOM = 2,
    /// The top face (facing positive Y)
    TOP = 3,
    /// The back face (facing negative Z)
    BACK = 4,
    /// The front face (facing positive Z)
    FRONT = 5,
}

impl BlockSide {
    /// Returns all six sides in mesh emission order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::LEFT,
            BlockSide::RIGHT,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::BACK,
            BlockSide::FRONT,
        ]
    }

    /// Step from a cell to its neighbor across this side.
    pub fn offset(self) -> Vector3<i64> {
        match self {
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::FRONT => Vector3::new(0, 0, 1),
        }
    }

    /// Outward unit normal.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }

    /// Unit-cube corner offsets in `[ul, ll, ur, lr]` order.
    fn corner_offsets(self) -> [[f32; 3]; 4] {
        match self {
            BlockSide::LEFT => [[0., 1., 0.], [0., 0., 0.], [0., 1., 1.], [0., 0., 1.]],
            BlockSide::RIGHT => [[1., 1., 1.], [1., 0., 1.], [1., 1., 0.], [1., 0., 0.]],
            BlockSide::BOTTOM => [[1., 0., 1.], [0., 0., 1.], [1., 0., 0.], [0., 0., 0.]],
            BlockSide::TOP => [[0., 1., 1.], [1., 1., 1.], [0., 1., 0.], [1., 1., 0.]],
            BlockSide::BACK => [[1., 0., 0.], [0., 0., 0.], [1., 1., 0.], [0., 1., 0.]],
            BlockSide::FRONT => [[0., 0., 1.], [1., 0., 1.], [0., 1., 1.], [1., 1., 1.]],
        }
    }
}

/// A single quad face of a voxel, in mesh space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Upper-left corner
    pub ul: Point3<f32>,
    /// Lower-left corner
    pub ll: Point3<f32>,
    /// Upper-right corner
    pub ur: Point3<f32>,
    /// Lower-right corner
    pub lr: Point3<f32>,
    /// Which side of the voxel this face covers
    pub block_side: BlockSide,
}

impl Face {
    /// Creates the face on `block_side` of the cell whose minimum corner is `origin`.
    ///
    /// # Arguments
    /// * `origin` - Minimum corner of the cell in mesh space
    /// * `block_side` - Which side of the cell the face covers
    pub fn new(origin: Point3<f32>, block_side: BlockSide) -> Self {
        let [ul, ll, ur, lr] = block_side
            .corner_offsets()
            .map(|[dx, dy, dz]| Point3::new(origin.x + dx, origin.y + dy, origin.z + dz));
        Face {
            ul,
            ll,
            ur,
            lr,
            block_side,
        }
    }

    /// Corners in vertex emission order.
    pub fn corners(&self) -> [Point3<f32>; 4] {
        [self.ul, self.ll, self.ur, self.lr]
    }

    /// Indices of the face's two triangles, given the index of its first vertex.
    pub fn indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 2, base + 2, base + 1, base + 3]
    }
}
