use proptest::prelude::*;
use voxel_script_worker::engine_state::rendering::meshing::{Mesh, MeshBuilder};
use voxel_script_worker::engine_state::voxels::{ColorCell, Rgb, VoxelGrid};

fn grid_from(size: usize, solid: &[bool]) -> VoxelGrid {
    let mut grid = VoxelGrid::new(size).unwrap();
    for x in 0..size {
        for y in 0..size {
            for z in 0..size {
                if solid[x + size * (y + size * z)] {
                    grid.set(x, y, z, ColorCell::css("orange"));
                }
            }
        }
    }
    grid
}

/// Grid coordinates of the cell each face looks out into.
fn outward_neighbors(mesh: &Mesh, size: usize) -> Vec<(i64, i64, i64)> {
    let center_offset = size as f32 / 2.0 - 0.5;
    mesh.positions
        .chunks_exact(4)
        .zip(mesh.normals.chunks_exact(4))
        .map(|(corners, normals)| {
            let normal = normals[0];
            let coordinate = |axis: usize| {
                let face_center = corners.iter().map(|c| c[axis]).sum::<f32>() / 4.0;
                let neighbor_center = face_center + normal[axis] * 0.5;
                (neighbor_center + center_offset - 0.5).round() as i64
            };
            (coordinate(0), coordinate(1), coordinate(2))
        })
        .collect()
}

/// Faces a solid set must expose: one per solid cell side whose neighbor is empty or outside.
fn expected_face_count(grid: &VoxelGrid) -> usize {
    let steps = [(-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1)];
    grid.occupied_coordinates()
        .map(|(x, y, z)| {
            let (x, y, z) = (x as i64, y as i64, z as i64);
            steps
                .iter()
                .filter(|(dx, dy, dz)| !grid.is_solid(x + dx, y + dy, z + dz))
                .count()
        })
        .sum()
}

fn builder() -> MeshBuilder {
    MeshBuilder::new(Rgb::GREEN)
}

proptest! {
    #[test]
    fn no_face_points_into_a_solid_cell(
        (size, solid) in (1usize..6).prop_flat_map(|n| (Just(n), prop::collection::vec(any::<bool>(), n * n * n)))
    ) {
        let grid = grid_from(size, &solid);
        let mesh = builder().build(&grid).unwrap();
        for (x, y, z) in outward_neighbors(&mesh, size) {
            prop_assert!(!grid.is_solid(x, y, z), "internal face toward ({x},{y},{z})");
        }
    }

    #[test]
    fn buffer_sizes_follow_face_count(
        (size, solid) in (1usize..6).prop_flat_map(|n| (Just(n), prop::collection::vec(any::<bool>(), n * n * n)))
    ) {
        let grid = grid_from(size, &solid);
        let mesh = builder().build(&grid).unwrap();
        prop_assert_eq!(mesh.face_count(), expected_face_count(&grid));
        prop_assert_eq!(mesh.vertex_count(), 4 * mesh.face_count());
        prop_assert_eq!(mesh.indices.len(), 6 * mesh.face_count());
        prop_assert_eq!(mesh.normals.len(), mesh.vertex_count());
        prop_assert_eq!(mesh.colors.len(), mesh.vertex_count());
    }
}

#[test]
fn cleared_grid_meshes_to_nothing() {
    let mut grid = grid_from(4, &[true; 64]);
    grid.clear();
    let mesh = builder().build(&grid).unwrap();
    assert!(mesh.is_empty());
    assert!(mesh.positions.is_empty());
    assert!(mesh.indices.is_empty());
}

#[test]
fn x_zero_slab_exposes_only_its_boundary() {
    let n = 4;
    let mut grid = VoxelGrid::new(n).unwrap();
    for y in 0..n {
        for z in 0..n {
            grid.set(0, y, z, ColorCell::rgb(Rgb::GREEN));
        }
    }
    let mesh = builder().build(&grid).unwrap();

    // An n x n x 1 slab: both large sides are fully exposed, and each of the
    // four thin edges exposes one face per cell along it.
    let large_sides = 2 * n * n;
    let thin_edges = 4 * n;
    assert_eq!(mesh.face_count(), large_sides + thin_edges);
    assert_eq!(mesh.face_count(), expected_face_count(&grid));
}

#[test]
fn solid_cube_exposes_only_its_shell() {
    let n = 3;
    let grid = grid_from(n, &[true; 27]);
    let mesh = builder().build(&grid).unwrap();
    assert_eq!(mesh.face_count(), 6 * n * n);
}
