//! Closed test meshes with outward-facing winding

use crate::core::types::Vec3;
use super::adapter::IndexedMesh;

/// Corner quads of a box, counter-clockwise seen from outside.
/// Corner index = x + 2y + 4z, with 0 = min and 1 = max per axis.
/// Order: -X, +X, -Y, +Y, -Z, +Z.
pub const CUBOID_FACES: [[u32; 4]; 6] = [
    [0, 4, 6, 2],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 2, 3, 1],
    [4, 5, 7, 6],
];

/// Axis-aligned box spanning `min..max`, 12 triangles
pub fn cuboid(min: Vec3, max: Vec3) -> IndexedMesh {
    let positions = (0..8u32)
        .map(|corner| {
            [
                if corner & 1 != 0 { max.x } else { min.x },
                if corner & 2 != 0 { max.y } else { min.y },
                if corner & 4 != 0 { max.z } else { min.z },
            ]
        })
        .collect();

    let indices = CUBOID_FACES
        .iter()
        .flat_map(|&[a, b, c, d]| [a, b, c, a, c, d])
        .collect();

    IndexedMesh::new(positions, indices)
}

/// Side-1 cube centered on the origin
pub fn unit_cube() -> IndexedMesh {
    cuboid(Vec3::splat(-0.5), Vec3::splat(0.5))
}

/// Octahedron `|x| + |y| + |z| <= radius`, 8 triangles
pub fn octahedron(radius: f32) -> IndexedMesh {
    // +X, -X, +Y, -Y, +Z, -Z
    let positions = vec![
        [radius, 0.0, 0.0],
        [-radius, 0.0, 0.0],
        [0.0, radius, 0.0],
        [0.0, -radius, 0.0],
        [0.0, 0.0, radius],
        [0.0, 0.0, -radius],
    ];

    let mut indices = Vec::with_capacity(24);
    for sx in [1i32, -1] {
        for sy in [1i32, -1] {
            for sz in [1i32, -1] {
                let x = if sx > 0 { 0 } else { 1 };
                let y = if sy > 0 { 2 } else { 3 };
                let z = if sz > 0 { 4 } else { 5 };
                // (y - x) x (z - x) points along (sx, sy, sz) only when the
                // sign product is positive
                if sx * sy * sz > 0 {
                    indices.extend_from_slice(&[x, y, z]);
                } else {
                    indices.extend_from_slice(&[x, z, y]);
                }
            }
        }
    }

    IndexedMesh::new(positions, indices)
}

/// A lone triangle: a surface with no volume
pub fn single_triangle(a: Vec3, b: Vec3, c: Vec3) -> IndexedMesh {
    IndexedMesh::non_indexed(vec![a.to_array(), b.to_array(), c.to_array()])
}
