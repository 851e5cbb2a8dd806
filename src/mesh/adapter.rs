//! Geometry adapter: flattens mesh handles into a world-space triangle buffer.
//!
//! The model-loading collaborator owns the real mesh representation. It only
//! has to expose its drawable parts through [`MeshSource`]: a position
//! attribute, an optional index list and the local-to-world transform.
//! [`extract`] turns that into an immutable [`TriangleBuffer`] whose
//! triangles are in world space with outward-facing winding.

use crate::core::{Error, Result};
use crate::core::types::{Mat4, Vec3};
use crate::math::{Aabb, Triangle};

/// Relative distance (fraction of the bounding diagonal) within which all
/// vertices count as lying on one plane
const PLANAR_TOLERANCE: f32 = 1e-5;

/// Borrowed view of one drawable sub-mesh
#[derive(Clone, Copy, Debug)]
pub struct SubMesh<'a> {
    /// Vertex positions in the sub-mesh's local frame
    pub positions: &'a [[f32; 3]],
    /// Triangle list indices; `None` means consecutive vertex triples
    pub indices: Option<&'a [u32]>,
    /// Local-to-world transform
    pub transform: Mat4,
}

/// Opaque mesh handle supplied by the model-loading side
pub trait MeshSource {
    /// Every drawable sub-mesh of the model
    fn sub_meshes(&self) -> Vec<SubMesh<'_>>;
}

/// Owned triangle-list mesh with a local-to-world transform
#[derive(Clone, Debug)]
pub struct IndexedMesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Option<Vec<u32>>,
    pub transform: Mat4,
}

impl IndexedMesh {
    /// Indexed triangle list in world space
    pub fn new(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices: Some(indices),
            transform: Mat4::IDENTITY,
        }
    }

    /// Non-indexed triangle list: every three positions form a triangle
    pub fn non_indexed(positions: Vec<[f32; 3]>) -> Self {
        Self {
            positions,
            indices: None,
            transform: Mat4::IDENTITY,
        }
    }

    /// Set the local-to-world transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    pub fn as_sub_mesh(&self) -> SubMesh<'_> {
        SubMesh {
            positions: &self.positions,
            indices: self.indices.as_deref(),
            transform: self.transform,
        }
    }
}

impl MeshSource for IndexedMesh {
    fn sub_meshes(&self) -> Vec<SubMesh<'_>> {
        vec![self.as_sub_mesh()]
    }
}

/// A model assembled from several sub-meshes
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub parts: Vec<IndexedMesh>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a part (builder style)
    pub fn with_part(mut self, part: IndexedMesh) -> Self {
        self.parts.push(part);
        self
    }

    pub fn push(&mut self, part: IndexedMesh) {
        self.parts.push(part);
    }
}

impl MeshSource for Mesh {
    fn sub_meshes(&self) -> Vec<SubMesh<'_>> {
        self.parts.iter().map(IndexedMesh::as_sub_mesh).collect()
    }
}

/// Immutable world-space triangle list plus its bounds
#[derive(Clone, Debug)]
pub struct TriangleBuffer {
    triangles: Vec<Triangle>,
    bounds: Aabb,
}

impl TriangleBuffer {
    /// Wrap triangles as-is (no winding normalization)
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| [t.a, t.b, t.c]));
        Self { triangles, bounds }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn get(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box of all vertices; inverted when empty
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Enclosed volume by the divergence theorem, measured from the bounds
    /// center. Exact for closed meshes; for open ones the sign still moves
    /// with the mesh rather than with its world placement.
    pub fn signed_volume(&self) -> f32 {
        let apex = self.bounds.center();
        self.triangles.iter().map(|t| t.signed_volume(apex)).sum()
    }

    /// False when every non-degenerate triangle lies on a single plane (or
    /// there are none), i.e. the surface cannot bound a solid.
    pub fn encloses_volume(&self) -> bool {
        let solid: Vec<&Triangle> = self.triangles.iter().filter(|t| !t.is_degenerate()).collect();
        let Some(reference) = solid.iter().max_by(|a, b| a.area().total_cmp(&b.area())) else {
            return false;
        };

        let normal = reference.normal().normalize();
        let tolerance = PLANAR_TOLERANCE * self.bounds.size().length();
        solid
            .iter()
            .flat_map(|t| [t.a, t.b, t.c])
            .any(|p| (p - reference.a).dot(normal).abs() > tolerance)
    }

    fn flip_all(&mut self) {
        for tri in &mut self.triangles {
            *tri = tri.flipped();
        }
    }
}

/// Flatten every sub-mesh into one world-space buffer.
///
/// Sub-meshes with a mirroring transform have their winding reversed, and
/// when the result has negative signed volume the whole buffer is flipped so
/// that closed meshes expose outward normals.
pub fn extract<M: MeshSource + ?Sized>(mesh: &M) -> Result<(TriangleBuffer, Aabb)> {
    let mut triangles = Vec::new();

    for (part_index, part) in mesh.sub_meshes().iter().enumerate() {
        if part.positions.is_empty() && part.indices.is_none_or(|i| i.is_empty()) {
            continue;
        }
        append_sub_mesh(part_index, part, &mut triangles)?;
    }

    if triangles.is_empty() {
        return Err(Error::InvalidGeometry("mesh has no triangles".into()));
    }

    let mut buffer = TriangleBuffer::from_triangles(triangles);
    if buffer.signed_volume() < 0.0 {
        log::debug!("Flipping winding of {} triangles (negative signed volume)", buffer.len());
        buffer.flip_all();
    }

    let degenerate = buffer.triangles().iter().filter(|t| t.is_degenerate()).count();
    if degenerate > 0 {
        log::debug!("{} of {} triangles have zero area", degenerate, buffer.len());
    }

    let bounds = buffer.bounds();
    Ok((buffer, bounds))
}

fn append_sub_mesh(part_index: usize, part: &SubMesh<'_>, out: &mut Vec<Triangle>) -> Result<()> {
    let world: Vec<Vec3> = part
        .positions
        .iter()
        .map(|p| part.transform.transform_point3(Vec3::from_array(*p)))
        .collect();

    if let Some(bad) = world.iter().position(|p| !p.is_finite()) {
        return Err(Error::InvalidGeometry(format!(
            "sub-mesh {part_index}: vertex {bad} is not finite"
        )));
    }

    let mirrored = part.transform.determinant() < 0.0;
    let mut push = |a: Vec3, b: Vec3, c: Vec3| {
        let tri = Triangle::new(a, b, c);
        out.push(if mirrored { tri.flipped() } else { tri });
    };

    match part.indices {
        Some(indices) => {
            if indices.len() % 3 != 0 {
                return Err(Error::InvalidGeometry(format!(
                    "sub-mesh {part_index}: index count {} is not a multiple of 3",
                    indices.len()
                )));
            }
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= world.len()) {
                return Err(Error::InvalidGeometry(format!(
                    "sub-mesh {part_index}: index {bad} out of range for {} vertices",
                    world.len()
                )));
            }
            for tri in indices.chunks_exact(3) {
                push(world[tri[0] as usize], world[tri[1] as usize], world[tri[2] as usize]);
            }
        }
        None => {
            if world.len() % 3 != 0 {
                return Err(Error::InvalidGeometry(format!(
                    "sub-mesh {part_index}: vertex count {} is not a multiple of 3",
                    world.len()
                )));
            }
            for tri in world.chunks_exact(3) {
                push(tri[0], tri[1], tri[2]);
            }
        }
    }

    Ok(())
}
