//! Mesh input boundary and test primitives

pub mod adapter;
pub mod primitives;

pub use adapter::{extract, IndexedMesh, Mesh, MeshSource, SubMesh, TriangleBuffer};
