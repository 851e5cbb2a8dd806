//! Geometric primitives: boxes, rays and triangles

pub mod aabb;
pub mod ray;
pub mod triangle;

pub use aabb::Aabb;
pub use ray::{Axis, AxisDirection, Ray};
pub use triangle::{RayHit, Triangle};
