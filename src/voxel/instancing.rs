//! Renderer-agnostic instance data for drawing a voxel set as boxes

use bytemuck::{Pod, Zeroable};

use crate::core::{Error, Result};
use crate::core::types::Mat4;
use super::set::{VoxelSet, VoxelTag};

/// Palette color for classified voxels, HSL(0.4, 0.4, 0.4)
pub const CLASSIFIED_HSL: [f32; 3] = [0.4, 0.4, 0.4];

/// Palette color for gap-filled voxels, HSL(0.9, 0.9, 0.9)
pub const GAP_FILLED_HSL: [f32; 3] = [0.9, 0.9, 0.9];

/// Per-instance GPU record
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VoxelInstance {
    /// Column-major model matrix (translation only)
    pub transform: [[f32; 4]; 4],
    /// Linear RGB, alpha = 1
    pub color: [f32; 4],
}

/// Shared box shape drawn at every instance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxGeometry {
    /// Edge length
    pub size: f32,
    /// Corner rounding radius
    pub roundness: f32,
}

impl BoxGeometry {
    /// Requires `0 < size <= cell_size` and `0 <= roundness <= size / 2`
    pub fn new(size: f32, roundness: f32, cell_size: f32) -> Result<Self> {
        if !(size.is_finite() && size > 0.0 && size <= cell_size) {
            return Err(Error::InvalidConfiguration(format!(
                "box size must be in (0, {cell_size}], got {size}"
            )));
        }
        if !(roundness.is_finite() && (0.0..=size * 0.5).contains(&roundness)) {
            return Err(Error::InvalidConfiguration(format!(
                "box roundness must be in [0, {}], got {roundness}",
                size * 0.5
            )));
        }
        Ok(Self { size, roundness })
    }
}

/// Instance records for every voxel, in set order
#[derive(Clone, Debug)]
pub struct InstanceBuffer {
    geometry: BoxGeometry,
    instances: Vec<VoxelInstance>,
}

impl InstanceBuffer {
    pub fn build(set: &VoxelSet, box_size: f32, roundness: f32) -> Result<Self> {
        let geometry = BoxGeometry::new(box_size, roundness, set.spec().cell_size)?;
        let classified = hsl_to_rgb(CLASSIFIED_HSL);
        let gap_filled = hsl_to_rgb(GAP_FILLED_HSL);

        let instances = set
            .iter()
            .map(|voxel| {
                let [r, g, b] = voxel.color.unwrap_or(match voxel.tag {
                    VoxelTag::Classified => classified,
                    VoxelTag::GapFilled => gap_filled,
                });
                VoxelInstance {
                    transform: Mat4::from_translation(voxel.center).to_cols_array_2d(),
                    color: [r, g, b, 1.0],
                }
            })
            .collect();

        Ok(Self { geometry, instances })
    }

    pub fn geometry(&self) -> BoxGeometry {
        self.geometry
    }

    pub fn instances(&self) -> &[VoxelInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Raw bytes ready for a vertex/instance buffer upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// HSL (all components in `[0, 1]`) to RGB
pub fn hsl_to_rgb([h, s, l]: [f32; 3]) -> [f32; 3] {
    if s == 0.0 {
        return [l, l, l];
    }
    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::voxel::grid::{GridCellId, GridSpec};

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    fn two_voxel_set() -> VoxelSet {
        let mut set = VoxelSet::new(GridSpec::new(Vec3::splat(-0.5), 0.5).unwrap());
        set.insert(GridCellId::new(1, 0, 1), VoxelTag::GapFilled);
        set.insert(GridCellId::new(0, 0, 0), VoxelTag::Classified);
        set
    }

    #[test]
    fn test_hsl_to_rgb() {
        assert!(approx(hsl_to_rgb(CLASSIFIED_HSL), [0.24, 0.56, 0.368]));
        assert!(approx(hsl_to_rgb([0.0, 1.0, 0.5]), [1.0, 0.0, 0.0]));
        assert!(approx(hsl_to_rgb([0.5, 0.0, 0.3]), [0.3, 0.3, 0.3]));
    }

    #[test]
    fn test_build_instances() {
        let mut set = two_voxel_set();
        let buffer = InstanceBuffer::build(&set, 0.4, 0.05).unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.geometry(), BoxGeometry { size: 0.4, roundness: 0.05 });

        // Set order: (0,0,0) first
        let first = buffer.instances()[0];
        assert_eq!(first.transform[3], [-0.25, -0.25, -0.25, 1.0]);
        assert_eq!(first.transform[0], [1.0, 0.0, 0.0, 0.0]);
        assert!(approx([first.color[0], first.color[1], first.color[2]], hsl_to_rgb(CLASSIFIED_HSL)));
        assert_eq!(first.color[3], 1.0);

        let second = buffer.instances()[1];
        assert_eq!(second.transform[3], [0.25, -0.25, 0.25, 1.0]);
        assert!(approx([second.color[0], second.color[1], second.color[2]], hsl_to_rgb(GAP_FILLED_HSL)));

        set.set_color(GridCellId::new(0, 0, 0), [1.0, 0.5, 0.0]);
        let tinted = InstanceBuffer::build(&set, 0.4, 0.05).unwrap();
        assert_eq!(tinted.instances()[0].color, [1.0, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn test_bytes_layout() {
        let buffer = InstanceBuffer::build(&two_voxel_set(), 0.5, 0.0).unwrap();
        assert_eq!(std::mem::size_of::<VoxelInstance>(), 80);
        assert_eq!(buffer.as_bytes().len(), 160);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let set = two_voxel_set();
        for (size, roundness) in [(0.0, 0.0), (0.6, 0.0), (0.4, 0.3), (0.4, -0.1), (f32::NAN, 0.0)] {
            assert!(matches!(
                InstanceBuffer::build(&set, size, roundness),
                Err(Error::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_empty_set() {
        let set = VoxelSet::new(GridSpec::new(Vec3::ZERO, 1.0).unwrap());
        let buffer = InstanceBuffer::build(&set, 1.0, 0.1).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.as_bytes().is_empty());
    }
}
