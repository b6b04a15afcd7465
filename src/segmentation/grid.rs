//! Two-level grid supervoxel partitioner.
//!
//! First pass downsamples the input to `voxel_resolution` by averaging
//! every occupied cell into one representative point (the voxelized
//! cloud). Second pass groups those representatives into seed cells of
//! `seed_resolution`; each occupied seed cell becomes one supervoxel whose
//! members index into the voxelized cloud.
//!
//! Both passes key their cells through a `BTreeMap`, so voxel ids and
//! member order are a pure function of the input geometry.

use super::{Partitioner, Voxel};
use crate::core::{ColoredCloud, PointRgb};
use std::collections::BTreeMap;

type CellKey = (i32, i32, i32);

#[inline]
fn cell_key(p: &PointRgb, resolution: f32) -> CellKey {
    (
        (p.x / resolution).floor() as i32,
        (p.y / resolution).floor() as i32,
        (p.z / resolution).floor() as i32,
    )
}

/// Deterministic grid-based supervoxel partitioner.
#[derive(Clone, Debug)]
pub struct GridPartitioner {
    voxel_resolution: f32,
    seed_resolution: f32,
}

impl GridPartitioner {
    /// Create a partitioner with the given cell sizes (meters).
    pub fn new(voxel_resolution: f32, seed_resolution: f32) -> Self {
        Self {
            voxel_resolution,
            seed_resolution,
        }
    }

    /// Centroid-downsample the cloud at `voxel_resolution`.
    fn downsample(&self, cloud: &ColoredCloud) -> ColoredCloud {
        let mut cells: BTreeMap<CellKey, Vec<&PointRgb>> = BTreeMap::new();
        for p in &cloud.points {
            cells.entry(cell_key(p, self.voxel_resolution)).or_default().push(p);
        }

        let mut out = ColoredCloud::with_capacity(cells.len());
        out.sensor_origin = cloud.sensor_origin;
        for members in cells.into_values() {
            let n = members.len() as f32;
            let mut sum = [0.0f32; 3];
            let mut sum_c = [0.0f32; 3];
            for p in &members {
                sum[0] += p.x;
                sum[1] += p.y;
                sum[2] += p.z;
                sum_c[0] += p.r as f32;
                sum_c[1] += p.g as f32;
                sum_c[2] += p.b as f32;
            }
            out.push(PointRgb::new(
                sum[0] / n,
                sum[1] / n,
                sum[2] / n,
                (sum_c[0] / n).round() as u8,
                (sum_c[1] / n).round() as u8,
                (sum_c[2] / n).round() as u8,
            ));
        }
        out
    }
}

impl Partitioner for GridPartitioner {
    fn partition(&self, cloud: &ColoredCloud) -> (Vec<Voxel>, ColoredCloud) {
        let voxelized = self.downsample(cloud);

        let mut seeds: BTreeMap<CellKey, Vec<usize>> = BTreeMap::new();
        for (i, p) in voxelized.points.iter().enumerate() {
            seeds.entry(cell_key(p, self.seed_resolution)).or_default().push(i);
        }

        let voxels = seeds
            .into_values()
            .enumerate()
            .map(|(id, indices)| Voxel::new(id as u64, indices))
            .collect();

        (voxels, voxelized)
    }
}
