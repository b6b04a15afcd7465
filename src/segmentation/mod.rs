//! Supervoxel partitioning and admission filtering.

pub mod admission;
pub mod grid;
pub mod voxel;

pub use admission::filter_voxels;
pub use grid::GridPartitioner;
pub use voxel::{FEATURE_DIM, Voxel};

use crate::core::ColoredCloud;

/// Trait for supervoxel partitioning algorithms.
///
/// Implementations group a normalized cloud into spatially coherent
/// voxels. Member indices point into the returned voxelized cloud, not
/// into the input. Both the voxel order and each voxel's member order must
/// be deterministic for a given input; the labeling pipeline's point-index
/// discipline depends on it.
pub trait Partitioner: Send + Sync {
    /// Partition a cloud into supervoxels and the voxelized cloud they
    /// index into.
    fn partition(&self, cloud: &ColoredCloud) -> (Vec<Voxel>, ColoredCloud);
}
