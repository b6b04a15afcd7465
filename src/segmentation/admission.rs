//! Voxel admission filtering.
//!
//! Voxels below the minimum member count are removed entirely; their
//! points are excluded from the request's output. Survivors get their
//! feature descriptors computed here so downstream stages can assume they
//! are present.

use super::Voxel;
use crate::core::ColoredCloud;
use log::debug;

/// Filter a voxel collection by minimum size.
///
/// Returns the surviving voxels (relative order unchanged) and N, the
/// total retained point count. N may be 0; downstream stages must accept
/// that without dividing by it.
pub fn filter_voxels(
    voxels: Vec<Voxel>,
    cloud: &ColoredCloud,
    min_point_count: usize,
) -> (Vec<Voxel>, usize) {
    let before = voxels.len();
    let mut survivors = Vec::with_capacity(before);
    let mut n = 0usize;
    for mut voxel in voxels {
        if voxel.size() >= min_point_count {
            n += voxel.size();
            voxel.compute_features(cloud);
            survivors.push(voxel);
        }
    }
    debug!(
        "Admission: {} of {} voxels kept, {} valid points",
        survivors.len(),
        before,
        n
    );
    (survivors, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voxel_of(id: u64, size: usize, offset: usize) -> Voxel {
        Voxel::new(id, (offset..offset + size).collect())
    }

    fn cloud_of(len: usize) -> ColoredCloud {
        let mut cloud = ColoredCloud::new();
        for i in 0..len {
            cloud.push(crate::core::PointRgb::new(i as f32, 0.0, 0.0, 0, 0, 0));
        }
        cloud
    }

    #[test]
    fn test_threshold_example() {
        // Sizes {50, 5} with threshold 10: only the size-50 voxel survives
        let cloud = cloud_of(55);
        let voxels = vec![voxel_of(0, 50, 0), voxel_of(1, 5, 50)];
        let (survivors, n) = filter_voxels(voxels, &cloud, 10);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].id(), 0);
        assert_eq!(n, 50);
    }

    #[test]
    fn test_n_is_sum_of_surviving_sizes() {
        let cloud = cloud_of(100);
        let voxels = vec![
            voxel_of(0, 30, 0),
            voxel_of(1, 9, 30),
            voxel_of(2, 41, 39),
            voxel_of(3, 20, 80),
        ];
        let (survivors, n) = filter_voxels(voxels, &cloud, 10);
        assert_eq!(survivors.len(), 3);
        assert_eq!(n, 30 + 41 + 20);
        // Relative order preserved
        let ids: Vec<u64> = survivors.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn test_all_below_threshold_gives_zero() {
        let cloud = cloud_of(12);
        let voxels = vec![voxel_of(0, 4, 0), voxel_of(1, 8, 4)];
        let (survivors, n) = filter_voxels(voxels, &cloud, 20);
        assert!(survivors.is_empty());
        assert_eq!(n, 0);
    }

    #[test]
    fn test_survivors_have_features() {
        let cloud = cloud_of(10);
        let voxels = vec![voxel_of(0, 10, 0)];
        let (survivors, _) = filter_voxels(voxels, &cloud, 5);
        assert!(survivors[0].features().is_some());
    }

    #[test]
    fn test_exact_threshold_survives() {
        let cloud = cloud_of(10);
        let voxels = vec![voxel_of(0, 10, 0)];
        let (survivors, n) = filter_voxels(voxels, &cloud, 10);
        assert_eq!(survivors.len(), 1);
        assert_eq!(n, 10);
    }
}
