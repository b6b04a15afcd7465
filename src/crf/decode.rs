//! Marginal decoding: argmax labels, probability flattening, frequency
//! statistics, and position remapping.

use crate::core::{ColoredCloud, LabelSet, PointRgb};
use crate::segmentation::Voxel;
use nalgebra::DMatrix;

/// The decoded per-point labeling of one request.
#[derive(Clone, Debug, Default)]
pub struct Labeling {
    /// Argmax class id per point
    pub labels: Vec<u32>,
    /// Full marginal row per point, row-major N×C
    pub probabilities: Vec<f32>,
    /// Mean marginal probability per class across all N points. This is
    /// an expectation under the posterior, not the fraction of points
    /// whose argmax equals the class.
    pub frequencies: Vec<f32>,
    /// True 3D position per point, same order as `labels`
    pub points: Vec<[f32; 3]>,
}

/// Decode marginals into labels, statistics, and positions, and build the
/// labeled observation cloud (the retained points recolored with their
/// class display colors).
///
/// Iterates voxels and member indices in the same fixed order the energy
/// builder used; the k-th decoded point is the k-th unary column and the
/// k-th marginal column. Points that survived no voxel are excluded from
/// both the result arrays and the observation cloud. Ties on the maximal
/// marginal resolve to the lowest class id.
pub fn decode_labeling(
    marginals: &DMatrix<f32>,
    voxels: &[Voxel],
    cloud: &ColoredCloud,
    labels: &LabelSet,
) -> (Labeling, ColoredCloud) {
    let c = labels.len();
    let n = marginals.ncols();
    debug_assert_eq!(marginals.nrows(), c);

    let mut result = Labeling {
        labels: vec![0; n],
        probabilities: vec![0.0; n * c],
        frequencies: vec![0.0; c],
        points: Vec::with_capacity(n),
    };
    let mut labeled = ColoredCloud::with_capacity(n);
    labeled.sensor_origin = cloud.sensor_origin;

    let mut point_index = 0usize;
    for voxel in voxels {
        for &i in voxel.indices() {
            let mut best = 0usize;
            let mut best_prob = marginals[(0, point_index)];
            for class in 1..c {
                let p = marginals[(class, point_index)];
                if p > best_prob {
                    best_prob = p;
                    best = class;
                }
            }

            let [r, g, b] = labels.color(best).unwrap_or([0, 0, 0]);
            let position = cloud.points[i].position();
            labeled.push(PointRgb::new(position[0], position[1], position[2], r, g, b));

            result.labels[point_index] = best as u32;
            let row = c * point_index;
            for class in 0..c {
                let p = marginals[(class, point_index)];
                result.probabilities[row + class] = p;
                result.frequencies[class] += p;
            }
            result.points.push(position);
            point_index += 1;
        }
    }
    debug_assert_eq!(point_index, n);

    if n > 0 {
        let inv_n = 1.0 / n as f32;
        for f in &mut result.frequencies {
            *f *= inv_n;
        }
    }

    (result, labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelEntry;

    fn label_set() -> LabelSet {
        LabelSet::from_entries(&[
            LabelEntry {
                name: "floor".to_string(),
                color: [0, 255, 0],
            },
            LabelEntry {
                name: "wall".to_string(),
                color: [255, 0, 0],
            },
        ])
        .unwrap()
    }

    fn cloud_of(len: usize) -> ColoredCloud {
        let mut cloud = ColoredCloud::new();
        for i in 0..len {
            cloud.push(PointRgb::new(i as f32, 2.0 * i as f32, 0.5, 9, 9, 9));
        }
        cloud
    }

    #[test]
    fn test_argmax_and_positions_follow_order() {
        let cloud = cloud_of(4);
        // Voxel order visits cloud indices [3, 0], then [2]
        let voxels = vec![Voxel::new(0, vec![3, 0]), Voxel::new(1, vec![2])];
        let marginals = DMatrix::from_row_slice(
            2,
            3,
            &[
                0.9, 0.2, 0.4, // floor
                0.1, 0.8, 0.6, // wall
            ],
        );
        let (labeling, _) = decode_labeling(&marginals, &voxels, &cloud, &label_set());

        assert_eq!(labeling.labels, vec![0, 1, 1]);
        assert_eq!(labeling.points.len(), 3);
        assert_eq!(labeling.points[0], [3.0, 6.0, 0.5]);
        assert_eq!(labeling.points[1], [0.0, 0.0, 0.5]);
        assert_eq!(labeling.points[2], [2.0, 4.0, 0.5]);
    }

    #[test]
    fn test_probabilities_row_major_per_point() {
        let cloud = cloud_of(2);
        let voxels = vec![Voxel::new(0, vec![0, 1])];
        let marginals = DMatrix::from_row_slice(2, 2, &[0.7, 0.3, 0.3, 0.7]);
        let (labeling, _) = decode_labeling(&marginals, &voxels, &cloud, &label_set());
        assert_eq!(labeling.probabilities, vec![0.7, 0.3, 0.3, 0.7]);
    }

    #[test]
    fn test_tie_breaks_to_lowest_class_id() {
        let cloud = cloud_of(1);
        let voxels = vec![Voxel::new(0, vec![0])];
        let marginals = DMatrix::from_row_slice(2, 1, &[0.5, 0.5]);
        let (labeling, _) = decode_labeling(&marginals, &voxels, &cloud, &label_set());
        assert_eq!(labeling.labels, vec![0]);
    }

    #[test]
    fn test_frequencies_are_mean_marginals() {
        let cloud = cloud_of(2);
        let voxels = vec![Voxel::new(0, vec![0, 1])];
        // Both points argmax to wall, but the mean marginal is not a vote
        let marginals = DMatrix::from_row_slice(2, 2, &[0.4, 0.4, 0.6, 0.6]);
        let (labeling, _) = decode_labeling(&marginals, &voxels, &cloud, &label_set());
        assert!((labeling.frequencies[0] - 0.4).abs() < 1e-6);
        assert!((labeling.frequencies[1] - 0.6).abs() < 1e-6);
        let sum: f32 = labeling.frequencies.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_labeled_cloud_has_class_colors_and_excludes_leftovers() {
        let cloud = cloud_of(3);
        // Only cloud index 1 survived admission
        let voxels = vec![Voxel::new(0, vec![1])];
        let marginals = DMatrix::from_row_slice(2, 1, &[0.2, 0.8]);
        let (_, labeled) = decode_labeling(&marginals, &voxels, &cloud, &label_set());
        assert_eq!(labeled.len(), 1);
        let p = &labeled.points[0];
        // Wall display color, position of cloud point 1
        assert_eq!((p.r, p.g, p.b), (255, 0, 0));
        assert_eq!(p.position(), [1.0, 2.0, 0.5]);
    }

    #[test]
    fn test_zero_points_yields_empty_arrays_and_zero_frequencies() {
        let cloud = cloud_of(2);
        let marginals = DMatrix::zeros(2, 0);
        let (labeling, labeled) = decode_labeling(&marginals, &[], &cloud, &label_set());
        assert!(labeling.labels.is_empty());
        assert!(labeling.probabilities.is_empty());
        assert!(labeling.points.is_empty());
        assert!(labeled.is_empty());
        assert_eq!(labeling.frequencies, vec![0.0, 0.0]);
        assert!(labeling.frequencies.iter().all(|f| f.is_finite()));
    }
}
