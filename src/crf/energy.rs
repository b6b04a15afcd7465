//! Energy-matrix construction for the pairwise smoothing model.
//!
//! The builder iterates surviving voxels in collection order and each
//! voxel's member indices in stored order; the j-th column written is
//! point j for every later stage. The decoder repeats the identical
//! iteration, which is what keeps labels, probabilities, and positions
//! aligned.

use crate::classify::Classifier;
use crate::config::LabelingConfig;
use crate::core::ColoredCloud;
use crate::segmentation::Voxel;
use nalgebra::DMatrix;

/// One pairwise term: a feature matrix (rows × N, one column per point)
/// with a Potts compatibility weight (zero cost on label match, `weight`
/// on mismatch).
#[derive(Clone, Debug)]
pub struct PairwiseTerm {
    pub features: DMatrix<f32>,
    pub weight: f32,
}

/// The full energy model handed to the smoothing solver: a C×N unary cost
/// matrix plus any number of pairwise terms.
#[derive(Clone, Debug)]
pub struct DenseEnergy {
    pub unary: DMatrix<f32>,
    pub pairwise: Vec<PairwiseTerm>,
}

impl DenseEnergy {
    /// Number of classes
    #[inline]
    pub fn num_classes(&self) -> usize {
        self.unary.nrows()
    }

    /// Number of points
    #[inline]
    pub fn num_points(&self) -> usize {
        self.unary.ncols()
    }
}

/// Sigma and weight parameters consumed by the builder.
#[derive(Clone, Copy, Debug)]
pub struct EnergyParams {
    pub appearance_color_sigma: f32,
    pub appearance_range_sigma: f32,
    pub appearance_weight: f32,
    pub smoothness_range_sigma: f32,
    pub smoothness_weight: f32,
}

impl From<&LabelingConfig> for EnergyParams {
    fn from(c: &LabelingConfig) -> Self {
        Self {
            appearance_color_sigma: c.appearance_color_sigma,
            appearance_range_sigma: c.appearance_range_sigma,
            appearance_weight: c.appearance_weight,
            smoothness_range_sigma: c.smoothness_range_sigma,
            smoothness_weight: c.smoothness_weight,
        }
    }
}

/// Build the energy model from the filtered voxel collection.
///
/// Classifies each voxel once; every member point receives the voxel's
/// negative log-posterior as its unary cost column, its scaled position
/// and Lab color as the appearance feature column, and its scaled
/// position as the smoothness feature column. Every retained point gets
/// exactly one column in each matrix.
pub fn build_energy(
    voxels: &[Voxel],
    cloud: &ColoredCloud,
    n: usize,
    classifier: &dyn Classifier,
    params: &EnergyParams,
) -> DenseEnergy {
    let c = classifier.num_classes();
    let mut unary = DMatrix::zeros(c, n);
    let mut appearance = DMatrix::zeros(6, n);
    let mut smoothness = DMatrix::zeros(3, n);

    let inv_acs = 1.0 / params.appearance_color_sigma;
    let inv_ars = 1.0 / params.appearance_range_sigma;
    let inv_srs = 1.0 / params.smoothness_range_sigma;

    let mut log_posterior = Vec::with_capacity(c);
    let mut point_index = 0usize;
    for voxel in voxels {
        classifier.class_log_posterior(voxel.features().unwrap_or(&[]), &mut log_posterior);
        for &i in voxel.indices() {
            let p = &cloud.points[i];
            for (class, lp) in log_posterior.iter().enumerate() {
                unary[(class, point_index)] = -lp;
            }
            appearance[(0, point_index)] = p.x * inv_ars;
            appearance[(1, point_index)] = p.y * inv_ars;
            appearance[(2, point_index)] = p.z * inv_ars;
            appearance[(3, point_index)] = p.r as f32 * inv_acs;
            appearance[(4, point_index)] = p.g as f32 * inv_acs;
            appearance[(5, point_index)] = p.b as f32 * inv_acs;
            smoothness[(0, point_index)] = p.x * inv_srs;
            smoothness[(1, point_index)] = p.y * inv_srs;
            smoothness[(2, point_index)] = p.z * inv_srs;
            point_index += 1;
        }
    }
    debug_assert_eq!(point_index, n);

    DenseEnergy {
        unary,
        pairwise: vec![
            PairwiseTerm {
                features: appearance,
                weight: params.appearance_weight,
            },
            PairwiseTerm {
                features: smoothness,
                weight: params.smoothness_weight,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PointRgb;
    use crate::segmentation::filter_voxels;

    /// Classifier that encodes the first feature value into its output,
    /// making it visible which voxel produced which unary column.
    struct EchoClassifier;

    impl Classifier for EchoClassifier {
        fn num_classes(&self) -> usize {
            2
        }
        fn class_log_posterior(&self, features: &[f32], out: &mut Vec<f32>) {
            let v = features.first().copied().unwrap_or(0.0);
            out.clear();
            out.push(-v);
            out.push(-1.0);
        }
    }

    fn params() -> EnergyParams {
        EnergyParams {
            appearance_color_sigma: 2.0,
            appearance_range_sigma: 0.5,
            appearance_weight: 1.0,
            smoothness_range_sigma: 0.25,
            smoothness_weight: 1.0,
        }
    }

    fn make_inputs() -> (Vec<Voxel>, ColoredCloud, usize) {
        let mut cloud = ColoredCloud::new();
        for i in 0..6 {
            cloud.push(PointRgb::new(i as f32, 0.0, 2.0, 10 * i as u8, 0, 0));
        }
        // Voxel 0 owns points {4, 1}, voxel 1 owns {0, 2, 5}
        let voxels = vec![Voxel::new(0, vec![4, 1]), Voxel::new(1, vec![0, 2, 5])];
        let (voxels, n) = filter_voxels(voxels, &cloud, 1);
        (voxels, cloud, n)
    }

    #[test]
    fn test_column_count_and_shapes() {
        let (voxels, cloud, n) = make_inputs();
        let energy = build_energy(&voxels, &cloud, n, &EchoClassifier, &params());
        assert_eq!(n, 5);
        assert_eq!(energy.unary.shape(), (2, 5));
        assert_eq!(energy.pairwise.len(), 2);
        assert_eq!(energy.pairwise[0].features.shape(), (6, 5));
        assert_eq!(energy.pairwise[1].features.shape(), (3, 5));
    }

    #[test]
    fn test_columns_follow_point_index_order() {
        let (voxels, cloud, n) = make_inputs();
        let energy = build_energy(&voxels, &cloud, n, &EchoClassifier, &params());
        // Point index order is voxel 0's members then voxel 1's:
        // cloud indices [4, 1, 0, 2, 5]
        let expected_x = [4.0f32, 1.0, 0.0, 2.0, 5.0];
        for (j, x) in expected_x.iter().enumerate() {
            assert!((energy.pairwise[0].features[(0, j)] - x / 0.5).abs() < 1e-5);
            assert!((energy.pairwise[1].features[(0, j)] - x / 0.25).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unary_is_negated_log_posterior_per_voxel() {
        let (voxels, cloud, n) = make_inputs();
        let energy = build_energy(&voxels, &cloud, n, &EchoClassifier, &params());
        // All members of one voxel share its unary column values
        assert_eq!(energy.unary[(0, 0)], energy.unary[(0, 1)]);
        assert_eq!(energy.unary[(0, 2)], energy.unary[(0, 3)]);
        assert_eq!(energy.unary[(0, 3)], energy.unary[(0, 4)]);
        // EchoClassifier returns -mean_l as class-0 log-posterior; unary
        // negates it back. Voxel 0 members are points 4 and 1: mean L = 25.
        assert!((energy.unary[(0, 0)] - 25.0).abs() < 1e-4);
        assert!((energy.unary[(1, 0)] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_color_channels_scaled_by_color_sigma() {
        let (voxels, cloud, n) = make_inputs();
        let energy = build_energy(&voxels, &cloud, n, &EchoClassifier, &params());
        // Column 0 is cloud point 4 with r = 40
        assert!((energy.pairwise[0].features[(3, 0)] - 40.0 / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_points_builds_empty_matrices() {
        let cloud = ColoredCloud::new();
        let energy = build_energy(&[], &cloud, 0, &EchoClassifier, &params());
        assert_eq!(energy.num_points(), 0);
        assert_eq!(energy.num_classes(), 2);
    }
}
