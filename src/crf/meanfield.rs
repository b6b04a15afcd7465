//! Dense mean-field inference over the energy model.
//!
//! Reference implementation of the [`SmoothingSolver`] contract: Gaussian
//! kernels over the pairwise feature columns with Potts compatibility,
//! updated for a fixed iteration budget. Kernels are materialized as N×N
//! matrices, so memory is quadratic in the retained point count; that is
//! acceptable for voxelized observations, and the trait allows swapping in
//! a filtered approximation without touching the pipeline.

use super::{DenseEnergy, SmoothingSolver};
use nalgebra::DMatrix;

/// Dense mean-field solver with Gaussian pairwise kernels.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanFieldSolver;

impl MeanFieldSolver {
    pub fn new() -> Self {
        Self
    }

    /// Gaussian kernel matrix over feature columns, zero diagonal so a
    /// point never messages itself.
    fn kernel(features: &DMatrix<f32>) -> DMatrix<f32> {
        let n = features.ncols();
        let mut k = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let d2: f32 = features
                    .column(i)
                    .iter()
                    .zip(features.column(j).iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                let v = (-0.5 * d2).exp();
                k[(i, j)] = v;
                k[(j, i)] = v;
            }
        }
        k
    }

    /// Overwrite `q` with the column-wise softmax of `-cost`.
    fn softmax_columns(cost: &DMatrix<f32>, q: &mut DMatrix<f32>) {
        let (c, n) = cost.shape();
        for j in 0..n {
            let mut min_cost = f32::MAX;
            for i in 0..c {
                min_cost = min_cost.min(cost[(i, j)]);
            }
            let mut sum = 0.0;
            for i in 0..c {
                let v = (min_cost - cost[(i, j)]).exp();
                q[(i, j)] = v;
                sum += v;
            }
            for i in 0..c {
                q[(i, j)] /= sum;
            }
        }
    }
}

impl SmoothingSolver for MeanFieldSolver {
    fn infer(&self, energy: &DenseEnergy, iterations: u32) -> DMatrix<f32> {
        let (c, n) = energy.unary.shape();
        if n == 0 {
            return DMatrix::zeros(c, 0);
        }

        let kernels: Vec<(DMatrix<f32>, f32)> = energy
            .pairwise
            .iter()
            .map(|term| (Self::kernel(&term.features), term.weight))
            .collect();

        let mut q = DMatrix::zeros(c, n);
        Self::softmax_columns(&energy.unary, &mut q);

        for _ in 0..iterations {
            let mut cost = energy.unary.clone();
            for (kernel, weight) in &kernels {
                // message[(l, i)] = sum_j kernel[(j, i)] * q[(l, j)]
                let message = &q * kernel;
                for i in 0..n {
                    let total: f32 = message.column(i).sum();
                    for l in 0..c {
                        // Potts: every differing label contributes
                        cost[(l, i)] += weight * (total - message[(l, i)]);
                    }
                }
            }
            Self::softmax_columns(&cost, &mut q);
        }
        q
    }
}
