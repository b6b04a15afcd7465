//! Dense pairwise smoothing: energy model, solver contract, and decoding.

pub mod decode;
pub mod energy;
pub mod meanfield;

pub use decode::{Labeling, decode_labeling};
pub use energy::{DenseEnergy, EnergyParams, PairwiseTerm, build_energy};
pub use meanfield::MeanFieldSolver;

use nalgebra::DMatrix;

/// Trait for pairwise smoothing solvers.
///
/// Implementations consume the energy model and run a fixed iteration
/// budget (a cost/accuracy knob, not a convergence check), returning a
/// C×N marginal matrix with one probability distribution per column.
/// Same energy and iteration count must produce the same marginals.
pub trait SmoothingSolver: Send + Sync {
    fn infer(&self, energy: &DenseEnergy, iterations: u32) -> DMatrix<f32>;
}
