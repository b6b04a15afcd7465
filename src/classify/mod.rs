//! Supervoxel classification.

pub mod forest;

pub use forest::RandomForest;

/// Trait for per-voxel classifiers.
///
/// Implementations map a fixed-dimension feature descriptor to a class
/// log-posterior vector of length C. Read-only after startup and safe for
/// concurrent use.
pub trait Classifier: Send + Sync {
    /// Number of classes the model was trained for
    fn num_classes(&self) -> usize;

    /// Write the class log-posterior for a feature vector into `out`
    /// (cleared and refilled, length C).
    fn class_log_posterior(&self, features: &[f32], out: &mut Vec<f32>);
}
