//! DrishtiSeg - Semantic point-cloud labeling for robot observations
//!
//! The daemon turns raw colored waypoint observations into semantically
//! labeled clouds and maintains a continuously growing fused map:
//!
//! 1. Fetch the observation and its sensor origin from the map service
//! 2. Normalize colors into CIELAB
//! 3. Partition into supervoxels; drop voxels below the admission threshold
//! 4. Classify each surviving voxel with a pretrained random forest
//! 5. Smooth the per-point labeling with dense mean-field inference
//! 6. Cache the labeled cloud per waypoint and rebroadcast the fused map
//!
//! External collaborators (the observation source, the classifier, the
//! partitioner, the smoothing solver, the publisher) are traits, so tests
//! substitute deterministic stand-ins.

pub mod classify;
pub mod config;
pub mod core;
pub mod crf;
pub mod error;
pub mod segmentation;
pub mod service;

// Re-export commonly used types
pub use config::DrishtiConfig;
pub use error::{Error, Result};
