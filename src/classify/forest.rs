//! Pretrained random forest classifier.
//!
//! The model is deserialized from a JSON file at startup; a missing or
//! malformed model is fatal, the daemon must not start serving without
//! it. Each tree is a flat node array with child links pointing forward,
//! leaves carry a posterior over the C classes. Classification averages
//! the reached leaf posteriors across trees and returns the (floored)
//! logarithm.

use super::Classifier;
use crate::error::{Error, Result};
use log::info;
use serde::Deserialize;
use std::path::Path;

/// Probability floor before taking the logarithm
const POSTERIOR_EPS: f32 = 1e-6;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        posterior: Vec<f32>,
    },
}

#[derive(Debug, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Walk the tree to a leaf posterior. Child links always point
    /// forward (validated at load), so this terminates.
    fn evaluate<'a>(&'a self, features: &[f32]) -> &'a [f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                Node::Leaf { posterior } => return posterior,
            }
        }
    }
}

/// A pretrained random forest over voxel feature descriptors.
#[derive(Debug, Deserialize)]
pub struct RandomForest {
    num_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Load and validate a forest model from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelLoad(format!("could not read forest model {:?}: {}", path, e))
        })?;
        let forest: RandomForest = serde_json::from_str(&content)
            .map_err(|e| Error::ModelLoad(format!("invalid forest model {:?}: {}", path, e)))?;
        forest.validate()?;
        info!(
            "Loaded random forest: {} trees, {} classes",
            forest.trees.len(),
            forest.num_classes
        );
        Ok(forest)
    }

    fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(Error::ModelLoad("forest has zero classes".to_string()));
        }
        if self.trees.is_empty() {
            return Err(Error::ModelLoad("forest has no trees".to_string()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(Error::ModelLoad(format!("tree {} is empty", t)));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split { left, right, .. } => {
                        // Forward links guarantee traversal termination
                        if *left <= i || *right <= i || *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                            return Err(Error::ModelLoad(format!(
                                "tree {} node {} has invalid child links",
                                t, i
                            )));
                        }
                    }
                    Node::Leaf { posterior } => {
                        if posterior.len() != self.num_classes {
                            return Err(Error::ModelLoad(format!(
                                "tree {} node {} posterior length {} != {} classes",
                                t,
                                i,
                                posterior.len(),
                                self.num_classes
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn class_log_posterior(&self, features: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.resize(self.num_classes, 0.0);
        for tree in &self.trees {
            let posterior = tree.evaluate(features);
            for (acc, p) in out.iter_mut().zip(posterior) {
                *acc += p;
            }
        }
        let inv = 1.0 / self.trees.len() as f32;
        for p in out.iter_mut() {
            *p = (*p * inv).max(POSTERIOR_EPS).ln();
        }
    }
}
