//! The labeling request pipeline.
//!
//! One `Labeler` serves one logical request variant (whole waypoint or
//! single instance) and owns that variant's waypoint store; the two
//! variants differ only in the [`FetchSpec`] handed to the source, so the
//! flow from voxelization onward is this single implementation. The
//! classifier, label set, and fused-cloud publisher are shared across
//! variants.

use crate::classify::Classifier;
use crate::config::LabelingConfig;
use crate::core::{ColoredCloud, LabelSet, color};
use crate::crf::{EnergyParams, SmoothingSolver, build_energy, decode_labeling};
use crate::error::{Error, Result};
use crate::segmentation::{Partitioner, filter_voxels};
use crate::service::messages::LabelResponse;
use crate::service::publisher::CloudPublisher;
use crate::service::source::{FetchSpec, ObservationSource};
use crate::service::store::{WaypointObservation, WaypointStore};
use log::info;
use std::sync::Arc;

/// Voxel resolution requested from the map service (meters)
const FETCH_RESOLUTION_M: f32 = 0.01;

/// Labeling pipeline for one request variant.
pub struct Labeler {
    labels: Arc<LabelSet>,
    classifier: Arc<dyn Classifier>,
    partitioner: Box<dyn Partitioner>,
    solver: Box<dyn SmoothingSolver>,
    source: Box<dyn ObservationSource>,
    publisher: Arc<dyn CloudPublisher>,
    store: WaypointStore,
    labeling: LabelingConfig,
    energy_params: EnergyParams,
}

impl Labeler {
    /// Wire up a pipeline instance.
    ///
    /// Fails if the classifier was trained for a different class count
    /// than the configured label set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        labels: Arc<LabelSet>,
        classifier: Arc<dyn Classifier>,
        partitioner: Box<dyn Partitioner>,
        solver: Box<dyn SmoothingSolver>,
        source: Box<dyn ObservationSource>,
        publisher: Arc<dyn CloudPublisher>,
        labeling: LabelingConfig,
    ) -> Result<Self> {
        if classifier.num_classes() != labels.len() {
            return Err(Error::Config(format!(
                "classifier has {} classes but the label set has {}",
                classifier.num_classes(),
                labels.len()
            )));
        }
        let energy_params = EnergyParams::from(&labeling);
        Ok(Self {
            labels,
            classifier,
            partitioner,
            solver,
            source,
            publisher,
            store: WaypointStore::new(),
            labeling,
            energy_params,
        })
    }

    /// This variant's waypoint store.
    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    /// Run the full pipeline for one request.
    ///
    /// A fetch failure aborts before any state is touched; every stage
    /// after a successful fetch is total, so a request either mutates the
    /// store and republishes the fused map, or leaves both untouched.
    pub fn label(&self, spec: &FetchSpec) -> Result<LabelResponse> {
        let waypoint_id = spec.waypoint_id();

        let (mut cloud, frame_id) = self.source.fetch_cloud(spec, FETCH_RESOLUTION_M)?;
        let origin = self.source.fetch_origin(waypoint_id)?;
        cloud.sensor_origin = origin;
        info!(
            "Cloud received for '{}', a total of {} points found",
            waypoint_id,
            cloud.len()
        );

        color::normalize_cloud(&mut cloud);

        let (voxels, voxelized) = self.partitioner.partition(&cloud);
        info!("Voxelized the cloud, got {} supervoxels", voxels.len());

        let (voxels, n) = filter_voxels(voxels, &voxelized, self.labeling.min_point_count);
        info!("Remaining valid points: {}", n);

        let energy = build_energy(
            &voxels,
            &voxelized,
            n,
            self.classifier.as_ref(),
            &self.energy_params,
        );
        let marginals = self.solver.infer(&energy, self.labeling.crf_iterations);
        let (labeling, labeled_cloud) = decode_labeling(&marginals, &voxels, &voxelized, &self.labels);
        info!("Done classifying all the supervoxels");

        self.store.insert_and_publish(
            waypoint_id.to_string(),
            WaypointObservation {
                cloud: labeled_cloud,
                frame_id: frame_id.clone(),
            },
            &frame_id,
            self.publisher.as_ref(),
        )?;

        Ok(LabelResponse {
            success: true,
            labels: labeling.labels,
            label_probabilities: labeling.probabilities,
            label_frequencies: labeling.frequencies,
            points: labeling.points,
            class_names: self.labels.names(),
        })
    }

    /// The fused union of everything this variant has labeled so far.
    pub fn fused_snapshot(&self) -> ColoredCloud {
        self.store.fused_snapshot()
    }
}
