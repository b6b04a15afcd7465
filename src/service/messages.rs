//! Wire message types.
//!
//! Three exchanges share the framing in [`super::wire`]:
//! - labeling requests/responses (client ↔ daemon)
//! - observation fetches (daemon ↔ upstream map service)
//! - the fused-cloud broadcast (daemon → subscribers)

use crate::core::ColoredCloud;
use serde::{Deserialize, Serialize};

/// Inbound labeling request. `instance_id` selects the single-instance
/// variant; absent means the whole waypoint observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRequest {
    pub waypoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u32>,
}

/// Labeling response. On failure only `success` is meaningful.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelResponse {
    pub success: bool,
    /// Argmax class id per retained point (length N)
    pub labels: Vec<u32>,
    /// Marginal probabilities, row-major N×C (per point contiguous)
    pub label_probabilities: Vec<f32>,
    /// Mean marginal probability per class (length C, sums to ≈1 unless
    /// N = 0)
    pub label_frequencies: Vec<f32>,
    /// Retained point positions (length N)
    pub points: Vec<[f32; 3]>,
    /// Class names, index-aligned to class ids (length C)
    pub class_names: Vec<String>,
}

impl LabelResponse {
    /// Failure response: indicator set, everything else empty
    pub fn failure() -> Self {
        Self::default()
    }
}

/// Request to the upstream map service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SourceRequest {
    /// Whole-waypoint observation at the given resolution
    Observation {
        waypoint_id: String,
        resolution: f32,
    },
    /// One instance within a waypoint
    ObservationInstance {
        waypoint_id: String,
        instance_id: u32,
        resolution: f32,
    },
    /// Sensor origin of a waypoint
    SensorOrigin { waypoint_id: String },
}

/// Upstream map service reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<ColoredCloud>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<[f32; 3]>,
}

/// One fused-map broadcast frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedCloudFrame {
    pub frame_id: String,
    pub cloud: ColoredCloud,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_without_instance_omits_field() {
        let req = LabelRequest {
            waypoint_id: "WayPoint12".to_string(),
            instance_id: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("instance_id"));
        let back: LabelRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.waypoint_id, "WayPoint12");
        assert!(back.instance_id.is_none());
    }

    #[test]
    fn test_source_request_tagging() {
        let req = SourceRequest::SensorOrigin {
            waypoint_id: "wp".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"op\":\"sensor_origin\""));
    }

    #[test]
    fn test_failure_response_is_empty() {
        let res = LabelResponse::failure();
        assert!(!res.success);
        assert!(res.labels.is_empty());
        assert!(res.class_names.is_empty());
    }
}
