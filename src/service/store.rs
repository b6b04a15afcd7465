//! Waypoint observation cache and fusion.
//!
//! Process-lifetime, in-memory only. Each pipeline variant owns its own
//! store; entries are replaced wholesale after a fully successful run and
//! never partially updated. The {store write, fuse, publish} sequence
//! runs under one lock so concurrent requests can never publish a fusion
//! that interleaves with another request's write.

use crate::core::ColoredCloud;
use crate::error::Result;
use crate::service::publisher::CloudPublisher;
use parking_lot::Mutex;
use std::collections::HashMap;

/// The labeled, recolored voxelized cloud of one waypoint.
#[derive(Clone, Debug)]
pub struct WaypointObservation {
    pub cloud: ColoredCloud,
    pub frame_id: String,
}

/// Keyed cache of the most recent labeled observation per waypoint.
#[derive(Default)]
pub struct WaypointStore {
    inner: Mutex<HashMap<String, WaypointObservation>>,
}

impl WaypointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached waypoints
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Replace the entry for `key`, fuse all entries, and publish the
    /// fused cloud — one critical section, called only after the labeling
    /// pipeline has fully succeeded.
    pub fn insert_and_publish(
        &self,
        key: String,
        observation: WaypointObservation,
        frame_id: &str,
        publisher: &dyn CloudPublisher,
    ) -> Result<()> {
        let mut map = self.inner.lock();
        map.insert(key, observation);
        let fused = Self::fuse(&map);
        publisher.publish(&fused, frame_id)
    }

    /// Fused concatenation of every cached observation (simple union, no
    /// deduplication, no transform).
    pub fn fused_snapshot(&self) -> ColoredCloud {
        Self::fuse(&self.inner.lock())
    }

    fn fuse(map: &HashMap<String, WaypointObservation>) -> ColoredCloud {
        let total: usize = map.values().map(|obs| obs.cloud.len()).sum();
        let mut fused = ColoredCloud::with_capacity(total);
        for obs in map.values() {
            fused.points.extend_from_slice(&obs.cloud.points);
        }
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PointRgb;
    use parking_lot::Mutex as PlMutex;

    struct RecordingPublisher {
        published: PlMutex<Vec<(usize, String)>>,
    }

    impl RecordingPublisher {
        fn new() -> Self {
            Self {
                published: PlMutex::new(Vec::new()),
            }
        }
    }

    impl CloudPublisher for RecordingPublisher {
        fn publish(&self, cloud: &ColoredCloud, frame_id: &str) -> Result<()> {
            self.published.lock().push((cloud.len(), frame_id.to_string()));
            Ok(())
        }
    }

    fn observation(len: usize) -> WaypointObservation {
        let mut cloud = ColoredCloud::new();
        for i in 0..len {
            cloud.push(PointRgb::new(i as f32, 0.0, 0.0, 1, 2, 3));
        }
        WaypointObservation {
            cloud,
            frame_id: "map".to_string(),
        }
    }

    #[test]
    fn test_fusion_additive_across_keys() {
        let store = WaypointStore::new();
        let publisher = RecordingPublisher::new();
        store
            .insert_and_publish("wp1".to_string(), observation(30), "map", &publisher)
            .unwrap();
        store
            .insert_and_publish("wp2".to_string(), observation(20), "map", &publisher)
            .unwrap();
        let published = publisher.published.lock();
        assert_eq!(published[0].0, 30);
        assert_eq!(published[1].0, 50);
        assert_eq!(store.fused_snapshot().len(), 50);
    }

    #[test]
    fn test_overwrite_replaces_not_accumulates() {
        let store = WaypointStore::new();
        let publisher = RecordingPublisher::new();
        store
            .insert_and_publish("wp1".to_string(), observation(40), "map", &publisher)
            .unwrap();
        store
            .insert_and_publish("wp1".to_string(), observation(15), "map", &publisher)
            .unwrap();
        assert_eq!(store.len(), 1);
        // Second publish reflects only the second labeling's point count
        assert_eq!(publisher.published.lock()[1].0, 15);
        assert_eq!(store.fused_snapshot().len(), 15);
    }

    #[test]
    fn test_publish_carries_latest_frame_id() {
        let store = WaypointStore::new();
        let publisher = RecordingPublisher::new();
        store
            .insert_and_publish("a".to_string(), observation(1), "frame_a", &publisher)
            .unwrap();
        store
            .insert_and_publish("b".to_string(), observation(1), "frame_b", &publisher)
            .unwrap();
        let published = publisher.published.lock();
        assert_eq!(published[0].1, "frame_a");
        assert_eq!(published[1].1, "frame_b");
    }

    #[test]
    fn test_empty_store_snapshot() {
        let store = WaypointStore::new();
        assert!(store.is_empty());
        assert_eq!(store.fused_snapshot().len(), 0);
    }
}
