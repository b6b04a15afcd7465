//! Observation source: where raw waypoint clouds come from.

use crate::core::ColoredCloud;
use crate::error::{Error, Result};
use crate::service::messages::{SourceRequest, SourceResponse};
use crate::service::wire;
use std::net::TcpStream;
use std::time::Duration;

/// What to fetch: a whole waypoint observation, or one instance within it.
/// The two labeling entry points differ only in this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSpec {
    Waypoint { waypoint_id: String },
    Instance { waypoint_id: String, instance_id: u32 },
}

impl FetchSpec {
    /// The waypoint key; also the key the labeled result is cached under.
    pub fn waypoint_id(&self) -> &str {
        match self {
            FetchSpec::Waypoint { waypoint_id } => waypoint_id,
            FetchSpec::Instance { waypoint_id, .. } => waypoint_id,
        }
    }
}

/// Trait for the upstream observation service.
///
/// Both calls must succeed for a request to proceed; any failure aborts
/// the request atomically with no store mutation and no publish.
pub trait ObservationSource: Send + Sync {
    /// Fetch the raw colored cloud for a spec, voxelized at `resolution`
    /// meters, together with its coordinate-frame identifier.
    fn fetch_cloud(&self, spec: &FetchSpec, resolution: f32) -> Result<(ColoredCloud, String)>;

    /// Fetch the sensor origin the waypoint was observed from.
    fn fetch_origin(&self, waypoint_id: &str) -> Result<[f32; 3]>;
}

/// TCP client for a map service speaking the length-prefixed JSON
/// protocol. Connects per call; the upstream service treats each exchange
/// as one request/response pair.
pub struct TcpObservationSource {
    address: String,
    timeout: Duration,
}

impl TcpObservationSource {
    pub fn new(address: String, timeout: Duration) -> Self {
        Self { address, timeout }
    }

    fn exchange(&self, request: &SourceRequest) -> Result<SourceResponse> {
        let addr: std::net::SocketAddr = self
            .address
            .parse()
            .map_err(|e| Error::Fetch(format!("invalid source address {}: {}", self.address, e)))?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| Error::Fetch(format!("connect to {} failed: {}", self.address, e)))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| Error::Fetch(format!("configure source stream: {}", e)))?;

        wire::write_frame(&mut stream, request)
            .map_err(|e| Error::Fetch(format!("source request failed: {}", e)))?;
        let response: SourceResponse = wire::read_frame(&mut stream)
            .map_err(|e| Error::Fetch(format!("source response failed: {}", e)))?;
        if !response.success {
            return Err(Error::Fetch("source reported failure".to_string()));
        }
        Ok(response)
    }
}

impl ObservationSource for TcpObservationSource {
    fn fetch_cloud(&self, spec: &FetchSpec, resolution: f32) -> Result<(ColoredCloud, String)> {
        let request = match spec {
            FetchSpec::Waypoint { waypoint_id } => SourceRequest::Observation {
                waypoint_id: waypoint_id.clone(),
                resolution,
            },
            FetchSpec::Instance {
                waypoint_id,
                instance_id,
            } => SourceRequest::ObservationInstance {
                waypoint_id: waypoint_id.clone(),
                instance_id: *instance_id,
                resolution,
            },
        };
        let response = self.exchange(&request)?;
        match (response.cloud, response.frame_id) {
            (Some(cloud), Some(frame_id)) => Ok((cloud, frame_id)),
            _ => Err(Error::Fetch("source response missing cloud or frame id".to_string())),
        }
    }

    fn fetch_origin(&self, waypoint_id: &str) -> Result<[f32; 3]> {
        let response = self.exchange(&SourceRequest::SensorOrigin {
            waypoint_id: waypoint_id.to_string(),
        })?;
        response
            .origin
            .ok_or_else(|| Error::Fetch("source response missing origin".to_string()))
    }
}
