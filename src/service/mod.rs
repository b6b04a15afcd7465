//! The labeling service: wire protocol, collaborators, waypoint cache,
//! fused-map publishing, and the request pipeline.

pub mod labeler;
pub mod messages;
pub mod publisher;
pub mod source;
pub mod store;
pub mod wire;

pub use labeler::Labeler;
pub use publisher::{CloudPublisher, TcpCloudPublisher};
pub use source::{FetchSpec, ObservationSource, TcpObservationSource};
pub use store::{WaypointObservation, WaypointStore};
