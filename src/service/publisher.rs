//! Fused-cloud broadcast.
//!
//! Latched publisher: every publish replaces the retained frame and fans
//! it out to connected subscribers; a subscriber that connects later
//! immediately receives the most recent frame. Both pipeline variants
//! share one publisher, and its internal lock serializes their emissions,
//! so subscribers never observe an interleaved or partial frame.

use crate::core::ColoredCloud;
use crate::error::Result;
use crate::service::messages::FusedCloudFrame;
use crate::service::wire;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Trait for fused-map publishing.
pub trait CloudPublisher: Send + Sync {
    /// Emit a fused cloud tagged with the frame of the most recent
    /// request. Either the full frame reaches a subscriber or, on a dead
    /// connection, nothing does; the subscriber is dropped.
    fn publish(&self, cloud: &ColoredCloud, frame_id: &str) -> Result<()>;
}

struct PublisherShared {
    latched: Option<Vec<u8>>,
    clients: Vec<TcpStream>,
}

/// TCP broadcast publisher with a latched last frame.
pub struct TcpCloudPublisher {
    shared: Arc<Mutex<PublisherShared>>,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    local_addr: std::net::SocketAddr,
}

impl TcpCloudPublisher {
    /// Bind the broadcast endpoint and start the accept thread.
    pub fn bind(address: &str) -> Result<Self> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Mutex::new(PublisherShared {
            latched: None,
            clients: Vec::new(),
        }));
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_shared = Arc::clone(&shared);
        let accept_shutdown = Arc::clone(&shutdown);
        let accept_thread = std::thread::Builder::new()
            .name("cloud-publisher".to_string())
            .spawn(move || {
                Self::accept_loop(listener, accept_shared, accept_shutdown);
            })?;

        info!("Fused cloud publisher listening on {}", local_addr);
        Ok(Self {
            shared,
            shutdown,
            accept_thread: Some(accept_thread),
            local_addr,
        })
    }

    /// The bound broadcast address.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    fn accept_loop(
        listener: TcpListener,
        shared: Arc<Mutex<PublisherShared>>,
        shutdown: Arc<AtomicBool>,
    ) {
        while !shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((mut stream, addr)) => {
                    let mut guard = shared.lock();
                    // Late subscribers receive the most recent frame on connect
                    if let Some(frame) = &guard.latched {
                        if let Err(e) = stream.write_all(frame) {
                            warn!("Failed to replay latched frame to {}: {}", addr, e);
                            continue;
                        }
                    }
                    info!("Fused cloud subscriber connected: {}", addr);
                    guard.clients.push(stream);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    error!("Subscriber accept error: {}", e);
                }
            }
        }
        debug!("Publisher accept thread exiting");
    }
}

impl CloudPublisher for TcpCloudPublisher {
    fn publish(&self, cloud: &ColoredCloud, frame_id: &str) -> Result<()> {
        let frame = FusedCloudFrame {
            frame_id: frame_id.to_string(),
            cloud: cloud.clone(),
        };
        let mut payload = Vec::new();
        wire::write_frame(&mut payload, &frame)?;

        let mut guard = self.shared.lock();
        guard.clients.retain_mut(|client| match client.write_all(&payload) {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropping fused cloud subscriber: {}", e);
                false
            }
        });
        guard.latched = Some(payload);
        debug!(
            "Published fused cloud: {} points, frame '{}'",
            cloud.len(),
            frame_id
        );
        Ok(())
    }
}

impl Drop for TcpCloudPublisher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}
