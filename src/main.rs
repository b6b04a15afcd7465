//! DrishtiSeg - Semantic labeling daemon
//!
//! Serves labeling requests over TCP and broadcasts the fused semantic
//! map. Two request variants (whole waypoint, single instance) are
//! dispatched to two pipeline instances with independent waypoint caches;
//! both feed the same latched broadcast.

use drishti_seg::classify::{Classifier, RandomForest};
use drishti_seg::config::DrishtiConfig;
use drishti_seg::core::LabelSet;
use drishti_seg::crf::MeanFieldSolver;
use drishti_seg::error::{Error, Result};
use drishti_seg::segmentation::GridPartitioner;
use drishti_seg::service::messages::{LabelRequest, LabelResponse};
use drishti_seg::service::wire;
use drishti_seg::service::{
    CloudPublisher, FetchSpec, Labeler, TcpCloudPublisher, TcpObservationSource,
};
use std::env;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `drishti-seg <path>` (positional)
/// - `drishti-seg --config <path>` (flag-based)
/// - `drishti-seg -c <path>` (short flag)
///
/// Defaults to `/etc/drishti.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/drishti.toml".to_string()
}

fn build_labeler(
    config: &DrishtiConfig,
    labels: &Arc<LabelSet>,
    classifier: &Arc<dyn Classifier>,
    publisher: &Arc<TcpCloudPublisher>,
) -> Result<Labeler> {
    Labeler::new(
        Arc::clone(labels),
        Arc::clone(classifier),
        Box::new(GridPartitioner::new(
            config.segmentation.voxel_resolution,
            config.segmentation.seed_resolution,
        )),
        Box::new(MeanFieldSolver::new()),
        Box::new(TcpObservationSource::new(
            config.source.address.clone(),
            Duration::from_millis(config.source.timeout_ms),
        )),
        Arc::clone(publisher) as Arc<dyn CloudPublisher>,
        config.labeling.clone(),
    )
}

fn handle_connection(stream: TcpStream, whole: Arc<Labeler>, instance: Arc<Labeler>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let mut stream = stream;

    loop {
        let request: LabelRequest = match wire::read_frame(&mut stream) {
            Ok(request) => request,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                log::debug!("Client {} disconnected", peer);
                return;
            }
            Err(e) => {
                log::warn!("Dropping client {}: {}", peer, e);
                return;
            }
        };

        let (labeler, spec) = match request.instance_id {
            Some(instance_id) => (
                &instance,
                FetchSpec::Instance {
                    waypoint_id: request.waypoint_id,
                    instance_id,
                },
            ),
            None => (
                &whole,
                FetchSpec::Waypoint {
                    waypoint_id: request.waypoint_id,
                },
            ),
        };

        let response = match labeler.label(&spec) {
            Ok(response) => response,
            Err(e) => {
                log::error!("Labeling '{}' failed: {}", spec.waypoint_id(), e);
                LabelResponse::failure()
            }
        };

        if let Err(e) = wire::write_frame(&mut stream, &response) {
            log::warn!("Failed to answer client {}: {}", peer, e);
            return;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("DrishtiSeg v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = parse_config_path();
    log::info!("Using config: {}", config_path);
    let config = DrishtiConfig::load(&config_path)?;

    let labels = Arc::new(LabelSet::from_entries(&config.labels)?);
    log::info!("Label set: {} classes", labels.len());

    // The classifier model is required; without it the daemon must not serve
    let classifier: Arc<dyn Classifier> = Arc::new(RandomForest::load(&config.model.forest_path)?);

    let publisher = Arc::new(TcpCloudPublisher::bind(&config.service.publish_address)?);

    let whole = Arc::new(build_labeler(&config, &labels, &classifier, &publisher)?);
    let instance = Arc::new(build_labeler(&config, &labels, &classifier, &publisher)?);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Config(format!("Error setting Ctrl-C handler: {}", e)))?;

    let listener = TcpListener::bind(&config.service.bind_address)?;
    listener.set_nonblocking(true)?;
    log::info!(
        "Labeling service ready on {} (publishing fused clouds on {})",
        config.service.bind_address,
        config.service.publish_address
    );

    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                log::info!("Client connected: {}", addr);
                if let Err(e) = stream.set_nonblocking(false) {
                    log::warn!("Failed to set blocking mode for {}: {}", addr, e);
                    continue;
                }
                let whole = Arc::clone(&whole);
                let instance = Arc::clone(&instance);
                if let Err(e) = std::thread::Builder::new()
                    .name("label-request".to_string())
                    .spawn(move || handle_connection(stream, whole, instance))
                {
                    log::error!("Failed to spawn request thread: {}", e);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                log::error!("Accept error: {}", e);
            }
        }
    }

    log::info!("DrishtiSeg stopped");
    Ok(())
}
