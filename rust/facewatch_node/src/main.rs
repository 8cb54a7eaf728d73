use homelink::capture::{CaptureCoordinator, DetectorRegistry, KnownFaces, SyntheticCamera};
use homelink::config::Settings;
use homelink::topics;
use log::LevelFilter;
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use zenoh::prelude::r#async::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    homelink::init_logger(LevelFilter::Info);

    let node_id = env::var("NODE_ID").unwrap_or_else(|_| "facewatch".to_string());
    let detector_type = env::var("DETECTOR").unwrap_or_else(|_| "luma".to_string());
    let settings = load_settings();

    println!("Starting facewatch node with ID: {}", node_id);
    println!(
        "Watching {} and {}",
        topics::SENSORS,
        topics::CAPTURE_COMMANDS
    );
    println!("Capture timeout: {}s", settings.capture.timeout);

    let session = open_session(&settings).await?;

    let registry = DetectorRegistry::new();
    let detector = registry
        .create_detector(&detector_type)
        .ok_or_else(|| format!("Unknown detector type: {}", detector_type))?;

    let mut coordinator = CaptureCoordinator::new(
        node_id,
        session,
        Box::new(SyntheticCamera::new()),
        Arc::from(detector),
        settings.capture.output_dir.clone(),
    )
    .with_config(settings.capture.to_capture_config());

    if let Some(path) = &settings.capture.encodings_path {
        match KnownFaces::load(path) {
            Ok(faces) if !faces.is_empty() => {
                println!("Loaded {} known face encodings", faces.encodings.len());
                coordinator = coordinator.with_known_faces(faces);
            }
            Ok(_) => println!("Known-face store at {} is empty, detection only", path.display()),
            Err(e) => {
                println!(
                    "Failed to load known faces from {} ({}), detection only",
                    path.display(),
                    e
                );
            }
        }
    }

    let cancel = CancellationToken::new();

    tokio::select! {
        result = coordinator.run(cancel.clone()) => {
            if let Err(e) = result {
                eprintln!("Facewatch node error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    }

    Ok(())
}

fn load_settings() -> Settings {
    let path = env::var("HOMELINK_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    match Settings::load(&path) {
        Ok(settings) => settings,
        Err(e) => {
            println!("No usable settings at {} ({}), using defaults", path, e);
            Settings::default()
        }
    }
}

async fn open_session(
    settings: &Settings,
) -> Result<Arc<Session>, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = zenoh::config::Config::default();
    let peer = env::var("ZENOH_PEER")
        .ok()
        .or_else(|| settings.zenoh_peer.clone());
    if let Some(peer) = peer {
        println!("Connecting to Zenoh peer: {}", peer);
        config
            .set_mode(Some(zenoh::config::whatami::WhatAmI::Client))
            .unwrap();
        config.connect.endpoints.push(peer.parse().unwrap());
    }
    Ok(zenoh::open(config).res().await?.into_arc())
}
