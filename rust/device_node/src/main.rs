use homelink::config::Settings;
use homelink::devices::CommandDispatcher;
use homelink::topics;
use log::LevelFilter;
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use zenoh::prelude::r#async::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    homelink::init_logger(LevelFilter::Info);

    let node_id = env::var("NODE_ID").unwrap_or_else(|_| "esp32_receiver".to_string());
    let settings = load_settings();

    println!("Starting device node with ID: {}", node_id);
    println!("Listening to: {}", topics::DEVICE_CONTROL_WILDCARD);
    println!("Supported devices: fan, light, ac, washing-machine");

    let session = open_session(&settings).await?;
    let dispatcher = CommandDispatcher::new(node_id, session);

    let cancel = CancellationToken::new();

    tokio::select! {
        result = dispatcher.run(cancel.clone()) => {
            if let Err(e) = result {
                eprintln!("Device node error: {}", e);
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
