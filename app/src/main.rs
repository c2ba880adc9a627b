use anyhow::Result;
use clap::Parser;
use eframe::egui;
use log::info;
use shared::{load_config, resolve_base_url, BackendClient};

mod app;
mod camera;
mod controller;
mod practice;
mod viewer;
mod views;

use app::SignBridgeApp;

#[derive(Parser)]
#[command(name = "signbridge")]
#[command(about = "Convert text, audio, video and YouTube links to sign language")]
struct Args {
    /// Backend base URL (overrides SIGNBRIDGE_BACKEND_URL and the config file)
    #[arg(short, long)]
    backend: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config();
    let base_url = resolve_base_url(args.backend, &config);
    info!("Using backend at {}", base_url);

    let client = BackendClient::new(&base_url);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width(), config.window_height()])
            .with_title("SignBridge"),
        ..Default::default()
    };

    eframe::run_native(
        "SignBridge",
        options,
        Box::new(move |_cc| Ok(Box::new(SignBridgeApp::new(client, config)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run egui app: {}", e))
}
