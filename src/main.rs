#![allow(non_snake_case)]

mod app;
mod components;
pub mod context;
mod theme;

use std::path::PathBuf;
use std::sync::OnceLock;

use clap::Parser;
use dioxus::desktop::{Config, WindowBuilder};

use defranotes_core::remote::DEFAULT_ENDPOINT;

/// Global data directory, set from command line
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
/// Global DefraDB GraphQL endpoint, set from command line
static ENDPOINT: OnceLock<String> = OnceLock::new();
/// Global path to the defradb binary, set from command line
static DEFRADB_BIN: OnceLock<PathBuf> = OnceLock::new();

/// Get the data directory (set from command line or default)
pub fn get_data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("defranotes")
    })
}

/// Get the DefraDB query endpoint
pub fn get_endpoint() -> String {
    ENDPOINT
        .get()
        .cloned()
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

/// Get the defradb binary path used by the peer bridge
pub fn get_defradb_bin() -> PathBuf {
    DEFRADB_BIN
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("defradb"))
}

/// DefraNotes - collaborative P2P note-taking
#[derive(Parser, Debug)]
#[command(name = "defranotes-desktop")]
#[command(about = "DefraNotes - collaborative notes on DefraDB")]
struct Args {
    /// Data directory for local state (use different dirs for multiple instances)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// DefraDB GraphQL endpoint
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Path to the defradb binary for peer operations
    #[arg(long)]
    defradb_bin: Option<PathBuf>,

    /// Instance name (creates data dir: defranotes-<name>)
    #[arg(short, long)]
    name: Option<String>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let (data_dir, display_name) = if let Some(dir) = args.data_dir {
        let label = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("custom")
            .to_string();
        (dir, label)
    } else if let Some(ref name) = args.name {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!("defranotes-{}", name));
        (base, name.clone())
    } else {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("defranotes");
        (base, String::new())
    };

    let _ = DATA_DIR.set(data_dir.clone());
    if let Some(endpoint) = args.endpoint {
        let _ = ENDPOINT.set(endpoint);
    }
    if let Some(bin) = args.defradb_bin {
        let _ = DEFRADB_BIN.set(bin);
    }

    let title = if !display_name.is_empty() {
        format!("DefraNotes - {}", display_name)
    } else {
        "DefraNotes".to_string()
    };

    tracing::info!(
        "Starting '{}' with data dir {:?} against {}",
        title,
        data_dir,
        get_endpoint()
    );

    let config = Config::new().with_window(
        WindowBuilder::new()
            .with_title(&title)
            .with_inner_size(dioxus::desktop::LogicalSize::new(1100.0, 800.0))
            .with_resizable(true),
    );

    dioxus::LaunchBuilder::desktop()
        .with_cfg(config)
        .launch(app::App);
}
