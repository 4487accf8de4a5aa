//! Document printing for BLE thermal receipt printers.
//!
//! Loads a PDF or raster image, renders it into an ESC/POS job and sends
//! it through a paced BLE session.

pub mod config;
pub mod services;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Load the first .env found walking up from the working directory.
/// Returns the file that was used.
pub fn load_dotenv() -> Option<&'static str> {
    const CANDIDATES: [&str; 3] = [".env", "../.env", "../../.env"];
    let found = CANDIDATES.into_iter().find(|path| dotenvy::from_filename(path).is_ok());
    match found {
        Some(path) => tracing::info!("Loaded .env from: {path}"),
        None => tracing::info!("No .env file found, using system environment variables"),
    }
    found
}
