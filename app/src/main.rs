//! # docprint CLI
//!
//! Print PDFs and images on a BLE thermal receipt printer.
//!
//! ```bash
//! # Print a local PDF (needs the `pdf` feature) or image
//! docprint print invoice.pdf
//!
//! # Fetch and print a remote image on an 80mm printer
//! docprint --width 576 print https://example.com/ticket.png
//!
//! # Render without a printer, writing the ESC/POS bytes to a file
//! docprint --dry-run --out ticket.bin print ticket.png
//!
//! # Print a QR code with a caption underneath
//! docprint qr https://example.com/menu --caption "Table 4"
//!
//! # List nearby devices and which ones would be selected
//! docprint scan
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use docprint_lib::config::AppConfig;
use docprint_lib::config::validation::validate_setting;
use docprint_lib::services::print_queue::PrintQueue;
use docprint_lib::services::printer::{open_session, scan_devices, write_dry_run};
use docprint_lib::services::printer_pipeline::{Caption, qr_job, render_document};
use docprint_lib::services::source::Source;
use thermal_printer::PrintJob;

/// docprint - documents to BLE thermal printers
#[derive(Parser, Debug)]
#[command(name = "docprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write the job bytes to a file instead of printing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output file for --dry-run
    #[arg(long, value_name = "FILE", default_value = "job.bin", global = true)]
    out: PathBuf,

    /// Printer identity (MAC or UUID), overrides PRINTER_ADDRESS
    #[arg(long, global = true)]
    printer: Option<String>,

    /// Print width in dots, overrides PRINT_WIDTH_DOTS
    #[arg(long, global = true)]
    width: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a document (local path or http/https URL)
    Print {
        source: String,

        /// Rasterization DPI for PDF pages, overrides RENDER_DPI
        #[arg(long)]
        dpi: Option<u32>,
    },

    /// Scan for nearby BLE devices
    Scan,

    /// Print a QR code
    Qr {
        text: String,

        /// Draw the symbol as an image for printers without native QR support
        #[arg(long)]
        raster: bool,

        /// Module size in dots for native QR (1-16)
        #[arg(long, default_value_t = 6)]
        size: u8,

        /// Line of text printed under the symbol
        #[arg(long)]
        caption: Option<String>,

        /// Caption magnification (1-8)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=8))]
        caption_scale: u8,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docprint_lib::init_tracing();
    docprint_lib::load_dotenv();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("failed to load configuration")?;

    if let Some(printer) = &cli.printer {
        validate_setting("PRINTER_ADDRESS", printer).map_err(|msg| anyhow::anyhow!("--printer {printer:?}: {msg}"))?;
        config.printer_address = Some(printer.clone());
    }
    if let Some(width) = cli.width {
        config.set_print_width(width)?;
    }
    if cli.dry_run {
        config.dry_run_mode = true;
    }

    match cli.command {
        Commands::Print { source, dpi } => {
            let source = Source::parse(&source);
            let document = source.load().await?;
            let dpi = dpi.unwrap_or(config.render_dpi);
            let width = config.print_width_dots;
            let trim = config.trim_options();

            let job = tokio::task::spawn_blocking(move || render_document(&document, dpi, width, &trim))
                .await
                .context("render task panicked")?
                .with_context(|| format!("failed to render {source}"))?;

            if job.image_blocks() == 0 {
                tracing::warn!(%source, "Document has no printable content, nothing sent");
                return Ok(());
            }
            deliver(job, &config, &cli.out, source.to_string()).await
        }
        Commands::Qr {
            text,
            raster,
            size,
            caption,
            caption_scale,
        } => {
            let caption = caption.as_deref().map(|line| Caption {
                text: line,
                scale: caption_scale,
            });
            let job = qr_job(&text, config.print_width_dots, size, !raster, caption)?;
            deliver(job, &config, &cli.out, format!("QR {text:?}")).await
        }
        Commands::Scan => {
            let session = open_session(&config).await?;
            let entries = scan_devices(&session, &config).await?;
            if entries.is_empty() {
                println!("No BLE devices found.");
            }
            for entry in entries {
                let marker = if entry.matches { "*" } else { " " };
                let name = if entry.device.name.is_empty() { "(unnamed)" } else { entry.device.name.as_str() };
                let rssi = entry.device.rssi.map(|r| format!("{r} dBm")).unwrap_or_default();
                println!("{marker} {name:<24} {:<40} {rssi}", entry.device.id);
            }
            Ok(())
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Send `job` to the printer, or to a file in dry-run mode.
async fn deliver(job: PrintJob, config: &AppConfig, out: &std::path::Path, description: String) -> anyhow::Result<()> {
    if config.dry_run_mode {
        return write_dry_run(&job, out).await;
    }

    let session = Arc::new(open_session(config).await?);
    let cancel = CancellationToken::new();
    let (queue, worker) = PrintQueue::start(Arc::clone(&session), config.printer_address.clone(), cancel.clone());
    let link_watch = session.watch_link(cancel.clone());

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling print");
            interrupt.cancel();
        }
    });

    let result = queue.print(job, description).await;

    cancel.cancel();
    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "Print queue worker ended abnormally");
    }
    if let Err(e) = link_watch.await {
        tracing::warn!(error = %e, "Link watcher ended abnormally");
    }
    if let Err(e) = session.disconnect().await {
        tracing::warn!(error = %e, "Disconnect failed");
    }
    result
}
