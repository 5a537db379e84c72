//! `framebridge` – frame calibration and pose streaming bridge.
//!
//! 1. Loads the TOML config (first argument, `FRAMEBRIDGE_CONFIG`, or
//!    `~/.framebridge/config.toml`, created with defaults when absent).
//! 2. Connects to the peer; failure to connect is fatal.
//! 3. Runs the session orchestrator until **Ctrl-C**, then closes the
//!    connection and exits cleanly.
//!
//! Exit status is non-zero on any fatal condition.

mod config;

use colored::Colorize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use framebridge_middleware::{JsonFileSource, SocketSession};
use framebridge_runtime::{SessionContext, SessionOrchestrator, init_tracing};
use framebridge_types::BridgeError;

fn main() -> ExitCode {
    let _tracing = init_tracing("framebridge");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – closing session …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the bridge can only be stopped by killing it");
    }

    match run(shutdown) {
        Ok(()) => {
            println!("{}", "  ✓ Session closed.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
            ExitCode::FAILURE
        }
    }
}

fn run(shutdown: Arc<AtomicBool>) -> Result<(), BridgeError> {
    // ── Configuration ─────────────────────────────────────────────────────
    let source = config::resolve(std::env::args().nth(1));
    let cfg = config::load(&source).map_err(BridgeError::Config)?;
    println!(
        "  Config loaded from {}",
        source.path().display().to_string().bold()
    );

    let pairing = cfg
        .pairing_table()
        .map_err(|e| BridgeError::Config(e.to_string()))?;
    if pairing.is_empty() {
        println!(
            "  {}",
            "No [[pairs]] configured – calibration will never become ready.".yellow()
        );
    } else {
        println!("  {} correspondence pair(s) configured", pairing.len());
    }

    let mut context = SessionContext::new(pairing, cfg.engine());
    if cfg.calibration.reuse_record {
        match cfg.record_path() {
            Some(path) => {
                if let Err(e) = context.restore_from(&path) {
                    warn!(error = %e, "not reusing calibration record; starting uncalibrated");
                }
            }
            None => warn!("reuse_record is set but record_path is empty"),
        }
    }

    // ── Runtime ───────────────────────────────────────────────────────────
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BridgeError::Setup(e.to_string()))?;

    runtime.block_on(async {
        let addr = cfg.peer_addr();
        print!("  Connecting to peer at {} … ", addr.dimmed());
        std::io::stdout().flush().ok();
        let session = match SocketSession::connect(
            addr.as_str(),
            cfg.connect_timeout(),
            cfg.session.max_frame_bytes,
        )
        .await
        {
            Ok(session) => {
                println!("{} {}", "connected to".green(), session.peer().bold());
                session
            }
            Err(e) => {
                println!("{}", "failed".red());
                return Err(BridgeError::Connection(e.to_string()));
            }
        };
        println!(
            "  Streaming detections from {}\n",
            cfg.source.path.as_str().bold()
        );

        let mut orchestrator = SessionOrchestrator::new(
            session,
            JsonFileSource::new(&cfg.source.path),
            context,
            cfg.orchestrator_config(),
        );
        orchestrator
            .run(shutdown)
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "framebridge".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Detector → reference frame calibration and pose streaming");
    println!();
}
