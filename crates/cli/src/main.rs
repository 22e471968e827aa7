//! Terminal demo client for the docq job queue.
//!
//! Submits one job and renders the waiting indicator as console lines
//! until the job starts, finishes, or the user presses Ctrl-C (which
//! cancels the wait and the job).
//!
//! Usage: `docq-cli <service> <action> [params-json]`

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docq_client::config::ClientConfig;
use docq_core::job::{JobStatus, JobSubmission};
use docq_tracker::context::JobTracker;
use docq_tracker::ui::{IndicatorView, Notifier, Severity, WaitIndicator};

/// Renders the waiting indicator as console output.
struct TerminalIndicator;

impl TerminalIndicator {
    fn print_lines(view: &IndicatorView) {
        if let Some(line) = &view.queue_line {
            println!("  {line}");
        }
        if let Some(line) = &view.eta_line {
            println!("  starts in {line}");
        }
        if let Some(line) = &view.limits_line {
            println!("  limits: {line}");
        }
    }
}

impl WaitIndicator for TerminalIndicator {
    fn open(&self, view: &IndicatorView) {
        println!("waiting in queue...");
        Self::print_lines(view);
    }

    fn update(&self, view: &IndicatorView) {
        Self::print_lines(view);
    }

    fn close(&self) {
        println!("wait finished");
    }
}

/// Prints notifications to stderr.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        eprintln!("[{severity:?}] {message}");
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docq=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (service, action) = match (args.next(), args.next()) {
        (Some(service), Some(action)) => (service, action),
        _ => {
            eprintln!("usage: docq-cli <service> <action> [params-json]");
            std::process::exit(2);
        }
    };
    let params: serde_json::Value = match args.next() {
        Some(raw) => serde_json::from_str(&raw).expect("params must be valid JSON"),
        None => serde_json::json!({}),
    };

    let config = ClientConfig::from_env();
    tracing::info!(api_url = %config.api_url, ws_url = %config.ws_url, "Loaded client configuration");

    let tracker = JobTracker::new(config, Arc::new(TerminalIndicator), Arc::new(TerminalNotifier));

    match tracker.gateway().queue_status(Some(&service)).await {
        Ok(queue) => tracing::info!(
            queued = queue.total_queued,
            running = queue.total_running,
            "Current queue state",
        ),
        Err(e) => tracing::warn!(error = %e, "Queue state unavailable"),
    }

    let (done_tx, mut done_rx) = tokio::sync::mpsc::channel::<()>(1);
    tracker.set_close_callback(move || {
        let _ = done_tx.try_send(());
    });

    let submission = JobSubmission {
        service,
        action,
        params,
        limits: None,
    };
    let receipt = match tracker.submit(&submission).await {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::error!(error = %e, "Submission failed");
            std::process::exit(1);
        }
    };

    if receipt.status == JobStatus::Queued && receipt.modal_required != Some(false) {
        tokio::select! {
            _ = done_rx.recv() => {
                tracing::info!(job_id = %receipt.job_id, "Wait finished");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(job_id = %receipt.job_id, "Interrupted, cancelling wait");
                tracker.cancel_tracked().await;
            }
        }
    } else {
        tracing::info!(job_id = %receipt.job_id, status = ?receipt.status, "Job started immediately");
    }

    tracker.shutdown().await;
}
