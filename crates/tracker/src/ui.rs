//! UI ports: the waiting indicator and the notification surface.
//!
//! Rendering is an external collaborator. The tracker computes display
//! text and drives these traits; the application shell decides what a
//! "dialog" or a "toast" actually looks like. Tracing-backed
//! implementations ship here for headless use.

/// Display content for the waiting indicator.
///
/// A `None` line is hidden, not rendered empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndicatorView {
    /// Queue-depth line, e.g. `"3 people ahead"`.
    pub queue_line: Option<String>,
    /// Remaining-wait line, e.g. `"01:30"`.
    pub eta_line: Option<String>,
    /// Job-class caps line, e.g. `"max_pages: 50, max_rows: 10000"`.
    pub limits_line: Option<String>,
}

/// The singleton waiting-indicator surface.
///
/// The coordinator guarantees `open` and `close` alternate and that no
/// `update` arrives while closed.
pub trait WaitIndicator: Send + Sync {
    fn open(&self, view: &IndicatorView);
    fn update(&self, view: &IndicatorView);
    fn close(&self);
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Dismissible user notification surface (toasts, banners).
///
/// Gateway failures are surfaced here so they are never silently
/// swallowed and never leave a stuck waiting indicator behind.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Indicator that logs transitions instead of rendering.
pub struct LogIndicator;

impl WaitIndicator for LogIndicator {
    fn open(&self, view: &IndicatorView) {
        tracing::info!(?view, "Waiting indicator opened");
    }

    fn update(&self, view: &IndicatorView) {
        tracing::debug!(?view, "Waiting indicator updated");
    }

    fn close(&self) {
        tracing::info!("Waiting indicator closed");
    }
}

/// Notifier that logs at the matching tracing level.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }
}
