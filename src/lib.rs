// Kangkang - clipboard translation runtime
mod alignment;
mod bridge;
mod clipboard;
mod constants;
mod errors;
mod guard;
mod hotkeys;
mod paths;
mod popup;
mod runtime;
mod session;
mod state;
mod translator;
mod util;
mod vault;

#[cfg(test)]
mod testing;

pub use alignment::{annotate, AlignmentResult, AnnotatedChar, PhoneticProvider, PinyinProvider};
pub use clipboard::{ClipboardSource, SystemClipboard};
pub use errors::{AppError, ErrorEvent};
pub use guard::FailureGuard;
pub use popup::{PopupContent, PopupHost, StdioPopupHost, TranslationView};
pub use runtime::{AppEvent, Dispatcher, EventLoop, LoopControl, ThreadDispatcher};
pub use session::{Completion, Orchestrator, PendingRequest, TranslationOutput};
pub use state::{SessionId, SessionPhase, Settings};
pub use translator::{TranslateError, TranslationClient};
pub use vault::{Credential, CredentialError, CredentialVault, MachineIdentity};

use constants::{CONFIG_FILE, LOG_FILE_PREFIX, SETTINGS_FILE};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Stderr plus a daily file in the data dir. Stdout belongs to the
/// renderer. Keep the returned guard alive or file lines get lost.
fn init_logging() -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let log_dir = paths::resolve_data_path("logs");
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if guard.is_none() {
        warn!("Log directory {} unavailable, logging to stderr only", log_dir.display());
    }
    info!("Kangkang starting up");
    guard
}

fn emit_error(host: &mut dyn PopupHost, error: AppError, context: Option<&str>) {
    let event = if let Some(ctx) = context {
        ErrorEvent::new(error.clone()).with_context(ctx)
    } else {
        ErrorEvent::new(error.clone())
    };

    error!("{}: {}", error.title(), error.message());

    host.report(&event);
}

fn forget_key(vault: &CredentialVault) {
    match vault.clear() {
        Ok(()) => info!("Stored API key removed from {}", vault.path().display()),
        Err(e) => error!("Failed to remove stored API key: {}", e),
    }
}

pub fn run() {
    let _log_guard = init_logging();

    let vault = CredentialVault::new(paths::resolve_config_path(CONFIG_FILE));
    if std::env::args().skip(1).any(|arg| arg == "--forget-key") {
        forget_key(&vault);
        return;
    }

    let mut host = StdioPopupHost::stdout();

    let settings_path = paths::resolve_config_path(SETTINGS_FILE);
    let settings = state::load_settings(&settings_path);
    if !settings_path.exists() {
        // leave an editable copy of the defaults behind
        if let Err(e) = state::save_settings(&settings_path, &settings) {
            emit_error(&mut host, AppError::Storage(e), Some("writing default settings"));
        }
    }
    info!("Using model {} at {}", settings.model, settings.endpoint);

    let credential = vault.load();
    if credential.is_none() {
        info!("No stored API key; the repair form opens on first use");
    }
    let provider = translator::ProviderFactory::create(&settings);
    let client = TranslationClient::new(Arc::from(provider), credential);

    let (tx, rx) = mpsc::channel();

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    let _hotkeys = match hotkeys::register_hotkeys(&settings, tx.clone()) {
        Ok(registration) => Some(registration),
        Err(e) => {
            emit_error(&mut host, e.into(), Some("registering hotkeys"));
            None
        }
    };

    if let Err(e) = bridge::spawn_stdin_bridge(tx.clone()) {
        emit_error(
            &mut host,
            AppError::Other(format!("Renderer bridge failed to start: {}", e)),
            Some("startup"),
        );
    }

    let orchestrator = Orchestrator::new(
        vault,
        client,
        Arc::new(PinyinProvider),
        Box::new(host),
        Box::new(SystemClipboard),
    );
    EventLoop::new(orchestrator, ThreadDispatcher::new(tx), rx).run();
    info!("Kangkang shut down");
}
