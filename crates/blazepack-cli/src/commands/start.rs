//! `start` command: run the dev server for one project directory.
//!
//! Orchestrates the dev server lifecycle:
//! - Template detection and configuration
//! - Binding the port (fails fast if taken)
//! - Initial scan and file watching
//! - Session server and HTTP/WebSocket transport
//! - Shutdown on Ctrl+C or on a fatal bundler report

use crate::cli::StartArgs;
use crate::config::DevConfig;
use crate::dev::proxy::http_client;
use crate::dev::{
    detect_template, load_registries, AppState, ChangeWatcher, ContentServer, DevServer,
    RegistryProxy, SessionExit, SessionOptions, SessionServer,
};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Time allowed for open connections to drain after the session stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const WATCH_HINT: &str =
    "On Linux, large projects may need a higher fs.inotify.max_user_watches";

/// Execute the start command.
///
/// # Process Flow
///
/// 1. Load configuration and detect the project template
/// 2. Bind the listening port
/// 3. Scan the project and start the watcher
/// 4. Serve until Ctrl+C (exit 0) or a fatal bundler report (error)
///
/// # Errors
///
/// Returns errors for:
/// - Invalid configuration or an unknown project template
/// - Port already in use
/// - File watcher failures
/// - A browser reporting an unrecoverable bundler error
pub async fn execute(args: StartArgs, verbose: bool) -> Result<()> {
    let config = DevConfig::from_args(&args)?;
    run(config, verbose, ctrl_c()).await
}

/// Run the dev server until `shutdown` resolves or a client reports a fatal
/// error.
pub async fn run<F>(config: DevConfig, verbose: bool, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let root = config.directory.clone();

    let template = detect_template(&root, &config.manifest)?;
    ui::debug(&format!("Detected template: {}", template));

    let rules = Arc::new(config.ignore_rules()?);
    let client = http_client().context("Failed to create the HTTP client")?;
    let registry = RegistryProxy::new(client.clone(), load_registries(&root));

    let server = DevServer::bind(config.addr()).await?;

    let spinner = ui::Spinner::new("Scanning project...");
    let (watcher, events) = match ChangeWatcher::start(root.clone(), Arc::clone(&rules)).await {
        Ok(started) => started,
        Err(e) => {
            spinner.fail("Failed to watch project");
            return Err(e).with_hint(WATCH_HINT);
        }
    };
    spinner.finish(&format!(
        "Watching {} files in {}",
        watcher.summary().files,
        root.display()
    ));

    let options = SessionOptions {
        registry_scopes: registry.scopes(),
        verbose,
        manifest: config.manifest.clone(),
        policy: config.snapshot_policy,
        ..SessionOptions::new(root.clone(), rules)
    };
    let (session, handle) = SessionServer::new(options);
    session.mark_listening();

    let content = ContentServer::new(root, config.asset_source(client), config.spa_fallback);
    let state = AppState::new(handle, content, registry);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut server_task = tokio::spawn(server.serve(state, async move {
        let _ = stop_rx.wait_for(|stopped| *stopped).await;
    }));

    let url = config.server_url();
    ui::success(&format!("Blazepack dev server running at {}", ui::url(&url)));
    config.browser_target().open(&url);
    ui::info("Press Ctrl+C to stop");

    let session_run = session.run(events, shutdown);
    tokio::pin!(session_run);

    let exit = tokio::select! {
        exit = &mut session_run => exit,
        result = &mut server_task => {
            ui::warning("Server task completed unexpectedly");
            return match result {
                Ok(result) => result,
                Err(e) => Err(CliError::Server(e.to_string())),
            };
        }
    };

    if let SessionExit::Fatal(report) = &exit {
        ui::error(&report.title);
        ui::error(&report.message);
        ui::info("Terminating the server");
    }

    let _ = stop_tx.send(true);
    drop(watcher);
    if tokio::time::timeout(SHUTDOWN_GRACE, server_task).await.is_err() {
        tracing::debug!("Connections still open after grace period");
    }

    if exit == SessionExit::Shutdown {
        ui::success("Dev server stopped");
    }
    exit.into_result()
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => ui::info("Shutting down dev server..."),
        Err(e) => {
            tracing::warn!(error = %e, "Unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
