//! Stylus entrypoint: replay an event script against an in-memory editor and print the markup.
use anyhow::{Context, Result};
use clap::Parser;
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod runtime;
mod script;

use runtime::Runtime;
use script::{Script, ScriptEventSource};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "stylus", version, about = "Replay editor input events against a document")]
struct Args {
    /// TOML event script (`[[event]]` entries).
    pub script: PathBuf,
    /// Configuration file path (overrides discovery of `stylus.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Initial markup of the editable root.
    #[arg(long = "html", default_value = "<p></p>")]
    pub html: String,
}

#[derive(Default)]
struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("stylus.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "stylus.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        if tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
            .is_ok()
        {
            self.log_guard = Some(guard);
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::default();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", script = %args.script.display(), "startup");

    let settings = core_config::load_from(args.config.clone()).context("loading configuration")?;
    let script = Script::load(&args.script)?;
    let cues = script.cues();

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let runtime = Runtime::new(settings, &args.html, cues.clone(), tx.clone(), rx)?;
    let mut registry = EventSourceRegistry::new();
    registry.register(ScriptEventSource::new(cues));
    let handles = registry.spawn_all(&tx);
    drop(tx);

    let markup = runtime.run().await?;
    for handle in handles {
        if let Err(err) = handle.await {
            warn!(target: "runtime.events", %err, "source_join_failed");
        }
    }
    println!("{markup}");
    Ok(())
}
