use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use iocraft::prelude::*;

use nutri_board::api::ApiClient;
use nutri_board::app::{App, ViewKind};
use nutri_board::color::ColorDepth;
use nutri_board::config::keybindings::MergedBindings;
use nutri_board::config::loader;
use nutri_board::engine::{BackendEngine, Engine};
use nutri_board::theme::{Background, ResolvedTheme};

#[derive(Parser)]
#[command(name = "nutri-board", version, about = "Terminal admin console for a nutrition tracking backend")]
struct Cli {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging to debug.log.
    #[arg(long)]
    debug: bool,

    /// View to open first (overrides `defaults.view`).
    #[arg(long, value_enum)]
    view: Option<ViewArg>,

    /// Backend base URL (overrides `backend.base_url`).
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Users,
    Products,
    Meals,
    Reports,
    Calendar,
}

impl From<ViewArg> for ViewKind {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Users => Self::Users,
            ViewArg::Products => Self::Products,
            ViewArg::Meals => Self::Meals,
            ViewArg::Reports => Self::Reports,
            ViewArg::Calendar => Self::Calendar,
        }
    }
}

fn main() -> Result<()> {
    // The fullscreen TUI swallows stderr.
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        let msg = format!("{info}\n\n{backtrace}");
        let _ = std::fs::write("panic.log", &msg);
        eprintln!("{msg}");
    }));

    let cli = Cli::parse();

    if cli.debug {
        let file = std::fs::File::create("debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    let mut config = loader::load_config(cli.config.as_deref())?.with_view_defaults();
    if let Some(url) = cli.base_url {
        config.backend.base_url = url;
    }
    config.defaults.download_dir = config
        .defaults
        .download_dir
        .map(|dir| loader::expand_tilde(&dir));

    let color_depth = ColorDepth::detect();
    let background = Background::detect();
    let theme = ResolvedTheme::resolve(&config.theme, background);
    let keybindings = MergedBindings::from_config(&config.keybindings);

    let client = ApiClient::new(&config.backend)?;

    // The engine owns its own Tokio runtime on a dedicated thread. Dropping
    // `engine_handle` at the end of `main` shuts it down.
    let poll_interval = Duration::from_secs(config.reports.poll_interval_secs.max(1));
    let engine_handle = BackendEngine::new(client, poll_interval).start();

    tracing::info!(base_url = %config.backend.base_url, "nutri-board starting");

    let initial_view = cli.view.map(ViewKind::from);

    // iocraft drives the UI on smol.
    smol::block_on(
        element! {
            App(
                config: &config,
                engine: &engine_handle,
                theme: &theme,
                keybindings: &keybindings,
                color_depth,
                initial_view,
            )
        }
        .fullscreen(),
    )?;

    Ok(())
}
