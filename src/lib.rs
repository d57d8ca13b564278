// audioshelf - local audio library with resumable playback
// Module declarations
pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod library;
pub mod playback;
pub mod session;
pub mod settings;
pub mod state;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use db::models::AudioEntry;
pub use error::{LibraryError, LibraryResult};
pub use library::AudioStore;
pub use playback::{PlaybackController, PlaybackState, TransientHandle};
pub use session::{SessionState, SessionStore};

pub fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audioshelf_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(cli::execute(cli))
}
