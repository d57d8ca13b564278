// Command line front end
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "audioshelf", version, about = "Keep audio files in a local shelf and play them back")]
pub struct Cli {
    /// Directory holding the database, settings and session files
    #[arg(long, env = "AUDIOSHELF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import audio files or directories
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List stored entries
    List,
    /// Select an entry for playback
    Play { id: i64 },
    /// Move to the next entry, wrapping around
    Next,
    /// Remember a playback position (seconds) for the current entry
    Position { seconds: f64 },
    /// Show the current session
    Status,
    /// Remove an entry
    Delete { id: i64 },
}

fn default_data_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "audioshelf")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine a data directory; pass --data-dir"))
}

pub async fn execute(cli: Cli) -> Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let state = AppState::load(&data_dir).map_err(|e| anyhow!(e))?;

    match cli.command {
        Command::Import { paths } => {
            for path in paths {
                if path.is_dir() {
                    let report = commands::import_directory(&state, path.clone())
                        .await
                        .map_err(|e| anyhow!(e))?;
                    println!(
                        "{}: imported {} file(s)",
                        path.display(),
                        report.imported.len()
                    );
                    for (file, err) in report.failed {
                        println!("  failed {}: {}", file, err);
                    }
                } else {
                    let id = commands::import_file(&state, path.clone())
                        .await
                        .map_err(|e| anyhow!(e))?;
                    println!("{}: entry {}", path.display(), id);
                }
            }
        }
        Command::List => {
            let entries = commands::list_audio(&state).await.map_err(|e| anyhow!(e))?;
            if entries.is_empty() {
                println!("No audio stored");
            }
            for (index, entry) in entries.iter().enumerate() {
                println!("{:>4}  Audio {:<4} {:>10} bytes", entry.id, index + 1, entry.size);
            }
        }
        Command::Play { id } => match commands::play_audio(&state, id).await.map_err(|e| anyhow!(e))? {
            Some(playing) => {
                let seek = commands::metadata_loaded(&state).await.map_err(|e| anyhow!(e))?;
                print_now_playing(&playing, seek);
            }
            None => println!("No entry with id {}", id),
        },
        Command::Next => match commands::next_audio(&state).await.map_err(|e| anyhow!(e))? {
            Some(playing) => print_now_playing(&playing, None),
            None => println!("Library is empty"),
        },
        Command::Position { seconds } => {
            commands::record_position(&state, seconds)
                .await
                .map_err(|e| anyhow!(e))?;
        }
        Command::Status => {
            let status = commands::get_session(&state).await.map_err(|e| anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Delete { id } => {
            let deleted = commands::delete_audio(&state, id).await.map_err(|e| anyhow!(e))?;
            if !deleted {
                println!("No entry with id {}", id);
            }
        }
    }

    Ok(())
}

fn print_now_playing(playing: &commands::NowPlaying, seek: Option<f64>) {
    match seek {
        Some(seconds) => println!("Now playing entry {} from {:.1}s", playing.entry_id, seconds),
        None => println!("Now playing entry {}", playing.entry_id),
    }
}
