use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "playcell")]
#[command(about = "Inspect and simulate audio attachment rows")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the player settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive the button states for an attachment against the local cache
    Inspect {
        /// Attachment file name
        #[arg(long, value_name = "NAME")]
        file_name: String,
        /// Cache directory (defaults to the configured one)
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,
        /// Direct local path to prefer over the cache
        #[arg(long, value_name = "PATH")]
        attach_path: Option<PathBuf>,
        /// The dialog permits streaming playback
        #[arg(long)]
        streamable: bool,
        /// Force the streaming preference on, ignoring settings
        #[arg(long)]
        stream_media: bool,
        /// Treat the attachment as a voice message
        #[arg(long)]
        voice: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay a JSON script of taps and engine callbacks
    Simulate {
        /// Script path
        script: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
