use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "daynotes", version, about = "Terminal notes, one list per calendar day")]
pub struct Cli {
    /// Directory holding the notes store (skips project/global lookup)
    #[arg(long, global = true, env = "DAYNOTES_STORE_DIR")]
    pub store_dir: Option<PathBuf>,
    /// Config file to read instead of the per-user config.yml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Locale for day headers, e.g. en_US or ru_RU
    #[arg(long, global = true)]
    pub locale: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project notes store in the current directory
    Init,
    /// List the notes of a day
    List {
        /// Day as YYYY-MM-DD, today, yesterday or tomorrow
        #[arg(long, short = 'd')]
        date: Option<String>,
    },
    /// Add a note to a day
    Add {
        /// Note text
        text: String,
        /// Day as YYYY-MM-DD, today, yesterday or tomorrow
        #[arg(long, short = 'd')]
        date: Option<String>,
    },
    /// Replace the text of a note
    Edit {
        /// Note number as shown by `list` (starting at 1)
        number: usize,
        /// New text
        text: String,
        /// Day as YYYY-MM-DD, today, yesterday or tomorrow
        #[arg(long, short = 'd')]
        date: Option<String>,
    },
    /// Delete a note
    Delete {
        /// Note number as shown by `list` (starting at 1)
        number: usize,
        /// Day as YYYY-MM-DD, today, yesterday or tomorrow
        #[arg(long, short = 'd')]
        date: Option<String>,
    },
    /// Show every day that has notes
    Days,
    /// Launch the interactive TUI
    Tui {
        /// Day to open on (defaults to today)
        #[arg(long, short = 'd')]
        date: Option<String>,
    },
}
