use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "phrasetrail", about = "Track translatable phrases through git history")]
pub struct Cli {
    /// Configuration file
    #[arg(long, short, default_value = "phrasetrail.toml")]
    pub config: PathBuf,

    /// Debug logging and progress bars
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a commit and queue it for processing
    Enqueue { repo: String, commit: String },

    /// Enqueue a commit and work it until it is finished
    Process {
        repo: String,
        commit: String,

        /// Run delayed jobs immediately
        #[arg(long)]
        no_delay: bool,

        /// Give up after this many jobs
        #[arg(long, default_value_t = 100)]
        max_jobs: usize,
    },

    /// Processing status of a commit
    Status { repo: String, commit: String },

    /// Weakest processing status among a branch's recorded commits
    BranchStatus { repo: String, branch: String },

    /// Which commit introduced each tracked file's content
    Snapshot {
        repo: String,
        commit: String,
        /// Restrict to these paths
        paths: Vec<String>,
    },

    /// Phrase changes between two commits
    Diff {
        repo: String,
        head: String,
        diff_point: String,
    },

    /// Phrase changes introduced by one commit
    Show { repo: String, commit: String },
}
