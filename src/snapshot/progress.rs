//! Attribution walk progress
//!
//! The walker reports commits visited and paths claimed; rendering is up to
//! the reporter (an indicatif bar in the CLI, nothing elsewhere).

use indicatif::{ProgressBar, ProgressStyle};

/// One running attribution walk
pub trait WalkProgress: Send + Sync {
    /// Another commit was diffed; `claimed` tracked paths now have an owner
    fn commit_walked(&self, claimed: usize);

    /// The walk ended after `walked` commits
    fn finish(&self, walked: usize, claimed: usize);
}

/// Starts a [`WalkProgress`] for each snapshot computation
pub trait ProgressReporter: Send + Sync {
    fn start_walk(&self, start_commit: &str, commits: usize, tracked: usize) -> Box<dyn WalkProgress>;
}

/// Progress bar on stderr, for the CLI
pub struct IndicatifProgress;

impl ProgressReporter for IndicatifProgress {
    fn start_walk(&self, start_commit: &str, commits: usize, tracked: usize) -> Box<dyn WalkProgress> {
        let short = start_commit.get(..8).unwrap_or(start_commit);
        let pb = ProgressBar::new(commits as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} Attributing {}: [{{bar:40.cyan/blue}}] {{pos}}/{{len}} commits, {{msg}}",
                    short
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(format!("0/{} files", tracked));
        Box::new(IndicatifWalk {
            bar: pb,
            commits,
            tracked,
        })
    }
}

struct IndicatifWalk {
    bar: ProgressBar,
    commits: usize,
    tracked: usize,
}

impl WalkProgress for IndicatifWalk {
    fn commit_walked(&self, claimed: usize) {
        self.bar.inc(1);
        self.bar.set_message(format!("{}/{} files", claimed, self.tracked));
    }

    fn finish(&self, walked: usize, claimed: usize) {
        if walked < self.commits {
            self.bar.finish_with_message(format!(
                "{}/{} files, all claimed after {} of {} commits",
                claimed, self.tracked, walked, self.commits
            ));
        } else {
            self.bar.finish_and_clear();
        }
    }
}

/// Reports nothing; the default outside the CLI
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn start_walk(&self, _start_commit: &str, _commits: usize, _tracked: usize) -> Box<dyn WalkProgress> {
        Box::new(NoopWalk)
    }
}

struct NoopWalk;

impl WalkProgress for NoopWalk {
    fn commit_walked(&self, _claimed: usize) {}
    fn finish(&self, _walked: usize, _claimed: usize) {}
}

/// Shows a bar only when verbose
pub struct VerboseProgress {
    verbose: bool,
}

impl VerboseProgress {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for VerboseProgress {
    fn start_walk(&self, start_commit: &str, commits: usize, tracked: usize) -> Box<dyn WalkProgress> {
        if self.verbose {
            IndicatifProgress.start_walk(start_commit, commits, tracked)
        } else {
            NoopProgress.start_walk(start_commit, commits, tracked)
        }
    }
}
