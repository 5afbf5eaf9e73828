use crate::archiver::RunOptions;
use crate::classify::{Mode, Policy};
use crate::maildir::Layout;
use chrono::Duration;
use clap::Parser;
use log::LevelFilter;
use std::env;
use std::path::PathBuf;

/// Cleans up old messages in maildir folders. A message is old when it
/// arrived at least the given number of days ago.
#[derive(Debug, Parser)]
#[clap(name = "cleanup-maildir")]
#[clap(author, version, about)]
pub struct Args {
    /// What to do with old messages.
    #[clap(value_enum)]
    pub command: Mode,
    /// Folders to clean up, such as `INBOX` or `Lists.rust`.
    #[clap(required_unless_present = "all", conflicts_with = "all")]
    pub folders: Vec<String>,
    /// Clean up INBOX and every other folder outside the archive namespace.
    #[clap(long)]
    pub all: bool,
    /// Only touch messages older than this many days.
    #[clap(short, long, default_value_t = 14)]
    pub age: u32,
    /// Do not touch any file, just say what would be done.
    #[clap(short = 'n', long = "trial-run", visible_alias = "dry-run")]
    pub dry_run: bool,
    /// Suppress normal output.
    #[clap(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
    /// Output what happens to every single message.
    #[clap(short, long)]
    pub verbose: bool,
    /// Create destination folders which do not exist yet.
    #[clap(short = 'c', long)]
    pub create_destination: bool,
    /// Remove a folder once it has no message left. INBOX is never removed.
    #[clap(long)]
    pub remove_empty: bool,
    /// Keep every message of a thread which has a flagged message.
    #[clap(short = 'k', long)]
    pub keep_flagged_threads: bool,
    /// Keep every message of a thread which has an unread message.
    #[clap(short = 'u', long)]
    pub keep_unread_threads: bool,
    /// Keep messages which have been read.
    #[clap(short = 'r', long)]
    pub keep_read: bool,
    /// Folder old messages go to with the trash command.
    #[clap(short = 't', long, default_value = "Trash")]
    pub trash_folder: String,
    /// Base of the archive folders, `<archive-prefix>.<folder>` by default.
    #[clap(long)]
    pub archive_folder: Option<String>,
    /// Namespace of archive folders, which are never cleaned up by --all.
    #[clap(long, default_value = "archive")]
    pub archive_prefix: String,
    /// Number of date levels below the archive base: 1 is the year, 2 adds
    /// the month, 3 the day, and 0 puts everything into the base.
    #[clap(
        short = 'd',
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    pub archive_hierarchy_depth: u8,
    /// Directory containing the mail folders, `$HOME/Maildir` by default.
    #[clap(long)]
    pub maildir_root: Option<PathBuf>,
    /// Prefix of folder directories under the root.
    #[clap(long, default_value = ".")]
    pub folder_prefix: String,
    /// Separator of folder hierarchy levels.
    #[clap(long, default_value = ".", alias = "folder-seperator")]
    pub folder_separator: String,
    /// The resolved mail root.
    #[clap(skip)]
    pub root: PathBuf,
}

impl Args {
    pub fn parse_args() -> Self {
        let mut result: Self = Self::parse();
        result.resolve();
        result
    }

    fn resolve(&mut self) {
        self.root = match &self.maildir_root {
            Some(root) => root.clone(),
            None => env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join("Maildir"),
        };
    }

    pub fn layout(&self) -> Layout {
        Layout {
            root: self.root.clone(),
            prefix: self.folder_prefix.clone(),
            separator: self.folder_separator.clone(),
        }
    }

    /// Policy used for cleaning up the given folder.
    pub fn policy(&self, folder: &str) -> Policy {
        let archive_folder = match &self.archive_folder {
            Some(archive_folder) => archive_folder.clone(),
            None => self
                .layout()
                .join(vec![self.archive_prefix.as_str(), folder]),
        };
        Policy {
            mode: self.command,
            min_age: Duration::days(i64::from(self.age)),
            archive_folder,
            archive_depth: self.archive_hierarchy_depth,
            trash_folder: self.trash_folder.clone(),
            keep_flagged_threads: self.keep_flagged_threads,
            keep_unread_threads: self.keep_unread_threads,
            keep_read: self.keep_read,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            create_destination: self.create_destination,
            remove_empty: self.remove_empty,
            dry_run: self.dry_run,
            show_progress: !self.quiet && !self.verbose,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Warn
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
