#[macro_use]
extern crate log;

mod archiver;
mod args;
mod classify;
mod collect;
mod datetime;
mod error;
mod execute;
mod folders;
mod maildir;
mod threads;
mod utils;
mod verify;

use anyhow::Context;
use archiver::Stats;
use args::Args;
use chrono::Utc;
use log::LevelFilter;
use maildir::INBOX;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse_args();
    init_logger(args.log_level());
    match do_main(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Returns whether every folder could be cleaned up.
fn do_main(args: &Args) -> anyhow::Result<bool> {
    let layout = args.layout();
    let options = args.run_options();
    let now = Utc::now();
    debug!("Mode is {}", args.command);

    // Listed up front, since cleaning up creates and removes folders.
    let folders = if args.all {
        folders::list_folders(&layout, &args.archive_prefix)
            .and_then(|folders| folders.collect::<Result<Vec<_>, _>>())
            .with_context(|| format!("failed to list folders in {:?}", layout.root))?
    } else {
        args.folders.clone()
    };

    let mut total = Stats::default();
    let mut all_done = true;
    for name in folders.iter() {
        let policy = args.policy(name);
        match archiver::clean_folder(&layout, &policy, name, options, now) {
            Ok(stats) => total.add(&stats),
            Err(err) if err.is_fatal() => {
                return Err(err).with_context(|| format!("aborted while cleaning up {}", name));
            }
            Err(err) => {
                error!("Skipping {}: {}", name, err);
                all_done = false;
            }
        }
    }

    total.log_summary(&args.policy(INBOX));
    Ok(all_done)
}
