use crate::classify::{self, KeepReason, Policy, Verdict};
use crate::collect;
use crate::error::Result;
use crate::execute;
use crate::maildir::Layout;
use chrono::{DateTime, Utc};

/// Options of a run that are not about which messages to pick.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    pub create_destination: bool,
    pub remove_empty: bool,
    pub dry_run: bool,
    pub show_progress: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub affected: usize,
    pub recent: usize,
    pub flagged: usize,
    pub unread: usize,
    pub related: usize,
    pub read: usize,
    pub skipped: usize,
}

impl Stats {
    fn count_kept(&mut self, reason: KeepReason) {
        match reason {
            KeepReason::Flagged => self.flagged += 1,
            KeepReason::Unread => self.unread += 1,
            KeepReason::Related => self.related += 1,
            KeepReason::Read => self.read += 1,
            KeepReason::Recent => self.recent += 1,
        }
    }

    pub fn add(&mut self, other: &Stats) {
        self.total += other.total;
        self.affected += other.affected;
        self.recent += other.recent;
        self.flagged += other.flagged;
        self.unread += other.unread;
        self.related += other.related;
        self.read += other.read;
        self.skipped += other.skipped;
    }

    pub fn log_summary(&self, policy: &Policy) {
        info!("Total messages:     {:5}", self.total);
        info!(
            "Untouched messages: {:5}",
            self.total - self.affected - self.skipped
        );
        if policy.keep_flagged_threads {
            info!("  Flagged:  {:5}", self.flagged);
        }
        if policy.keep_unread_threads {
            info!("  Unread:   {:5}", self.unread);
        }
        if policy.keep_flagged_threads || policy.keep_unread_threads {
            info!("  Related:  {:5}", self.related);
        }
        if policy.keep_read {
            info!("  Read:     {:5}", self.read);
        }
        info!("  Recent:   {:5}", self.recent);
        info!("Affected messages ({}): {:5}", policy.mode, self.affected);
        if self.skipped > 0 {
            warn!("Skipped messages:   {:5}", self.skipped);
        }
    }
}

/// Cleans up one folder: moves or deletes every message old enough under the
/// policy, as of `now`.
pub fn clean_folder(
    layout: &Layout,
    policy: &Policy,
    folder_name: &str,
    options: RunOptions,
    now: DateTime<Utc>,
) -> Result<Stats> {
    let folder = layout.folder(folder_name);
    info!("Cleaning up {}...", folder_name);

    let listing = collect::list_messages(&folder, options.show_progress)?;
    let mut stats = Stats {
        total: listing.unreadable,
        skipped: listing.unreadable,
        ..Stats::default()
    };

    let plan = classify::classify_emails(layout, policy, &listing.messages, now);
    execute::prepare_destinations(layout, &plan, options.create_destination, options.dry_run)?;

    for (message, verdict) in plan.iter() {
        stats.total += 1;
        match verdict {
            Verdict::Keep(reason) => {
                debug!("Keeping {} ({}): {}", message.file_name, reason, message.subject());
                stats.count_kept(*reason);
            }
            Verdict::Act(action) => {
                match execute::apply(layout, message, action, options.dry_run) {
                    Ok(()) => stats.affected += 1,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!("Leaving {} in place: {}", message.file_name, err);
                        stats.skipped += 1;
                    }
                }
            }
        }
    }

    if options.remove_empty {
        remove_if_empty(layout, folder_name, stats, options.dry_run)?;
    }
    Ok(stats)
}

fn remove_if_empty(layout: &Layout, folder_name: &str, stats: Stats, dry_run: bool) -> Result<()> {
    let folder = layout.folder(folder_name);
    if folder.is_inbox() {
        debug!("Never removing {}", folder_name);
        return Ok(());
    }
    if dry_run {
        // Nothing was moved, so judge by what would have been.
        if stats.skipped == 0 && folder.removable_entries()? == Some(stats.affected) {
            info!("(Not really) Removing empty folder {}", folder_name);
        }
        return Ok(());
    }
    if folder.remove()? {
        info!("Removed empty folder {}", folder_name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Mode;
    use crate::error::CleanupError;
    use crate::maildir::INBOX;
    use chrono::{Duration, TimeZone};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        layout: Layout,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let layout = Layout {
                root: tmp.path().to_path_buf(),
                prefix: ".".to_string(),
                separator: ".".to_string(),
            };
            layout.folder(INBOX).create().unwrap();
            Fixture {
                _tmp: tmp,
                layout,
                now: Utc.with_ymd_and_hms(2021, 6, 30, 12, 0, 0).unwrap(),
            }
        }

        /// Delivers a message which arrived `days_old` days ago.
        fn deliver(&self, folder: &str, name: &str, days_old: i64) -> PathBuf {
            let arrival = self.now - Duration::days(days_old);
            let folder = self.layout.folder(folder);
            folder.create().unwrap();
            let path = folder.subdir("cur").join(name);
            let content = format!(
                "Delivery-date: {}\nSubject: {} days old\n\nHello\n",
                arrival.to_rfc2822(),
                days_old
            );
            fs::write(&path, content).unwrap();
            path
        }

        fn files(&self, folder: &str) -> Vec<String> {
            let folder = self.layout.folder(folder);
            let mut files = vec![];
            for subdir in &["cur", "new"] {
                for entry in fs::read_dir(folder.subdir(subdir)).unwrap() {
                    files.push(entry.unwrap().file_name().into_string().unwrap());
                }
            }
            files.sort();
            files
        }

        fn clean(&self, policy: &Policy, folder: &str, options: RunOptions) -> Result<Stats> {
            clean_folder(&self.layout, policy, folder, options, self.now)
        }
    }

    fn policy(mode: Mode) -> Policy {
        Policy {
            mode,
            min_age: Duration::days(365),
            archive_folder: "archive.Work".to_string(),
            archive_depth: 0,
            trash_folder: "Trash".to_string(),
            keep_flagged_threads: false,
            keep_unread_threads: false,
            keep_read: false,
        }
    }

    fn create() -> RunOptions {
        RunOptions {
            create_destination: true,
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_only_old_messages_move() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400:2,S", 400);
        fixture.deliver("Work", "200:2,S", 200);
        fixture.deliver("Work", "1:2,", 1);

        let stats = fixture
            .clean(&policy(Mode::Archive), "Work", create())
            .unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.affected, 1);
        assert_eq!(stats.recent, 2);
        assert_eq!(fixture.files("Work"), vec!["1:2,", "200:2,S"]);
        assert_eq!(fixture.files("archive.Work"), vec!["400:2,S"]);

        // Nothing left to do the second time.
        let stats = fixture
            .clean(&policy(Mode::Archive), "Work", create())
            .unwrap();
        assert_eq!(stats.affected, 0);
        assert_eq!(fixture.files("Work"), vec!["1:2,", "200:2,S"]);
        assert_eq!(fixture.files("archive.Work"), vec!["400:2,S"]);
    }

    #[test]
    fn test_dated_archive_folders() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400", 400);
        let policy = Policy {
            archive_depth: 2,
            ..policy(Mode::Archive)
        };
        fixture.clean(&policy, "Work", create()).unwrap();
        assert_eq!(fixture.files("archive.Work.2020.05"), vec!["400:2,"]);
    }

    #[test]
    fn test_destination_missing() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400", 400);
        fixture.deliver("Work", "500", 500);

        let err = fixture
            .clean(&policy(Mode::Archive), "Work", RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, CleanupError::DestinationMissing { .. }));
        assert_eq!(fixture.files("Work"), vec!["400", "500"]);
        assert!(!fixture.layout.folder("archive.Work").path().exists());
    }

    #[test]
    fn test_source_not_maildir() {
        let fixture = Fixture::new();
        let err = fixture
            .clean(&policy(Mode::Delete), "Missing", RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, CleanupError::SourceNotMaildir { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_delete_and_trash() {
        let fixture = Fixture::new();
        fixture.deliver(INBOX, "400", 400);
        fixture.deliver(INBOX, "1", 1);
        let stats = fixture
            .clean(&policy(Mode::Delete), INBOX, RunOptions::default())
            .unwrap();
        assert_eq!(stats.affected, 1);
        assert_eq!(fixture.files(INBOX), vec!["1"]);

        fixture.deliver("Sent", "500", 500);
        fixture.clean(&policy(Mode::Trash), "Sent", create()).unwrap();
        assert_eq!(fixture.files("Trash"), vec!["500:2,"]);
        assert!(fixture.files("Sent").is_empty());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400", 400);
        fixture.deliver("Work", "1", 1);
        let options = RunOptions {
            dry_run: true,
            remove_empty: true,
            ..create()
        };

        let dry = fixture.clean(&policy(Mode::Archive), "Work", options).unwrap();
        assert_eq!(fixture.files("Work"), vec!["1", "400"]);
        assert!(!fixture.layout.folder("archive.Work").path().exists());

        let real = fixture.clean(&policy(Mode::Archive), "Work", create()).unwrap();
        assert_eq!(dry, real);
    }

    #[test]
    fn test_remove_empty_source() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400", 400);
        fixture.deliver(INBOX, "401", 401);
        let options = RunOptions {
            remove_empty: true,
            ..create()
        };

        let work = fixture.layout.folder("Work");
        fixture.clean(&policy(Mode::Delete), "Work", options).unwrap();
        assert!(!work.path().exists());

        fixture.clean(&policy(Mode::Delete), INBOX, options).unwrap();
        assert!(fixture.layout.folder(INBOX).exists().unwrap());
        assert!(fixture.files(INBOX).is_empty());
    }

    #[test]
    fn test_remove_empty_keeps_folder_with_recent_mail() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400", 400);
        fixture.deliver("Work", "1", 1);
        let options = RunOptions {
            remove_empty: true,
            ..create()
        };
        fixture.clean(&policy(Mode::Delete), "Work", options).unwrap();
        assert_eq!(fixture.files("Work"), vec!["1"]);
    }

    #[test]
    fn test_remove_empty_keeps_folder_with_foreign_files() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400", 400);
        let work = fixture.layout.folder("Work");
        let uidlist = work.path().join("dovecot-uidlist");
        fs::write(&uidlist, b"3 V1 N2\n").unwrap();
        let options = RunOptions {
            remove_empty: true,
            ..create()
        };

        let stats = fixture.clean(&policy(Mode::Delete), "Work", options).unwrap();
        assert_eq!(stats.affected, 1);
        assert!(uidlist.is_file());
        assert!(work.exists().unwrap());
        assert!(fixture.files("Work").is_empty());

        // Still a maildir the next time around.
        let stats = fixture.clean(&policy(Mode::Delete), "Work", options).unwrap();
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn test_failed_message_does_not_stop_folder() {
        let fixture = Fixture::new();
        fixture.deliver("Work", "400:2,S", 400);
        fixture.deliver("Work", "500:2,S", 500);
        fixture.deliver("Work", "600:2,S", 600);
        let archive = fixture.layout.folder("archive.Work");
        archive.create().unwrap();
        fs::write(archive.subdir("cur").join("500:2,S"), b"Subject: older copy\n\n").unwrap();
        let options = RunOptions {
            remove_empty: true,
            ..create()
        };

        let stats = fixture.clean(&policy(Mode::Archive), "Work", options).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.affected, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(fixture.files("Work"), vec!["500:2,S"]);
        assert_eq!(
            fixture.files("archive.Work"),
            vec!["400:2,S", "500:2,S", "600:2,S"]
        );
        assert_eq!(
            fs::read(archive.subdir("cur").join("500:2,S")).unwrap(),
            b"Subject: older copy\n\n"
        );
        assert!(fixture.layout.folder("Work").exists().unwrap());
    }
}
