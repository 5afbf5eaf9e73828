use crate::collect::Message;
use crate::maildir::Layout;
use crate::threads::KeptThreads;
use chrono::{DateTime, Datelike, Duration, Utc};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Move old messages to archive folders based on their date.
    Archive,
    /// Move old messages to the trash folder.
    Trash,
    /// Permanently delete old messages.
    Delete,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Mode::Archive => "archive",
            Mode::Trash => "trash",
            Mode::Delete => "delete",
        })
    }
}

/// Which messages to touch and what to do with them.
#[derive(Clone, Debug)]
pub struct Policy {
    pub mode: Mode,
    pub min_age: Duration,
    /// Base of the archive folders, e.g. `archive.Sent`.
    pub archive_folder: String,
    /// 0 puts everything into the base, 1 adds the year, 2 the month, and
    /// 3 the day.
    pub archive_depth: u8,
    pub trash_folder: String,
    pub keep_flagged_threads: bool,
    pub keep_unread_threads: bool,
    pub keep_read: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepReason {
    Flagged,
    Unread,
    Related,
    Read,
    Recent,
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            KeepReason::Flagged => "flagged",
            KeepReason::Unread => "unread",
            KeepReason::Related => "part of kept thread",
            KeepReason::Read => "read",
            KeepReason::Recent => "recent",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Move into the named folder.
    Move(String),
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Keep(KeepReason),
    Act(Action),
}

/// Whether a message arrived at least `min_age` before `now`.
pub fn is_old(message: &Message, min_age: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(message.arrival) >= min_age
}

/// Name of the archive folder a message goes to. The date is the one the
/// message was sent, or the arrival date when there is none, taken in UTC.
pub fn get_archive_name(layout: &Layout, policy: &Policy, message: &Message) -> String {
    let dt = message.sent.unwrap_or(message.arrival);
    let year = format!("{:04}", dt.year());
    let month = format!("{:02}", dt.month());
    let day = format!("{:02}", dt.day());
    let parts = [year.as_str(), month.as_str(), day.as_str()];
    let depth = usize::from(policy.archive_depth.min(3));
    layout.join(
        std::iter::once(policy.archive_folder.as_str()).chain(parts[..depth].iter().copied()),
    )
}

pub fn classify_message(
    layout: &Layout,
    policy: &Policy,
    kept: &KeptThreads,
    message: &Message,
    now: DateTime<Utc>,
) -> Verdict {
    let mid = message.message_id.as_deref().unwrap_or("");
    if kept.seeds.contains(mid) {
        if message.is_flagged() && policy.keep_flagged_threads {
            return Verdict::Keep(KeepReason::Flagged);
        }
        return Verdict::Keep(KeepReason::Unread);
    }
    if kept.related.contains(mid) {
        return Verdict::Keep(KeepReason::Related);
    }
    if policy.keep_read && !message.is_unread() {
        return Verdict::Keep(KeepReason::Read);
    }
    if !is_old(message, policy.min_age, now) {
        return Verdict::Keep(KeepReason::Recent);
    }
    Verdict::Act(match policy.mode {
        Mode::Archive => Action::Move(get_archive_name(layout, policy, message)),
        Mode::Trash => Action::Move(policy.trash_folder.clone()),
        Mode::Delete => Action::Delete,
    })
}

/// Decides what happens to every message of a folder.
pub fn classify_emails<'m>(
    layout: &Layout,
    policy: &Policy,
    messages: &'m [Message],
    now: DateTime<Utc>,
) -> Vec<(&'m Message, Verdict)> {
    let kept = KeptThreads::scan(
        messages,
        policy.keep_flagged_threads,
        policy.keep_unread_threads,
    );
    messages
        .iter()
        .map(|message| (message, classify_message(layout, policy, &kept, message, now)))
        .collect()
}
