use crate::datetime::parse_datetime;
use crate::error::{CleanupError, Result};
use crate::maildir::{self, Folder};
use crate::utils;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Where the arrival date of a message came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrivalSource {
    DeliveryDate,
    Received,
    Mtime,
}

#[derive(Clone, Debug)]
pub struct Message {
    pub path: PathBuf,
    pub file_name: String,
    pub flags: String,
    pub arrival: DateTime<Utc>,
    pub arrival_source: ArrivalSource,
    /// Value of the `Date` header, if it parses.
    pub sent: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
}

impl Message {
    pub fn is_flagged(&self) -> bool {
        self.flags.contains('F')
    }

    pub fn is_unread(&self) -> bool {
        !self.flags.contains('S')
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }
}

/// Header fields of a message, names lowercased, values unfolded.
#[derive(Debug, Default)]
struct Headers(Vec<(String, String)>);

impl Headers {
    fn read(reader: impl BufRead) -> io::Result<Self> {
        let mut reader = reader;
        let mut fields: Vec<(String, String)> = vec![];
        let mut line = vec![];
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(|c: char| c == '\r' || c == '\n');
            // An empty line ends the header section.
            if text.is_empty() {
                break;
            }
            if text.starts_with(|c: char| c == ' ' || c == '\t') {
                if let Some((_, value)) = fields.last_mut() {
                    value.push(' ');
                    value.push_str(text.trim());
                }
                continue;
            }
            if let Some((name, value)) = text.split_once(':') {
                fields.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }
        Ok(Headers(fields))
    }

    /// Returns the first field with the given lowercase name.
    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    parse_datetime(value.as_bytes()).map(|dt| dt.with_timezone(&Utc))
}

/// Picks the arrival date from delivery metadata: `Delivery-date` first, then
/// the date the topmost `Received` header was stamped with.
fn delivery_date(headers: &Headers) -> Option<(DateTime<Utc>, ArrivalSource)> {
    if let Some(dt) = headers.get("delivery-date").and_then(parse_utc) {
        return Some((dt, ArrivalSource::DeliveryDate));
    }
    headers
        .get("received")
        .and_then(|received| received.rsplit(';').next())
        .and_then(parse_utc)
        .map(|dt| (dt, ArrivalSource::Received))
}

/// Splits a list of message ids such as the value of `References`.
fn parse_msg_ids(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .filter(|id| id.len() > 2 && id.starts_with('<') && id.ends_with('>'))
        .map(str::to_string)
        .collect()
}

pub fn read_message(path: &Path) -> Result<Message> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let file = File::open(path).map_err(|e| CleanupError::unreadable(path, e))?;
    let mtime = file
        .metadata()
        .and_then(|metadata| metadata.modified())
        .map_err(|e| CleanupError::unreadable(path, e))?;
    let headers =
        Headers::read(BufReader::new(file)).map_err(|e| CleanupError::unreadable(path, e))?;

    let (arrival, arrival_source) =
        delivery_date(&headers).unwrap_or_else(|| (DateTime::from(mtime), ArrivalSource::Mtime));
    trace!("{:?} arrived {} ({:?})", path, arrival, arrival_source);
    let message_id = headers
        .get("message-id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let in_reply_to = headers
        .get("in-reply-to")
        .and_then(|irt| parse_msg_ids(irt).into_iter().next());
    let references = headers
        .get("references")
        .map(parse_msg_ids)
        .unwrap_or_default();

    Ok(Message {
        path: path.to_path_buf(),
        flags: maildir::flags_of(&file_name).to_string(),
        file_name,
        arrival,
        arrival_source,
        sent: headers.get("date").and_then(parse_utc),
        subject: headers.get("subject").map(str::to_string),
        message_id,
        in_reply_to,
        references,
    })
}

/// Messages of a folder, plus how many files could not be read.
#[derive(Debug, Default)]
pub struct Listing {
    pub messages: Vec<Message>,
    pub unreadable: usize,
}

/// Reads every message in `cur` and `new` of the folder. Files in `tmp` are
/// still being delivered and are never looked at.
pub fn list_messages(folder: &Folder, show_progress: bool) -> Result<Listing> {
    folder.check_source()?;

    let mut files = vec![];
    for subdir in &["cur", "new"] {
        let dir = folder.subdir(subdir);
        let entries = fs::read_dir(&dir).map_err(|e| CleanupError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CleanupError::io(&dir, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let is_message = entry
                .file_name()
                .to_str()
                .map_or(false, maildir::is_message_name);
            if is_file && is_message {
                files.push(entry.path());
            }
        }
    }

    let mut listing = Listing::default();
    // There is no email, just return.
    if files.is_empty() {
        return Ok(listing);
    }

    let progress = utils::create_progress_bar(show_progress, files.len());
    for path in files {
        match read_message(&path) {
            Ok(message) => listing.messages.push(message),
            Err(err) if err.is_fatal() => {
                progress.finish_and_clear();
                return Err(err);
            }
            Err(err) => {
                warn!("Skipping unreadable message: {}", err);
                listing.unreadable += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(listing)
}
