use crate::error::{CleanupError, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Logical name of the folder living at the mail root itself.
pub const INBOX: &str = "INBOX";

/// Subdirectories every maildir has.
pub const SUBDIRS: [&str; 3] = ["cur", "new", "tmp"];

/// Marker file Maildir++ puts into every folder but the root.
const FOLDER_MARKER: &str = "maildirfolder";

#[cfg(unix)]
const INFO_SEPARATOR: &str = ":2,";
#[cfg(windows)]
const INFO_SEPARATOR: &str = ";2,";

/// How logical folder names map to directories under the mail root.
#[derive(Clone, Debug)]
pub struct Layout {
    pub root: PathBuf,
    pub prefix: String,
    pub separator: String,
}

impl Layout {
    pub fn folder(&self, name: &str) -> Folder {
        let path = if name == INBOX {
            self.root.clone()
        } else {
            self.root.join(format!("{}{}", self.prefix, name))
        };
        Folder {
            name: name.to_string(),
            path,
        }
    }

    /// Joins name components with the folder separator.
    pub fn join<'a>(&self, parts: impl IntoIterator<Item = &'a str>) -> String {
        parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Folder {
    name: String,
    path: PathBuf,
}

impl Folder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_inbox(&self) -> bool {
        self.name == INBOX
    }

    pub fn subdir(&self, subdir: &str) -> PathBuf {
        self.path.join(subdir)
    }

    /// Whether the folder has the `cur` and `new` directories messages are
    /// read from.
    pub fn exists(&self) -> Result<bool> {
        Ok(is_dir(&self.subdir("cur"))? && is_dir(&self.subdir("new"))?)
    }

    pub fn check_source(&self) -> Result<()> {
        if self.exists()? {
            Ok(())
        } else {
            Err(CleanupError::SourceNotMaildir {
                folder: self.name.clone(),
                path: self.path.clone(),
            })
        }
    }

    /// Creates the folder structure, leaving whatever already exists alone.
    pub fn create(&self) -> Result<()> {
        for subdir in SUBDIRS.iter() {
            let path = self.subdir(subdir);
            fs::create_dir_all(&path).map_err(|e| CleanupError::io(&path, e))?;
        }
        if !self.is_inbox() {
            let marker = self.path.join(FOLDER_MARKER);
            if !marker.exists() {
                File::create(&marker).map_err(|e| CleanupError::io(&marker, e))?;
            }
        }
        Ok(())
    }

    /// Whether the folder holds nothing but empty `cur`, `new` and `tmp`
    /// (and the folder marker).
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.removable_entries()? == Some(0))
    }

    /// Number of entries in `cur`, `new` and `tmp` together, or `None` when
    /// the folder directory holds anything else, such as index files of an
    /// IMAP server or nested folders. Such a folder is never removed.
    pub fn removable_entries(&self) -> Result<Option<usize>> {
        let entries = fs::read_dir(&self.path).map_err(|e| CleanupError::io(&self.path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CleanupError::io(&self.path, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| CleanupError::io(&entry.path(), e))?;
            let file_name = entry.file_name();
            let known = match file_name.to_str() {
                Some(FOLDER_MARKER) => file_type.is_file(),
                Some(name) => SUBDIRS.contains(&name) && file_type.is_dir(),
                None => false,
            };
            if !known {
                debug!("{} holds {:?}", self.name, file_name);
                return Ok(None);
            }
        }

        let mut count = 0;
        for subdir in SUBDIRS.iter() {
            let path = self.subdir(subdir);
            match fs::read_dir(&path) {
                Ok(entries) => count += entries.count(),
                Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CleanupError::io(&path, e)),
            }
        }
        Ok(Some(count))
    }

    /// Removes an empty folder. Returns whether the folder is gone. INBOX is
    /// never removed, and neither is a folder holding files this tool does
    /// not know about. Nothing is deleted unless the whole folder is empty.
    pub fn remove(&self) -> Result<bool> {
        if self.is_inbox() {
            return Ok(false);
        }
        match self.removable_entries()? {
            Some(0) => {}
            Some(_) => return Ok(false),
            None => {
                warn!("Keeping {}: it holds files other than messages", self.name);
                return Ok(false);
            }
        }
        for subdir in SUBDIRS.iter() {
            let path = self.subdir(subdir);
            match fs::remove_dir(&path) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CleanupError::io(&path, e)),
            }
        }
        let marker = self.path.join(FOLDER_MARKER);
        match fs::remove_file(&marker) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(CleanupError::io(&marker, e)),
        }
        fs::remove_dir(&self.path).map_err(|e| CleanupError::io(&self.path, e))?;
        Ok(true)
    }
}

fn is_dir(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CleanupError::io(path, e)),
    }
}

/// Returns the flags part of a maildir file name, which is empty for
/// messages that have never been seen by a mail client.
pub fn flags_of(file_name: &str) -> &str {
    file_name
        .rfind(INFO_SEPARATOR)
        .map(|pos| &file_name[pos + INFO_SEPARATOR.len()..])
        .unwrap_or("")
}

/// File name a message gets in `cur`. Messages taken from `new` have no
/// info part yet and get an empty one.
pub fn cur_file_name(file_name: &str) -> String {
    if file_name.contains(INFO_SEPARATOR) {
        file_name.to_string()
    } else {
        format!("{}{}", file_name, INFO_SEPARATOR)
    }
}

/// Files starting with a dot are not messages, per maildir convention.
pub fn is_message_name(file_name: &str) -> bool {
    !file_name.is_empty() && !file_name.starts_with('.')
}
