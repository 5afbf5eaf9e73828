use crate::error::{CleanupError, Result};
use crate::maildir::{Layout, INBOX, SUBDIRS};
use std::fs;
use std::iter;

/// Lists the folders a whole-maildir run goes through: INBOX first, then every
/// folder directly under the root, skipping the archive namespace.
pub fn list_folders<'a>(
    layout: &'a Layout,
    archive_prefix: &'a str,
) -> Result<impl Iterator<Item = Result<String>> + 'a> {
    let entries = fs::read_dir(&layout.root).map_err(|e| CleanupError::io(&layout.root, e))?;
    let others = entries.filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Some(Err(CleanupError::io(&layout.root, e))),
        };
        let path = entry.path();
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => {}
            Ok(_) => return None,
            Err(e) => return Some(Err(CleanupError::io(&path, e))),
        }
        let file_name = match entry.file_name().into_string() {
            Ok(file_name) => file_name,
            Err(file_name) => {
                warn!("Skipping folder with non UTF-8 name {:?}", file_name);
                return None;
            }
        };
        folder_name(layout, archive_prefix, &file_name).map(|name| Ok(name.to_string()))
    });
    Ok(iter::once(Ok(INBOX.to_string())).chain(others))
}

fn folder_name<'n>(layout: &Layout, archive_prefix: &str, file_name: &'n str) -> Option<&'n str> {
    if SUBDIRS.contains(&file_name) {
        return None;
    }
    let name = file_name.strip_prefix(layout.prefix.as_str())?;
    if name.is_empty() || name == INBOX || is_archive(layout, archive_prefix, name) {
        return None;
    }
    Some(name)
}

fn is_archive(layout: &Layout, archive_prefix: &str, name: &str) -> bool {
    match name.strip_prefix(archive_prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(layout.separator.as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn layout(root: &Path, prefix: &str) -> Layout {
        Layout {
            root: PathBuf::from(root),
            prefix: prefix.to_string(),
            separator: ".".to_string(),
        }
    }

    #[test]
    fn test_folder_name() {
        let layout = layout(Path::new("/m"), ".");
        let name = |file_name: &'static str| folder_name(&layout, "archive", file_name);
        assert_eq!(name(".Sent"), Some("Sent"));
        assert_eq!(name(".Lists.rust"), Some("Lists.rust"));
        assert_eq!(name(".archives"), Some("archives"));
        assert_eq!(name(".archive"), None);
        assert_eq!(name(".archive.INBOX.2020"), None);
        assert_eq!(name("cur"), None);
        assert_eq!(name("courierimapkeywords"), None);
        assert_eq!(name("."), None);
        assert_eq!(name(".INBOX"), None);
    }

    #[test]
    fn test_reserved_names_without_prefix() {
        let layout = layout(Path::new("/m"), "");
        let name = |file_name: &'static str| folder_name(&layout, "archive", file_name);
        assert_eq!(name("Sent"), Some("Sent"));
        assert_eq!(name("new"), None);
        assert_eq!(name("tmp"), None);
        assert_eq!(name("archive.Sent"), None);
    }

    #[test]
    fn test_list_folders() {
        let tmp = TempDir::new().unwrap();
        for dir in &["cur", "new", "tmp", ".Sent", ".Trash", ".archive.Sent.2019"] {
            fs::create_dir(tmp.path().join(dir)).unwrap();
        }
        fs::write(tmp.path().join(".subscriptions"), b"Sent\n").unwrap();

        let layout = layout(tmp.path(), ".");
        let mut folders = list_folders(&layout, "archive")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(folders[0], INBOX);
        folders.sort();
        assert_eq!(folders, vec!["INBOX", "Sent", "Trash"]);
    }
}
