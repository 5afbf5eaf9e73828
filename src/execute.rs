use crate::classify::{Action, Verdict};
use crate::collect::Message;
use crate::error::{CleanupError, Result};
use crate::maildir::{self, Folder, Layout};
use crate::verify::{hash_file, StreamHasher};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Makes sure every folder messages are about to be moved to exists, before
/// any message is touched.
pub fn prepare_destinations(
    layout: &Layout,
    plan: &[(&Message, Verdict)],
    create: bool,
    dry_run: bool,
) -> Result<()> {
    let names = plan
        .iter()
        .filter_map(|(_, verdict)| match verdict {
            Verdict::Act(Action::Move(name)) => Some(name.as_str()),
            _ => None,
        })
        .collect::<BTreeSet<_>>();
    for name in names {
        let folder = layout.folder(name);
        if folder.exists()? {
            continue;
        }
        if !create {
            return Err(CleanupError::DestinationMissing {
                folder: name.to_string(),
                path: folder.path().to_path_buf(),
            });
        }
        if dry_run {
            info!("(Not really) Creating folder {}", name);
        } else {
            info!("Creating folder {}", name);
            folder.create()?;
        }
    }
    Ok(())
}

/// Carries out the action decided for one message.
pub fn apply(layout: &Layout, message: &Message, action: &Action, dry_run: bool) -> Result<()> {
    let fake = if dry_run { "(Not really) " } else { "" };
    match action {
        Action::Delete => {
            info!("{}Deleting {}: {}", fake, message.file_name, message.subject());
            if !dry_run {
                fs::remove_file(&message.path)
                    .map_err(|e| CleanupError::unreadable(&message.path, e))?;
            }
        }
        Action::Move(name) => {
            info!(
                "{}Moving {} to {}: {}",
                fake,
                message.file_name,
                name,
                message.subject()
            );
            if !dry_run {
                move_message(message, &layout.folder(name))?;
            }
        }
    }
    Ok(())
}

/// Moves a message into `cur` of the folder, keeping its file name and so
/// its flags. Messages from `new` get an empty info part.
pub fn move_message(message: &Message, folder: &Folder) -> Result<()> {
    let file_name = maildir::cur_file_name(&message.file_name);
    let target = folder.subdir("cur").join(&file_name);
    if target == message.path {
        return Ok(());
    }
    if fs::symlink_metadata(&target).is_ok() {
        return Err(CleanupError::DestinationExists { path: target });
    }
    match fs::rename(&message.path, &target) {
        Ok(()) => Ok(()),
        Err(ref e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("{:?} is on another filesystem, copying", target);
            copy_verified(&message.path, folder, &file_name)
        }
        Err(e) => Err(CleanupError::unreadable(&message.path, e)),
    }
}

/// Copies a message into the folder through its `tmp` directory, checks the
/// copy, and only then removes the original.
pub fn copy_verified(src: &Path, folder: &Folder, file_name: &str) -> Result<()> {
    let tmp_path = folder.subdir("tmp").join(file_name);
    let target = folder.subdir("cur").join(file_name);

    let src_file = File::open(src).map_err(|e| CleanupError::unreadable(src, e))?;
    let modified = src_file
        .metadata()
        .and_then(|metadata| metadata.modified())
        .map_err(|e| CleanupError::unreadable(src, e))?;
    let mut hasher = StreamHasher::new(src_file);
    let copied = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .and_then(|mut tmp_file| {
            io::copy(&mut hasher, &mut tmp_file)?;
            // Keep the mtime, it may be the only arrival date there is.
            tmp_file.set_modified(modified)?;
            tmp_file.sync_all()
        });
    if let Err(e) = copied {
        let _ = fs::remove_file(&tmp_path);
        return Err(CleanupError::io(&tmp_path, e));
    }

    let expected = hasher.get_result();
    let actual = hash_file(&tmp_path).map_err(|e| CleanupError::io(&tmp_path, e))?;
    if expected[..] != actual[..] {
        let _ = fs::remove_file(&tmp_path);
        return Err(CleanupError::io(
            &tmp_path,
            io::Error::new(io::ErrorKind::InvalidData, "copy differs from original"),
        ));
    }

    fs::rename(&tmp_path, &target).map_err(|e| CleanupError::io(&target, e))?;
    fs::remove_file(src).map_err(|e| CleanupError::io(src, e))
}
