//! `ArchiveTag.txt` tag cache.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::TAG_FILE_NAME;
use crate::error_handling::RevisionError;

pub(crate) fn tag_file(source_dir: &Path) -> PathBuf {
    source_dir.join(TAG_FILE_NAME)
}

/// First line of the cached tag, if the file exists.
pub(crate) fn load_tag(source_dir: &Path) -> Result<Option<String>, RevisionError> {
    let content = match fs::read_to_string(tag_file(source_dir)) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(content.lines().next().unwrap_or_default().to_string()))
}

/// Writes `tag` without a trailing newline.
pub(crate) fn save_tag(source_dir: &Path, tag: &str) -> Result<(), RevisionError> {
    fs::write(tag_file(source_dir), tag)?;
    Ok(())
}
