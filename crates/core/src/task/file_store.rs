//! Whole-file helpers shared by the file-backed task stores
//!
//! Every store operation reads the complete file, works on the in-memory
//! copy and writes the complete file back.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{Error, Result};

/// Make sure `path` exists and is non-empty
///
/// A missing file gets its parent directories created first. Missing and
/// zero-length files are both written with `empty_content`.
pub(crate) fn ensure_file_exists(path: &Path, empty_content: &str) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => return Ok(()),
        Ok(_) => debug!("Re-initializing empty task file: {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::storage("create directory", parent, e))?;
            }
            debug!("Creating task file: {}", path.display());
        }
        Err(err) => return Err(Error::storage("inspect", path, err)),
    }

    fs::write(path, empty_content).map_err(|e| Error::storage("initialize", path, e))
}

/// Read the whole file as UTF-8 text
pub(crate) fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::storage("read", path, e))
}

/// Replace the whole file content
pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| Error::storage("write", path, e))?;
    debug!("Wrote task file: {} ({} bytes)", path.display(), content.len());
    Ok(())
}
