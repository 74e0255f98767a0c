//! Utility functions for error handling
//!
//! This module provides helpers that attach path information to file errors.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// Safely open an input file
///
/// A missing path is reported as [`Error::FileNotFound`], any other failure
/// as [`Error::Io`].
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for log context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        log::error!("Missing input for {purpose}: {}", path.display());
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    if !path.is_file() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Expected a file for {purpose}: {}", path.display()),
        )));
    }

    match fs::File::open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => {
            if e.kind() == io::ErrorKind::PermissionDenied {
                log::error!("Permission denied - check file permissions: {}", path.display());
            }
            Err(Error::Io(e))
        }
    }
}
