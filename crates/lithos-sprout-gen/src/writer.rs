// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::fs;
use std::path::Path;

use tracing::{error, info};

use crate::error::GenError;

/// Creates or truncates `path` and writes `contents`, creating missing
/// parent directories.
pub fn write_output(path: &Path, contents: &str) -> Result<(), GenError> {
    let result = write(path, contents);
    match &result {
        Ok(()) => info!(path = %path.display(), bytes = contents.len(), "wrote output"),
        Err(err) => error!(path = %path.display(), error = %err, "failed to write output"),
    }
    result
}

fn write(path: &Path, contents: &str) -> Result<(), GenError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| GenError::io(parent, source))?;
    }
    fs::write(path, contents).map_err(|source| GenError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry/conversion/out.go");
        write_output(&path, "package conversion\n// long content\n").unwrap();
        write_output(&path, "package conversion\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "package conversion\n");
    }

    #[test]
    fn reports_the_failing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_output(dir.path(), "x").unwrap_err();
        match err {
            GenError::Io { path, .. } => assert_eq!(path, dir.path()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
