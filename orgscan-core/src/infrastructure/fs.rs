// orgscan-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::Path;

/// Writes `content` to `path` through a temporary file in the same directory,
/// then renames it into place. Readers see either the old record or the new
/// one, never a truncated file. Missing parent directories are created.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // Same directory so the rename never crosses filesystems
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file.as_file().sync_all()?;

    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_replaces_record() -> Result<()> {
        let dir = tempdir()?;
        let record = dir.path().join("meta.rec");

        atomic_write(&record, "first")?;
        atomic_write(&record, "second")?;

        assert_eq!(fs::read_to_string(&record)?, "second");
        // No temporary file left behind
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_atomic_write_creates_parent_directories() -> Result<()> {
        let dir = tempdir()?;
        let record = dir.path().join("nested").join("cache").join("data.rec");

        atomic_write(&record, b"payload")?;

        assert_eq!(fs::read(&record)?, b"payload");
        Ok(())
    }
}
