use std::{fs, io, path::Path};

use ipam::{Ipam, Snapshot};
use snafu::{ResultExt as _, whatever};
use snafu_utils::GenericError;
use tracing::debug;

/// Reads the allocator state stored at `path`, or `None` if there is none.
pub(crate) fn load(path: &Path) -> Result<Option<Ipam>, GenericError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_whatever_context(|_| format!("failed to read {}", path.display()));
        }
    };
    let snapshot: Snapshot = serde_json::from_str(&text)
        .with_whatever_context(|_| format!("malformed state in {}", path.display()))?;
    let ipam = Ipam::import(&snapshot)
        .with_whatever_context(|_| format!("failed to restore state from {}", path.display()))?;
    debug!(path = %path.display(), "loaded state");
    Ok(Some(ipam))
}

pub(crate) fn load_existing(path: &Path) -> Result<Ipam, GenericError> {
    let Some(ipam) = load(path)? else {
        whatever!("state file {} does not exist", path.display());
    };
    Ok(ipam)
}

pub(crate) fn save(path: &Path, ipam: &Ipam) -> Result<(), GenericError> {
    let mut text = to_json(ipam)?;
    text.push('\n');
    fs::write(path, text)
        .with_whatever_context(|_| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "saved state");
    Ok(())
}

pub(crate) fn to_json(ipam: &Ipam) -> Result<String, GenericError> {
    serde_json::to_string_pretty(&ipam.export()).whatever_context("failed to serialize state")
}
