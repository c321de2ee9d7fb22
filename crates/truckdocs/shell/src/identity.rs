//! Persistent device identifier.

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr as _;

const DEVICE_ID_FILE: &str = "device-id";

/// The identifier this installation enrolls under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    id: String,
    path: PathBuf,
}

impl DeviceIdentity {
    /// Load the identifier from the data directory, creating a new UUID v4
    /// on first run.
    pub fn load_or_create(data_dir: &Path) -> color_eyre::eyre::Result<Self> {
        let path = data_dir.join(DEVICE_ID_FILE);

        if path.exists() {
            let id = std::fs::read_to_string(&path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?
                .trim()
                .to_string();
            if !id.is_empty() {
                return Ok(Self { id, path });
            }
            tracing::warn!(path = %path.display(), "empty device id file, generating a new id");
        }

        std::fs::create_dir_all(data_dir)
            .wrap_err_with(|| format!("failed to create {}", data_dir.display()))?;

        let id = uuid::Uuid::new_v4().to_string();
        std::fs::write(&path, &id)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;

        tracing::info!(device_id = %id, "generated device id");
        Ok(Self { id, path })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
