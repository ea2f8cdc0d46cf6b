use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::fs;

use super::{HistoryLoad, HistoryStore};
use crate::history::HistoryRecord;

/// History stored as one pretty-printed JSON array.
///
/// Saves go to a sibling `<name>.tmp` file that is then renamed over the
/// target, so readers see either the old or the new array, never a partial one.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("history.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create history directory")?;
            }
        }
        Ok(())
    }
}

/// Serialize with a four-space indent, the layout of existing history files.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .context("Failed to serialize history")?;
    Ok(out)
}

#[async_trait::async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn load(&self) -> HistoryLoad {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HistoryLoad::Missing,
            Err(e) => {
                return HistoryLoad::Corrupt(format!("{}: {e}", self.path.display()));
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => HistoryLoad::Loaded(records),
            Err(e) => HistoryLoad::Corrupt(format!("{}: {e}", self.path.display())),
        }
    }

    async fn save(&self, records: &[HistoryRecord]) -> Result<()> {
        self.ensure_parent_dir().await?;
        let content = to_pretty_json(&records)?;

        let temp = self.temp_path();
        fs::write(&temp, content)
            .await
            .with_context(|| format!("Failed to write {}", temp.display()))?;
        fs::rename(&temp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    async fn ensure_initialized(&self) -> Result<bool> {
        if fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to check {}", self.path.display()))?
        {
            return Ok(false);
        }
        self.save(&[]).await?;
        Ok(true)
    }
}
