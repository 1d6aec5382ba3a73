//! Append-only JSON-lines mirror of visitor records.
//!
//! Redundant second write alongside the document store. One line per record,
//! stamped with the wall-clock time of the write itself so the two stores can
//! be reconciled after the event.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::debug;

use eventlens_core::VisitorRecord;

pub struct MirrorLog {
    file: Mutex<File>,
}

impl MirrorLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .with_context(|| format!("Failed to open mirror log at {:?}", path.as_ref()))?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Append one record as a JSON line.
    pub async fn append(&self, record: &VisitorRecord) -> Result<()> {
        let mut entry = serde_json::to_value(record)?;
        entry["mirrored_at"] = serde_json::Value::String(chrono::Utc::now().to_rfc3339());

        let mut file = self.file.lock().await;
        writeln!(file, "{}", entry).context("Failed to append to mirror log")?;
        file.flush()?;
        debug!(id = %record.id, "Mirrored visitor record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventlens_core::VisitorFields;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let path = std::env::temp_dir().join(format!("mirror-{}.jsonl", Uuid::new_v4()));
        let log = MirrorLog::open(&path).unwrap();

        for name in ["a", "b"] {
            let record = VisitorRecord {
                id: Uuid::new_v4(),
                fields: VisitorFields {
                    name: Some(name.into()),
                    ..Default::default()
                },
                created_at: chrono::Utc::now(),
            };
            log.append(&record).await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["name"], "a");
        assert!(first["mirrored_at"].is_string());

        std::fs::remove_file(&path).ok();
    }
}
