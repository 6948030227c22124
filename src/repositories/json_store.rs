use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Failures from the flat-file stores. A missing file is not an error (it
/// reads as an empty collection); a present-but-unparsable file is surfaced
/// as `Malformed` rather than silently treated as empty.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An array-of-records JSON file. Every operation is a full read or a full
/// rewrite; there is no per-record addressing. Callers are expected to
/// serialize mutations themselves (the ledger service handles its requests
/// one at a time).
#[derive(Clone, Debug)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonStore { path: path.into() }
    }

    pub fn read<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&raw).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Rewrite the whole collection. Writes go to a sibling temp file first
    /// and are renamed into place so a crash mid-write cannot truncate the
    /// live store.
    pub fn write<T: Serialize>(&self, records: &[T]) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(records).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            source: e,
        })?;

        let tmp = self
            .path
            .with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
        let io_err = |e: io::Error| StoreError::Io {
            path: self.path.clone(),
            source: e,
        };

        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn absent_file_reads_as_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonStore::new(dir.path().join("missing.json"));
        let records: Vec<Value> = store.read().expect("read");
        assert!(records.is_empty());
    }

    #[test]
    fn blank_file_reads_as_empty() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("blank.json");
        std::fs::write(&path, "  \n").expect("seed");
        let records: Vec<Value> = JsonStore::new(path).read().expect("read");
        assert!(records.is_empty());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonStore::new(dir.path().join("records.json"));
        let records = vec![json!({"id": 1}), json!({"id": 2})];
        store.write(&records).expect("write");

        let back: Vec<Value> = store.read().expect("read");
        assert_eq!(back, records);
    }

    #[test]
    fn malformed_content_is_an_error_not_an_empty_store() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{not json").expect("seed");

        let result: Result<Vec<Value>, _> = JsonStore::new(path).read();
        assert!(matches!(result, Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn rewrite_replaces_the_previous_contents() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonStore::new(dir.path().join("records.json"));
        store.write(&[json!({"id": 1})]).expect("first write");
        store.write(&[json!({"id": 9})]).expect("second write");

        let back: Vec<Value> = store.read().expect("read");
        assert_eq!(back, vec![json!({"id": 9})]);
    }
}
