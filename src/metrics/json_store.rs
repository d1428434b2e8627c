use std::fs;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::record::{MetricsRecord, NewMetricsRecord};
use super::store::{MetricsStore, Records, StoreError};

/// Append-only JSON Lines file holding one record per line.
///
/// Existing lines are loaded on open; lines that fail to parse are skipped
/// with a warning so one bad write cannot hide the rest of the history.
#[derive(Debug)]
pub struct JsonlMetricsStore {
    path: PathBuf,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    records: Records,
    /// The file may end in a partial line; the next append starts a fresh one.
    torn_tail: bool,
}

impl JsonlMetricsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut records = Records::default();
        let mut torn_tail = false;
        if path.exists() {
            for record in load_lines(&path)? {
                records.push(record);
            }
            torn_tail = ends_mid_line(&path)?;
        } else if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        log::debug!(
            "Opened metrics file {} with {} record(s)",
            path.display(),
            records.items.len()
        );
        Ok(Self {
            path,
            state: Mutex::new(State { records, torn_tail }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ends_mid_line(path: &Path) -> Result<bool, StoreError> {
    let mut file = fs::File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

async fn append(path: &Path, line: &[u8]) -> Result<(), StoreError> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line).await?;
    file.flush().await?;
    Ok(())
}

fn load_lines(path: &Path) -> Result<Vec<MetricsRecord>, StoreError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MetricsRecord>(&line) {
            Ok(record) => items.push(record),
            Err(err) => log::warn!("Skipping line {} of {}: {err}", idx + 1, path.display()),
        }
    }
    Ok(items)
}

#[async_trait]
impl MetricsStore for JsonlMetricsStore {
    async fn create(&self, entry: NewMetricsRecord) -> Result<MetricsRecord, StoreError> {
        let mut state = self.state.lock().await;
        let record = state.records.next(entry);

        let mut line = Vec::new();
        if state.torn_tail {
            line.push(b'\n');
        }
        let written = match serde_json::to_writer(&mut line, &record) {
            Ok(()) => {
                line.push(b'\n');
                append(&self.path, &line).await
            }
            Err(err) => Err(err.into()),
        };
        if let Err(err) = written {
            state.records.last_id -= 1;
            state.torn_tail = true;
            log::warn!("Failed to append metrics record to {}: {err}", self.path.display());
            return Err(err);
        }

        state.torn_tail = false;
        state.records.push(record.clone());
        Ok(record)
    }

    async fn list(&self, owner: &str, model: Option<&str>) -> Result<Vec<MetricsRecord>, StoreError> {
        Ok(self.state.lock().await.records.list(owner, model))
    }

    async fn get(&self, owner: &str, id: u64) -> Result<Option<MetricsRecord>, StoreError> {
        Ok(self.state.lock().await.records.get(owner, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::record::fixtures::entry;

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("records.jsonl");

        let store = JsonlMetricsStore::open(&path).unwrap();
        store.create(entry("u1", "gpt-3.5-turbo", "first")).await.unwrap();
        store.create(entry("u1", "gpt-3.5-turbo", "second")).await.unwrap();
        drop(store);

        let reopened = JsonlMetricsStore::open(&path).unwrap();
        let listed = reopened.list("u1", None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].entry.user_prompt, "second");

        let third = reopened.create(entry("u1", "gpt-3.5-turbo", "third")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let store = JsonlMetricsStore::open(&path).unwrap();
        store.create(entry("u1", "gpt-3.5-turbo", "kept")).await.unwrap();
        drop(store);

        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push_str("{not json\n\n");
        fs::write(&path, contents).unwrap();

        let reopened = JsonlMetricsStore::open(&path).unwrap();
        let listed = reopened.list("u1", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entry.user_prompt, "kept");
    }

    #[tokio::test]
    async fn append_after_partial_line_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let store = JsonlMetricsStore::open(&path).unwrap();
        store.create(entry("u1", "gpt-3.5-turbo", "kept")).await.unwrap();
        drop(store);

        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push_str("{\"id\":2,\"userId\":\"u1\"");
        fs::write(&path, contents).unwrap();

        let reopened = JsonlMetricsStore::open(&path).unwrap();
        let next = reopened.create(entry("u1", "gpt-3.5-turbo", "after")).await.unwrap();
        assert_eq!(next.id, 2);
        drop(reopened);

        let again = JsonlMetricsStore::open(&path).unwrap();
        let prompts: Vec<String> = again
            .list("u1", None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.entry.user_prompt)
            .collect();
        assert_eq!(prompts, vec!["after", "kept"]);
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }
}
