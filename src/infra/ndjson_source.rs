use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use crate::app::ports::RecordSourcePort;
use crate::error::InferenceError;

/// Reads newline-delimited JSON records lazily, one line per call. Blank
/// lines are ignored.
pub struct NdjsonFileSource<T> {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> NdjsonFileSource<T> {
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open input file {:?}: {}", path, e))?;
        debug!("reading records from {:?}", path);
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path,
            line: 0,
            _record: PhantomData,
        })
    }
}

#[async_trait]
impl<T> RecordSourcePort<T> for NdjsonFileSource<T>
where
    T: DeserializeOwned + Send,
{
    async fn next_record(&mut self) -> anyhow::Result<Option<T>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record = serde_json::from_str(trimmed).map_err(|error| InferenceError::JsonLine {
                source_name: self.path.display().to_string(),
                line: self.line,
                error,
            })?;
            return Ok(Some(record));
        }
        Ok(None)
    }
}
