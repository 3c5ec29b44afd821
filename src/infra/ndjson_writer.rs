use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::debug;

/// Buffered newline-delimited JSON file writer. Creating one truncates the file.
pub struct NdjsonFileWriter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl NdjsonFileWriter {
    pub async fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent_dir) = path.parent() {
            if !parent_dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent_dir).await.map_err(|e| {
                    anyhow::anyhow!("Failed to create output directory {:?}: {}", parent_dir, e)
                })?;
            }
        }
        let file = File::create(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open output file {:?}: {}", path, e))?;
        debug!("writing records to {:?}", path);
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write<T: Serialize + ?Sized>(&self, record: &T) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)? + "\n";
        self.writer
            .lock()
            .await
            .write_all(line.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write to output file {:?}: {}", self.path, e))?;
        Ok(())
    }

    pub async fn flush(&self) -> anyhow::Result<()> {
        self.writer
            .lock()
            .await
            .flush()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to flush output file {:?}: {}", self.path, e))?;
        Ok(())
    }
}
