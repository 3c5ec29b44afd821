use async_trait::async_trait;
use std::path::Path;

use crate::app::ports::MatchOutputPort;
use crate::infra::ndjson_writer::NdjsonFileWriter;
use crate::pipeline::processing::matcher::MatchResult;

/// File-based adapter writing match results to a single NDJSON file
pub struct FileMatchOutputAdapter {
    writer: NdjsonFileWriter,
}

impl FileMatchOutputAdapter {
    pub async fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self {
            writer: NdjsonFileWriter::create(path).await?,
        })
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }
}

#[async_trait]
impl MatchOutputPort for FileMatchOutputAdapter {
    async fn write_match(&self, result: &MatchResult) -> anyhow::Result<()> {
        self.writer.write(result).await
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.writer.flush().await
    }
}
