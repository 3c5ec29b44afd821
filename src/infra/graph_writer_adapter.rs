use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::app::ports::GraphWriterPort;
use crate::infra::ndjson_writer::NdjsonFileWriter;
use crate::pipeline::processing::transform::GraphRecord;

/// Writes graph record payloads to one NDJSON file per record kind:
/// `<dataset>.objects.ndjson`, `<dataset>.relations.ndjson` and `<dataset>.log.ndjson`.
pub struct FileGraphWriterAdapter {
    objects: NdjsonFileWriter,
    relations: NdjsonFileWriter,
    log: NdjsonFileWriter,
}

impl FileGraphWriterAdapter {
    pub async fn create(output_dir: impl AsRef<Path>, dataset: &str) -> anyhow::Result<Self> {
        let output_dir = output_dir.as_ref();
        let file = |kind: &str| output_dir.join(format!("{}.{}.ndjson", dataset, kind));

        let adapter = Self {
            objects: NdjsonFileWriter::create(file("objects")).await?,
            relations: NdjsonFileWriter::create(file("relations")).await?,
            log: NdjsonFileWriter::create(file("log")).await?,
        };
        info!("Writing graph records for dataset '{}' to {:?}", dataset, output_dir);
        Ok(adapter)
    }
}

#[async_trait]
impl GraphWriterPort for FileGraphWriterAdapter {
    async fn write_record(&self, record: &GraphRecord) -> anyhow::Result<()> {
        match record {
            GraphRecord::Object(object) => self.objects.write(object).await,
            GraphRecord::Relation(relation) => self.relations.write(relation).await,
            GraphRecord::Log(entry) => self.log.write(entry).await,
        }
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.objects.flush().await?;
        self.relations.flush().await?;
        self.log.flush().await
    }
}
