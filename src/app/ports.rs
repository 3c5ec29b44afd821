use async_trait::async_trait;

use crate::pipeline::processing::matcher::MatchResult;
use crate::pipeline::processing::transform::GraphRecord;

/// A sequential source of records, read one at a time.
#[async_trait]
pub trait RecordSourcePort<T>: Send {
    /// The next record, or `None` once the source is exhausted.
    async fn next_record(&mut self) -> anyhow::Result<Option<T>>;
}

/// Sink for the matching stage's per house number results.
#[async_trait]
pub trait MatchOutputPort: Send + Sync {
    async fn write_match(&self, result: &MatchResult) -> anyhow::Result<()>;

    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Downstream writer persisting graph records.
#[async_trait]
pub trait GraphWriterPort: Send + Sync {
    async fn write_record(&self, record: &GraphRecord) -> anyhow::Result<()>;

    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
