use anyhow::Result;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

use crate::app::ports::{GraphWriterPort, RecordSourcePort};
use crate::observability::metrics;
use crate::pipeline::processing::transform::{GraphRecord, RecordTransformer};

/// Use case for turning match results into graph records for the writer
pub struct TransformUseCase {
    transformer: RecordTransformer,
    writer: Box<dyn GraphWriterPort>,
}

impl TransformUseCase {
    pub fn new(writer: Box<dyn GraphWriterPort>) -> Self {
        Self {
            transformer: RecordTransformer::new(),
            writer,
        }
    }

    /// Expand every inferred record and hand the results to the writer in
    /// order. Stops at the first error.
    pub async fn run(&self, inferred: &mut dyn RecordSourcePort<Value>) -> Result<TransformStats> {
        let start_time = Instant::now();
        let mut stats = TransformStats::default();

        // Records handed over before a failure are kept.
        let outcome = self.expand_all(inferred, &mut stats).await;
        self.writer.flush().await?;
        outcome?;

        metrics::transform::duration(start_time.elapsed().as_secs_f64());
        info!(
            "Transform completed: {} objects, {} relations, {} log entries from {} inferred records",
            stats.objects, stats.relations, stats.logs, stats.records_read
        );
        Ok(stats)
    }

    async fn expand_all(
        &self,
        inferred: &mut dyn RecordSourcePort<Value>,
        stats: &mut TransformStats,
    ) -> Result<()> {
        while let Some(value) = inferred.next_record().await? {
            stats.records_read += 1;
            metrics::transform::record_read();

            let records = self.transformer.expand_value(value)?;
            if records.is_empty() {
                stats.dropped += 1;
                metrics::transform::record_dropped();
                continue;
            }

            for record in &records {
                self.writer.write_record(record).await?;
                stats.count(record);
                metrics::transform::graph_record_written(record.kind());
            }
            debug!("wrote {} graph records", records.len());
        }
        Ok(())
    }
}

/// Counters for one transform run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransformStats {
    pub records_read: u64,
    pub dropped: u64,
    pub objects: u64,
    pub relations: u64,
    pub logs: u64,
}

impl TransformStats {
    fn count(&mut self, record: &GraphRecord) {
        match record {
            GraphRecord::Object(_) => self.objects += 1,
            GraphRecord::Relation(_) => self.relations += 1,
            GraphRecord::Log(_) => self.logs += 1,
        }
    }
}
