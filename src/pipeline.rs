// macsio_etl/src/pipeline.rs
// Read → transform → batched write, with a guaranteed sink teardown.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};
use crate::transform::transform_doc;

/// Yields input records one at a time.
#[async_trait]
pub trait RecordSource: Send {
    /// Returns the next record, or `None` once the source is exhausted.
    async fn next_record(&mut self,) -> Result<Option<Document,>,>;

    fn describe(&self,) -> String;
}

/// Persists output records in batches.
#[async_trait]
pub trait RecordSink: Send {
    async fn write_batch(&mut self, batch: Vec<Document,>,) -> Result<(),>;

    /// Called once after every batch has been written, only when the run succeeded.
    async fn commit(&mut self,) -> Result<(),> {
        Ok((),)
    }

    /// Releases whatever the sink holds. Called exactly once per run, on success or
    /// failure.
    async fn close(&mut self,) -> Result<(),> {
        Ok((),)
    }

    fn describe(&self,) -> String;
}

#[derive(Debug, Clone, Copy,)]
pub struct PipelineOptions {
    pub batch_size:   usize,
    /// Log and skip records the transform rejects instead of aborting the run.
    pub skip_invalid: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size:   crate::DEFAULT_BATCH_SIZE,
            skip_invalid: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct RejectedRecord {
    pub record: String,
    pub error:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct RunReport {
    pub records_read:     usize,
    pub records_written:  usize,
    pub records_rejected: usize,
    pub batches_written:  usize,
    pub rejected:         Vec<RejectedRecord,>,
}

impl RunReport {
    pub fn save(&self, path: &std::path::Path,) -> Result<(),> {
        let json = serde_json::to_string_pretty(self,)
            .map_err(|e| EtlError::Other(format!("Failed to serialize run report: {}", e),),)?;
        std::fs::write(path, json,)?;
        info!("Run report saved to {}", path.display());
        Ok((),)
    }
}

pub struct Pipeline<S, K,> {
    source:  S,
    sink:    K,
    options: PipelineOptions,
}

impl<S: RecordSource, K: RecordSink,> Pipeline<S, K,> {
    pub fn new(source: S, sink: K, options: PipelineOptions,) -> Result<Self,> {
        if options.batch_size == 0 {
            return Err(EtlError::ConfigurationError(
                "batch size must be at least 1".to_string(),
            ),);
        }
        Ok(Self { source, sink, options, },)
    }

    /// Drives the source to exhaustion, commits the sink, then closes it.
    ///
    /// The sink is committed only when every record was read and written, and closed
    /// even when the run fails; in that case the run's error is returned and a close
    /// failure is only logged.
    pub async fn run(mut self,) -> Result<RunReport,> {
        info!(
            "Starting pipeline: {} -> {} (batch size {})",
            self.source.describe(),
            self.sink.describe(),
            self.options.batch_size
        );

        let mut report = RunReport::default();
        let mut outcome = self.drive(&mut report,).await;
        if outcome.is_ok() {
            outcome = self.sink.commit().await;
        }
        let closed = self.sink.close().await;

        match (outcome, closed,) {
            (Ok((),), Ok((),),) => {
                info!(
                    "Pipeline finished: {} read, {} written in {} batches, {} rejected",
                    report.records_read,
                    report.records_written,
                    report.batches_written,
                    report.records_rejected
                );
                Ok(report,)
            },
            (Ok((),), Err(e,),) => Err(e,),
            (Err(e,), closed,) => {
                if let Err(close_err,) = closed {
                    warn!(
                        transient = close_err.is_transient(),
                        "Failed to close {}: {}",
                        self.sink.describe(),
                        close_err
                    );
                }
                Err(e,)
            },
        }
    }

    async fn drive(&mut self, report: &mut RunReport,) -> Result<(),> {
        let mut buffer = Vec::with_capacity(self.options.batch_size,);

        while let Some(record,) = self.source.next_record().await? {
            let ordinal = report.records_read;
            report.records_read += 1;

            match transform_doc(&record,) {
                Ok(out,) => buffer.push(out,),
                Err(source,) => {
                    let record = record_label(&record, ordinal,);
                    if !self.options.skip_invalid {
                        return Err(EtlError::RejectedRecord { record, source, },);
                    }
                    warn!("Skipping record {}: {}", record, source);
                    report.records_rejected += 1;
                    report.rejected.push(RejectedRecord {
                        record,
                        error: source.to_string(),
                    },);
                },
            }

            if buffer.len() >= self.options.batch_size {
                self.flush(&mut buffer, report,).await?;
            }
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer, report,).await?;
        }
        Ok((),)
    }

    async fn flush(&mut self, buffer: &mut Vec<Document,>, report: &mut RunReport,) -> Result<(),> {
        let batch = std::mem::replace(buffer, Vec::with_capacity(self.options.batch_size,),);
        let len = batch.len();
        self.sink.write_batch(batch,).await?;
        report.records_written += len;
        report.batches_written += 1;
        debug!("Wrote batch of {} records to {}", len, self.sink.describe());
        Ok((),)
    }
}

/// Names a record for error messages: its `_id` when present, else its position.
pub fn record_label(record: &Document, ordinal: usize,) -> String {
    match record.get("_id",) {
        Some(Bson::String(s,),) => s.clone(),
        Some(Bson::ObjectId(oid,),) => oid.to_hex(),
        Some(other,) => other.to_string(),
        None => format!("#{}", ordinal),
    }
}
