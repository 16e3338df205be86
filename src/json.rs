// macsio_etl/src/json.rs
// JSON-lines output for inspecting reshaped records without a target database.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{EtlError, Result};
use crate::pipeline::RecordSink;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin,>;

/// Writes each record as one relaxed Extended JSON object per line.
///
/// A file target is not created (or truncated) until the first batch arrives or the
/// run commits, so a run that fails before producing output leaves it untouched.
pub struct JsonLinesSink {
    writer: Option<BoxedWriter,>,
    path:   Option<PathBuf,>,
    target: String,
}

impl JsonLinesSink {
    pub fn stdout() -> Self {
        Self::from_writer(tokio::io::stdout(), "stdout",)
    }

    pub fn create(path: &Path,) -> Self {
        Self {
            writer: None,
            path:   Some(path.to_path_buf(),),
            target: path.display().to_string(),
        }
    }

    pub fn from_writer(writer: impl AsyncWrite + Send + Unpin + 'static, target: &str,) -> Self {
        Self {
            writer: Some(Box::new(writer,),),
            path:   None,
            target: target.to_string(),
        }
    }

    async fn writer(&mut self,) -> Result<&mut BoxedWriter,> {
        if self.writer.is_none() {
            if let Some(path,) = &self.path {
                let file = tokio::fs::File::create(path,).await.map_err(|e| {
                    EtlError::SinkError(format!(
                        "Failed to create output file {}: {}",
                        path.display(),
                        e
                    ),)
                },)?;
                self.writer = Some(Box::new(tokio::io::BufWriter::new(file,),),);
            }
        }
        self.writer
            .as_mut()
            .ok_or_else(|| EtlError::SinkError(format!("No writer for {}", self.target),),)
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn write_batch(&mut self, batch: Vec<Document,>,) -> Result<(),> {
        let mut lines = String::new();
        for record in batch {
            let value = Bson::Document(record,).into_relaxed_extjson();
            let line = serde_json::to_string(&value,)
                .map_err(|e| EtlError::SinkError(format!("Failed to encode record: {}", e),),)?;
            lines.push_str(&line,);
            lines.push('\n',);
        }
        let target = self.target.clone();
        self.writer()
            .await?
            .write_all(lines.as_bytes(),)
            .await
            .map_err(|e| EtlError::SinkError(format!("Failed to write to {}: {}", target, e),),)
    }

    // An empty successful run still leaves an empty output file behind.
    async fn commit(&mut self,) -> Result<(),> {
        self.writer().await?;
        Ok((),)
    }

    async fn close(&mut self,) -> Result<(),> {
        if let Some(writer,) = self.writer.as_mut() {
            writer.flush().await?;
        }
        Ok((),)
    }

    fn describe(&self,) -> String {
        format!("json lines {}", self.target)
    }
}
