//! Destinations for output rows.

use crate::error::{SyncError, SyncResult};
use crate::row::EnrichedRow;
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Receives rows in join order.
#[async_trait]
pub trait RowSink: Send {
    async fn emit(&mut self, row: &EnrichedRow) -> SyncResult<()>;

    /// Called once after the last row of a run.
    async fn flush(&mut self) -> SyncResult<()> {
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: W,
    lines: usize,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Writes any serializable value as one line.
    pub async fn write_line<T: Serialize + ?Sized>(&mut self, value: &T) -> SyncResult<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|e| SyncError::Sink(format!("write failed: {e}")))?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RowSink for JsonLinesSink<W> {
    async fn emit(&mut self, row: &EnrichedRow) -> SyncResult<()> {
        self.write_line(row).await
    }

    async fn flush(&mut self) -> SyncResult<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| SyncError::Sink(format!("flush failed: {e}")))
    }
}

/// Keeps rows in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<EnrichedRow>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn emit(&mut self, row: &EnrichedRow) -> SyncResult<()> {
        self.rows.push(row.clone());
        Ok(())
    }
}
