use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::normalize::{collapse_transaction, sort_events};
use super::types::{PageFile, RawTransaction};
use super::{EventSource, SourceError};
use crate::event_source::SwapEvent;

/// Reads a directory of JSON page files, auto-detects pagination direction,
/// filters to `[start, end]`, collapses flash-repay pairs, and yields events
/// in ascending `(timestamp_ms, digest, seq)` order.
///
/// Page files are read in full (one at a time) rather than streamed, since
/// auto-detection needs each file's first and last transaction timestamp
/// before the iteration order for that file is known; this is the pragmatic
/// reading of the contract for directories of bounded backtest fixtures.
pub struct FileEventSource {
    buffer: VecDeque<SwapEvent>,
}

impl FileEventSource {
    pub async fn new(
        dir: impl AsRef<Path>,
        pool_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let mut filenames = Self::list_files(dir).await?;
        filenames.sort();

        let mut files: Vec<(PathBuf, Vec<RawTransaction>)> = Vec::with_capacity(filenames.len());
        for path in filenames {
            match Self::read_page(&path).await {
                Ok(txs) => files.push((path, txs)),
                Err(reason) => {
                    tracing::warn!(file = %path.display(), %reason, "skipping unparseable page file");
                }
            }
        }

        if files.len() > 1 {
            let first_ts = files.first().and_then(|(_, txs)| txs.first()).map(|t| t.timestamp_ms);
            let last_ts = files.last().and_then(|(_, txs)| txs.first()).map(|t| t.timestamp_ms);
            if let (Some(first_ts), Some(last_ts)) = (first_ts, last_ts) {
                if first_ts > last_ts {
                    files.reverse();
                }
            }
        }

        let mut buffer = Vec::new();
        'outer: for (_, mut txs) in files {
            if let (Some(first), Some(last)) = (txs.first(), txs.last()) {
                if first.timestamp_ms > last.timestamp_ms {
                    txs.reverse();
                }
            }
            for tx in &txs {
                if tx.timestamp_ms < start {
                    continue;
                }
                if tx.timestamp_ms > end {
                    break 'outer;
                }
                buffer.extend(collapse_transaction(tx, pool_id));
            }
        }

        sort_events(&mut buffer);
        Ok(Self {
            buffer: buffer.into(),
        })
    }

    async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let mut read_dir = tokio::fs::read_dir(dir).await.map_err(|_| {
            SourceError::MissingDirectory(dir.display().to_string())
        })?;
        let mut out = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| SourceError::Store(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                out.push(path);
            }
        }
        Ok(out)
    }

    async fn read_page(path: &Path) -> Result<Vec<RawTransaction>, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| e.to_string())?;
        let page: PageFile = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
        Ok(page.data)
    }
}

#[async_trait]
impl EventSource for FileEventSource {
    async fn next_event(&mut self) -> Result<Option<SwapEvent>, SourceError> {
        Ok(self.buffer.pop_front())
    }
}
