

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::models::{ChunkMetadata, ChunkRecord};
use crate::db::store::{ChunkStore, StoreError};
use crate::utils::with_deadline;


/// Fetches the leading chunks of named documents, skipping front matter.
///
/// Failures are absorbed per document: a file whose query fails is logged and
/// left out, as is a file with no chunks at or past the position floor.
pub struct ChunkFetcher {
    store: Arc<dyn ChunkStore>,
    extension: String,
    min_position: i64,
    deadline: Option<Duration>,
}

impl ChunkFetcher {

    pub fn new(store: Arc<dyn ChunkStore>, extension: impl Into<String>, min_position: i64) -> Self {
        let extension = extension.into();
        info!("Initializing ChunkFetcher: extension={}, min_position={}", extension, min_position);
        Self {
            store,
            extension,
            min_position,
            deadline: None,
        }
    }


    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// `ROSE` becomes `ROSE.pdf`; `ROSE.pdf` is unchanged.
    pub fn normalize_filename(&self, filename: &str) -> String {
        if filename.ends_with(&self.extension) {
            filename.to_string()
        } else {
            format!("{}{}", filename, self.extension)
        }
    }


    pub async fn fetch(&self, filenames: &[String], first_k: usize) -> Vec<ChunkRecord> {
        let mut records = Vec::with_capacity(filenames.len());
        if first_k == 0 {
            return records;
        }

        for filename in filenames {
            let normalized = self.normalize_filename(filename);

            let chunks = match with_deadline(
                self.deadline,
                self.store.chunks(&normalized, self.min_position, first_k),
                |limit| StoreError::Unavailable(format!("timed out after {}ms", limit.as_millis())),
            )
            .await
            {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!("Error processing {}: {}", normalized, e);
                    continue;
                }
            };

            let mut chunks: Vec<_> = chunks.into_iter().filter(|c| c.position >= self.min_position).collect();
            chunks.sort_by_key(|c| c.position);
            chunks.truncate(first_k);

            if chunks.is_empty() {
                debug!("No chunks at or past position {} for {}", self.min_position, normalized);
                continue;
            }

            let mut record = ChunkRecord {
                filename: normalized
                    .strip_suffix(self.extension.as_str())
                    .unwrap_or(&normalized)
                    .to_string(),
                chunk_text: Vec::with_capacity(chunks.len()),
                metadata: ChunkMetadata::default(),
            };
            for chunk in chunks {
                record.chunk_text.push(chunk.text);
                record.metadata.positions.push(chunk.position);
                record.metadata.pages.push(chunk.page);
            }

            debug!("Fetched {} chunks for {}", record.chunk_text.len(), record.filename);
            records.push(record);
        }

        info!("Fetched chunks for {}/{} documents", records.len(), filenames.len());
        records
    }
}
