use std::sync::{atomic::AtomicBool, Arc};

use thiserror::Error;

use crate::{
    fetcher::FetchPage,
    runner::BatchRunner,
    store::{ObjectStore, StorageError},
    types::{RunSummary, UploadResult},
    uploader::DatasetUploader,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The batch produced zero records, nothing to upload.
    #[error("batch produced an empty dataset")]
    EmptyDataset,
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug)]
pub struct PipelineReport {
    pub summary: RunSummary,
    pub upload: UploadResult,
}

/// Sequences the two phases: scrape the batch, then upload whatever dataset
/// came out of it. Per-identifier failures are accepted; only an empty
/// dataset or a storage failure is fatal.
pub struct Pipeline<F, S> {
    runner: BatchRunner<F>,
    uploader: DatasetUploader<S>,
}

impl<F: FetchPage, S: ObjectStore> Pipeline<F, S> {
    pub fn new(runner: BatchRunner<F>, uploader: DatasetUploader<S>) -> Self {
        Pipeline { runner, uploader }
    }

    pub async fn run(
        &self,
        identifiers: &[String],
        should_terminate: Arc<AtomicBool>,
    ) -> Result<PipelineReport, PipelineError> {
        let outcome = self.runner.run(identifiers, should_terminate).await;
        let summary = outcome.summary();

        if !outcome.manifest.is_empty() {
            // partial success is an accepted outcome, the run proceeds
            info!(
                "{} identifiers failed, uploading the {} that succeeded",
                outcome.manifest.len(),
                outcome.dataset.len()
            );
        }

        if outcome.dataset.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let upload = self.uploader.upload(&outcome).await?;
        info!(
            "run complete: {} ({} bytes at {})",
            summary, upload.bytes, upload.dataset_key
        );

        Ok(PipelineReport { summary, upload })
    }
}
