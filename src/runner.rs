use std::{
    fs,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::StreamExt;
use tokio::time::sleep;

use crate::{
    config::{DebugHtmlConfig, DebugHtmlMode},
    extractor::extract_product,
    fetcher::FetchPage,
    types::{BatchOutcome, Failure, FailureCause, ProductRecord, RawPage},
    utils::{debug_page_path, error_page_path, jitter},
};

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct RunnerOptions {
    /// Concurrent fetches; 1 keeps the run strictly sequential.
    #[builder(default = "1")]
    concurrency: usize,
    // politeness window between successive requests, per worker
    #[builder(default = "500")]
    min_delay_ms: u64,
    #[builder(default = "1500")]
    max_delay_ms: u64,
    /// Stop issuing fetches after this many identifiers.
    #[builder(default = "None")]
    max_products: Option<usize>,
    #[builder(default)]
    debug_html: DebugHtmlConfig,
}

impl RunnerOptions {
    pub fn default_builder() -> RunnerOptionsBuilder {
        RunnerOptionsBuilder::default()
    }
}

/// Walks an identifier list through fetch and extraction. A failed identifier
/// is logged and recorded in the manifest; it never aborts the batch.
pub struct BatchRunner<F> {
    fetcher: F,
    options: RunnerOptions,
}

impl<F: FetchPage> BatchRunner<F> {
    pub fn new(fetcher: F, options: RunnerOptions) -> Self {
        BatchRunner { fetcher, options }
    }

    pub async fn run(
        &self,
        identifiers: &[String],
        should_terminate: Arc<AtomicBool>,
    ) -> BatchOutcome {
        let mut ids = dedupe(identifiers);
        if let Some(max) = self.options.max_products {
            ids.truncate(max);
        }
        let total = ids.len();

        if self.options.debug_html.mode != DebugHtmlMode::Off {
            if let Err(e) = fs::create_dir_all(&self.options.debug_html.dir) {
                warn!(
                    "could not create debug dir {:?}: {}",
                    self.options.debug_html.dir, e
                );
            }
        }

        info!(
            "starting batch of {} identifiers with concurrency {}",
            total, self.options.concurrency
        );

        // results are keyed by input index so the dataset order is
        // deterministic regardless of fetch interleaving
        let mut results = futures::stream::iter(ids.iter().enumerate())
            .map(|(index, identifier)| {
                let should_terminate = should_terminate.clone();
                async move {
                    if should_terminate.load(Ordering::Relaxed) {
                        debug!("termination requested, skipping {}", identifier);
                        return (index, None);
                    }
                    sleep(jitter(
                        Duration::from_millis(self.options.min_delay_ms),
                        Duration::from_millis(self.options.max_delay_ms),
                    ))
                    .await;
                    debug!("processing {}/{} – {}", index + 1, total, identifier);
                    (index, Some(self.process_one(identifier).await))
                }
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        results.sort_by_key(|(index, _)| *index);

        let mut outcome = BatchOutcome::default();
        for (_, result) in results {
            match result {
                Some(Ok(record)) => outcome.dataset.records.push(record),
                Some(Err(failure)) => {
                    warn!(
                        "{}: {} ({})",
                        failure.identifier, failure.cause, failure.detail
                    );
                    outcome.manifest.push(failure);
                }
                // not issued before termination, neither dataset nor manifest
                None => {}
            }
        }

        info!("batch finished: {}", outcome.summary());
        outcome
    }

    async fn process_one(&self, identifier: &str) -> Result<ProductRecord, Failure> {
        let page = match self.fetcher.fetch_page(identifier).await {
            Ok(page) => page,
            Err(e) => {
                return Err(Failure {
                    identifier: identifier.to_string(),
                    cause: FailureCause::FetchFailed,
                    detail: e.to_string(),
                })
            }
        };

        if self.options.debug_html.mode == DebugHtmlMode::Always {
            self.persist_page(&page, false);
        }

        match extract_product(&page) {
            Ok(record) => Ok(record),
            Err(e) => {
                if self.options.debug_html.mode != DebugHtmlMode::Off {
                    self.persist_page(&page, true);
                }
                Err(Failure {
                    identifier: identifier.to_string(),
                    cause: FailureCause::ExtractFailed,
                    detail: e.to_string(),
                })
            }
        }
    }

    // best-effort, an io error never affects the record outcome
    fn persist_page(&self, page: &RawPage, failed: bool) {
        let dir = &self.options.debug_html.dir;
        let path = if failed {
            error_page_path(dir, &page.identifier)
        } else {
            debug_page_path(dir, &page.identifier)
        };
        if let Err(e) = fs::write(&path, &page.body) {
            warn!("could not persist page for {} at {:?}: {}", page.identifier, path, e);
        }
    }
}

/// First occurrence wins, so the dataset can never hold two records for the
/// same identifier.
fn dedupe(identifiers: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    identifiers
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
