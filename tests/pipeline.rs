mod common;

use std::sync::{atomic::AtomicBool, Arc};

use common::{error_page, ids, product_page, MemoryStore, StubFetcher, StubOutcome};
use foodscrape::{
    pipeline::{Pipeline, PipelineError},
    runner::{BatchRunner, RunnerOptions},
    store::StorageError,
    types::{Dataset, Failure, FailureCause},
    uploader::DatasetUploader,
};

macro_rules! aw {
    ($e:expr) => {
        tokio_test::block_on($e)
    };
}

fn quiet_options() -> RunnerOptions {
    RunnerOptions::default_builder()
        .min_delay_ms(0u64)
        .max_delay_ms(0u64)
        .build()
        .unwrap()
}

fn no_terminate() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[test]
fn partial_batch_still_uploads_the_dataset() {
    // "0001" yields a product page, "0002" times out
    let fetcher = StubFetcher::default()
        .with("0001", StubOutcome::Page(product_page("Test Biscuit", "Acme", true)))
        .with("0002", StubOutcome::Timeout);
    let store = MemoryStore::default();
    let pipeline = Pipeline::new(
        BatchRunner::new(fetcher, quiet_options()),
        DatasetUploader::new(store.clone(), "openfoodfacts"),
    );

    let report = aw!(pipeline.run(&ids(&["0001", "0002"]), no_terminate())).unwrap();

    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.fetch_failed, 1);
    assert_eq!(report.summary.extract_failed, 0);

    let objects = store.objects.lock().unwrap();
    let payload = objects
        .get(&report.upload.dataset_key)
        .expect("dataset object written");
    let dataset: Dataset = serde_json::from_slice(payload).unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.records[0].barcode, "0001");
    assert_eq!(dataset.records[0].name.as_deref(), Some("Test Biscuit"));
    assert_eq!(dataset.records[0].brands.as_deref(), Some("Acme"));

    let manifest_key = report.upload.manifest_key.expect("manifest object written");
    let manifest: Vec<Failure> = serde_json::from_slice(objects.get(&manifest_key).unwrap()).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0].identifier, "0002");
    assert_eq!(manifest[0].cause, FailureCause::FetchFailed);
}

#[test]
fn clean_run_skips_the_manifest_object() {
    let fetcher = StubFetcher::default()
        .with("0001", StubOutcome::Page(product_page("Biscuit", "Acme", true)));
    let store = MemoryStore::default();
    let pipeline = Pipeline::new(
        BatchRunner::new(fetcher, quiet_options()),
        DatasetUploader::new(store.clone(), "openfoodfacts"),
    );

    let report = aw!(pipeline.run(&ids(&["0001"]), no_terminate())).unwrap();

    assert!(report.upload.manifest_key.is_none());
    assert!(report.upload.dataset_key.starts_with("openfoodfacts/dataset_"));
    assert_eq!(store.objects.lock().unwrap().len(), 1);
}

#[test]
fn upload_auth_failure_is_fatal_and_writes_nothing() {
    let fetcher = StubFetcher::default()
        .with("0001", StubOutcome::Page(product_page("A", "A", true)))
        .with("0002", StubOutcome::Page(product_page("B", "B", true)))
        .with("0003", StubOutcome::Page(product_page("C", "C", true)));
    let store = MemoryStore {
        auth_failure: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(
        BatchRunner::new(fetcher, quiet_options()),
        DatasetUploader::new(store.clone(), "openfoodfacts"),
    );

    let err = aw!(pipeline.run(&ids(&["0001", "0002", "0003"]), no_terminate())).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Storage(StorageError::Auth(_))
    ));
    assert!(store.objects.lock().unwrap().is_empty());
}

#[test]
fn empty_dataset_is_fatal_before_any_upload() {
    let fetcher = StubFetcher::default()
        .with("0001", StubOutcome::Timeout)
        .with("0002", StubOutcome::Page(error_page()));
    let store = MemoryStore::default();
    let pipeline = Pipeline::new(
        BatchRunner::new(fetcher, quiet_options()),
        DatasetUploader::new(store.clone(), "openfoodfacts"),
    );

    let err = aw!(pipeline.run(&ids(&["0001", "0002"]), no_terminate())).unwrap_err();

    assert!(matches!(err, PipelineError::EmptyDataset));
    assert!(store.objects.lock().unwrap().is_empty());
}
