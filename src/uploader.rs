use chrono::Utc;

use crate::{
    store::{ObjectStore, StorageError},
    types::{BatchOutcome, UploadResult},
    utils::DATASET_CONTENT_TYPE,
};

/// Persists a finished batch to object storage: the dataset as one JSON
/// object and, when anything failed, the failure manifest alongside it.
pub struct DatasetUploader<S> {
    store: S,
    key_prefix: String,
}

impl<S: ObjectStore> DatasetUploader<S> {
    pub fn new(store: S, key_prefix: &str) -> Self {
        DatasetUploader {
            store,
            key_prefix: key_prefix.trim_matches('/').to_string(),
        }
    }

    pub async fn upload(&self, outcome: &BatchOutcome) -> Result<UploadResult, StorageError> {
        let ts = Utc::now().format("%Y%m%dT%H%M%SZ");

        let dataset_key = self.object_key(&format!("dataset_{}.json", ts));
        let payload = serde_json::to_vec_pretty(&outcome.dataset)
            .expect("dataset serialization is infallible");
        let bytes = payload.len();

        self.store
            .put(&dataset_key, payload, DATASET_CONTENT_TYPE)
            .await?;

        let manifest_key = if outcome.manifest.is_empty() {
            None
        } else {
            let key = self.object_key(&format!("failures_{}.json", ts));
            let manifest = serde_json::to_vec_pretty(&outcome.manifest)
                .expect("manifest serialization is infallible");
            self.store.put(&key, manifest, DATASET_CONTENT_TYPE).await?;
            Some(key)
        };

        Ok(UploadResult {
            dataset_key,
            manifest_key,
            bytes,
        })
    }

    fn object_key(&self, name: &str) -> String {
        if self.key_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.key_prefix, name)
        }
    }
}
