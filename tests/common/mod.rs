#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
    time::Duration,
};

use foodscrape::{
    fetcher::{FetchError, FetchPage},
    store::{ObjectStore, StorageError},
    types::RawPage,
};

#[derive(Debug, Clone)]
pub enum StubOutcome {
    Page(String),
    Timeout,
    Status(u16),
}

/// Canned pages keyed by identifier; unknown identifiers get a 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, StubOutcome>,
}

impl StubFetcher {
    pub fn with(mut self, identifier: &str, outcome: StubOutcome) -> Self {
        self.pages.insert(identifier.to_string(), outcome);
        self
    }
}

impl FetchPage for StubFetcher {
    async fn fetch_page(&self, identifier: &str) -> Result<RawPage, FetchError> {
        match self.pages.get(identifier) {
            Some(StubOutcome::Page(body)) => Ok(RawPage {
                identifier: identifier.to_string(),
                status: 200,
                body: body.clone(),
            }),
            Some(StubOutcome::Timeout) => Err(FetchError::Timeout(Duration::from_secs(5))),
            Some(StubOutcome::Status(status)) => Err(FetchError::Status {
                status: *status,
                url: format!("stub://product/{identifier}"),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: format!("stub://product/{identifier}"),
            }),
        }
    }
}

/// In-memory object store; cloning shares the underlying map so tests can
/// inspect what the pipeline wrote.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    pub auth_failure: bool,
}

impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _: &str) -> Result<(), StorageError> {
        if self.auth_failure {
            return Err(StorageError::Auth("InvalidAccessKeyId".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes);
        Ok(())
    }
}

pub fn product_page(name: &str, brand: &str, with_nutrition: bool) -> String {
    let nutrition = if with_nutrition {
        r#"<table aria-label="Nutrition facts">
             <tr><td>Energy</td><td>2,252 kj</td></tr>
             <tr><td>Fat</td><td>25,5 g</td></tr>
           </table>"#
    } else {
        ""
    };
    format!(
        r#"<html><body>
             <h1 property="food:name">{name}</h1>
             <span id="field_brands_value">{brand}</span>
             <span id="field_categories_value">Snacks</span>
             {nutrition}
           </body></html>"#
    )
}

pub fn error_page() -> String {
    "<html><body><p>This product does not exist.</p></body></html>".to_string()
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
