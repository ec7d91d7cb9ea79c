use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};

use crate::utils::{DEFAULT_BASE_URL, USER_AGENT};

/// Parameters for page fetching. Built once and injected into the fetcher so
/// the scraping core never reads ambient process state.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            base_url: DEFAULT_BASE_URL.into(),
            user_agent: USER_AGENT.clone(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ScrapeConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("OFF_BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        ScrapeConfig {
            base_url,
            ..Default::default()
        }
    }
}

/// Destination bucket and key prefix for the uploader. Region and credentials
/// are resolved by the AWS SDK from the environment.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: Option<String>,
    pub key_prefix: String,
}

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bucket = std::env::var("S3_BUCKET").context("S3_BUCKET is not set")?;
        if bucket.is_empty() {
            return Err(anyhow!("S3_BUCKET is empty"));
        }
        let region = std::env::var("AWS_REGION").ok().filter(|s| !s.is_empty());
        let key_prefix = std::env::var("S3_KEY_PREFIX")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "openfoodfacts".into());
        Ok(StorageConfig {
            bucket,
            region,
            key_prefix,
        })
    }
}

/// Debug-HTML persistence policy. The original tooling was ambiguous about
/// when pages were dumped, so the policy is an explicit toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DebugHtmlMode {
    #[default]
    Off,
    /// Keep only pages whose extraction failed.
    OnFailure,
    /// Keep every fetched page.
    Always,
}

#[derive(Debug, Clone)]
pub struct DebugHtmlConfig {
    pub mode: DebugHtmlMode,
    pub dir: PathBuf,
}

impl Default for DebugHtmlConfig {
    fn default() -> Self {
        DebugHtmlConfig {
            mode: DebugHtmlMode::Off,
            dir: PathBuf::from("debug_html"),
        }
    }
}
