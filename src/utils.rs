use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use rand::Rng;

pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org";
pub const DATASET_CONTENT_TYPE: &str = "application/json";

lazy_static! {
    pub static ref USER_AGENT: String = {
        match std::env::var("OPENFOODFACTS_USER_AGENT") {
            Ok(ua) if !ua.is_empty() => ua,
            _ => format!("foodscrape/{}", env!("CARGO_PKG_VERSION")),
        }
    };
}

pub fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(min.as_millis() as u64..=max.as_millis() as u64))
}

/// File name for a page kept for offline inspection, deterministic per identifier.
pub fn debug_page_path(dir: &Path, identifier: &str) -> PathBuf {
    dir.join(format!("debug_{}.html", sanitize_identifier(identifier)))
}

/// File name for a page that failed extraction.
pub fn error_page_path(dir: &Path, identifier: &str) -> PathBuf {
    dir.join(format!("error_{}.html", sanitize_identifier(identifier)))
}

// identifiers come from external lists; keep file names shell-safe
fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
