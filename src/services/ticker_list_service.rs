use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::errors::AppError;

/// Parse a newline-delimited ticker list.
///
/// Lines are trimmed, blank lines dropped, and repeated symbols kept only once
/// (first occurrence wins). Case is preserved.
pub fn parse_tickers(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tickers = Vec::new();

    for line in contents.lines() {
        let ticker = line.trim();
        if ticker.is_empty() {
            continue;
        }
        if !seen.insert(ticker.to_string()) {
            warn!("Duplicate ticker {} in list, ignoring", ticker);
            continue;
        }
        tickers.push(ticker.to_string());
    }

    tickers
}

pub async fn load_tickers(path: impl AsRef<Path>) -> Result<Vec<String>, AppError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;
    let tickers = parse_tickers(&contents);
    info!("📄 Loaded {} tickers from {}", tickers.len(), path.display());
    Ok(tickers)
}
