//! Where the catalog comes from: a local file or an http(s) URL.

use anyhow::{Context, Result, bail};
use rebate_catalog::{LoadedCatalog, load_catalog_file, load_catalog_str};

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub async fn load_catalog(source: &str) -> Result<LoadedCatalog> {
    let loaded = if is_remote(source) {
        let json = fetch(source).await?;
        load_catalog_str(&json, source)?
    } else {
        load_catalog_file(source)?
    };

    for w in &loaded.warnings {
        tracing::debug!(%w, "catalog normalization warning");
    }
    Ok(loaded)
}

async fn fetch(url: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .with_context(|| format!("fetching catalog from {url}"))?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("catalog fetch failed: {status} {txt}");
    }
    resp.text().await.context("reading catalog response body")
}
