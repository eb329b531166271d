//! Fetching every record of a paginated collection endpoint.
//!
//! Rally collection endpoints answer with a JSON:API document whose `links` carry
//! `first`, `last` and `next` URLs. Page markers have the form `page=<N>p<size>`,
//! e.g. `.../presets?page=3p20`.
//!
//! [`index_path_fast`] reads the page count from the first answer and requests all
//! remaining pages at once; [`index_path`] walks `next` links one request at a time
//! and is kept for endpoints that cannot be started on page one.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use futures::future::try_join_all;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::ApiClient;
use crate::core::RallyError;

static PAGE_MARKER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"page=(\d+)p(\d+)"));

/// One page of a collection endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    /// Raw records on this page
    #[serde(default)]
    pub data: Vec<Value>,
    /// Pagination links
    #[serde(default)]
    pub links: PageLinks,
}

/// Pagination links of a [`Page`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    /// Link to the first page
    #[serde(default)]
    pub first: Option<String>,
    /// Link to the last page; its page marker gives the page count
    #[serde(default)]
    pub last: Option<String>,
    /// Link to the following page, absent on the last page
    #[serde(default)]
    pub next: Option<String>,
}

/// Parse the `page=<N>p<size>` marker of a pagination link.
///
/// Returns `(page number, page size)`.
///
/// # Errors
///
/// Returns [`RallyError::MalformedPagination`] if the link has no page marker.
///
/// ```rust
/// use rally_cli::api::pagination::num_pages;
///
/// let (pages, size) = num_pages("https://x/api/v2/presets?page=7p20").unwrap();
/// assert_eq!((pages, size), (7, 20));
/// assert!(num_pages("https://x/api/v2/presets").is_err());
/// ```
pub fn num_pages(link: &str) -> Result<(u32, u32)> {
    let marker = PAGE_MARKER.as_ref().map_err(Clone::clone)?;
    let malformed = || RallyError::MalformedPagination {
        link: link.to_string(),
    };

    let captures = marker.captures(link).ok_or_else(malformed)?;
    let pages = captures[1].parse().map_err(|_| malformed())?;
    let size = captures[2].parse().map_err(|_| malformed())?;
    Ok((pages, size))
}

/// Rewrite a first-page link so it points at `page`.
///
/// Only the first `page=1p` occurrence is replaced.
#[must_use]
pub fn link_to_page(first: &str, page: u32) -> String {
    first.replacen("page=1p", &format!("page={page}p"), 1)
}

/// Fetch every record of a collection, requesting all pages concurrently.
///
/// `path` must request page one (e.g. `/presets?page=1p20`). The first answer's
/// `last` link gives the page count; pages `2..=N` are then derived from the `first`
/// link and requested together. Records come back in page order regardless of the
/// order the responses arrive in. Local environments are never contacted and give
/// an empty result.
///
/// # Errors
///
/// Fails if any page fails (the whole fetch fails, no partial result is returned),
/// or with [`RallyError::MalformedPagination`] if the first answer has no usable
/// `last` link.
pub async fn index_path_fast(client: &ApiClient, env: &str, path: &str) -> Result<Vec<Value>> {
    if ApiClient::is_local_env(env) {
        return Ok(Vec::new());
    }

    let first: Page = client.get_json(env, path).await?;
    let last = first.links.last.as_deref().ok_or_else(|| RallyError::MalformedPagination {
        link: String::new(),
    })?;
    let (pages, size) = num_pages(last)?;
    debug!("{env} {path}: {pages} pages of {size}");

    let base = first.links.first.as_deref().unwrap_or(path);
    let rest = try_join_all((2..=pages).map(|page| {
        let url = link_to_page(base, page);
        async move {
            let page: Page = client
                .get_json(env, &url)
                .await
                .with_context(|| format!("Failed to fetch page {page} of {path} from {env}"))?;
            Ok::<_, anyhow::Error>(page.data)
        }
    }))
    .await?;

    let mut all = first.data;
    all.extend(rest.into_iter().flatten());
    Ok(all)
}

/// Fetch every record of a collection by following `next` links sequentially.
///
/// # Errors
///
/// Fails if any page fails.
pub async fn index_path(client: &ApiClient, env: &str, path: &str) -> Result<Vec<Value>> {
    if ApiClient::is_local_env(env) {
        return Ok(Vec::new());
    }

    let mut page: Page = client.get_json(env, path).await?;
    let mut all = std::mem::take(&mut page.data);

    while let Some(next) = page.links.next.take() {
        page = client.get_json(env, &next).await?;
        all.append(&mut page.data);
    }

    Ok(all)
}
