//! Fetches raw TEI and manifest payloads.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct MarkupLoader {
    http: reqwest::Client,
}

impl MarkupLoader {
    pub fn new() -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| AppError::Internal(err.to_string()))?;
        Ok(Self { http })
    }

    /// Fetch a resource as text. Non-success statuses and transport
    /// failures become fetch errors the orchestrator records per manifest.
    pub async fn fetch_text(&self, url: &str) -> AppResult<String> {
        debug!(url, "fetching");
        let response = self.http.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                AppError::FetchTimeout(url.to_string())
            } else {
                AppError::Fetch {
                    url: url.to_string(),
                    detail: err.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|err| AppError::Fetch {
            url: url.to_string(),
            detail: err.to_string(),
        })
    }

    /// Fetch a TEI payload and strip any DOCTYPE/entity preamble. The
    /// declarations are not needed downstream and may carry external entity
    /// references; nothing here ever resolves an external entity.
    pub async fn fetch_tei(&self, url: &str) -> AppResult<String> {
        let raw = self.fetch_text(url).await?;
        Ok(strip_preamble(&raw))
    }
}

fn doctype_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Covers a bare declaration and one with an internal [ ... ] subset of
    // entity declarations.
    RE.get_or_init(|| {
        Regex::new(r"(?s)<!DOCTYPE[^\[>]*(?:\[[^\]]*\])?[^>]*>\s*").expect("doctype pattern")
    })
}

pub fn strip_preamble(xml: &str) -> String {
    doctype_pattern().replace_all(xml, "").into_owned()
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
