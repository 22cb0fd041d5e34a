//! Thin async client for the Yamcs REST surface.
//!
//! Two endpoints matter to the bridge: the MDB parameter catalog and the
//! per-parameter archive. Both are plain JSON GETs over `reqwest`; no retry
//! is layered here (the archive contract forbids it, and a failed catalog
//! load poisons its cache anyway).

use serde::Deserialize;
use url::Url;

use crate::config::YamcsConfig;
use crate::error::YamcsError;
use crate::mdb::dictionary::{MdbParameter, MdbResponse};
use crate::model::{HistoryRange, RawEngValue};

/// Wire form of the archive endpoint: `{"parameter":[...]}` or `{}` when no
/// data exists yet.
#[derive(Debug, Deserialize)]
pub struct ArchiveResponse {
    #[serde(default)]
    pub parameter: Vec<ArchiveSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSample {
    pub id: ArchiveSampleId,
    #[serde(rename = "generationTime")]
    pub generation_time: Option<String>,
    #[serde(rename = "engValue")]
    pub eng_value: Option<RawEngValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSampleId {
    pub name: String,
}

pub struct RestClient {
    http: reqwest::Client,
    base: Url,
}

impl RestClient {
    pub fn new(config: &YamcsConfig) -> Result<Self, YamcsError> {
        Self::with_base(&config.http_base())
    }

    pub fn with_base(base: &str) -> Result<Self, YamcsError> {
        let base = Url::parse(base)
            .map_err(|e| YamcsError::DictionaryLoad(format!("invalid base url `{base}`: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// `GET /api/mdb/{instance}/parameters`.
    pub async fn mdb_parameters(&self, instance: &str) -> Result<Vec<MdbParameter>, YamcsError> {
        let load_err = |e: &dyn std::fmt::Display| YamcsError::DictionaryLoad(e.to_string());
        let url = self
            .base
            .join(&format!("api/mdb/{instance}/parameters"))
            .map_err(|e| load_err(&e))?;
        log::debug!("Fetching parameter dictionary from {url}");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| load_err(&e))?
            .error_for_status()
            .map_err(|e| load_err(&e))?;
        let body: MdbResponse = response.json().await.map_err(|e| load_err(&e))?;
        Ok(body.parameter)
    }

    /// GETs a parameter's archive endpoint, derived from its MDB URL by
    /// swapping the `mdb` path segment for `archive`.
    pub async fn archive_samples(
        &self,
        parameter_url: &str,
        range: Option<&HistoryRange>,
    ) -> Result<Vec<ArchiveSample>, YamcsError> {
        let fetch_err = |e: &dyn std::fmt::Display| YamcsError::HistoricalFetch(e.to_string());
        let target = archive_endpoint(parameter_url);
        let url = match Url::parse(&target) {
            Ok(url) => url,
            // The MDB may hand back a server-relative URL.
            Err(_) => self
                .base
                .join(target.trim_start_matches('/'))
                .map_err(|e| fetch_err(&e))?,
        };
        let mut request = self.http.get(url);
        if let Some(range) = range {
            if let Some(start) = &range.start {
                request = request.query(&[("start", start.to_rfc3339())]);
            }
            if let Some(stop) = &range.stop {
                request = request.query(&[("stop", stop.to_rfc3339())]);
            }
        }
        let response = request
            .send()
            .await
            .map_err(|e| fetch_err(&e))?
            .error_for_status()
            .map_err(|e| fetch_err(&e))?;
        let body: ArchiveResponse = response.json().await.map_err(|e| fetch_err(&e))?;
        Ok(body.parameter)
    }
}

/// `.../api/mdb/simulator/parameters/X` → `.../api/archive/simulator/parameters/X`.
fn archive_endpoint(parameter_url: &str) -> String {
    parameter_url.replacen("/mdb/", "/archive/", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_endpoint_swaps_only_the_path_segment() {
        assert_eq!(
            archive_endpoint("http://localhost:8090/api/mdb/simulator/parameters/YSS/A"),
            "http://localhost:8090/api/archive/simulator/parameters/YSS/A"
        );
        // Only the first occurrence is a path segment.
        assert_eq!(
            archive_endpoint("/api/mdb/sim/parameters/mdb_counter"),
            "/api/archive/sim/parameters/mdb_counter"
        );
    }

    #[test]
    fn empty_archive_body_decodes_to_no_samples() {
        let body: ArchiveResponse = serde_json::from_str("{}").unwrap();
        assert!(body.parameter.is_empty());
    }
}
