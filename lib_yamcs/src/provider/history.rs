//! Historical (archive) retrieval.

use std::sync::Arc;

use crate::error::YamcsError;
use crate::mdb::cache::DictionaryCache;
use crate::model::{decode_eng_value, HistoryRange, TelemetryIdentifier, TelemetryPoint};
use crate::provider::TELEMETRY_TYPE;
use crate::rest::{ArchiveSample, RestClient};

/// Fetches a parameter's archived samples and normalizes them into
/// [`TelemetryPoint`]s.
pub struct HistoryProvider {
    cache: Arc<DictionaryCache>,
    rest: Arc<RestClient>,
}

impl HistoryProvider {
    pub fn new(cache: Arc<DictionaryCache>, rest: Arc<RestClient>) -> Self {
        Self { cache, rest }
    }

    pub fn supports_request(&self, type_key: &str) -> bool {
        type_key == TELEMETRY_TYPE
    }

    /// Resolves the parameter's archive endpoint and decodes the response.
    ///
    /// An archive with no records yields exactly one synthetic "no data
    /// yet" point so the host UI stays populated. Transport errors
    /// propagate unmodified; this layer never retries.
    pub async fn fetch_history(
        &self,
        identifier: &TelemetryIdentifier,
        range: Option<&HistoryRange>,
    ) -> Result<Vec<TelemetryPoint>, YamcsError> {
        let parameter = self.cache.require(&identifier.key).await?;
        let samples = self.rest.archive_samples(&parameter.url, range).await?;
        if samples.is_empty() {
            return Ok(vec![TelemetryPoint::no_data(&identifier.key)]);
        }
        samples.iter().map(decode_sample).collect()
    }
}

/// One archive record, in record order. The engineering value uses the same
/// tagged-union scheme as the live path; a record without a value decodes
/// to a valueless point.
fn decode_sample(sample: &ArchiveSample) -> Result<TelemetryPoint, YamcsError> {
    let value = match &sample.eng_value {
        Some(raw) => Some(decode_eng_value(raw)?),
        None => None,
    };
    Ok(TelemetryPoint {
        id: sample.id.name.clone(),
        timestamp: sample.generation_time.clone(),
        value,
    })
}
