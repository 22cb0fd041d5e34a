//! Single-flight, memoizing catalog loader.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::YamcsError;
use crate::mdb::dictionary::{Dictionary, ParameterDescriptor};
use crate::rest::RestClient;

/// Loads the parameter catalog at most once per instance.
///
/// The first caller of [`load`](Self::load) triggers the REST fetch; every
/// concurrent or later caller awaits the same in-flight future and then
/// observes the same settled result. A failed load is memoized too: this
/// instance stays poisoned and the owner must construct a fresh cache to
/// retry.
pub struct DictionaryCache {
    source: Option<(Arc<RestClient>, String)>,
    cell: OnceCell<Result<Arc<Dictionary>, YamcsError>>,
}

impl DictionaryCache {
    /// A cache that fetches `/api/mdb/{instance}/parameters` on first use.
    pub fn new(rest: Arc<RestClient>, instance: impl Into<String>) -> Self {
        Self {
            source: Some((rest, instance.into())),
            cell: OnceCell::new(),
        }
    }

    /// A cache pre-settled with a known catalog. No network is ever touched.
    pub fn preloaded(dictionary: Dictionary) -> Self {
        Self {
            source: None,
            cell: OnceCell::new_with(Some(Ok(Arc::new(dictionary)))),
        }
    }

    /// Get-or-load. Idempotent: one underlying fetch regardless of call
    /// count or concurrency.
    pub async fn load(&self) -> Result<Arc<Dictionary>, YamcsError> {
        self.cell
            .get_or_init(|| async {
                match &self.source {
                    Some((rest, instance)) => {
                        let parameters = rest.mdb_parameters(instance).await?;
                        let dictionary = Dictionary::from_parameters(parameters);
                        log::info!("Loaded parameter dictionary: {} entries", dictionary.len());
                        Ok(Arc::new(dictionary))
                    }
                    // `preloaded` always settles the cell up front.
                    None => Ok(Arc::new(Dictionary::default())),
                }
            })
            .await
            .clone()
    }

    /// Resolves one entry by short name, loading the catalog if needed.
    pub async fn require(&self, name: &str) -> Result<ParameterDescriptor, YamcsError> {
        let dictionary = self.load().await?;
        dictionary.require(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdb::dictionary::MdbResponse;

    fn sample_dictionary() -> Dictionary {
        let response: MdbResponse = serde_json::from_str(
            r#"{"parameter":[{"name":"Alpha","qualifiedName":"/YSS/Alpha","url":"u"}]}"#,
        )
        .unwrap();
        Dictionary::from_parameters(response.parameter)
    }

    #[tokio::test]
    async fn preloaded_cache_resolves_without_network() {
        let cache = DictionaryCache::preloaded(sample_dictionary());
        let dict = cache.load().await.unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(cache.require("Alpha").await.unwrap().qualified_name, "/YSS/Alpha");
        assert_eq!(
            cache.require("Beta").await.unwrap_err(),
            YamcsError::ParameterNotFound("Beta".to_string())
        );
    }
}
