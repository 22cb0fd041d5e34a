//! Binding to the host framework's extension points.

use std::sync::Arc;

use crate::config::YamcsConfig;
use crate::error::YamcsError;
use crate::live::engine::LiveEngine;
use crate::mdb::cache::DictionaryCache;
use crate::model::TelemetryIdentifier;
use crate::provider::history::HistoryProvider;
use crate::provider::objects::{CompositionProvider, ObjectProvider};
use crate::provider::{NAMESPACE, ROOT_KEY, TELEMETRY_TYPE};
use crate::rest::RestClient;

/// Static metadata registered for the telemetry-point type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: String,
    pub description: String,
    pub css_class: String,
}

/// The host framework's registration surface, as far as the bridge needs
/// it. The host owns object routing, tree expansion, and telemetry request
/// dispatch; the plugin only hands over its providers once at install.
pub trait Host {
    fn add_root(&mut self, identifier: TelemetryIdentifier);
    fn add_type(&mut self, key: &str, definition: TypeDefinition);
    fn add_object_provider(&mut self, namespace: &str, provider: Arc<ObjectProvider>);
    fn add_composition_provider(&mut self, provider: Arc<CompositionProvider>);
    fn add_history_provider(&mut self, provider: Arc<HistoryProvider>);
    fn add_subscribe_provider(&mut self, provider: Arc<LiveEngine>);
}

/// The assembled plugin: one dictionary cache shared by all providers, and
/// the live engine with its push socket already running.
pub struct YamcsPlugin {
    pub objects: Arc<ObjectProvider>,
    pub composition: Arc<CompositionProvider>,
    pub history: Arc<HistoryProvider>,
    pub live: Arc<LiveEngine>,
}

impl YamcsPlugin {
    /// Builds all services and opens the push connection.
    pub fn new(config: &YamcsConfig) -> Result<Self, YamcsError> {
        let rest = Arc::new(RestClient::new(config)?);
        let cache = Arc::new(DictionaryCache::new(Arc::clone(&rest), config.instance()));
        let objects = Arc::new(ObjectProvider::new(Arc::clone(&cache)));
        Ok(Self {
            composition: Arc::new(CompositionProvider::new(Arc::clone(&objects))),
            history: Arc::new(HistoryProvider::new(Arc::clone(&cache), rest)),
            live: LiveEngine::start(config, Arc::clone(&cache)),
            objects,
        })
    }

    /// One-time static registrations plus provider hand-over.
    pub fn install<H: Host>(&self, host: &mut H) {
        host.add_root(TelemetryIdentifier::new(NAMESPACE, ROOT_KEY));
        host.add_type(
            TELEMETRY_TYPE,
            TypeDefinition {
                name: "Yamcs Telemetry Point".to_string(),
                description: "Telemetry point from Yamcs".to_string(),
                css_class: "icon-telemetry".to_string(),
            },
        );
        host.add_object_provider(NAMESPACE, Arc::clone(&self.objects));
        host.add_composition_provider(Arc::clone(&self.composition));
        host.add_history_provider(Arc::clone(&self.history));
        host.add_subscribe_provider(Arc::clone(&self.live));
    }

    /// Plugin teardown: closes the push connection.
    pub fn shutdown(&self) {
        self.live.close();
    }
}
