//! Identifier resolution and folder expansion.

use std::sync::Arc;

use serde::Serialize;

use crate::error::YamcsError;
use crate::mdb::cache::DictionaryCache;
use crate::mdb::dictionary::EngType;
use crate::model::TelemetryIdentifier;
use crate::provider::{FOLDER_TYPE, NAMESPACE, ROOT_KEY, TELEMETRY_TYPE};

/// Display format of one value field on a telemetry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    Enum,
    Float,
    Integer,
    Boolean,
    Utc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumerationEntry {
    pub string: String,
    pub value: i64,
}

/// Rendering hints the host understands: `range` marks the plottable value
/// field, `domain` the time axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValueHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<u32>,
}

/// One value field in a telemetry-point descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueDescriptor {
    pub key: String,
    pub name: String,
    pub format: ValueFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enumerations: Vec<EnumerationEntry>,
    pub hints: ValueHints,
}

/// What an identifier resolves to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectDescriptor {
    Folder {
        identifier: SerializableIdentifier,
        name: String,
        #[serde(rename = "type")]
        type_key: String,
        location: String,
    },
    TelemetryPoint {
        identifier: SerializableIdentifier,
        name: String,
        #[serde(rename = "type")]
        type_key: String,
        values: Vec<ValueDescriptor>,
        location: String,
    },
}

/// Identifier in the host's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializableIdentifier {
    pub namespace: String,
    pub key: String,
}

impl From<&TelemetryIdentifier> for SerializableIdentifier {
    fn from(identifier: &TelemetryIdentifier) -> Self {
        Self {
            namespace: identifier.namespace.clone(),
            key: identifier.key.clone(),
        }
    }
}

/// Resolves host identifiers to object descriptors.
pub struct ObjectProvider {
    cache: Arc<DictionaryCache>,
}

impl ObjectProvider {
    pub fn new(cache: Arc<DictionaryCache>) -> Self {
        Self { cache }
    }

    /// Builds the descriptor for one identifier.
    ///
    /// The root key resolves to a folder without touching the dictionary.
    /// Any other key must match a dictionary entry by exact name or the
    /// call is rejected with [`YamcsError::ParameterNotFound`].
    pub async fn describe(
        &self,
        identifier: &TelemetryIdentifier,
    ) -> Result<ObjectDescriptor, YamcsError> {
        if identifier.key == ROOT_KEY {
            return Ok(ObjectDescriptor::Folder {
                identifier: identifier.into(),
                name: "Yamcs".to_string(),
                type_key: FOLDER_TYPE.to_string(),
                location: "ROOT".to_string(),
            });
        }

        let parameter = self.cache.require(&identifier.key).await?;
        Ok(ObjectDescriptor::TelemetryPoint {
            identifier: identifier.into(),
            name: identifier.key.clone(),
            type_key: TELEMETRY_TYPE.to_string(),
            values: vec![
                value_descriptor(parameter.eng_type.as_ref()),
                timestamp_descriptor(),
            ],
            location: format!("{NAMESPACE}:{ROOT_KEY}"),
        })
    }

    /// One child identifier per dictionary entry, in dictionary order.
    pub async fn enumerate(&self) -> Result<Vec<TelemetryIdentifier>, YamcsError> {
        let dictionary = self.cache.load().await?;
        Ok(dictionary
            .iter()
            .map(|p| TelemetryIdentifier::new(NAMESPACE, p.name.clone()))
            .collect())
    }
}

/// Expands the root folder into its children for the host's tree view.
pub struct CompositionProvider {
    objects: Arc<ObjectProvider>,
}

impl CompositionProvider {
    pub fn new(objects: Arc<ObjectProvider>) -> Self {
        Self { objects }
    }

    pub fn applies_to(&self, identifier: &TelemetryIdentifier, type_key: &str) -> bool {
        identifier.namespace == NAMESPACE && type_key == FOLDER_TYPE
    }

    pub async fn load(&self) -> Result<Vec<TelemetryIdentifier>, YamcsError> {
        self.objects.enumerate().await
    }
}

/// The primary value field. Its format follows a fixed mapping from the
/// engineering type; this telemetry source models boolean/string states as
/// ENABLED/DISABLED, so enum-formatted fields carry that two-entry table.
fn value_descriptor(eng_type: Option<&EngType>) -> ValueDescriptor {
    let format = match eng_type {
        Some(EngType::Float) => ValueFormat::Float,
        Some(EngType::Integer) => ValueFormat::Integer,
        Some(EngType::Boolean) => ValueFormat::Boolean,
        Some(EngType::Enumeration) | Some(EngType::Text) => ValueFormat::Enum,
        // Anything else, including an absent type block, displays as enum.
        _ => ValueFormat::Enum,
    };
    let enumerations = if format == ValueFormat::Enum {
        vec![
            EnumerationEntry {
                string: "ENABLED".to_string(),
                value: 1,
            },
            EnumerationEntry {
                string: "DISABLED".to_string(),
                value: 0,
            },
        ]
    } else {
        Vec::new()
    };
    ValueDescriptor {
        key: "value".to_string(),
        name: "Value".to_string(),
        format,
        source: None,
        enumerations,
        hints: ValueHints {
            range: Some(1),
            domain: None,
        },
    }
}

/// The fixed secondary time field.
fn timestamp_descriptor() -> ValueDescriptor {
    ValueDescriptor {
        key: "utc".to_string(),
        name: "Timestamp".to_string(),
        format: ValueFormat::Utc,
        source: Some("timestamp".to_string()),
        enumerations: Vec::new(),
        hints: ValueHints {
            range: None,
            domain: Some(1),
        },
    }
}
