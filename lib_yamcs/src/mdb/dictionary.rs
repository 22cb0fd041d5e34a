//! The in-memory parameter catalog.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::YamcsError;

/// Engineering type of a parameter as reported by the MDB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngType {
    Uint32,
    Sint64,
    Float,
    Integer,
    Boolean,
    Enumeration,
    Text,
    Other(String),
}

impl EngType {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "uint32" => EngType::Uint32,
            "sint64" => EngType::Sint64,
            "float" => EngType::Float,
            "integer" => EngType::Integer,
            "boolean" => EngType::Boolean,
            "enumeration" => EngType::Enumeration,
            "string" => EngType::Text,
            other => EngType::Other(other.to_string()),
        }
    }
}

/// One catalog entry. Immutable once loaded; owned by the [`Dictionary`] and
/// only ever handed out by clone or reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    /// Short display name, unique within the dictionary.
    pub name: String,
    /// Fully-namespaced name used on the push channel.
    pub qualified_name: String,
    /// Engineering type; `None` when the MDB omits the type block.
    pub eng_type: Option<EngType>,
    /// Per-parameter MDB URL; swapping the `mdb` path segment for `archive`
    /// yields the historical retrieval endpoint.
    pub url: String,
}

/// Wire form of `GET /api/mdb/{instance}/parameters`.
#[derive(Debug, Deserialize)]
pub struct MdbResponse {
    #[serde(default)]
    pub parameter: Vec<MdbParameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MdbParameter {
    pub name: String,
    #[serde(rename = "qualifiedName")]
    pub qualified_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type")]
    pub parameter_type: Option<MdbParameterType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MdbParameterType {
    #[serde(rename = "engType")]
    pub eng_type: Option<String>,
}

/// Ordered parameter catalog, unique by short name, with an index for
/// by-name resolution.
#[derive(Debug, Default)]
pub struct Dictionary {
    entries: Vec<ParameterDescriptor>,
    by_name: HashMap<String, usize>,
}

impl Dictionary {
    /// Builds the catalog from the REST payload, preserving server order.
    /// On a duplicate name the first entry wins.
    pub fn from_parameters(parameters: Vec<MdbParameter>) -> Self {
        let mut dict = Dictionary::default();
        for p in parameters {
            if dict.by_name.contains_key(&p.name) {
                log::warn!("Duplicate parameter name `{}` in MDB response, keeping the first", p.name);
                continue;
            }
            let descriptor = ParameterDescriptor {
                qualified_name: p.qualified_name,
                eng_type: p
                    .parameter_type
                    .and_then(|t| t.eng_type)
                    .map(|tag| EngType::parse(&tag)),
                url: p.url,
                name: p.name,
            };
            dict.by_name.insert(descriptor.name.clone(), dict.entries.len());
            dict.entries.push(descriptor);
        }
        dict
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn require(&self, name: &str) -> Result<&ParameterDescriptor, YamcsError> {
        self.get(name)
            .ok_or_else(|| YamcsError::ParameterNotFound(name.to_string()))
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
