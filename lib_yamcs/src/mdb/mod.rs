//! The Mission Database (MDB): the parameter catalog and its one-shot cache.

pub mod cache;
pub mod dictionary;

pub use cache::DictionaryCache;
pub use dictionary::{Dictionary, EngType, ParameterDescriptor};
