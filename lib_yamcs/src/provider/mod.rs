//! Provider implementations for the host framework's extension points.

pub mod history;
pub mod objects;

/// Namespace all bridge identifiers live under.
pub const NAMESPACE: &str = "yamcs.instance";
/// Key of the provider's root folder.
pub const ROOT_KEY: &str = "parameters";
/// Type key registered for telemetry points.
pub const TELEMETRY_TYPE: &str = "yamcs.telemetry";
/// Type key the host assigns to folders.
pub const FOLDER_TYPE: &str = "folder";

pub use history::HistoryProvider;
pub use objects::{CompositionProvider, ObjectDescriptor, ObjectProvider};
