use thiserror::Error;

/// Error taxonomy for the bridge.
///
/// The enum is `Clone` (transport errors are flattened to their display
/// strings) so the dictionary cache can hand the same settled failure to
/// every waiter: a failed catalog load poisons that cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YamcsError {
    /// Transport or parse failure while fetching the parameter catalog.
    /// Fatal to this plugin instance.
    #[error("failed to load parameter dictionary: {0}")]
    DictionaryLoad(String),

    /// An identifier or name with no matching dictionary entry.
    #[error("no parameter named `{0}` in the dictionary")]
    ParameterNotFound(String),

    /// Transport failure during archive retrieval. Propagated, never
    /// retried at this layer.
    #[error("archive retrieval failed: {0}")]
    HistoricalFetch(String),

    /// An inbound push frame that could not be decoded. Logged and dropped
    /// inside the dispatch loop; one bad frame must not break the feed.
    #[error("malformed push frame: {0}")]
    MalformedFrame(String),

    /// An engineering value whose type tag selects no known typed field.
    #[error("unknown engineering value tag `{0}`")]
    UnknownValueTag(String),

    /// The push connection dropped. Drives reconnect-and-resubscribe.
    #[error("push connection lost")]
    Disconnected,
}
