//! Control-frame encoding and push-frame decoding.

use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{json, Value};

use crate::error::YamcsError;
use crate::model::RawEngValue;

/// Encodes outbound control frames:
/// `[1, 1, <seq>, {"parameter": <op>, "data": {"list": [{"name": <qualified>}]}}]`.
///
/// Sequence numbers are a monotonically increasing counter shared across
/// reconnects, so no two frames this encoder produces are ever identical.
#[derive(Debug)]
pub struct ControlEncoder {
    seq: AtomicU32,
}

impl Default for ControlEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlEncoder {
    pub fn new() -> Self {
        Self {
            seq: AtomicU32::new(1),
        }
    }

    pub fn subscribe(&self, qualified_name: &str) -> String {
        self.frame("subscribe", qualified_name)
    }

    pub fn unsubscribe(&self, qualified_name: &str) -> String {
        self.frame("unsubscribe", qualified_name)
    }

    fn frame(&self, op: &str, qualified_name: &str) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        json!([1, 1, seq, {
            "parameter": op,
            "data": { "list": [ { "name": qualified_name } ] }
        }])
        .to_string()
    }
}

/// A decoded inbound push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    /// The trailing element was a non-object sentinel: a liveness tick with
    /// no payload at all.
    Tick,
    /// A batch of per-parameter updates. May be empty when the frame named
    /// nothing usable.
    Updates(Vec<ParameterUpdate>),
}

/// One batch entry: the parameter it names and its (possibly absent)
/// engineering value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterUpdate {
    pub name: String,
    pub generation_time: Option<String>,
    pub eng_value: Option<Value>,
}

impl ParameterUpdate {
    /// The typed engineering value, when the entry carried one.
    pub fn raw_eng_value(&self) -> Option<Result<RawEngValue, YamcsError>> {
        self.eng_value.as_ref().map(|v| {
            serde_json::from_value(v.clone())
                .map_err(|e| YamcsError::MalformedFrame(format!("bad engValue: {e}")))
        })
    }
}

/// Decodes an inbound websocket text frame.
///
/// Inbound frames are JSON arrays whose last element is either
/// `{"data": {"parameter": [...]}}` or a non-object sentinel. Anything that
/// is not an array at all is malformed; an object without a usable batch
/// decodes to an empty update list so one odd frame cannot break the feed.
pub fn decode_push_frame(text: &str) -> Result<PushFrame, YamcsError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| YamcsError::MalformedFrame(format!("not JSON: {e}")))?;
    let elements = value
        .as_array()
        .ok_or_else(|| YamcsError::MalformedFrame("not an array".to_string()))?;
    let last = elements
        .last()
        .ok_or_else(|| YamcsError::MalformedFrame("empty array".to_string()))?;

    if !last.is_object() {
        return Ok(PushFrame::Tick);
    }

    let batch = last
        .get("data")
        .and_then(|data| data.get("parameter"))
        .and_then(Value::as_array);
    let Some(batch) = batch else {
        return Ok(PushFrame::Updates(Vec::new()));
    };

    let mut updates = Vec::with_capacity(batch.len());
    for entry in batch {
        // Entries name their parameter as id.name; older payloads use a
        // bare name field.
        let name = entry
            .get("id")
            .and_then(|id| id.get("name"))
            .or_else(|| entry.get("name"))
            .and_then(Value::as_str);
        let Some(name) = name else {
            log::warn!("Skipping push batch entry with no parameter name: {entry}");
            continue;
        };
        updates.push(ParameterUpdate {
            name: name.to_string(),
            generation_time: entry
                .get("generationTime")
                .and_then(Value::as_str)
                .map(str::to_string),
            eng_value: entry.get("engValue").cloned(),
        });
    }
    Ok(PushFrame::Updates(updates))
}
