//! Message envelopes
//!
//! Each pipeline reads one envelope shape. The topic decides which concrete
//! payload type an envelope is decoded into; nothing inspects the JSON to
//! guess its shape.

use serde::{Deserialize, Serialize};

/// CDC change event: `{"payload": {"before": T, "after": T, "op": "u"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct CdcEnvelope<T> {
    pub payload: CdcPayload<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CdcPayload<T> {
    /// Pre-image; only read for deletes
    pub before: Option<T>,

    /// Post-image to persist
    pub after: Option<T>,

    #[serde(default)]
    pub op: String,
}

/// CDC operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdcOp {
    Create,
    /// Snapshot read, treated like a create
    Read,
    Update,
    Delete,
}

impl CdcOp {
    /// Parse an op code; unknown codes are `None` and get ignored.
    pub fn parse(op: &str) -> Option<Self> {
        match op.trim() {
            "c" => Some(CdcOp::Create),
            "r" => Some(CdcOp::Read),
            "u" => Some(CdcOp::Update),
            "d" => Some(CdcOp::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CdcOp::Create => "c",
            CdcOp::Read => "r",
            CdcOp::Update => "u",
            CdcOp::Delete => "d",
        }
    }
}

/// GWS event: `{"eventType": "...", "data": T, "producer": "gws"}`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GwsEnvelope<T> {
    pub event_type: String,
    pub data: T,
    #[serde(default)]
    pub producer: String,
}

/// Write path selected by a GWS event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GwsEventClass {
    Create,
    Update,
    Delete,
}

impl GwsEventClass {
    /// Classify merchant and merchant-bank event types. Unknown types are
    /// `None` and get ignored.
    pub fn classify(event_type: &str) -> Option<Self> {
        match event_type.trim() {
            "merchantCreated" | "createMerchant" | "merchantBankCreated"
            | "createMerchantBank" => Some(GwsEventClass::Create),
            "merchantUpdated" | "updateMerchant" | "merchantBankUpdated"
            | "updateMerchantBank" => Some(GwsEventClass::Update),
            "merchantDeleted" | "deleteMerchant" | "merchantBankDeleted"
            | "deleteMerchantBank" => Some(GwsEventClass::Delete),
            _ => None,
        }
    }

    /// Action label recorded in the activity log
    pub fn action(&self) -> &'static str {
        match self {
            GwsEventClass::Create => "INSERT",
            GwsEventClass::Update => "UPDATE",
            GwsEventClass::Delete => "DELETE",
        }
    }
}

/// Generic `{"eventType": "...", "payload": T}` queue envelope used by the
/// worker and dolphin topics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePayload<T> {
    pub event_type: String,
    pub payload: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_cdc_op_parse() {
        assert_eq!(CdcOp::parse("c"), Some(CdcOp::Create));
        assert_eq!(CdcOp::parse("r"), Some(CdcOp::Read));
        assert_eq!(CdcOp::parse("u"), Some(CdcOp::Update));
        assert_eq!(CdcOp::parse("d"), Some(CdcOp::Delete));
        assert_eq!(CdcOp::parse("t"), None);
        assert_eq!(CdcOp::parse(""), None);
    }

    #[test]
    fn test_cdc_envelope_missing_images() {
        let envelope: CdcEnvelope<Value> =
            serde_json::from_str(r#"{"payload":{"after":{"id":1},"op":"c"}}"#).unwrap();
        assert!(envelope.payload.before.is_none());
        assert!(envelope.payload.after.is_some());

        let envelope: CdcEnvelope<Value> =
            serde_json::from_str(r#"{"payload":{"before":null,"after":null,"op":"d"}}"#).unwrap();
        assert!(envelope.payload.after.is_none());
    }

    #[test]
    fn test_gws_event_classes() {
        assert_eq!(
            GwsEventClass::classify("merchantCreated"),
            Some(GwsEventClass::Create)
        );
        assert_eq!(
            GwsEventClass::classify("updateMerchant"),
            Some(GwsEventClass::Update)
        );
        assert_eq!(
            GwsEventClass::classify("merchantBankDeleted"),
            Some(GwsEventClass::Delete)
        );
        assert_eq!(GwsEventClass::classify("merchantViewed"), None);
    }

    #[test]
    fn test_queue_payload_shape() {
        let payload: QueuePayload<Value> =
            serde_json::from_str(r#"{"eventType":"UpsertMerchant","payload":{"id":"M1"}}"#)
                .unwrap();
        assert_eq!(payload.event_type, "UpsertMerchant");
        assert_eq!(payload.payload["id"], "M1");
    }
}
