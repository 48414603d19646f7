/*
[INPUT]:  Raw WebSocket text frames and outbound protocol intents
[OUTPUT]: Classified inbound messages, serialized outbound frames, emitted envelopes
[POS]:    WebSocket layer - wire contract and downstream event shape
[UPDATE]: When adding control message types or changing the envelope shape
*/

use chrono::{SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::http::{PrimeError, Result};

/// Frames sent to the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Auth {
        #[serde(rename = "apiKey")]
        api_key: String,
        timestamp: String,
        signature: String,
    },
    Subscribe {
        channels: Vec<String>,
        #[serde(rename = "accountId", skip_serializing_if = "Option::is_none")]
        account_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
    },
    Pong {
        timestamp: i64,
    },
    Unsubscribe {
        channels: Vec<String>,
    },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Auth { .. } => "auth",
            OutboundMessage::Subscribe { .. } => "subscribe",
            OutboundMessage::Pong { .. } => "pong",
            OutboundMessage::Unsubscribe { .. } => "unsubscribe",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Domain event received once subscribed
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    pub kind: String,
    pub account_id: Option<String>,
    pub symbol: Option<String>,
    pub timestamp: Option<Value>,
    pub data: Option<Value>,
    pub raw: Value,
}

/// Inbound frame classified by its `type` field
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    AuthResponse { status: Option<String> },
    Subscribed,
    Heartbeat(Value),
    Event(EventMessage),
    /// Valid JSON without a string `type`
    Unknown(Value),
}

impl InboundMessage {
    /// Parse a text frame; fails only when the frame is not JSON
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PrimeError::Protocol(format!("frame is not JSON: {e}")))?;
        Ok(Self::classify(value))
    }

    pub fn classify(value: Value) -> Self {
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_string) else {
            return InboundMessage::Unknown(value);
        };

        match kind.as_str() {
            "auth_response" => InboundMessage::AuthResponse {
                status: value.get("status").and_then(Value::as_str).map(str::to_string),
            },
            "subscribed" => InboundMessage::Subscribed,
            "heartbeat" => InboundMessage::Heartbeat(value),
            _ => InboundMessage::Event(EventMessage {
                account_id: string_field(&value, "accountId"),
                symbol: string_field(&value, "symbol"),
                timestamp: present_field(&value, "timestamp"),
                data: present_field(&value, "data"),
                kind,
                raw: value,
            }),
        }
    }
}

fn string_field(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Field value, treating null, false, zero and empty strings as absent
fn present_field(value: &Value, name: &str) -> Option<Value> {
    value.get(name).filter(|field| is_truthy(field)).cloned()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Normalized event handed to the downstream sink.
///
/// A passthrough envelope serializes as its `raw` frame, untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub event: String,
    pub timestamp: Value,
    pub data: Option<Value>,
    pub raw: Option<Value>,
    pub error: Option<String>,
    passthrough: bool,
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if let (true, Some(raw)) = (self.passthrough, &self.raw) {
            return raw.serialize(serializer);
        }

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("event", &self.event)?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        if let Some(data) = &self.data {
            map.serialize_entry("data", data)?;
        }
        if let Some(raw) = &self.raw {
            map.serialize_entry("raw", raw)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

impl Envelope {
    /// Envelope for a subscribed domain event
    pub fn from_event(message: &EventMessage) -> Self {
        Self {
            event: message.kind.clone(),
            timestamp: message.timestamp.clone().unwrap_or_else(now_value),
            data: Some(message.data.clone().unwrap_or_else(|| message.raw.clone())),
            raw: Some(message.raw.clone()),
            error: None,
            passthrough: false,
        }
    }

    /// Surfaced heartbeat; forwarded downstream as the frame itself
    pub fn heartbeat(message: &Value) -> Self {
        Self {
            event: "heartbeat".to_string(),
            timestamp: present_field(message, "timestamp").unwrap_or_else(now_value),
            data: Some(message.clone()),
            raw: Some(message.clone()),
            error: None,
            passthrough: true,
        }
    }

    /// True when the envelope is forwarded as its raw frame
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Fallback for frames that are not JSON
    pub fn raw_text(text: &str) -> Self {
        Self {
            event: "raw".to_string(),
            timestamp: now_value(),
            data: Some(Value::String(text.to_string())),
            raw: None,
            error: None,
            passthrough: false,
        }
    }

    /// Socket-level failure
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            event: "error".to_string(),
            timestamp: now_value(),
            data: None,
            raw: None,
            error: Some(message.into()),
            passthrough: false,
        }
    }
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_auth_wire_shape() {
        let frame = OutboundMessage::Auth {
            api_key: "key".into(),
            timestamp: "1700000000000".into(),
            signature: "abc".into(),
        };
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "auth", "apiKey": "key", "timestamp": "1700000000000", "signature": "abc"})
        );
    }

    #[test]
    fn test_outbound_subscribe_omits_disabled_filters() {
        let frame = OutboundMessage::Subscribe {
            channels: vec!["order.filled".into()],
            account_id: None,
            symbol: Some("BTC/USD".into()),
        };
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "subscribe", "channels": ["order.filled"], "symbol": "BTC/USD"})
        );
    }

    #[test]
    fn test_classify_control_messages() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"auth_response","status":"success"}"#).unwrap(),
            InboundMessage::AuthResponse {
                status: Some("success".into())
            }
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"subscribed","channels":["x"]}"#).unwrap(),
            InboundMessage::Subscribed
        );
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"heartbeat"}"#).unwrap(),
            InboundMessage::Heartbeat(_)
        ));
    }

    #[test]
    fn test_classify_event_and_unknown() {
        let parsed = InboundMessage::parse(
            r#"{"type":"order.filled","accountId":"ACC-1","symbol":"BTC/USD","data":{"qty":1}}"#,
        )
        .unwrap();
        match parsed {
            InboundMessage::Event(event) => {
                assert_eq!(event.kind, "order.filled");
                assert_eq!(event.account_id.as_deref(), Some("ACC-1"));
                assert_eq!(event.data, Some(json!({"qty": 1})));
                assert_eq!(event.timestamp, None);
            }
            other => panic!("expected event, got {other:?}"),
        }

        assert!(matches!(
            InboundMessage::parse(r#"{"kind":"nope"}"#).unwrap(),
            InboundMessage::Unknown(_)
        ));
        assert!(matches!(InboundMessage::parse("42").unwrap(), InboundMessage::Unknown(_)));
        let err = InboundMessage::parse("not json").unwrap_err();
        assert!(matches!(err, PrimeError::Protocol(_)));
        assert!(err.to_string().starts_with("Protocol error: frame is not JSON"));
    }

    #[test]
    fn test_envelope_falls_back_to_whole_message() {
        let raw = json!({"type": "trade.executed", "data": null, "timestamp": "2024-01-15T00:00:00Z"});
        let InboundMessage::Event(event) = InboundMessage::classify(raw.clone()) else {
            panic!("expected event");
        };
        let envelope = Envelope::from_event(&event);
        assert_eq!(envelope.event, "trade.executed");
        assert_eq!(envelope.timestamp, json!("2024-01-15T00:00:00Z"));
        assert_eq!(envelope.data, Some(raw.clone()));
        assert_eq!(envelope.raw, Some(raw));
    }

    #[test]
    fn test_error_envelope_serialization() {
        let value = serde_json::to_value(Envelope::error("connection reset")).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["error"], "connection reset");
        assert!(value.get("data").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_heartbeat_serializes_as_the_frame() {
        let frame = json!({"type": "heartbeat", "timestamp": 1700000000000_i64, "seq": 7});
        let envelope = Envelope::heartbeat(&frame);
        assert!(envelope.is_passthrough());
        assert_eq!(serde_json::to_value(&envelope).unwrap(), frame);

        let event = Envelope::from_event(&EventMessage {
            kind: "order.filled".into(),
            account_id: None,
            symbol: None,
            timestamp: None,
            data: None,
            raw: json!({"type": "order.filled"}),
        });
        assert!(!event.is_passthrough());
        assert_eq!(serde_json::to_value(&event).unwrap()["event"], "order.filled");
    }
}
