//! Payloads of the agent-local REST API a microservice talks to.
//!
//! Message bodies travel as base64 strings on the wire and are exposed as raw
//! bytes here.

use serde::{Deserialize, Deserializer, Serialize};

/// Request body carrying only the calling microservice's id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AgentIdRequest {
    /// Microservice uuid (the agent's `SELFNAME`).
    pub id: String,
}

/// Answer of the config endpoint; `config` is itself a JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ConfigResponse {
    /// JSON-encoded microservice configuration.
    pub config: String,
}

/// Message exchanged over the agent message bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct IoMessage {
    /// Message id, assigned by the agent on publish.
    pub id: String,
    /// Free-form tag.
    pub tag: String,
    /// Group of a multi-part message.
    #[serde(rename = "groupid")]
    pub group_id: String,
    /// Position within the group.
    #[serde(rename = "sequencenumber")]
    pub sequence_number: i64,
    /// Number of messages in the group.
    #[serde(rename = "sequencetotal")]
    pub sequence_total: i64,
    /// Priority.
    pub priority: i64,
    /// Publish time in epoch milliseconds, assigned by the agent.
    pub timestamp: i64,
    /// Publishing microservice uuid.
    pub publisher: String,
    /// Authentication id.
    #[serde(rename = "authid")]
    pub auth_id: String,
    /// Authentication group.
    #[serde(rename = "authgroup")]
    pub auth_group: String,
    /// Message format version.
    pub version: i64,
    /// Chain timestamp.
    #[serde(rename = "chaintimestamp")]
    pub chain_timestamp: i64,
    /// Difficulty target.
    #[serde(rename = "difficultytarget")]
    pub difficulty_target: f64,
    /// Content type of `content_data`.
    #[serde(rename = "infotype")]
    pub info_type: String,
    /// Content format of `content_data`.
    #[serde(rename = "infoformat")]
    pub info_format: String,
    /// Context bytes.
    #[serde(rename = "contextdata", with = "base64_bytes")]
    pub context_data: Vec<u8>,
    /// Payload bytes.
    #[serde(rename = "contentdata", with = "base64_bytes")]
    pub content_data: Vec<u8>,
}

/// Agent receipt for a published message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PostMessageResponse {
    /// Id assigned to the message.
    pub id: String,
    /// Publish time in epoch milliseconds.
    pub timestamp: i64,
}

/// Query for messages of some publishers inside a time frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MessagesQuery {
    /// Calling microservice uuid.
    pub id: String,
    /// Start of the frame, epoch milliseconds.
    #[serde(rename = "timeframestart")]
    pub timeframe_start: i64,
    /// End of the frame, epoch milliseconds.
    #[serde(rename = "timeframeend")]
    pub timeframe_end: i64,
    /// Publisher uuids to include.
    pub publishers: Vec<String>,
}

/// Messages answer of the next-messages and query endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MessagesResponse {
    /// Messages in delivery order.
    #[serde(deserialize_with = "null_as_empty")]
    pub messages: Vec<IoMessage>,
    /// Start of the answered frame (query endpoint only).
    #[serde(rename = "timeframestart")]
    pub timeframe_start: i64,
    /// End of the answered frame (query endpoint only).
    #[serde(rename = "timeframeend")]
    pub timeframe_end: i64,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|err| D::Error::custom(format!("invalid base64 payload: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_bodies_are_base64_on_the_wire() {
        let msg = IoMessage {
            publisher: "ms-1".into(),
            info_type: "text".into(),
            info_format: "utf-8".into(),
            content_data: b"hello".to_vec(),
            ..IoMessage::default()
        };
        let value = serde_json::to_value(&msg).expect("encode");
        assert_eq!(value["contentdata"], "aGVsbG8=");
        assert_eq!(value["contextdata"], "");
        assert_eq!(value["infotype"], "text");

        let back: IoMessage = serde_json::from_value(value).expect("decode");
        assert_eq!(back.content_data, b"hello");
    }

    #[test]
    fn null_messages_and_data_decode_empty() {
        let res: MessagesResponse = serde_json::from_value(json!({
            "messages": null,
            "timeframestart": 10
        }))
        .expect("decode");
        assert!(res.messages.is_empty());
        assert_eq!(res.timeframe_start, 10);

        let msg: IoMessage =
            serde_json::from_value(json!({"id": "m1", "contentdata": null})).expect("decode");
        assert!(msg.content_data.is_empty());
    }

    #[test]
    fn bad_base64_is_rejected() {
        let err = serde_json::from_value::<IoMessage>(json!({"contentdata": "%%%"})).unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }
}
