//! Wire types for the DevTools JSON-RPC envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// Incoming frame: a command response when `id` is set, an event when
/// `method` is set. Events are skipped by the transport loop.
#[derive(Debug, Deserialize)]
pub struct Message {
    pub id: Option<u64>,
    pub method: Option<String>,
    pub result: Option<Value>,
    pub error: Option<ProtocolError>,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolError {
    pub code: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_session_when_absent() {
        let request = Request {
            id: 1,
            method: "Target.createTarget",
            params: json!({"url": "about:blank"}),
            session_id: None,
        };
        let encoded = serde_json::to_string(&request).unwrap();
        assert!(!encoded.contains("sessionId"));

        let request = Request {
            session_id: Some("abc"),
            ..request
        };
        let encoded = serde_json::to_string(&request).unwrap();
        assert!(encoded.contains("\"sessionId\":\"abc\""));
    }

    #[test]
    fn response_and_event_frames_parse() {
        let response: Message =
            serde_json::from_str(r#"{"id":3,"result":{"targetId":"t1"}}"#).unwrap();
        assert_eq!(response.id, Some(3));
        assert!(response.method.is_none());

        let event: Message =
            serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{}}"#).unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.method.as_deref(), Some("Page.loadEventFired"));

        let failure: Message =
            serde_json::from_str(r#"{"id":4,"error":{"code":-32000,"message":"no"}}"#).unwrap();
        assert_eq!(failure.error.unwrap().message, "no");
    }
}
