//! CDP protocol types and message definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Any message arriving on the socket: a response (has `id`) or an event.
#[derive(Debug, Deserialize)]
pub struct CdpMessage {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP error in response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// An event broadcast to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// Target info from CDP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: Option<bool>,
}

impl TargetInfo {
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}

/// Browser version info.
///
/// Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Mouse event type.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum MouseEventType {
    #[serde(rename = "mousePressed")]
    MousePressed,
    #[serde(rename = "mouseReleased")]
    MouseReleased,
}

/// Keys the driver presses, with the codes Chrome needs to act on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    End,
    Escape,
    Enter,
}

impl Key {
    pub fn name(&self) -> &'static str {
        match self {
            Self::End => "End",
            Self::Escape => "Escape",
            Self::Enter => "Enter",
        }
    }

    pub fn virtual_key_code(&self) -> u32 {
        match self {
            Self::End => 35,
            Self::Escape => 27,
            Self::Enter => 13,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_empty_fields() {
        let request = CdpRequest {
            id: 7,
            method: "Target.getTargets".to_string(),
            params: None,
            session_id: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"id":7,"method":"Target.getTargets"}"#
        );
    }

    #[test]
    fn test_event_message_parses() {
        let msg: CdpMessage = serde_json::from_str(
            r#"{"method":"Target.targetCreated","params":{"targetInfo":{"targetId":"T1","type":"page","title":"","url":"chrome-extension://x/notification.html","attached":false}}}"#,
        )
        .unwrap();
        assert!(msg.id.is_none());
        assert_eq!(msg.method.as_deref(), Some("Target.targetCreated"));

        let info: TargetInfo =
            serde_json::from_value(msg.params.unwrap()["targetInfo"].clone()).unwrap();
        assert!(info.is_page());
        assert_eq!(info.target_id, "T1");
    }

    #[test]
    fn test_error_response_parses() {
        let msg: CdpMessage = serde_json::from_str(
            r#"{"id":3,"error":{"code":-32000,"message":"No node with given id found"}}"#,
        )
        .unwrap();
        let error = msg.error.unwrap();
        assert_eq!(error.code, -32000);
    }
}
