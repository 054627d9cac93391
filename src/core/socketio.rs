//! Engine.IO v4 / Socket.IO v5 text packet codec
//!
//! Only the subset a passive subscriber needs: the open handshake, namespace
//! connect/disconnect, heartbeats and server events on the default namespace.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SaverError};

/// Payload of the Engine.IO open packet (`0{...}`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Engine.IO transport-level packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet carried inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0{"sid":"..."}`: namespace connect acknowledgement
    Connect { sid: String },
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(String),
    /// Acks and binary packets; a progress subscriber ignores them
    Other(String),
}

impl EnginePacket {
    pub fn parse(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SaverError::Protocol("empty frame".into()))?;
        let body = chars.as_str();

        Ok(match kind {
            '0' => EnginePacket::Open(serde_json::from_str(body)?),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping,
            '3' => EnginePacket::Pong,
            '4' => EnginePacket::Message(SocketPacket::parse(body)?),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => {
                return Err(SaverError::Protocol(format!(
                    "unknown engine packet type '{other}'"
                )));
            }
        })
    }
}

impl SocketPacket {
    fn parse(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SaverError::Protocol("empty socket packet".into()))?;
        let rest = skip_ack_id(strip_namespace(chars.as_str()));

        match kind {
            '0' => {
                #[derive(Deserialize)]
                struct ConnectPayload {
                    sid: String,
                }
                let payload: ConnectPayload = serde_json::from_str(rest)?;
                Ok(SocketPacket::Connect { sid: payload.sid })
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let mut args: Vec<Value> = serde_json::from_str(rest)?;
                if args.is_empty() {
                    return Err(SaverError::Protocol("event without a name".into()));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(SaverError::Protocol(format!(
                            "event name is not a string: {other}"
                        )));
                    }
                };
                let data = if args.is_empty() {
                    Value::Null
                } else {
                    args.remove(0)
                };
                Ok(SocketPacket::Event { name, data })
            }
            '4' => Ok(SocketPacket::ConnectError(rest.to_string())),
            _ => Ok(SocketPacket::Other(body.to_string())),
        }
    }
}

/// Drop a `/namespace,` prefix; only the default namespace is used
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        rest.split_once(',').map(|(_, tail)| tail).unwrap_or("")
    } else {
        rest
    }
}

fn skip_ack_id(rest: &str) -> &str {
    rest.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Join the default namespace
pub fn encode_connect() -> &'static str {
    "40"
}

/// Leave the default namespace
pub fn encode_disconnect() -> &'static str {
    "41"
}

/// Heartbeat answer to a server ping
pub fn encode_pong() -> &'static str {
    "3"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open() {
        let packet = EnginePacket::parse(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        let EnginePacket::Open(open) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(open.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(open.ping_interval, 25000);
    }

    #[test]
    fn test_parse_namespace_connect() {
        let packet = EnginePacket::parse(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Connect {
                sid: "wZX3oN0bSVIhsaknAAAI".into()
            })
        );
    }

    #[test]
    fn test_parse_event() {
        let packet =
            EnginePacket::parse(r#"42["progressUpdate",{"progress":42.5,"size":"3.10"}]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "progressUpdate".into(),
                data: json!({"progress": 42.5, "size": "3.10"}),
            })
        );
    }

    #[test]
    fn test_parse_event_with_namespace_and_ack_id() {
        let packet = EnginePacket::parse(r#"42/admin,7["hello"]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "hello".into(),
                data: Value::Null,
            })
        );
    }

    #[test]
    fn test_parse_heartbeat_and_close() {
        assert_eq!(EnginePacket::parse("2").unwrap(), EnginePacket::Ping);
        assert_eq!(EnginePacket::parse("1").unwrap(), EnginePacket::Close);
        assert_eq!(
            EnginePacket::parse("41").unwrap(),
            EnginePacket::Message(SocketPacket::Disconnect)
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(EnginePacket::parse("").is_err());
        assert!(EnginePacket::parse("9oops").is_err());
        assert!(EnginePacket::parse("42[]").is_err());
        assert!(EnginePacket::parse("42[1,2]").is_err());
    }

    #[test]
    fn test_encoders() {
        assert_eq!(encode_connect(), "40");
        assert_eq!(encode_disconnect(), "41");
        assert_eq!(encode_pong(), "3");
    }
}
