//! Wire messages exchanged between agents and the coordinator
//!
//! Every message is a fixed-layout record inside the [`GameMessage`] sum type.
//! Payloads are JSON with a `type` tag; the tag must agree with the topic the
//! payload arrived on.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AgentId, Position};

/// Named broadcast channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    /// Agents -> coordinator, once at boot
    Ready,
    /// Agents -> coordinator and seeker
    Move,
    /// Agents -> coordinator, heartbeat
    Status,
    /// Coordinator -> all
    Begin,
    /// Coordinator -> all, targeted by id
    Freeze,
    /// Coordinator -> all
    Stop,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::Ready,
        Topic::Move,
        Topic::Status,
        Topic::Begin,
        Topic::Freeze,
        Topic::Stop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Topic::Ready => "READY",
            Topic::Move => "MOVE",
            Topic::Status => "STATUS",
            Topic::Begin => "BEGIN",
            Topic::Freeze => "FREEZE",
            Topic::Stop => "STOP",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyReport {
    pub id: AgentId,
    #[serde(rename = "start-position")]
    pub start_position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    pub id: AgentId,
    #[serde(rename = "new-position")]
    pub new_position: Position,
}

/// Heartbeat carrying the agent's own view of its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub id: AgentId,
    pub position: Position,
    pub frozen: bool,
    #[serde(rename = "game-started")]
    pub game_started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeOrder {
    #[serde(rename = "target-id")]
    pub target: AgentId,
}

/// Every message that travels over the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameMessage {
    Ready(ReadyReport),
    Move(MoveReport),
    Status(StatusReport),
    Begin,
    Freeze(FreezeOrder),
    Stop,
}

/// Failure to turn a payload back into a [`GameMessage`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed {topic} payload: {source}")]
    Malformed {
        topic: Topic,
        #[source]
        source: serde_json::Error,
    },

    #[error("{found} payload arrived on {expected}")]
    TopicMismatch { expected: Topic, found: Topic },
}

impl DecodeError {
    /// Topic the offending payload arrived on
    pub fn topic(&self) -> Topic {
        match self {
            DecodeError::Malformed { topic, .. } => *topic,
            DecodeError::TopicMismatch { expected, .. } => *expected,
        }
    }
}

impl GameMessage {
    /// The channel this message belongs on
    pub fn topic(&self) -> Topic {
        match self {
            GameMessage::Ready(_) => Topic::Ready,
            GameMessage::Move(_) => Topic::Move,
            GameMessage::Status(_) => Topic::Status,
            GameMessage::Begin => Topic::Begin,
            GameMessage::Freeze(_) => Topic::Freeze,
            GameMessage::Stop => Topic::Stop,
        }
    }

    pub fn ready(id: AgentId, start_position: Position) -> Self {
        GameMessage::Ready(ReadyReport { id, start_position })
    }

    pub fn moved(id: AgentId, new_position: Position) -> Self {
        GameMessage::Move(MoveReport { id, new_position })
    }

    pub fn freeze(target: AgentId) -> Self {
        GameMessage::Freeze(FreezeOrder { target })
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a payload received on `topic`
    pub fn decode(topic: Topic, payload: &[u8]) -> Result<Self, DecodeError> {
        let msg: GameMessage =
            serde_json::from_slice(payload).map_err(|source| DecodeError::Malformed { topic, source })?;
        if msg.topic() != topic {
            return Err(DecodeError::TopicMismatch {
                expected: topic,
                found: msg.topic(),
            });
        }
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let msg = GameMessage::Status(StatusReport {
            id: AgentId(2),
            position: Position::new(1, 3),
            frozen: false,
            game_started: true,
        });
        let json = String::from_utf8(msg.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Status","id":2,"position":{"x":1,"y":3},"frozen":false,"game-started":true}"#
        );
    }

    #[test]
    fn test_empty_messages_wire_format() {
        assert_eq!(GameMessage::Begin.encode().unwrap(), br#"{"type":"Begin"}"#.to_vec());
        assert_eq!(GameMessage::Stop.encode().unwrap(), br#"{"type":"Stop"}"#.to_vec());
    }

    #[test]
    fn test_decode_freeze() {
        let msg = GameMessage::decode(Topic::Freeze, br#"{"type":"Freeze","target-id":4}"#).unwrap();
        assert_eq!(msg, GameMessage::freeze(AgentId(4)));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = GameMessage::decode(Topic::Move, b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { topic: Topic::Move, .. }));
        assert!(err.to_string().starts_with("Malformed MOVE payload"));
    }

    #[test]
    fn test_decode_missing_field() {
        let err = GameMessage::decode(Topic::Ready, br#"{"type":"Ready","id":1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_decode_rejects_topic_mismatch() {
        let payload = GameMessage::Begin.encode().unwrap();
        let err = GameMessage::decode(Topic::Stop, &payload).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TopicMismatch {
                expected: Topic::Stop,
                found: Topic::Begin
            }
        ));
    }

    #[test]
    fn test_every_message_lands_on_its_topic() {
        let messages = [
            GameMessage::ready(AgentId(0), Position::new(0, 0)),
            GameMessage::moved(AgentId(0), Position::new(1, 0)),
            GameMessage::Begin,
            GameMessage::freeze(AgentId(0)),
            GameMessage::Stop,
        ];
        for msg in messages {
            let payload = msg.encode().unwrap();
            assert_eq!(GameMessage::decode(msg.topic(), &payload).unwrap(), msg);
        }
    }

    #[test]
    fn test_topic_names() {
        let names: Vec<_> = Topic::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["READY", "MOVE", "STATUS", "BEGIN", "FREEZE", "STOP"]);
    }
}
