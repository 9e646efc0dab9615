//! Control band payloads (codes 0 through 3).
//!
//! Control messages speak to the server itself rather than the drawing
//! session. They are never recorded and never reach the canvas. The
//! [`Command`] message doubles as a free-form channel: both directions
//! carry a compact JSON envelope so new server features do not need new
//! message types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wire::{PayloadReader, PayloadWriter, ProtocolError, MAX_PAYLOAD_LEN};

/// Client-to-server command envelope, carried as JSON inside a
/// [`Command`] message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCommand {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub kwargs: Map<String, Value>,
}

impl ServerCommand {
    pub fn new(cmd: impl Into<String>) -> ServerCommand {
        ServerCommand {
            cmd: cmd.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }
}

/// Kind tag of a server-to-client reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Login,
    Message,
    Chat,
    Alert,
    Error,
    Result,
    SessionConf,
    Reset,
    /// Unrecognized kind, kept so older clients survive newer servers.
    #[serde(other)]
    Unknown,
}

impl Default for ReplyKind {
    fn default() -> ReplyKind {
        ReplyKind::Unknown
    }
}

/// Server-to-client reply envelope, carried as JSON inside a [`Command`]
/// message. Fields beyond the kind and message land in `reply`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerReply {
    #[serde(rename = "type", default)]
    pub kind: ReplyKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(flatten)]
    pub reply: Map<String, Value>,
}

/// Server command/reply channel. The payload is a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub msg: String,
}

impl Command {
    /// Wrap an already serialized JSON document.
    pub fn new(msg: impl Into<String>) -> Command {
        Command { msg: msg.into() }
    }

    /// Build from a client-to-server command envelope.
    pub fn from_command(envelope: &ServerCommand) -> Result<Command, ProtocolError> {
        Ok(Command {
            msg: serde_json::to_string(envelope)?,
        })
    }

    /// Build from a server-to-client reply envelope.
    pub fn from_reply(envelope: &ServerReply) -> Result<Command, ProtocolError> {
        Ok(Command {
            msg: serde_json::to_string(envelope)?,
        })
    }

    /// Parse the payload as a client-to-server command.
    pub fn server_command(&self) -> Result<ServerCommand, ProtocolError> {
        Ok(serde_json::from_str(&self.msg)?)
    }

    /// Parse the payload as a server-to-client reply.
    pub fn server_reply(&self) -> Result<ServerReply, ProtocolError> {
        Ok(serde_json::from_str(&self.msg)?)
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<Command, ProtocolError> {
        Ok(Command {
            msg: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_str(&self.msg);
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.msg.len()
    }
}

/// Why a connection is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Protocol or internal error
    Error,
    /// Removed by an operator
    Kick,
    /// Server is shutting down
    Shutdown,
    /// Any other reason, raw code preserved
    Other(u8),
}

impl DisconnectReason {
    pub fn from_code(code: u8) -> DisconnectReason {
        match code {
            0 => DisconnectReason::Error,
            1 => DisconnectReason::Kick,
            2 => DisconnectReason::Shutdown,
            other => DisconnectReason::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            DisconnectReason::Error => 0,
            DisconnectReason::Kick => 1,
            DisconnectReason::Shutdown => 2,
            DisconnectReason::Other(code) => code,
        }
    }
}

/// Graceful connection teardown notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Disconnect {
    pub reason: DisconnectReason,
    pub message: String,
}

impl Disconnect {
    pub fn new(reason: DisconnectReason, message: impl Into<String>) -> Disconnect {
        Disconnect {
            reason,
            message: message.into(),
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<Disconnect, ProtocolError> {
        r.validate(1, MAX_PAYLOAD_LEN)?;
        Ok(Disconnect {
            reason: DisconnectReason::from_code(r.read_u8()?),
            message: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u8(self.reason.code());
        w.write_str(&self.message);
    }

    pub(crate) fn payload_len(&self) -> usize {
        1 + self.message.len()
    }
}

/// Keepalive probe. `is_pong` distinguishes the answer from the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub is_pong: bool,
}

impl Ping {
    pub fn ping() -> Ping {
        Ping { is_pong: false }
    }

    pub fn pong() -> Ping {
        Ping { is_pong: true }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<Ping, ProtocolError> {
        r.validate(1, 1)?;
        Ok(Ping {
            is_pong: r.read_u8()? != 0,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u8(self.is_pong as u8);
    }

    pub(crate) fn payload_len(&self) -> usize {
        1
    }
}

/// Catch-up progress marker: how many bytes of history are still coming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPos {
    pub bytes: u32,
}

impl StreamPos {
    pub fn new(bytes: u32) -> StreamPos {
        StreamPos { bytes }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<StreamPos, ProtocolError> {
        r.validate(4, 4)?;
        Ok(StreamPos {
            bytes: r.read_u32()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u32(self.bytes);
    }

    pub(crate) fn payload_len(&self) -> usize {
        4
    }
}

// ===================================================================
// Tests
// ===================================================================
