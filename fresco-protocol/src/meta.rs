//! Meta band payloads (codes 32 through 127).
//!
//! Meta messages are part of the session but do not draw anything. The
//! low sub-band (32..=63) is transparent so the server can track user
//! lifecycle; the high sub-band (64..=127) is relayed opaquely. The ACL
//! carrying types (`UserAcl`, `LayerAcl`, `SessionAcl`, `SessionOwner`)
//! steer how the command band is filtered downstream.

use crate::types::{LayerId, UserId};
use crate::wire::{PayloadReader, PayloadWriter, ProtocolError};

/// A user joined the session. The origin id of the message is the new
/// user's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserJoin {
    pub name: String,
}

impl UserJoin {
    pub fn new(name: impl Into<String>) -> UserJoin {
        UserJoin { name: name.into() }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<UserJoin, ProtocolError> {
        Ok(UserJoin {
            name: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_str(&self.name);
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.name.len()
    }
}

/// Replaces the whole set of session operators. A session holds at most
/// 255 users, so the id list is bounded by that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOwner {
    pub users: Vec<UserId>,
}

impl SessionOwner {
    pub fn new(users: Vec<UserId>) -> SessionOwner {
        SessionOwner { users }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<SessionOwner, ProtocolError> {
        r.validate(0, 255)?;
        Ok(SessionOwner {
            users: r.read_remaining().to_vec(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_bytes(&self.users);
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.users.len()
    }
}

/// Chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub message: String,
}

impl Chat {
    pub fn new(message: impl Into<String>) -> Chat {
        Chat {
            message: message.into(),
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<Chat, ProtocolError> {
        Ok(Chat {
            message: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_str(&self.message);
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.message.len()
    }
}

/// Pause hint for recording playback, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub ms: u16,
}

impl Interval {
    pub fn new(ms: u16) -> Interval {
        Interval { ms }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<Interval, ProtocolError> {
        r.validate(2, 2)?;
        Ok(Interval { ms: r.read_u16()? })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u16(self.ms);
    }

    pub(crate) fn payload_len(&self) -> usize {
        2
    }
}

/// Starts a laser pointer trail that fades after `persistence` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaserTrail {
    pub color: u32,
    pub persistence: u8,
}

impl LaserTrail {
    pub fn new(color: u32, persistence: u8) -> LaserTrail {
        LaserTrail { color, persistence }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LaserTrail, ProtocolError> {
        r.validate(5, 5)?;
        Ok(LaserTrail {
            color: r.read_u32()?,
            persistence: r.read_u8()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u32(self.color);
        w.write_u8(self.persistence);
    }

    pub(crate) fn payload_len(&self) -> usize {
        5
    }
}

/// Pointer position in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePointer {
    pub x: i32,
    pub y: i32,
}

impl MovePointer {
    pub fn new(x: i32, y: i32) -> MovePointer {
        MovePointer { x, y }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<MovePointer, ProtocolError> {
        r.validate(8, 8)?;
        Ok(MovePointer {
            x: r.read_i32()?,
            y: r.read_i32()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_i32(self.x);
        w.write_i32(self.y);
    }

    pub(crate) fn payload_len(&self) -> usize {
        8
    }
}

/// Recording annotation, shown on the playback timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub text: String,
}

impl Marker {
    pub fn new(text: impl Into<String>) -> Marker {
        Marker { text: text.into() }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<Marker, ProtocolError> {
        Ok(Marker {
            text: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_str(&self.text);
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.text.len()
    }
}

/// Replaces the whole set of locked users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAcl {
    pub users: Vec<UserId>,
}

impl UserAcl {
    pub fn new(users: Vec<UserId>) -> UserAcl {
        UserAcl { users }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<UserAcl, ProtocolError> {
        r.validate(0, 255)?;
        Ok(UserAcl {
            users: r.read_remaining().to_vec(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_bytes(&self.users);
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.users.len()
    }
}

/// Lock and exclusivity change for a single layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerAcl {
    pub layer: LayerId,
    pub locked: bool,
    /// Users allowed on the layer. Empty means no exclusivity.
    pub exclusive: Vec<UserId>,
}

impl LayerAcl {
    const FLAG_LOCKED: u8 = 0x01;

    pub fn new(layer: LayerId, locked: bool, exclusive: Vec<UserId>) -> LayerAcl {
        LayerAcl {
            layer,
            locked,
            exclusive,
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LayerAcl, ProtocolError> {
        r.validate(3, 3 + 255)?;
        Ok(LayerAcl {
            layer: r.read_layer_id()?,
            locked: r.read_u8()? & Self::FLAG_LOCKED != 0,
            exclusive: r.read_remaining().to_vec(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_u8(if self.locked { Self::FLAG_LOCKED } else { 0 });
        w.write_bytes(&self.exclusive);
    }

    pub(crate) fn payload_len(&self) -> usize {
        3 + self.exclusive.len()
    }
}

/// Session wide permission flags, applied as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAcl {
    pub flags: u16,
}

impl SessionAcl {
    /// Only operators may issue command band messages.
    pub const LOCK_SESSION: u16 = 0x01;
    /// Layer structure changes require operator privilege.
    pub const LOCK_LAYERCTRL: u16 = 0x02;
    /// Users manage and draw on layers they created.
    pub const LOCK_OWNLAYERS: u16 = 0x04;
    /// Newly joining users start out locked.
    pub const LOCK_DEFAULT: u16 = 0x08;

    pub fn new(flags: u16) -> SessionAcl {
        SessionAcl { flags }
    }

    pub fn is_session_locked(&self) -> bool {
        self.flags & Self::LOCK_SESSION != 0
    }

    pub fn is_layer_control_locked(&self) -> bool {
        self.flags & Self::LOCK_LAYERCTRL != 0
    }

    pub fn is_own_layers(&self) -> bool {
        self.flags & Self::LOCK_OWNLAYERS != 0
    }

    pub fn is_locked_by_default(&self) -> bool {
        self.flags & Self::LOCK_DEFAULT != 0
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<SessionAcl, ProtocolError> {
        r.validate(2, 2)?;
        Ok(SessionAcl {
            flags: r.read_u16()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u16(self.flags);
    }

    pub(crate) fn payload_len(&self) -> usize {
        2
    }
}

// ===================================================================
// Tests
// ===================================================================
