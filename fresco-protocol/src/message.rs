//! Message envelope, typed body dispatch, and shared handles.
//!
//! A [`Message`] pairs an origin user with a typed [`Body`] and an
//! undo marker. The marker lives in an `AtomicU8` so history
//! bookkeeping can flag a message as undone while other parts of the
//! pipeline still hold references to it through [`MessageHandle`].
//!
//! Equality deliberately ignores the undo marker. Two replicas that
//! disagree on undo state still hold the same message as far as
//! deduplication and recording are concerned.

use std::ops::Deref;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::command::{
    AnnotationCreate, AnnotationDelete, AnnotationEdit, AnnotationReshape, CanvasResize, FillRect,
    LayerAttributes, LayerCreate, LayerDelete, LayerOrder, LayerRetitle, LayerVisibility, PenMove,
    PenPoint, PutImage, ToolChange, Undo,
};
use crate::control::{
    Command, Disconnect, DisconnectReason, Ping, ServerCommand, ServerReply, StreamPos,
};
use crate::meta::{
    Chat, Interval, LaserTrail, LayerAcl, Marker, MovePointer, SessionAcl, SessionOwner, UserAcl,
    UserJoin,
};
use crate::types::{LayerId, MessageBand, MessageType, UndoState, UserId};
use crate::wire::{PayloadReader, PayloadWriter, ProtocolError, HEADER_LEN, MAX_PAYLOAD_LEN};

// ───────────────────────── typed message body ─────────────────────────

/// The payload of a message, one variant per wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    // control band
    Command(Command),
    Disconnect(Disconnect),
    Ping(Ping),
    StreamPos(StreamPos),
    // meta band, transparent
    UserJoin(UserJoin),
    UserLeave,
    SessionOwner(SessionOwner),
    // meta band, opaque
    Chat(Chat),
    Interval(Interval),
    LaserTrail(LaserTrail),
    MovePointer(MovePointer),
    Marker(Marker),
    UserAcl(UserAcl),
    LayerAcl(LayerAcl),
    SessionAcl(SessionAcl),
    // command band
    UndoPoint,
    CanvasResize(CanvasResize),
    LayerCreate(LayerCreate),
    LayerAttributes(LayerAttributes),
    LayerRetitle(LayerRetitle),
    LayerOrder(LayerOrder),
    LayerDelete(LayerDelete),
    LayerVisibility(LayerVisibility),
    PutImage(PutImage),
    FillRect(FillRect),
    ToolChange(ToolChange),
    PenMove(PenMove),
    PenUp,
    AnnotationCreate(AnnotationCreate),
    AnnotationReshape(AnnotationReshape),
    AnnotationEdit(AnnotationEdit),
    AnnotationDelete(AnnotationDelete),
    Undo(Undo),
}

impl Body {
    /// The wire type code this body serializes as.
    pub fn message_type(&self) -> MessageType {
        match self {
            Body::Command(_) => MessageType::Command,
            Body::Disconnect(_) => MessageType::Disconnect,
            Body::Ping(_) => MessageType::Ping,
            Body::StreamPos(_) => MessageType::StreamPos,
            Body::UserJoin(_) => MessageType::UserJoin,
            Body::UserLeave => MessageType::UserLeave,
            Body::SessionOwner(_) => MessageType::SessionOwner,
            Body::Chat(_) => MessageType::Chat,
            Body::Interval(_) => MessageType::Interval,
            Body::LaserTrail(_) => MessageType::LaserTrail,
            Body::MovePointer(_) => MessageType::MovePointer,
            Body::Marker(_) => MessageType::Marker,
            Body::UserAcl(_) => MessageType::UserAcl,
            Body::LayerAcl(_) => MessageType::LayerAcl,
            Body::SessionAcl(_) => MessageType::SessionAcl,
            Body::UndoPoint => MessageType::UndoPoint,
            Body::CanvasResize(_) => MessageType::CanvasResize,
            Body::LayerCreate(_) => MessageType::LayerCreate,
            Body::LayerAttributes(_) => MessageType::LayerAttributes,
            Body::LayerRetitle(_) => MessageType::LayerRetitle,
            Body::LayerOrder(_) => MessageType::LayerOrder,
            Body::LayerDelete(_) => MessageType::LayerDelete,
            Body::LayerVisibility(_) => MessageType::LayerVisibility,
            Body::PutImage(_) => MessageType::PutImage,
            Body::FillRect(_) => MessageType::FillRect,
            Body::ToolChange(_) => MessageType::ToolChange,
            Body::PenMove(_) => MessageType::PenMove,
            Body::PenUp => MessageType::PenUp,
            Body::AnnotationCreate(_) => MessageType::AnnotationCreate,
            Body::AnnotationReshape(_) => MessageType::AnnotationReshape,
            Body::AnnotationEdit(_) => MessageType::AnnotationEdit,
            Body::AnnotationDelete(_) => MessageType::AnnotationDelete,
            Body::Undo(_) => MessageType::Undo,
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            Body::Command(b) => b.payload_len(),
            Body::Disconnect(b) => b.payload_len(),
            Body::Ping(b) => b.payload_len(),
            Body::StreamPos(b) => b.payload_len(),
            Body::UserJoin(b) => b.payload_len(),
            Body::UserLeave => 0,
            Body::SessionOwner(b) => b.payload_len(),
            Body::Chat(b) => b.payload_len(),
            Body::Interval(b) => b.payload_len(),
            Body::LaserTrail(b) => b.payload_len(),
            Body::MovePointer(b) => b.payload_len(),
            Body::Marker(b) => b.payload_len(),
            Body::UserAcl(b) => b.payload_len(),
            Body::LayerAcl(b) => b.payload_len(),
            Body::SessionAcl(b) => b.payload_len(),
            Body::UndoPoint => 0,
            Body::CanvasResize(b) => b.payload_len(),
            Body::LayerCreate(b) => b.payload_len(),
            Body::LayerAttributes(b) => b.payload_len(),
            Body::LayerRetitle(b) => b.payload_len(),
            Body::LayerOrder(b) => b.payload_len(),
            Body::LayerDelete(b) => b.payload_len(),
            Body::LayerVisibility(b) => b.payload_len(),
            Body::PutImage(b) => b.payload_len(),
            Body::FillRect(b) => b.payload_len(),
            Body::ToolChange(b) => b.payload_len(),
            Body::PenMove(b) => b.payload_len(),
            Body::PenUp => 0,
            Body::AnnotationCreate(b) => b.payload_len(),
            Body::AnnotationReshape(b) => b.payload_len(),
            Body::AnnotationEdit(b) => b.payload_len(),
            Body::AnnotationDelete(b) => b.payload_len(),
            Body::Undo(b) => b.payload_len(),
        }
    }

    fn encode_payload(&self, w: &mut PayloadWriter) {
        match self {
            Body::Command(b) => b.encode(w),
            Body::Disconnect(b) => b.encode(w),
            Body::Ping(b) => b.encode(w),
            Body::StreamPos(b) => b.encode(w),
            Body::UserJoin(b) => b.encode(w),
            Body::UserLeave => {}
            Body::SessionOwner(b) => b.encode(w),
            Body::Chat(b) => b.encode(w),
            Body::Interval(b) => b.encode(w),
            Body::LaserTrail(b) => b.encode(w),
            Body::MovePointer(b) => b.encode(w),
            Body::Marker(b) => b.encode(w),
            Body::UserAcl(b) => b.encode(w),
            Body::LayerAcl(b) => b.encode(w),
            Body::SessionAcl(b) => b.encode(w),
            Body::UndoPoint => {}
            Body::CanvasResize(b) => b.encode(w),
            Body::LayerCreate(b) => b.encode(w),
            Body::LayerAttributes(b) => b.encode(w),
            Body::LayerRetitle(b) => b.encode(w),
            Body::LayerOrder(b) => b.encode(w),
            Body::LayerDelete(b) => b.encode(w),
            Body::LayerVisibility(b) => b.encode(w),
            Body::PutImage(b) => b.encode(w),
            Body::FillRect(b) => b.encode(w),
            Body::ToolChange(b) => b.encode(w),
            Body::PenMove(b) => b.encode(w),
            Body::PenUp => {}
            Body::AnnotationCreate(b) => b.encode(w),
            Body::AnnotationReshape(b) => b.encode(w),
            Body::AnnotationEdit(b) => b.encode(w),
            Body::AnnotationDelete(b) => b.encode(w),
            Body::Undo(b) => b.encode(w),
        }
    }

    fn decode(msg_type: MessageType, payload: &[u8]) -> Result<Body, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        let body = match msg_type {
            MessageType::Command => Body::Command(Command::decode(&mut r)?),
            MessageType::Disconnect => Body::Disconnect(Disconnect::decode(&mut r)?),
            MessageType::Ping => Body::Ping(Ping::decode(&mut r)?),
            MessageType::StreamPos => Body::StreamPos(StreamPos::decode(&mut r)?),
            MessageType::UserJoin => Body::UserJoin(UserJoin::decode(&mut r)?),
            MessageType::UserLeave => {
                r.validate(0, 0)?;
                Body::UserLeave
            }
            MessageType::SessionOwner => Body::SessionOwner(SessionOwner::decode(&mut r)?),
            MessageType::Chat => Body::Chat(Chat::decode(&mut r)?),
            MessageType::Interval => Body::Interval(Interval::decode(&mut r)?),
            MessageType::LaserTrail => Body::LaserTrail(LaserTrail::decode(&mut r)?),
            MessageType::MovePointer => Body::MovePointer(MovePointer::decode(&mut r)?),
            MessageType::Marker => Body::Marker(Marker::decode(&mut r)?),
            MessageType::UserAcl => Body::UserAcl(UserAcl::decode(&mut r)?),
            MessageType::LayerAcl => Body::LayerAcl(LayerAcl::decode(&mut r)?),
            MessageType::SessionAcl => Body::SessionAcl(SessionAcl::decode(&mut r)?),
            MessageType::UndoPoint => {
                r.validate(0, 0)?;
                Body::UndoPoint
            }
            MessageType::CanvasResize => Body::CanvasResize(CanvasResize::decode(&mut r)?),
            MessageType::LayerCreate => Body::LayerCreate(LayerCreate::decode(&mut r)?),
            MessageType::LayerAttributes => {
                Body::LayerAttributes(LayerAttributes::decode(&mut r)?)
            }
            MessageType::LayerRetitle => Body::LayerRetitle(LayerRetitle::decode(&mut r)?),
            MessageType::LayerOrder => Body::LayerOrder(LayerOrder::decode(&mut r)?),
            MessageType::LayerDelete => Body::LayerDelete(LayerDelete::decode(&mut r)?),
            MessageType::LayerVisibility => {
                Body::LayerVisibility(LayerVisibility::decode(&mut r)?)
            }
            MessageType::PutImage => Body::PutImage(PutImage::decode(&mut r)?),
            MessageType::FillRect => Body::FillRect(FillRect::decode(&mut r)?),
            MessageType::ToolChange => Body::ToolChange(ToolChange::decode(&mut r)?),
            MessageType::PenMove => Body::PenMove(PenMove::decode(&mut r)?),
            MessageType::PenUp => {
                r.validate(0, 0)?;
                Body::PenUp
            }
            MessageType::AnnotationCreate => {
                Body::AnnotationCreate(AnnotationCreate::decode(&mut r)?)
            }
            MessageType::AnnotationReshape => {
                Body::AnnotationReshape(AnnotationReshape::decode(&mut r)?)
            }
            MessageType::AnnotationEdit => Body::AnnotationEdit(AnnotationEdit::decode(&mut r)?),
            MessageType::AnnotationDelete => {
                Body::AnnotationDelete(AnnotationDelete::decode(&mut r)?)
            }
            MessageType::Undo => Body::Undo(Undo::decode(&mut r)?),
        };
        Ok(body)
    }
}

// ───────────────────────── message envelope ─────────────────────────

/// A single session message: origin user, typed body, undo marker.
///
/// The origin is fixed at construction. Id 0 is reserved for the
/// server, so client side code passes its own session id and servers
/// pass 0.
#[derive(Debug)]
pub struct Message {
    origin: UserId,
    undo: AtomicU8,
    body: Body,
}

impl Message {
    /// Wraps a body with an origin. The undo marker starts at
    /// [`UndoState::Done`].
    pub fn new(origin: UserId, body: Body) -> Message {
        Message {
            origin,
            undo: AtomicU8::new(UndoState::Done as u8),
            body,
        }
    }

    // ── accessors ──

    pub fn origin_user(&self) -> UserId {
        self.origin
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    pub fn band(&self) -> MessageBand {
        self.body.message_type().band()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn is_control(&self) -> bool {
        self.body.message_type().is_control()
    }

    pub fn is_meta(&self) -> bool {
        self.body.message_type().is_meta()
    }

    pub fn is_command(&self) -> bool {
        self.body.message_type().is_command()
    }

    /// Opaque messages are relayed by the server without inspection.
    pub fn is_opaque(&self) -> bool {
        self.body.message_type().is_opaque()
    }

    /// Recordable messages belong in session recordings. The control
    /// band is connection plumbing and is never recorded.
    pub fn is_recordable(&self) -> bool {
        self.body.message_type().is_recordable()
    }

    /// Messages that grant or revoke privileges.
    pub fn is_op_command(&self) -> bool {
        self.body.message_type().is_op_command()
    }

    /// Only command band messages take part in undo history.
    pub fn is_undoable(&self) -> bool {
        self.is_command()
    }

    // ── undo marker ──

    pub fn undo_state(&self) -> UndoState {
        UndoState::from_bits(self.undo.load(Ordering::Relaxed))
    }

    /// Marks the message done, undone, or gone. Silently ignored for
    /// message types the undo system does not track.
    pub fn set_undo_state(&self, state: UndoState) {
        if self.is_undoable() {
            self.undo.store(state as u8, Ordering::Relaxed);
        }
    }

    // ── wire format ──

    /// Total encoded size, header included.
    pub fn length(&self) -> usize {
        HEADER_LEN + self.body.payload_len()
    }

    /// Serializes the message into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload_len = self.body.payload_len();
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(payload_len));
        }
        let mut w = PayloadWriter::new(self.message_type(), self.origin, payload_len);
        self.body.encode_payload(&mut w);
        Ok(w.finish())
    }

    /// Parses one message from the front of `buf`.
    ///
    /// `buf` may extend past the message; trailing bytes are left for
    /// the next call. `max_len` caps the announced total length so a
    /// hostile header cannot make the caller wait for a frame that
    /// never fits.
    pub fn decode(buf: &[u8], max_len: usize) -> Result<Message, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedHeader);
        }
        let payload_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        let total = HEADER_LEN + payload_len;
        if total > max_len {
            return Err(ProtocolError::TooLong {
                announced: total,
                limit: max_len,
            });
        }
        if buf.len() < total {
            return Err(ProtocolError::Truncated);
        }
        let msg_type =
            MessageType::from_code(buf[2]).ok_or(ProtocolError::UnknownType(buf[2]))?;
        let body = Body::decode(msg_type, &buf[HEADER_LEN..total])?;
        Ok(Message::new(buf[3], body))
    }

    // ── control band constructors ──

    pub fn command(origin: UserId, envelope: &ServerCommand) -> Result<Message, ProtocolError> {
        Ok(Message::new(
            origin,
            Body::Command(Command::from_command(envelope)?),
        ))
    }

    pub fn command_reply(origin: UserId, envelope: &ServerReply) -> Result<Message, ProtocolError> {
        Ok(Message::new(
            origin,
            Body::Command(Command::from_reply(envelope)?),
        ))
    }

    pub fn disconnect(
        origin: UserId,
        reason: DisconnectReason,
        message: impl Into<String>,
    ) -> Message {
        Message::new(origin, Body::Disconnect(Disconnect::new(reason, message)))
    }

    pub fn ping(origin: UserId) -> Message {
        Message::new(origin, Body::Ping(Ping::ping()))
    }

    pub fn pong(origin: UserId) -> Message {
        Message::new(origin, Body::Ping(Ping::pong()))
    }

    pub fn stream_pos(origin: UserId, bytes: u32) -> Message {
        Message::new(origin, Body::StreamPos(StreamPos::new(bytes)))
    }

    // ── meta band constructors ──

    pub fn user_join(origin: UserId, name: impl Into<String>) -> Message {
        Message::new(origin, Body::UserJoin(UserJoin::new(name)))
    }

    pub fn user_leave(origin: UserId) -> Message {
        Message::new(origin, Body::UserLeave)
    }

    pub fn session_owner(origin: UserId, users: Vec<UserId>) -> Message {
        Message::new(origin, Body::SessionOwner(SessionOwner::new(users)))
    }

    pub fn chat(origin: UserId, message: impl Into<String>) -> Message {
        Message::new(origin, Body::Chat(Chat::new(message)))
    }

    pub fn interval(origin: UserId, ms: u16) -> Message {
        Message::new(origin, Body::Interval(Interval::new(ms)))
    }

    pub fn laser_trail(origin: UserId, color: u32, persistence: u8) -> Message {
        Message::new(origin, Body::LaserTrail(LaserTrail::new(color, persistence)))
    }

    pub fn move_pointer(origin: UserId, x: i32, y: i32) -> Message {
        Message::new(origin, Body::MovePointer(MovePointer::new(x, y)))
    }

    pub fn marker(origin: UserId, text: impl Into<String>) -> Message {
        Message::new(origin, Body::Marker(Marker::new(text)))
    }

    pub fn user_acl(origin: UserId, users: Vec<UserId>) -> Message {
        Message::new(origin, Body::UserAcl(UserAcl::new(users)))
    }

    pub fn layer_acl(
        origin: UserId,
        layer: LayerId,
        locked: bool,
        exclusive: Vec<UserId>,
    ) -> Message {
        Message::new(origin, Body::LayerAcl(LayerAcl::new(layer, locked, exclusive)))
    }

    pub fn session_acl(origin: UserId, flags: u16) -> Message {
        Message::new(origin, Body::SessionAcl(SessionAcl::new(flags)))
    }

    // ── command band constructors ──

    pub fn undo_point(origin: UserId) -> Message {
        Message::new(origin, Body::UndoPoint)
    }

    pub fn canvas_resize(origin: UserId, top: i32, right: i32, bottom: i32, left: i32) -> Message {
        Message::new(
            origin,
            Body::CanvasResize(CanvasResize::new(top, right, bottom, left)),
        )
    }

    pub fn layer_create(
        origin: UserId,
        layer: LayerId,
        fill: u32,
        title: impl Into<String>,
    ) -> Message {
        Message::new(origin, Body::LayerCreate(LayerCreate::new(layer, fill, title)))
    }

    pub fn layer_attributes(origin: UserId, layer: LayerId, opacity: u8, blend: u8) -> Message {
        Message::new(
            origin,
            Body::LayerAttributes(LayerAttributes::new(layer, opacity, blend)),
        )
    }

    pub fn layer_retitle(origin: UserId, layer: LayerId, title: impl Into<String>) -> Message {
        Message::new(origin, Body::LayerRetitle(LayerRetitle::new(layer, title)))
    }

    pub fn layer_order(origin: UserId, layers: Vec<LayerId>) -> Message {
        Message::new(origin, Body::LayerOrder(LayerOrder::new(layers)))
    }

    pub fn layer_delete(origin: UserId, layer: LayerId, merge: bool) -> Message {
        Message::new(origin, Body::LayerDelete(LayerDelete::new(layer, merge)))
    }

    pub fn layer_visibility(origin: UserId, layer: LayerId, visible: bool) -> Message {
        Message::new(
            origin,
            Body::LayerVisibility(LayerVisibility::new(layer, visible)),
        )
    }

    pub fn put_image(origin: UserId, image: PutImage) -> Message {
        Message::new(origin, Body::PutImage(image))
    }

    pub fn fill_rect(origin: UserId, fill: FillRect) -> Message {
        Message::new(origin, Body::FillRect(fill))
    }

    pub fn tool_change(origin: UserId, layer: LayerId, params: Vec<u8>) -> Message {
        Message::new(origin, Body::ToolChange(ToolChange::new(layer, params)))
    }

    pub fn pen_move(origin: UserId, points: Vec<PenPoint>) -> Message {
        Message::new(origin, Body::PenMove(PenMove::new(points)))
    }

    pub fn pen_up(origin: UserId) -> Message {
        Message::new(origin, Body::PenUp)
    }

    pub fn annotation_create(origin: UserId, id: u16, x: i32, y: i32, w: u16, h: u16) -> Message {
        Message::new(
            origin,
            Body::AnnotationCreate(AnnotationCreate::new(id, x, y, w, h)),
        )
    }

    pub fn annotation_reshape(origin: UserId, id: u16, x: i32, y: i32, w: u16, h: u16) -> Message {
        Message::new(
            origin,
            Body::AnnotationReshape(AnnotationReshape::new(id, x, y, w, h)),
        )
    }

    pub fn annotation_edit(
        origin: UserId,
        id: u16,
        background: u32,
        text: impl Into<String>,
    ) -> Message {
        Message::new(
            origin,
            Body::AnnotationEdit(AnnotationEdit::new(id, background, text)),
        )
    }

    pub fn annotation_delete(origin: UserId, id: u16) -> Message {
        Message::new(origin, Body::AnnotationDelete(AnnotationDelete::new(id)))
    }

    pub fn undo(origin: UserId, override_user: UserId, redo: bool) -> Message {
        Message::new(origin, Body::Undo(Undo::new(override_user, redo)))
    }
}

impl Clone for Message {
    fn clone(&self) -> Message {
        Message {
            origin: self.origin,
            undo: AtomicU8::new(self.undo.load(Ordering::Relaxed)),
            body: self.body.clone(),
        }
    }
}

/// Origin and body only. The undo marker is bookkeeping, not content.
impl PartialEq for Message {
    fn eq(&self, other: &Message) -> bool {
        self.origin == other.origin && self.body == other.body
    }
}

// ───────────────────────── shared handle ─────────────────────────

/// Reference counted handle to an immutable [`Message`].
///
/// The recorder, the undo history, and the canvas pipeline all hold
/// the same allocation. The undo marker is atomic, so a mark set
/// through one handle is visible through every other.
#[derive(Debug, Clone)]
pub struct MessageHandle(Arc<Message>);

impl MessageHandle {
    pub fn new(message: Message) -> MessageHandle {
        MessageHandle(Arc::new(message))
    }

    /// Number of live handles to this message.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Deref for MessageHandle {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.0
    }
}

impl From<Message> for MessageHandle {
    fn from(message: Message) -> MessageHandle {
        MessageHandle::new(message)
    }
}

impl PartialEq for MessageHandle {
    fn eq(&self, other: &MessageHandle) -> bool {
        *self.0 == *other.0
    }
}

// ===================================================================
// Tests
// ===================================================================
