//! Protocol identifiers and the message type taxonomy.
//!
//! Every message type has a fixed 8-bit code. The code space is split into
//! three bands, and all classification is derived from the numeric value
//! alone:
//!
//! ```text
//! ┌────────────┬─────────┬──────────────────────────────────────────┐
//! │ code range │ band    │ handling                                 │
//! ├────────────┼─────────┼──────────────────────────────────────────┤
//! │   0..=31   │ control │ transparent, server bookkeeping          │
//! │  32..=63   │ meta    │ transparent, session lifecycle           │
//! │  64..=127  │ meta    │ opaque, relayed without inspection       │
//! │ 128..=255  │ command │ opaque, drawing stream, undoable         │
//! └────────────┴─────────┴──────────────────────────────────────────┘
//! ```
//!
//! Every replica derives the same classification from the same code, which
//! is what keeps access control verdicts identical across clients and the
//! server.

use std::fmt;

/// User (origin) identifier. 0 is reserved for "no user / system origin".
pub type UserId = u8;

/// Message type codes.
///
/// The roster is closed: a code that does not appear here fails decoding,
/// so unknown future types are rejected rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    // Control band (transparent)
    /// Server command/reply channel, JSON payload
    Command = 0,
    /// Connection teardown notice with a reason
    Disconnect = 1,
    /// Keepalive probe or its answer
    Ping = 2,
    /// Download progress marker for session catch-up
    StreamPos = 3,

    // Meta band (transparent)
    /// A user joined the session
    UserJoin = 32,
    /// A user left the session
    UserLeave = 33,
    /// Replaces the set of session operators
    SessionOwner = 34,

    // Meta band (opaque)
    /// Chat line
    Chat = 64,
    /// Playback pause hint for recordings
    Interval = 65,
    /// Laser pointer trail color and fade time
    LaserTrail = 66,
    /// Pointer position update
    MovePointer = 67,
    /// Recording annotation marker
    Marker = 68,
    /// Replaces the set of locked users
    UserAcl = 69,
    /// Lock/exclusivity change for one layer
    LayerAcl = 70,
    /// Session wide permission flags
    SessionAcl = 71,

    // Command band (opaque)
    /// Undo history savepoint
    UndoPoint = 128,
    /// Canvas edge adjustment
    CanvasResize = 129,
    /// New layer
    LayerCreate = 130,
    /// Layer opacity/blend mode change
    LayerAttributes = 131,
    /// Layer rename
    LayerRetitle = 132,
    /// Full layer stack reorder
    LayerOrder = 133,
    /// Layer removal, optionally merging down
    LayerDelete = 134,
    /// Layer visibility toggle
    LayerVisibility = 135,
    /// Pixel data paste onto a layer
    PutImage = 136,
    /// Rectangle fill on a layer
    FillRect = 137,
    /// Tool selection, declares the sender's active layer
    ToolChange = 138,
    /// Pen stroke points for the current tool
    PenMove = 139,
    /// End of pen stroke
    PenUp = 140,
    /// New text annotation
    AnnotationCreate = 141,
    /// Annotation move/resize
    AnnotationReshape = 142,
    /// Annotation content change
    AnnotationEdit = 143,
    /// Annotation removal
    AnnotationDelete = 144,
    /// Undo or redo action
    Undo = 255,
}

impl MessageType {
    /// Look up a type by its wire code.
    pub fn from_code(code: u8) -> Option<MessageType> {
        use MessageType::*;
        Some(match code {
            0 => Command,
            1 => Disconnect,
            2 => Ping,
            3 => StreamPos,
            32 => UserJoin,
            33 => UserLeave,
            34 => SessionOwner,
            64 => Chat,
            65 => Interval,
            66 => LaserTrail,
            67 => MovePointer,
            68 => Marker,
            69 => UserAcl,
            70 => LayerAcl,
            71 => SessionAcl,
            128 => UndoPoint,
            129 => CanvasResize,
            130 => LayerCreate,
            131 => LayerAttributes,
            132 => LayerRetitle,
            133 => LayerOrder,
            134 => LayerDelete,
            135 => LayerVisibility,
            136 => PutImage,
            137 => FillRect,
            138 => ToolChange,
            139 => PenMove,
            140 => PenUp,
            141 => AnnotationCreate,
            142 => AnnotationReshape,
            143 => AnnotationEdit,
            144 => AnnotationDelete,
            255 => Undo,
            _ => return None,
        })
    }

    /// Wire code of this type.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Control messages speak to the server, not the session.
    pub fn is_control(self) -> bool {
        (self as u8) < 32
    }

    /// Meta messages are part of the session but do not draw anything.
    /// The ACL related ones steer how command messages are filtered.
    pub fn is_meta(self) -> bool {
        let code = self as u8;
        (32..128).contains(&code)
    }

    /// Command messages are the drawing stream. The canvas can be
    /// reconstructed exactly from command messages alone.
    pub fn is_command(self) -> bool {
        (self as u8) >= 128
    }

    /// Opaque messages are relayed by the server as raw bytes without
    /// being understood.
    pub fn is_opaque(self) -> bool {
        (self as u8) >= 64
    }

    /// Everything except the control band ends up in session recordings.
    pub fn is_recordable(self) -> bool {
        (self as u8) >= 32
    }

    /// Types that require session operator privilege to send.
    pub fn is_op_command(self) -> bool {
        matches!(
            self,
            MessageType::SessionOwner | MessageType::SessionAcl | MessageType::UserAcl
        )
    }

    /// Coarse band of this type.
    pub fn band(self) -> MessageBand {
        if self.is_control() {
            MessageBand::Control
        } else if self.is_meta() {
            MessageBand::Meta
        } else {
            MessageBand::Command
        }
    }
}

/// The three bands of the code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageBand {
    /// Client/server bookkeeping, never recorded.
    Control,
    /// Session state updates, recorded but not drawn.
    Meta,
    /// Drawing operations.
    Command,
}

/// Local undo marker for command messages.
///
/// This is not part of the protocol and is never serialized. It exists so
/// each replica can track its own undo history directly on the shared
/// message instances instead of keeping a side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UndoState {
    /// Applied and not undone.
    Done = 0x00,
    /// Undone, can still be redone.
    Undone = 0x01,
    /// Undone for good, no redo possible.
    Gone = 0x03,
}

impl UndoState {
    pub(crate) fn from_bits(bits: u8) -> UndoState {
        match bits {
            0x00 => UndoState::Done,
            0x01 => UndoState::Undone,
            _ => UndoState::Gone,
        }
    }
}

/// Layer identifier with the creator's user id packed into the high byte.
///
/// The packing is what "own layer" permission checks are built on, so the
/// encode/decode pair lives here and nowhere else. Id 0 is never a real
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LayerId(u16);

impl LayerId {
    /// Build an id from the creating user and a per-creator index.
    pub fn new(creator: UserId, index: u8) -> LayerId {
        LayerId(u16::from_be_bytes([creator, index]))
    }

    /// Wrap a raw wire value.
    pub fn from_raw(raw: u16) -> LayerId {
        LayerId(raw)
    }

    /// Raw wire value.
    pub fn raw(self) -> u16 {
        self.0
    }

    /// The user that created this layer.
    pub fn creator(self) -> UserId {
        (self.0 >> 8) as UserId
    }

    /// Per-creator layer index.
    pub fn index(self) -> u8 {
        (self.0 & 0x00ff) as u8
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [MessageType; 33] = [
        MessageType::Command,
        MessageType::Disconnect,
        MessageType::Ping,
        MessageType::StreamPos,
        MessageType::UserJoin,
        MessageType::UserLeave,
        MessageType::SessionOwner,
        MessageType::Chat,
        MessageType::Interval,
        MessageType::LaserTrail,
        MessageType::MovePointer,
        MessageType::Marker,
        MessageType::UserAcl,
        MessageType::LayerAcl,
        MessageType::SessionAcl,
        MessageType::UndoPoint,
        MessageType::CanvasResize,
        MessageType::LayerCreate,
        MessageType::LayerAttributes,
        MessageType::LayerRetitle,
        MessageType::LayerOrder,
        MessageType::LayerDelete,
        MessageType::LayerVisibility,
        MessageType::PutImage,
        MessageType::FillRect,
        MessageType::ToolChange,
        MessageType::PenMove,
        MessageType::PenUp,
        MessageType::AnnotationCreate,
        MessageType::AnnotationReshape,
        MessageType::AnnotationEdit,
        MessageType::AnnotationDelete,
        MessageType::Undo,
    ];

    // ── MessageType tests ────────────────────────────────────────

    #[test]
    fn test_code_roundtrip_all_types() {
        for t in ALL_TYPES {
            assert_eq!(MessageType::from_code(t.code()), Some(t));
        }
    }

    #[test]
    fn test_unassigned_codes_rejected() {
        for code in [4u8, 16, 31, 35, 63, 72, 100, 127, 145, 200, 254] {
            assert_eq!(MessageType::from_code(code), None, "code {code}");
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert!(MessageType::Command.is_control());
        assert!(MessageType::StreamPos.is_control());
        assert_eq!(MessageType::Ping.band(), MessageBand::Control);

        assert!(MessageType::UserJoin.is_meta());
        assert!(!MessageType::UserJoin.is_opaque());
        assert!(MessageType::SessionAcl.is_meta());
        assert!(MessageType::SessionAcl.is_opaque());
        assert_eq!(MessageType::Chat.band(), MessageBand::Meta);

        assert!(MessageType::UndoPoint.is_command());
        assert!(MessageType::UndoPoint.is_opaque());
        assert!(MessageType::Undo.is_command());
        assert_eq!(MessageType::PenMove.band(), MessageBand::Command);
    }

    #[test]
    fn test_recordable_excludes_control_band() {
        for t in ALL_TYPES {
            assert_eq!(t.is_recordable(), !t.is_control(), "{t:?}");
        }
    }

    #[test]
    fn test_bands_are_exclusive() {
        for t in ALL_TYPES {
            let bands = [t.is_control(), t.is_meta(), t.is_command()];
            assert_eq!(bands.iter().filter(|b| **b).count(), 1, "{t:?}");
        }
    }

    #[test]
    fn test_op_command_types() {
        for t in ALL_TYPES {
            let expected = matches!(
                t,
                MessageType::SessionOwner | MessageType::SessionAcl | MessageType::UserAcl
            );
            assert_eq!(t.is_op_command(), expected, "{t:?}");
        }
    }

    // ── LayerId tests ────────────────────────────────────────────

    #[test]
    fn test_layer_id_creator_roundtrip() {
        for creator in 0..=255u8 {
            for index in 0..=255u8 {
                let id = LayerId::new(creator, index);
                assert_eq!(id.creator(), creator);
                assert_eq!(id.index(), index);
                assert_eq!(id.raw() >> 8, creator as u16);
            }
        }
    }

    #[test]
    fn test_layer_id_raw_roundtrip() {
        let id = LayerId::from_raw(0x0502);
        assert_eq!(id.creator(), 5);
        assert_eq!(id.index(), 2);
        assert_eq!(id.raw(), 0x0502);
    }

    #[test]
    fn test_layer_id_display() {
        assert_eq!(LayerId::from_raw(0x0502).to_string(), "0x0502");
        assert_eq!(LayerId::default().to_string(), "0x0000");
    }

    // ── UndoState tests ──────────────────────────────────────────

    #[test]
    fn test_undo_state_bits() {
        assert_eq!(UndoState::from_bits(0x00), UndoState::Done);
        assert_eq!(UndoState::from_bits(0x01), UndoState::Undone);
        assert_eq!(UndoState::from_bits(0x02), UndoState::Gone);
        assert_eq!(UndoState::from_bits(0x03), UndoState::Gone);
        assert_eq!(UndoState::Gone as u8, 0x03);
    }
}
