//! Command band payloads (codes 128 through 255).
//!
//! Command messages mutate the canvas and are the only band the
//! undo system tracks. Every replica must apply them in the same
//! order, so the payload layouts here are fixed width wherever the
//! content allows it. Blob carrying types (`PutImage`, `ToolChange`)
//! append their variable part after the fixed header fields.

use crate::types::{LayerId, UserId};
use crate::wire::{PayloadReader, PayloadWriter, ProtocolError, MAX_PAYLOAD_LEN};

/// Grows or shrinks the canvas by the given number of pixels per edge.
/// Negative values crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasResize {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl CanvasResize {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> CanvasResize {
        CanvasResize {
            top,
            right,
            bottom,
            left,
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<CanvasResize, ProtocolError> {
        r.validate(16, 16)?;
        Ok(CanvasResize {
            top: r.read_i32()?,
            right: r.read_i32()?,
            bottom: r.read_i32()?,
            left: r.read_i32()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_i32(self.top);
        w.write_i32(self.right);
        w.write_i32(self.bottom);
        w.write_i32(self.left);
    }

    pub(crate) fn payload_len(&self) -> usize {
        16
    }
}

/// Creates a new layer. The layer id's high byte must match the
/// message origin, which makes creator attribution checkable without
/// extra bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerCreate {
    pub layer: LayerId,
    pub fill: u32,
    pub title: String,
}

impl LayerCreate {
    pub fn new(layer: LayerId, fill: u32, title: impl Into<String>) -> LayerCreate {
        LayerCreate {
            layer,
            fill,
            title: title.into(),
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LayerCreate, ProtocolError> {
        r.validate(6, MAX_PAYLOAD_LEN)?;
        Ok(LayerCreate {
            layer: r.read_layer_id()?,
            fill: r.read_u32()?,
            title: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_u32(self.fill);
        w.write_str(&self.title);
    }

    pub(crate) fn payload_len(&self) -> usize {
        6 + self.title.len()
    }
}

/// Changes a layer's opacity and blend mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerAttributes {
    pub layer: LayerId,
    pub opacity: u8,
    pub blend: u8,
}

impl LayerAttributes {
    pub fn new(layer: LayerId, opacity: u8, blend: u8) -> LayerAttributes {
        LayerAttributes {
            layer,
            opacity,
            blend,
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LayerAttributes, ProtocolError> {
        r.validate(4, 4)?;
        Ok(LayerAttributes {
            layer: r.read_layer_id()?,
            opacity: r.read_u8()?,
            blend: r.read_u8()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_u8(self.opacity);
        w.write_u8(self.blend);
    }

    pub(crate) fn payload_len(&self) -> usize {
        4
    }
}

/// Renames a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRetitle {
    pub layer: LayerId,
    pub title: String,
}

impl LayerRetitle {
    pub fn new(layer: LayerId, title: impl Into<String>) -> LayerRetitle {
        LayerRetitle {
            layer,
            title: title.into(),
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LayerRetitle, ProtocolError> {
        r.validate(2, MAX_PAYLOAD_LEN)?;
        Ok(LayerRetitle {
            layer: r.read_layer_id()?,
            title: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_str(&self.title);
    }

    pub(crate) fn payload_len(&self) -> usize {
        2 + self.title.len()
    }
}

/// Reorders the layer stack. The list holds every layer id in the new
/// stacking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOrder {
    pub layers: Vec<LayerId>,
}

impl LayerOrder {
    pub fn new(layers: Vec<LayerId>) -> LayerOrder {
        LayerOrder { layers }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LayerOrder, ProtocolError> {
        if r.remaining() % 2 != 0 {
            return Err(ProtocolError::InvalidField("layer order id list"));
        }
        let mut layers = Vec::with_capacity(r.remaining() / 2);
        while r.remaining() > 0 {
            layers.push(r.read_layer_id()?);
        }
        Ok(LayerOrder { layers })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        for layer in &self.layers {
            w.write_layer_id(*layer);
        }
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.layers.len() * 2
    }
}

/// Deletes a layer, optionally merging its content into the layer
/// below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDelete {
    pub layer: LayerId,
    pub merge: bool,
}

impl LayerDelete {
    pub fn new(layer: LayerId, merge: bool) -> LayerDelete {
        LayerDelete { layer, merge }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LayerDelete, ProtocolError> {
        r.validate(3, 3)?;
        Ok(LayerDelete {
            layer: r.read_layer_id()?,
            merge: r.read_u8()? != 0,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_u8(self.merge as u8);
    }

    pub(crate) fn payload_len(&self) -> usize {
        3
    }
}

/// Toggles layer visibility. Affects rendering only, so it passes the
/// filter without a lock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    pub layer: LayerId,
    pub visible: bool,
}

impl LayerVisibility {
    pub fn new(layer: LayerId, visible: bool) -> LayerVisibility {
        LayerVisibility { layer, visible }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<LayerVisibility, ProtocolError> {
        r.validate(3, 3)?;
        Ok(LayerVisibility {
            layer: r.read_layer_id()?,
            visible: r.read_u8()? != 0,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_u8(self.visible as u8);
    }

    pub(crate) fn payload_len(&self) -> usize {
        3
    }
}

/// Pastes an image blob onto a layer region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutImage {
    pub layer: LayerId,
    pub mode: u8,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub image: Vec<u8>,
}

impl PutImage {
    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<PutImage, ProtocolError> {
        r.validate(19, MAX_PAYLOAD_LEN)?;
        Ok(PutImage {
            layer: r.read_layer_id()?,
            mode: r.read_u8()?,
            x: r.read_u32()?,
            y: r.read_u32()?,
            w: r.read_u32()?,
            h: r.read_u32()?,
            image: r.read_remaining().to_vec(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_u8(self.mode);
        w.write_u32(self.x);
        w.write_u32(self.y);
        w.write_u32(self.w);
        w.write_u32(self.h);
        w.write_bytes(&self.image);
    }

    pub(crate) fn payload_len(&self) -> usize {
        19 + self.image.len()
    }
}

/// Fills a rectangle with a solid color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRect {
    pub layer: LayerId,
    pub mode: u8,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub color: u32,
}

impl FillRect {
    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<FillRect, ProtocolError> {
        r.validate(23, 23)?;
        Ok(FillRect {
            layer: r.read_layer_id()?,
            mode: r.read_u8()?,
            x: r.read_u32()?,
            y: r.read_u32()?,
            w: r.read_u32()?,
            h: r.read_u32()?,
            color: r.read_u32()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_u8(self.mode);
        w.write_u32(self.x);
        w.write_u32(self.y);
        w.write_u32(self.w);
        w.write_u32(self.h);
        w.write_u32(self.color);
    }

    pub(crate) fn payload_len(&self) -> usize {
        23
    }
}

/// Selects the drawing tool and target layer. Subsequent `PenMove`
/// messages from the same user land on this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolChange {
    pub layer: LayerId,
    /// Opaque tool configuration, interpreted by the paint engine.
    pub params: Vec<u8>,
}

impl ToolChange {
    pub fn new(layer: LayerId, params: Vec<u8>) -> ToolChange {
        ToolChange { layer, params }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<ToolChange, ProtocolError> {
        r.validate(2, MAX_PAYLOAD_LEN)?;
        Ok(ToolChange {
            layer: r.read_layer_id()?,
            params: r.read_remaining().to_vec(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_layer_id(self.layer);
        w.write_bytes(&self.params);
    }

    pub(crate) fn payload_len(&self) -> usize {
        2 + self.params.len()
    }
}

/// One sampled pen position with pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenPoint {
    pub x: i32,
    pub y: i32,
    pub pressure: u16,
}

impl PenPoint {
    /// Encoded size of a single point.
    pub const LEN: usize = 10;

    pub fn new(x: i32, y: i32, pressure: u16) -> PenPoint {
        PenPoint { x, y, pressure }
    }
}

/// A batch of pen positions forming a stroke segment. Points are
/// batched so a fast stylus does not flood the session with one
/// message per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenMove {
    pub points: Vec<PenPoint>,
}

impl PenMove {
    pub fn new(points: Vec<PenPoint>) -> PenMove {
        debug_assert!(!points.is_empty());
        PenMove { points }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<PenMove, ProtocolError> {
        r.validate(PenPoint::LEN, MAX_PAYLOAD_LEN)?;
        if r.remaining() % PenPoint::LEN != 0 {
            return Err(ProtocolError::InvalidField("pen move point list"));
        }
        let mut points = Vec::with_capacity(r.remaining() / PenPoint::LEN);
        while r.remaining() > 0 {
            points.push(PenPoint {
                x: r.read_i32()?,
                y: r.read_i32()?,
                pressure: r.read_u16()?,
            });
        }
        Ok(PenMove { points })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        for p in &self.points {
            w.write_i32(p.x);
            w.write_i32(p.y);
            w.write_u16(p.pressure);
        }
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.points.len() * PenPoint::LEN
    }
}

/// Creates a floating text annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationCreate {
    pub id: u16,
    pub x: i32,
    pub y: i32,
    pub w: u16,
    pub h: u16,
}

impl AnnotationCreate {
    pub fn new(id: u16, x: i32, y: i32, w: u16, h: u16) -> AnnotationCreate {
        AnnotationCreate { id, x, y, w, h }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<AnnotationCreate, ProtocolError> {
        r.validate(14, 14)?;
        Ok(AnnotationCreate {
            id: r.read_u16()?,
            x: r.read_i32()?,
            y: r.read_i32()?,
            w: r.read_u16()?,
            h: r.read_u16()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u16(self.id);
        w.write_i32(self.x);
        w.write_i32(self.y);
        w.write_u16(self.w);
        w.write_u16(self.h);
    }

    pub(crate) fn payload_len(&self) -> usize {
        14
    }
}

/// Moves or resizes an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationReshape {
    pub id: u16,
    pub x: i32,
    pub y: i32,
    pub w: u16,
    pub h: u16,
}

impl AnnotationReshape {
    pub fn new(id: u16, x: i32, y: i32, w: u16, h: u16) -> AnnotationReshape {
        AnnotationReshape { id, x, y, w, h }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<AnnotationReshape, ProtocolError> {
        r.validate(14, 14)?;
        Ok(AnnotationReshape {
            id: r.read_u16()?,
            x: r.read_i32()?,
            y: r.read_i32()?,
            w: r.read_u16()?,
            h: r.read_u16()?,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u16(self.id);
        w.write_i32(self.x);
        w.write_i32(self.y);
        w.write_u16(self.w);
        w.write_u16(self.h);
    }

    pub(crate) fn payload_len(&self) -> usize {
        14
    }
}

/// Sets an annotation's background color and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationEdit {
    pub id: u16,
    pub background: u32,
    pub text: String,
}

impl AnnotationEdit {
    pub fn new(id: u16, background: u32, text: impl Into<String>) -> AnnotationEdit {
        AnnotationEdit {
            id,
            background,
            text: text.into(),
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<AnnotationEdit, ProtocolError> {
        r.validate(6, MAX_PAYLOAD_LEN)?;
        Ok(AnnotationEdit {
            id: r.read_u16()?,
            background: r.read_u32()?,
            text: r.read_remaining_str()?.to_owned(),
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u16(self.id);
        w.write_u32(self.background);
        w.write_str(&self.text);
    }

    pub(crate) fn payload_len(&self) -> usize {
        6 + self.text.len()
    }
}

/// Removes an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationDelete {
    pub id: u16,
}

impl AnnotationDelete {
    pub fn new(id: u16) -> AnnotationDelete {
        AnnotationDelete { id }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<AnnotationDelete, ProtocolError> {
        r.validate(2, 2)?;
        Ok(AnnotationDelete { id: r.read_u16()? })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u16(self.id);
    }

    pub(crate) fn payload_len(&self) -> usize {
        2
    }
}

/// Undoes or redoes the most recent undo point. Operators may undo on
/// behalf of another user by setting `override_user` to a nonzero id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Undo {
    pub override_user: UserId,
    pub redo: bool,
}

impl Undo {
    pub fn new(override_user: UserId, redo: bool) -> Undo {
        Undo {
            override_user,
            redo,
        }
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Result<Undo, ProtocolError> {
        r.validate(2, 2)?;
        Ok(Undo {
            override_user: r.read_u8()?,
            redo: r.read_u8()? != 0,
        })
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.write_u8(self.override_user);
        w.write_u8(self.redo as u8);
    }

    pub(crate) fn payload_len(&self) -> usize {
        2
    }
}

// ===================================================================
// Tests
// ===================================================================
