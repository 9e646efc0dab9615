//! Per-layer access control roster.
//!
//! Holds one [`LayerAclEntry`] per known layer, in stacking order.
//! Canvas code creates and removes layers through the shared handle;
//! the filter only reads lock state and rewrites ACLs. The roster
//! carries no pixel data.

use std::sync::{Arc, RwLock};

use fresco_protocol::types::{LayerId, UserId};

/// Shared handle to the roster. The filter holds one clone, the
/// canvas another.
pub type SharedLayerAcls = Arc<RwLock<LayerAcls>>;

/// Lock state for a single layer.
///
/// A locked layer is locked for everyone. A non-empty exclusive list
/// locks the layer for every user not on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerAclEntry {
    pub locked: bool,
    pub exclusive: Vec<UserId>,
}

impl LayerAclEntry {
    pub fn is_locked_for(&self, user: UserId) -> bool {
        self.locked || (!self.exclusive.is_empty() && !self.exclusive.contains(&user))
    }
}

/// ACL roster for every layer in the session, ordered bottom to top.
#[derive(Debug, Default)]
pub struct LayerAcls {
    layers: Vec<(LayerId, LayerAclEntry)>,
}

impl LayerAcls {
    pub fn new() -> LayerAcls {
        LayerAcls { layers: Vec::new() }
    }

    /// Wraps the roster for sharing between the canvas and the filter.
    pub fn shared(self) -> SharedLayerAcls {
        Arc::new(RwLock::new(self))
    }

    /// Registers a layer with a default (unlocked) ACL. Returns false
    /// if the id is already known.
    pub fn add_layer(&mut self, id: LayerId) -> bool {
        if self.position(id).is_some() {
            return false;
        }
        self.layers.push((id, LayerAclEntry::default()));
        true
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        match self.position(id) {
            Some(at) => {
                self.layers.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerAclEntry> {
        self.position(id).map(|at| &self.layers[at].1)
    }

    /// Lookup by stacking position, bottom first.
    pub fn layer_at(&self, index: usize) -> Option<(LayerId, &LayerAclEntry)> {
        self.layers.get(index).map(|(id, entry)| (*id, entry))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.iter().map(|(id, _)| *id)
    }

    /// Replaces a layer's ACL. Returns false if the layer is unknown.
    pub fn set_acl(&mut self, id: LayerId, locked: bool, exclusive: &[UserId]) -> bool {
        match self.position(id) {
            Some(at) => {
                self.layers[at].1 = LayerAclEntry {
                    locked,
                    exclusive: exclusive.to_vec(),
                };
                true
            }
            None => false,
        }
    }

    /// Reverts every layer to the default ACL. Layers themselves stay.
    pub fn clear_acls(&mut self) {
        for (_, entry) in &mut self.layers {
            *entry = LayerAclEntry::default();
        }
    }

    /// `None` when the layer does not exist; the caller decides what a
    /// missing layer means.
    pub fn is_locked_for(&self, id: LayerId, user: UserId) -> Option<bool> {
        self.layer(id).map(|entry| entry.is_locked_for(user))
    }

    fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|(known, _)| *known == id)
    }
}

// ===================================================================
// Tests
// ===================================================================
