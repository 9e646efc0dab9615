//! Access control filtering for the session message stream.
//!
//! Every participant runs the same [`AclFilter`] over the same
//! ordered stream and reaches the same verdicts. The filter is a
//! state machine: ACL carrying messages mutate it as they pass, and
//! that state decides the fate of the messages that follow. Because
//! of that, a message must never reach the filter out of order and a
//! session must never filter two messages concurrently.
//!
//! ```text
//!            ┌───────────────────────────────────────┐
//!  stream ──►│ operator gate                         │──► reject
//!            │   ▼                                   │
//!            │ ACL types: apply + accept             │
//!            │   ▼                                   │
//!            │ command lock gate (session/user lock) │──► reject
//!            │   ▼                                   │
//!            │ per-type checks (layer locks, ops)    │──► reject
//!            └───────────────┬───────────────────────┘
//!                            ▼ accept
//! ```
//!
//! Local permission changes surface as [`AclChange`] notifications so
//! the UI can grey out tools the next stroke would lose anyway.

use fresco_protocol::message::{Body, Message};
use fresco_protocol::meta::SessionAcl;
use fresco_protocol::types::{LayerId, UserId};

use crate::events::{AclChange, AclObserver};
use crate::layers::SharedLayerAcls;

/// Per-user standing, replicated through the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub is_operator: bool,
    /// Honored by the command gate. The current protocol only tracks
    /// the lock list for the local user, so remote records keep the
    /// default here.
    pub is_locked: bool,
}

/// Stateful gatekeeper for one session's message stream.
///
/// Construct once per connection, [`reset`](AclFilter::reset) on
/// every (re)join, then pass each incoming message through
/// [`filter`](AclFilter::filter) in arrival order. A rejected
/// message must be dropped before it reaches the canvas.
pub struct AclFilter {
    layers: SharedLayerAcls,
    users: [UserRecord; 256],
    /// Layer each user last declared with a tool change.
    active_layers: [LayerId; 256],
    observers: Vec<AclObserver>,

    local_id: UserId,
    local_is_operator: bool,
    local_user_locked: bool,
    session_locked: bool,
    layer_ctrl_locked: bool,
    own_layers: bool,
    lock_default: bool,
}

impl AclFilter {
    /// A fresh filter with everything unlocked and nobody privileged.
    /// Call [`reset`](AclFilter::reset) before the first message.
    pub fn new(layers: SharedLayerAcls) -> AclFilter {
        AclFilter {
            layers,
            users: [UserRecord::default(); 256],
            active_layers: [LayerId::from_raw(0); 256],
            observers: Vec::new(),
            local_id: 0,
            local_is_operator: false,
            local_user_locked: false,
            session_locked: false,
            layer_ctrl_locked: false,
            own_layers: false,
            lock_default: false,
        }
    }

    /// Registers a synchronous observer for local permission changes.
    pub fn observe(&mut self, observer: impl FnMut(AclChange) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Starts a new session epoch.
    ///
    /// Clears every user record, every layer ACL, and every session
    /// flag. `local_mode` marks an offline or freshly hosted session,
    /// where the local user operates unconditionally. The unlock is
    /// announced even if the filter was already unlocked, so stale UI
    /// state from a dead session cannot survive a rejoin.
    pub fn reset(&mut self, local_id: UserId, local_mode: bool) {
        self.users = [UserRecord::default(); 256];
        self.layers.write().unwrap().clear_acls();
        self.local_id = local_id;
        self.set_operator(local_mode);

        self.session_locked = false;
        self.local_user_locked = false;
        self.active_layers = [LayerId::from_raw(0); 256];
        self.emit(AclChange::LocalLockChanged(false));

        self.set_layer_control_lock(false);
        self.set_own_layers(false);
        self.lock_default = false;
    }

    /// Decides whether `msg` may take effect, updating filter state
    /// along the way. Must see the stream in order, every message
    /// exactly once.
    pub fn filter(&mut self, msg: &Message) -> bool {
        let origin = msg.origin_user();
        let record = self.users[origin as usize];

        // The user table is empty in local mode.
        let is_operator =
            record.is_operator || (origin == self.local_id && self.local_is_operator);

        // Privilege changes require privilege. Origin 0 is the server.
        if origin != 0 && msg.is_op_command() && !is_operator {
            return false;
        }

        // Types that adjust the access controls themselves.
        match msg.body() {
            Body::UserJoin(_) => {
                // The roster entry does not exist yet; only the local
                // user's default lock can be applied at this point.
                if origin == self.local_id && self.lock_default {
                    self.set_user_lock(true);
                }
            }
            Body::SessionOwner(owner) => {
                self.update_session_ownership(origin, &owner.users);
                return true;
            }
            Body::LayerAcl(acl) => {
                if !is_operator && !(self.own_layers && acl.layer.creator() == origin) {
                    return false;
                }
                let applied = self
                    .layers
                    .write()
                    .unwrap()
                    .set_acl(acl.layer, acl.locked, &acl.exclusive);
                if !applied {
                    log::warn!("layer acl: layer {} does not exist", acl.layer);
                }
                // Which layer the UI has selected is not known here,
                // so the lock state is re-announced either way.
                let locked = self.is_locally_locked();
                self.emit(AclChange::LocalLockChanged(locked));
                return true;
            }
            Body::SessionAcl(acl) => {
                self.set_session_lock(acl.is_session_locked());
                self.set_layer_control_lock(acl.is_layer_control_locked());
                self.set_own_layers(acl.is_own_layers());
                self.lock_default = acl.is_locked_by_default();
                return true;
            }
            Body::UserAcl(acl) => {
                let locked = acl.users.contains(&self.local_id);
                self.set_user_lock(locked);
                return true;
            }
            Body::ToolChange(tool) => {
                self.active_layers[origin as usize] = tool.layer;
                return true;
            }
            _ => {}
        }

        // A locked user draws nothing. Operators are not exempt.
        if msg.is_command() && (self.session_locked || record.is_locked) {
            return false;
        }

        match msg.body() {
            Body::LayerCreate(m) => self.allow_layer_control(is_operator, m.layer, origin),
            Body::LayerAttributes(m) => self.allow_layer_control(is_operator, m.layer, origin),
            Body::LayerRetitle(m) => self.allow_layer_control(is_operator, m.layer, origin),
            Body::LayerDelete(m) => self.allow_layer_control(is_operator, m.layer, origin),
            // Restacking is an operator call even in own-layers mode.
            Body::LayerOrder(_) => is_operator,
            Body::PutImage(m) => !self.is_layer_locked_for(m.layer, origin),
            Body::FillRect(m) => !self.is_layer_locked_for(m.layer, origin),
            Body::PenMove(_) => {
                !self.is_layer_locked_for(self.active_layers[origin as usize], origin)
            }
            _ => true,
        }
    }

    // In own-layers mode users manage the layers they created;
    // otherwise a layer control lock reserves them for operators.
    fn allow_layer_control(&self, is_operator: bool, layer: LayerId, origin: UserId) -> bool {
        !self.layer_ctrl_locked
            || is_operator
            || (self.own_layers && layer.creator() == origin)
    }

    /// Whether `layer` is locked against `user`. An unknown layer is
    /// treated as unlocked so a stroke racing a layer deletion does
    /// not desynchronize the replicas that already dropped the layer.
    pub fn is_layer_locked_for(&self, layer: LayerId, user: UserId) -> bool {
        match self.layers.read().unwrap().is_locked_for(layer, user) {
            Some(locked) => locked,
            None => {
                log::warn!("lock check for user {user}: layer {layer} does not exist");
                false
            }
        }
    }

    fn update_session_ownership(&mut self, sender: UserId, operators: &[UserId]) {
        for record in self.users.iter_mut() {
            record.is_operator = false;
        }
        for &id in operators {
            self.users[id as usize].is_operator = true;
        }

        // A sender handing out ownership keeps it, listed or not.
        let local_op = operators.contains(&self.local_id) || self.local_id == sender;
        self.set_operator(local_op);
    }

    // ── local state setters, each announcing actual changes ──

    fn set_operator(&mut self, op: bool) {
        if op != self.local_is_operator {
            self.local_is_operator = op;
            self.emit(AclChange::LocalOpChanged(op));
        }
    }

    fn set_session_lock(&mut self, lock: bool) {
        let was_locked = self.is_locally_locked();
        self.session_locked = lock;
        let now_locked = self.is_locally_locked();
        if was_locked != now_locked {
            self.emit(AclChange::LocalLockChanged(now_locked));
        }
    }

    fn set_user_lock(&mut self, lock: bool) {
        let was_locked = self.is_locally_locked();
        self.local_user_locked = lock;
        let now_locked = self.is_locally_locked();
        if was_locked != now_locked {
            self.emit(AclChange::LocalLockChanged(now_locked));
        }
    }

    fn set_layer_control_lock(&mut self, lock: bool) {
        if self.layer_ctrl_locked != lock {
            self.layer_ctrl_locked = lock;
            self.emit(AclChange::LayerControlLockChanged(lock));
        }
    }

    fn set_own_layers(&mut self, own: bool) {
        if self.own_layers != own {
            self.own_layers = own;
            self.emit(AclChange::OwnLayersChanged(own));
        }
    }

    fn emit(&mut self, change: AclChange) {
        for observer in &mut self.observers {
            observer(change);
        }
    }

    // ── accessors ──

    pub fn local_id(&self) -> UserId {
        self.local_id
    }

    pub fn is_local_operator(&self) -> bool {
        self.local_is_operator
    }

    /// Session lock or self lock; either stops the local pen.
    pub fn is_locally_locked(&self) -> bool {
        self.session_locked || self.local_user_locked
    }

    pub fn is_session_locked(&self) -> bool {
        self.session_locked
    }

    pub fn is_layer_control_locked(&self) -> bool {
        self.layer_ctrl_locked
    }

    pub fn is_own_layers(&self) -> bool {
        self.own_layers
    }

    pub fn is_locked_by_default(&self) -> bool {
        self.lock_default
    }

    pub fn user_record(&self, id: UserId) -> UserRecord {
        self.users[id as usize]
    }

    /// The layer `id` last declared with a tool change, if any.
    pub fn active_layer(&self, id: UserId) -> Option<LayerId> {
        let layer = self.active_layers[id as usize];
        if layer.raw() == 0 {
            None
        } else {
            Some(layer)
        }
    }

    // ── local prediction, mirroring the filter's own checks ──

    /// Would the filter accept a layer adjustment for `layer` from
    /// the local user right now?
    pub fn can_use_layer_controls(&self, layer: LayerId) -> bool {
        !self.is_locally_locked()
            && (self.local_is_operator
                || !self.layer_ctrl_locked
                || (self.own_layers && layer.creator() == self.local_id))
    }

    /// Would the filter accept a layer creation from the local user
    /// right now?
    pub fn can_create_layer(&self) -> bool {
        !self.is_locally_locked()
            && (self.local_is_operator || !self.layer_ctrl_locked || self.own_layers)
    }

    /// Current session flags in wire form, for re-announcing the
    /// session's ACL state.
    ///
    /// `lock_default` has no bit of its own on this path; it asserts
    /// [`SessionAcl::LOCK_LAYERCTRL`] instead, so the default-lock
    /// setting does not survive an encode/apply cycle.
    pub fn session_acl_flags(&self) -> u16 {
        let mut flags = 0;
        if self.session_locked {
            flags |= SessionAcl::LOCK_SESSION;
        }
        if self.layer_ctrl_locked {
            flags |= SessionAcl::LOCK_LAYERCTRL;
        }
        if self.lock_default {
            flags |= SessionAcl::LOCK_LAYERCTRL;
        }
        if self.own_layers {
            flags |= SessionAcl::LOCK_OWNLAYERS;
        }
        flags
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeRecorder;
    use crate::layers::LayerAcls;
    use fresco_protocol::command::{FillRect, PenPoint, PutImage};
    use std::sync::Arc;

    fn fixture() -> (AclFilter, ChangeRecorder, SharedLayerAcls) {
        let layers = LayerAcls::new().shared();
        let mut filter = AclFilter::new(Arc::clone(&layers));
        let recorder = ChangeRecorder::new();
        filter.observe(recorder.hook());
        (filter, recorder, layers)
    }

    /// Joined-session fixture: local user 1, made operator by the
    /// server, change recorder drained.
    fn op_fixture() -> (AclFilter, ChangeRecorder, SharedLayerAcls) {
        let (mut filter, recorder, layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_owner(0, vec![1])));
        recorder.take();
        (filter, recorder, layers)
    }

    fn add_layer(layers: &SharedLayerAcls, id: LayerId) {
        layers.write().unwrap().add_layer(id);
    }

    fn stroke(origin: UserId) -> Message {
        Message::pen_move(origin, vec![PenPoint::new(1, 2, 100)])
    }

    fn put_image(origin: UserId, layer: LayerId) -> Message {
        Message::put_image(
            origin,
            PutImage {
                layer,
                mode: 1,
                x: 0,
                y: 0,
                w: 1,
                h: 1,
                image: vec![0xff; 4],
            },
        )
    }

    fn fill_rect(origin: UserId, layer: LayerId) -> Message {
        Message::fill_rect(
            origin,
            FillRect {
                layer,
                mode: 1,
                x: 0,
                y: 0,
                w: 8,
                h: 8,
                color: 0xff00_00ff,
            },
        )
    }

    // ── reset tests ──

    #[test]
    fn test_reset_solo_announces_op_then_unlock() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, true);
        assert_eq!(
            recorder.take(),
            vec![
                AclChange::LocalOpChanged(true),
                AclChange::LocalLockChanged(false),
            ]
        );
        assert!(filter.is_local_operator());
        assert!(!filter.is_locally_locked());
    }

    #[test]
    fn test_repeat_reset_still_announces_unlock() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, true);
        recorder.take();

        filter.reset(1, true);
        // operator state did not change, the unlock still fires
        assert_eq!(recorder.take(), vec![AclChange::LocalLockChanged(false)]);
    }

    #[test]
    fn test_reset_clears_session_state() {
        let (mut filter, _recorder, layers) = op_fixture();
        let layer = LayerId::new(2, 1);
        add_layer(&layers, layer);
        assert!(filter.filter(&Message::session_acl(
            0,
            SessionAcl::LOCK_SESSION | SessionAcl::LOCK_LAYERCTRL | SessionAcl::LOCK_DEFAULT,
        )));
        assert!(filter.filter(&Message::layer_acl(1, layer, true, vec![])));
        assert!(filter.filter(&Message::tool_change(5, layer, vec![])));

        filter.reset(1, false);
        assert!(!filter.is_session_locked());
        assert!(!filter.is_layer_control_locked());
        assert!(!filter.is_own_layers());
        assert!(!filter.is_locked_by_default());
        assert!(!filter.is_local_operator());
        assert_eq!(filter.active_layer(5), None);
        assert_eq!(filter.user_record(1), UserRecord::default());
        assert_eq!(layers.read().unwrap().is_locked_for(layer, 9), Some(false));
    }

    #[test]
    fn test_reset_epoch_unblocks_commands() {
        let (mut filter, _recorder, _layers) = op_fixture();
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_SESSION)));
        assert!(!filter.filter(&stroke(5)));

        filter.reset(1, false);
        assert!(filter.filter(&stroke(5)));
    }

    // ── operator gate tests ──

    #[test]
    fn test_op_gate_rejects_without_state_change() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, false);
        recorder.take();

        assert!(!filter.filter(&Message::session_acl(5, SessionAcl::LOCK_SESSION)));
        assert!(!filter.filter(&Message::user_acl(5, vec![1])));
        assert!(!filter.filter(&Message::session_owner(5, vec![5])));

        assert!(!filter.is_session_locked());
        assert!(!filter.is_locally_locked());
        assert!(!filter.user_record(5).is_operator);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_op_gate_lets_the_server_through() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_SESSION)));
        assert!(filter.is_session_locked());
    }

    #[test]
    fn test_op_gate_accepts_operator_user() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_owner(0, vec![5])));
        assert!(filter.filter(&Message::session_acl(5, SessionAcl::LOCK_OWNLAYERS)));
        assert!(filter.is_own_layers());
    }

    // ── session owner tests ──

    #[test]
    fn test_session_owner_replaces_operator_set() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_owner(0, vec![2, 3])));
        assert!(filter.user_record(2).is_operator);
        assert!(filter.user_record(3).is_operator);

        // operator 2 hands the session to 3 alone
        assert!(filter.filter(&Message::session_owner(2, vec![3])));
        assert!(!filter.user_record(2).is_operator);
        assert!(filter.user_record(3).is_operator);
    }

    #[test]
    fn test_session_owner_grants_local_op() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, false);
        recorder.take();

        assert!(filter.filter(&Message::session_owner(0, vec![1])));
        assert!(filter.is_local_operator());
        assert_eq!(recorder.take(), vec![AclChange::LocalOpChanged(true)]);
    }

    #[test]
    fn test_session_owner_keeps_sender_op() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, true);
        recorder.take();

        // local op names someone else; sending keeps their own op
        assert!(filter.filter(&Message::session_owner(1, vec![2])));
        assert!(filter.is_local_operator());
        assert!(filter.user_record(2).is_operator);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_session_owner_can_demote_local() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, true);
        recorder.take();

        assert!(filter.filter(&Message::session_owner(0, vec![2])));
        assert!(!filter.is_local_operator());
        assert_eq!(recorder.take(), vec![AclChange::LocalOpChanged(false)]);
    }

    // ── layer ACL tests ──

    #[test]
    fn test_layer_acl_operator_path() {
        let (mut filter, recorder, layers) = op_fixture();
        let layer = LayerId::new(5, 1);
        add_layer(&layers, layer);

        assert!(filter.filter(&Message::layer_acl(1, layer, true, vec![2])));
        assert_eq!(layers.read().unwrap().is_locked_for(layer, 2), Some(true));
        // lock state re-announced even though it did not change
        assert_eq!(recorder.take(), vec![AclChange::LocalLockChanged(false)]);
    }

    #[test]
    fn test_layer_acl_own_layer_creator_only() {
        let (mut filter, _recorder, layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_OWNLAYERS)));
        let layer = LayerId::new(5, 2);
        add_layer(&layers, layer);

        // creator may manage their own layer without being operator
        assert!(filter.filter(&Message::layer_acl(5, layer, true, vec![])));
        assert_eq!(layers.read().unwrap().is_locked_for(layer, 9), Some(true));

        // another non-operator may not
        assert!(!filter.filter(&Message::layer_acl(6, layer, false, vec![])));
        assert_eq!(layers.read().unwrap().is_locked_for(layer, 9), Some(true));
    }

    #[test]
    fn test_layer_acl_rejected_without_privilege() {
        let (mut filter, recorder, layers) = fixture();
        filter.reset(1, false);
        let layer = LayerId::new(5, 2);
        add_layer(&layers, layer);
        recorder.take();

        assert!(!filter.filter(&Message::layer_acl(5, layer, true, vec![])));
        assert_eq!(layers.read().unwrap().is_locked_for(layer, 9), Some(false));
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_layer_acl_missing_layer_still_accepted() {
        let (mut filter, _recorder, layers) = op_fixture();
        assert!(filter.filter(&Message::layer_acl(1, LayerId::new(9, 9), true, vec![])));
        assert_eq!(layers.read().unwrap().layer_count(), 0);
    }

    // ── session ACL tests ──

    #[test]
    fn test_session_acl_applies_all_flags() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, false);
        recorder.take();

        let flags = SessionAcl::LOCK_SESSION
            | SessionAcl::LOCK_LAYERCTRL
            | SessionAcl::LOCK_OWNLAYERS
            | SessionAcl::LOCK_DEFAULT;
        assert!(filter.filter(&Message::session_acl(0, flags)));
        assert!(filter.is_session_locked());
        assert!(filter.is_layer_control_locked());
        assert!(filter.is_own_layers());
        assert!(filter.is_locked_by_default());
        assert_eq!(
            recorder.take(),
            vec![
                AclChange::LocalLockChanged(true),
                AclChange::LayerControlLockChanged(true),
                AclChange::OwnLayersChanged(true),
            ]
        );
    }

    #[test]
    fn test_session_acl_repeat_is_silent() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_SESSION)));
        recorder.take();

        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_SESSION)));
        assert!(recorder.take().is_empty());
    }

    // ── user ACL tests ──

    #[test]
    fn test_user_acl_tracks_local_user_only() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, false);
        recorder.take();

        assert!(filter.filter(&Message::user_acl(0, vec![1, 9])));
        assert!(filter.is_locally_locked());
        assert_eq!(recorder.take(), vec![AclChange::LocalLockChanged(true)]);
        // remote lock lists are not replicated into the records
        assert!(!filter.user_record(9).is_locked);

        assert!(filter.filter(&Message::user_acl(0, vec![9])));
        assert!(!filter.is_locally_locked());
        assert_eq!(recorder.take(), vec![AclChange::LocalLockChanged(false)]);
    }

    #[test]
    fn test_self_lock_does_not_gate_own_commands() {
        // The command gate keys on the replicated per-user record.
        // UserAcl only adjusts the local lock view, so enforcement
        // for the local user happens in the UI via the prediction
        // accessors, not here.
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::user_acl(0, vec![1])));
        assert!(filter.is_locally_locked());

        assert!(filter.filter(&stroke(1)));
        assert!(filter.filter(&Message::undo_point(1)));
        assert!(filter.filter(&Message::chat(1, "still here")));
    }

    // ── command lock gate tests ──

    #[test]
    fn test_session_lock_blocks_every_command() {
        let (mut filter, _recorder, layers) = op_fixture();
        let layer = LayerId::new(1, 1);
        add_layer(&layers, layer);
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_SESSION)));

        // operators are locked like everyone else
        assert!(!filter.filter(&stroke(1)));
        assert!(!filter.filter(&Message::undo_point(1)));
        assert!(!filter.filter(&put_image(1, layer)));
        assert!(!filter.filter(&Message::layer_create(1, LayerId::new(1, 2), 0, "new")));
        // meta traffic still flows
        assert!(filter.filter(&Message::chat(5, "brb")));
    }

    #[test]
    fn test_tool_change_tracked_while_locked() {
        let (mut filter, _recorder, layers) = op_fixture();
        let layer = LayerId::new(5, 1);
        add_layer(&layers, layer);
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_SESSION)));

        // tool changes pass and are tracked even under a session lock
        assert!(filter.filter(&Message::tool_change(5, layer, vec![])));
        assert_eq!(filter.active_layer(5), Some(layer));
        // but the stroke itself is still blocked
        assert!(!filter.filter(&stroke(5)));

        assert!(filter.filter(&Message::session_acl(0, 0)));
        assert!(filter.filter(&stroke(5)));
    }

    // ── layer control tests ──

    #[test]
    fn test_layer_controls_open_by_default() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::layer_create(5, LayerId::new(5, 1), 0, "bg")));
        assert!(filter.filter(&Message::layer_retitle(6, LayerId::new(5, 1), "base")));
    }

    #[test]
    fn test_layer_control_lock_reserves_for_operators() {
        let (mut filter, _recorder, _layers) = op_fixture();
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_LAYERCTRL)));

        let own = LayerId::new(5, 1);
        assert!(!filter.filter(&Message::layer_create(5, own, 0, "mine")));
        assert!(!filter.filter(&Message::layer_delete(5, own, false)));
        // the local operator still passes
        assert!(filter.filter(&Message::layer_create(1, LayerId::new(1, 1), 0, "ref")));
    }

    #[test]
    fn test_own_layers_opens_creator_controls() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_acl(
            0,
            SessionAcl::LOCK_LAYERCTRL | SessionAcl::LOCK_OWNLAYERS,
        )));

        let own = LayerId::new(5, 1);
        let foreign = LayerId::new(6, 1);
        assert!(filter.filter(&Message::layer_create(5, own, 0, "mine")));
        assert!(filter.filter(&Message::layer_attributes(5, own, 128, 1)));
        assert!(!filter.filter(&Message::layer_retitle(5, foreign, "not yours")));
        assert!(!filter.filter(&Message::layer_delete(5, foreign, false)));
    }

    #[test]
    fn test_layer_order_is_operator_only() {
        let (mut filter, _recorder, _layers) = op_fixture();
        // even with layer controls open
        assert!(!filter.filter(&Message::layer_order(5, vec![LayerId::new(5, 1)])));
        assert!(filter.filter(&Message::layer_order(1, vec![LayerId::new(5, 1)])));
    }

    // ── layer lock tests ──

    #[test]
    fn test_put_image_respects_layer_lock() {
        let (mut filter, _recorder, layers) = op_fixture();
        let layer = LayerId::new(2, 1);
        add_layer(&layers, layer);
        assert!(filter.filter(&Message::layer_acl(1, layer, true, vec![])));

        assert!(!filter.filter(&put_image(5, layer)));
        assert!(!filter.filter(&fill_rect(5, layer)));

        assert!(filter.filter(&Message::layer_acl(1, layer, false, vec![])));
        assert!(filter.filter(&put_image(5, layer)));
        assert!(filter.filter(&fill_rect(5, layer)));
    }

    #[test]
    fn test_exclusive_layer_admits_members_only() {
        let (mut filter, _recorder, layers) = op_fixture();
        let layer = LayerId::new(2, 1);
        add_layer(&layers, layer);
        assert!(filter.filter(&Message::layer_acl(1, layer, false, vec![5])));

        assert!(filter.filter(&put_image(5, layer)));
        assert!(!filter.filter(&put_image(6, layer)));
    }

    #[test]
    fn test_locked_layer_excludes_exclusive_members_too() {
        let (mut filter, _recorder, layers) = op_fixture();
        let layer = LayerId::new(2, 1);
        add_layer(&layers, layer);
        assert!(filter.filter(&Message::layer_acl(1, layer, true, vec![3])));

        assert!(!filter.filter(&put_image(3, layer)));
    }

    #[test]
    fn test_pen_move_checks_declared_layer() {
        let (mut filter, _recorder, layers) = op_fixture();
        let open = LayerId::new(1, 1);
        let locked = LayerId::new(1, 2);
        add_layer(&layers, open);
        add_layer(&layers, locked);
        assert!(filter.filter(&Message::layer_acl(1, locked, true, vec![])));

        assert!(filter.filter(&Message::tool_change(5, locked, vec![])));
        assert!(!filter.filter(&stroke(5)));

        assert!(filter.filter(&Message::tool_change(5, open, vec![])));
        assert!(filter.filter(&stroke(5)));
    }

    #[test]
    fn test_pen_move_on_unknown_layer_passes() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);

        // no tool change seen for this user at all
        assert!(filter.filter(&stroke(5)));

        // declared layer missing from the store
        assert!(filter.filter(&Message::tool_change(5, LayerId::new(9, 9), vec![])));
        assert!(filter.filter(&stroke(5)));
    }

    // ── default lock tests ──

    #[test]
    fn test_lock_default_applies_on_own_join() {
        let (mut filter, recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_DEFAULT)));
        recorder.take();

        // a remote join changes nothing locally
        assert!(filter.filter(&Message::user_join(7, "guest")));
        assert!(!filter.is_locally_locked());
        assert!(!filter.user_record(7).is_locked);
        assert!(recorder.take().is_empty());

        // the local join applies the default lock
        assert!(filter.filter(&Message::user_join(1, "me")));
        assert!(filter.is_locally_locked());
        assert_eq!(recorder.take(), vec![AclChange::LocalLockChanged(true)]);
    }

    // ── prediction accessor tests ──

    #[test]
    fn test_prediction_matches_filter_for_layer_controls() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        let own = LayerId::new(1, 1);
        let foreign = LayerId::new(6, 1);

        assert!(filter.can_create_layer());
        assert!(filter.can_use_layer_controls(foreign));

        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_LAYERCTRL)));
        assert!(!filter.can_create_layer());
        assert!(!filter.can_use_layer_controls(own));

        assert!(filter.filter(&Message::session_acl(
            0,
            SessionAcl::LOCK_LAYERCTRL | SessionAcl::LOCK_OWNLAYERS,
        )));
        assert!(filter.can_create_layer());
        assert!(filter.can_use_layer_controls(own));
        assert!(!filter.can_use_layer_controls(foreign));
    }

    #[test]
    fn test_locked_user_predicts_nothing() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, true);
        assert!(filter.filter(&Message::user_acl(0, vec![1])));
        // operator status does not override the lock
        assert!(!filter.can_create_layer());
        assert!(!filter.can_use_layer_controls(LayerId::new(1, 1)));
    }

    // ── flag encoding tests ──

    #[test]
    fn test_session_acl_flags_mirror_state() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert_eq!(filter.session_acl_flags(), 0);

        assert!(filter.filter(&Message::session_acl(
            0,
            SessionAcl::LOCK_SESSION | SessionAcl::LOCK_OWNLAYERS,
        )));
        assert_eq!(
            filter.session_acl_flags(),
            SessionAcl::LOCK_SESSION | SessionAcl::LOCK_OWNLAYERS
        );
    }

    #[test]
    fn test_session_acl_flags_alias_default_lock() {
        let (mut filter, _recorder, _layers) = fixture();
        filter.reset(1, false);
        assert!(filter.filter(&Message::session_acl(0, SessionAcl::LOCK_DEFAULT)));

        // the default lock rides the layer-control bit on the way out
        assert_eq!(filter.session_acl_flags(), SessionAcl::LOCK_LAYERCTRL);
    }
}
