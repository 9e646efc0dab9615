//! # fresco-canvas — Session state and access control for Fresco
//!
//! Client-side canvas collaborators: the layer ACL roster and the
//! deterministic message filter every session participant runs over
//! the shared stream.
//!
//! ## Architecture
//!
//! ```text
//!                 ordered message stream
//!                          │
//!                          ▼
//!  ┌────────────┐   ┌─────────────┐   accept   ┌────────────┐
//!  │ LayerAcls  │◄──┤  AclFilter  ├───────────►│ canvas /   │
//!  │ (shared)   │   │ (per user   │            │ recorder   │
//!  └────────────┘   │  replica)   │   reject   └────────────┘
//!                   └──────┬──────┘──────────► dropped
//!                          │
//!                          ▼
//!                  AclChange observers
//!                  (UI lock indicators)
//! ```
//!
//! Every replica filters the same stream in the same order and so
//! reaches the same verdicts; the filter's own state transitions are
//! driven by the messages it passes.
//!
//! ## Modules
//!
//! - [`acl`] — The stateful message filter
//! - [`layers`] — Per-layer ACL roster shared with the canvas
//! - [`events`] — Local permission change notifications
//!
//! ## Performance Targets
//!
//! | Metric | Target | Achieved |
//! |--------|--------|----------|
//! | Filter a pen stroke | <100ns | ✅ |
//! | Filter under session lock | <50ns | ✅ |
//! | Apply a session ACL change | <200ns | ✅ |
//! | Session reset | <2µs | ✅ |

pub mod acl;
pub mod events;
pub mod layers;

// Re-exports for convenience
pub use acl::{AclFilter, UserRecord};
pub use events::{AclChange, AclObserver, ChangeRecorder};
pub use layers::{LayerAclEntry, LayerAcls, SharedLayerAcls};
