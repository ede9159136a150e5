//! Abstraction over the OS accessibility tree and service.
//!
//! The engine never touches a platform node type directly; it sees
//! [`AccessibilityNode`] snapshots and an [`AccessibilityHost`] for everything
//! that needs the live service (active window, gestures, notices).

pub mod host;
pub mod memory;
pub mod node;
pub mod query;

pub use host::{AccessibilityEvent, AccessibilityHost, EventType, GestureOutcome};
pub use memory::{MemoryHost, MemoryNode};
pub use node::{AccessibilityNode, Bounds, NodeAction, NodeRef};
