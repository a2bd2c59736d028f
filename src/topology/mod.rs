//! Network topology module.
//!
//! This module contains the declarative topology model, its invariant
//! checks, and the two lab presets.

pub mod presets;
pub mod types;

// Re-export key types and functions for easier access
pub use presets::{backbone, sdn};
pub use types::{Cidr, Interface, LinkEnd, LinkSpec, NodeRole, NodeSpec, Topology, TopologyError};
