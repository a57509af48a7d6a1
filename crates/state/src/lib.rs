//! The service-node registry data model: [`node::NodeInfo`],
//! [`snapshot::StateSnapshot`], and [`history::StateHistory`].

pub mod errors;
pub mod history;
pub mod node;
pub mod quorum;
pub mod snapshot;

pub use errors::StateError;
pub use history::{AltStates, DetachOutcome, StateHistory};
pub use node::NodeInfo;
pub use quorum::{Quorum, QuorumKind};
pub use snapshot::StateSnapshot;
