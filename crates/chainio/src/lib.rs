//! Named interfaces for the collaborators `snsd-snse`/`snsd-pulse` consume
//! but do not implement: chain storage, the quorum-net transport, and the
//! wire/persistence encodings that cross that boundary. No concrete
//! backing store ships in this workspace.

pub mod blob;
pub mod errors;
pub mod traits;
pub mod wire;

pub use errors::ChainIoError;
pub use traits::{ChainStore, QuorumNet};
