//! Market data acquisition: session gate, snapshot cache, upstream provider
//! and the policy that ties them together.

pub mod acquisition;
pub mod cache;
pub mod provider;
pub mod session;

pub use acquisition::{Acquired, AcquisitionMode, AcquisitionPolicy};
pub use cache::SnapshotCache;
pub use provider::{ChainProvider, NseClient};
pub use session::SessionGate;
