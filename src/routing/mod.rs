// Query routing: agent catalog, relevance scoring, and agent selection

mod registry;
pub mod scorer;
mod selector;

pub use registry::{default_catalog, CapabilityRegistry};
pub use selector::{PrimarySelector, Router, SupportingSelector};
