// Clippy allows for reasonable defaults
#![allow(clippy::too_many_arguments)] // Orchestrator constructors take the whole turn context
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::derivable_impls)] // Explicit Default impls can be clearer
#![allow(clippy::single_char_add_str)] // push_str("\n") reads better than push('\n')
#![allow(clippy::format_in_format_args)] // Nested format! can be clearer for complex strings

// Module declarations
pub mod agents;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod models;
pub mod routing;
pub mod shutdown;
pub mod storage;
mod utils;

// Server module (HTTP/WebSocket API)
pub mod server;

pub use coordinator::Coordinator;
pub use errors::{AgentInvocationError, ConfigurationError, CoordinatorError, SynthesisError};
pub use models::*;
