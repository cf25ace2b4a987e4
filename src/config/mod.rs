// Configuration module

mod coordinator;
mod loader;
mod routing;

pub use coordinator::CoordinatorConfig;
pub use loader::{AppConfig, CommandConfig, ServerConfig, StorageConfig};
pub use routing::RoutingConfig;
