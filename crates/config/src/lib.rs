pub mod env;
pub mod tracing_init;

pub use env::{AppConfig, ConnectorMode, StoreMode};
pub use tracing_init::init_tracing;
