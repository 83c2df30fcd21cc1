pub mod catalog;
pub mod charts;
pub mod envelope;
pub mod error;
pub mod gateway;

pub use catalog::{ToolCall, ToolSpec, ANALYST_TOOLS, COLLECTOR_TOOLS};
pub use charts::ChartSpec;
pub use envelope::{guard, guard_sync, into_envelope};
pub use error::ToolError;
pub use gateway::MarketDataGateway;
