pub mod claude_cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod prompts;
pub mod retention;
pub mod subagent;
pub mod supervisor;
pub mod turn;

pub mod test_support;

pub use claude_cli::ClaudeCli;
pub use error::AgentError;
pub use model::{ChatModel, ModelRequest, TextStream};
pub use subagent::{DataAnalyst, DataCollector, SubAgent};
pub use supervisor::{Decision, Supervisor};
pub use turn::{ChatContext, ChatTurn};
