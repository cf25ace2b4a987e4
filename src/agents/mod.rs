// Concrete agent invokers: per-agent dispatch and CLI-backed agents

mod command_invoker;
mod dispatcher;

pub use command_invoker::{extract_confidence, CommandInvoker, PROMPT_PLACEHOLDER};
pub use dispatcher::AgentDispatcher;
