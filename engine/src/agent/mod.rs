//! Agents
//!
//! An agent is a system prompt, a tool set and an LLM handle behind one
//! `chat` call. The workflow owns the agents; this module only knows how to
//! run one conversation turn.

pub mod adapter;
pub mod prompts;
pub mod tool;
pub mod working_memory;

pub use adapter::AgentAdapter;
pub use tool::{Tool, ToolBox, ToolScope};
pub use working_memory::WorkingMemory;
