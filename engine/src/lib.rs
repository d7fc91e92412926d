//! Concierge Engine Library
//!
//! This library provides the orchestration core of the concierge: agents,
//! the workflow that routes between them, and the collaborators they call.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// LLM provider abstraction layer
pub mod llm;

/// Agent adapter, tool interface and prompts
pub mod agent;

/// Event-driven session workflow
pub mod workflow;

/// External collaborators (render, search, pricing)
pub mod services;

/// Task-specific tools
pub mod tools;

/// HTTP gateway
pub mod gateway;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
