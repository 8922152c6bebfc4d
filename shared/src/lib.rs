//! Shared library for the Text2SQL agent gateway, desktop client and admin tools.
//!
//! This crate provides the agent issuers, the response decoder, configuration,
//! HTTP helpers and the data catalog tooling used across all binaries.

pub mod agents;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod decoder;
pub mod error;
pub mod http;
pub mod models;
pub mod signing;

pub use agents::{AgentClient, AgentInvoker, AgentRequest};
pub use config::{AgentConfig, AgentTarget, IngestionConfig};
pub use conversation::{Conversation, ConversationTurn};
pub use decoder::{decode, AgentPayload, Chunk, DecodedResponse};
pub use error::{Error, Result};
pub use models::{ProxyRequest, ProxyResponse};
pub use signing::SignedAgentClient;
