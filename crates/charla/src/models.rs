//! These models represent the objects passed around by the agent
//!
//! There are three related formats we need to interact with:
//! - history entries, sent from the chat interface to the agent
//! - openai messages/tools, sent from the agent to the LLM
//! - tool arguments and results, exchanged between the agent and its tools
//!
//! We always immediately convert those data models into the internal structs
//! using to/from helpers. The wire conversion for the LLM lives in
//! `providers::utils`.
pub mod history;
pub mod message;
pub mod role;
pub mod tool;
