//! Conformance harness for MCP servers.
//!
//! Launches a server as a child process, drives it through the standard MCP
//! sequence (`initialize`, `resources/list`, `tools/list`, `resources/read`,
//! `tools/call`, `prompts/list`) over newline-delimited JSON-RPC 2.0 on
//! stdio, and checks that every step returns a well-formed, non-error
//! response.

pub mod channel;
pub mod config;
pub mod error;
pub mod harness;
pub mod protocol;
pub mod report;
pub mod runner;
pub mod steps;
pub mod supervisor;

pub mod schema;
