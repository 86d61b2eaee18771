//! Go Documentation MCP Service
//!
//! This crate provides a Model Context Protocol (MCP) service that answers Go
//! documentation queries by running `go doc`, hiding the rough edges of doing
//! that directly: relative and absolute paths are turned into import paths,
//! packages outside any module get a throwaway module to live in, repeated
//! queries are served from a bounded cache and long output is paginated.
//!
//! # Modules
//!
//! - [`resolver`]: Mapping user paths to import paths
//! - [`workspace`]: Temporary modules for queries without a working directory
//! - [`godoc`]: The `go doc` extractor and the cache in front of it
//! - [`cache`]: TTL and size bounded document cache
//! - [`paginate`]: Line-based pagination
//! - [`mcp`]: MCP server implementation and the `get_doc` tool
//! - [`server`]: stdio and SSE transports

pub mod cache;
pub mod command;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod godoc;
pub mod mcp;
pub mod paginate;
pub mod resolver;
pub mod server;
pub mod workspace;
