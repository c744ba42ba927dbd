//! Porter - static file server with virtual hosts
//!
//! Core library for the HTTP engine, document resolution and the acceptor.

pub mod config;
pub mod http;
pub mod server;
pub mod vhost;
