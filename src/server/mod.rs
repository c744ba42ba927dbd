//! TCP acceptor.

pub mod listener;

pub use listener::Listener;
