//! A small todo service: SQLite-backed CRUD over HTTP, plus a one-shot call to
//! a generative-image API that attaches an illustration to each new todo.

pub mod adapters;
pub mod client;
pub mod config;
pub mod core;
pub mod imaging;
pub mod storage;
pub mod transport;
