pub mod client;
pub mod view;

pub use client::{ClientConfig, TodoClient};
pub use view::{Board, Effect, Msg, TodoRow};
