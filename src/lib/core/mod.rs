pub mod error;
pub mod todo;
pub mod todo_service;

pub use error::*;
pub use todo::*;
pub use todo_service::*;
