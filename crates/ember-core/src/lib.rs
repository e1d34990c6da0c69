pub mod chat;
pub mod error;
pub mod matcher;
pub mod pair;
pub mod paths;
