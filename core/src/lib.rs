pub mod cli;
pub mod config;
pub mod directory;
pub mod fleet;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod tools;
