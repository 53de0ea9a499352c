pub mod chat;
pub mod close;
pub mod config_cmd;
pub mod memory;
pub mod serve;
