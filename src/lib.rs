pub mod cache;
pub mod cli;
pub mod config;
pub mod registry;
pub mod resolve;
pub mod rpc;
pub mod syntax;
pub mod util;
