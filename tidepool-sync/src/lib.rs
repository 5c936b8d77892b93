pub mod cli;
pub mod load_config;
pub mod nightscout_client;

pub use cli::{run, Cli, Commands};
