pub mod config;
pub mod credentials;
pub mod ledger;
pub mod paths;
pub mod process;
pub mod status_mapping;
pub mod store;
pub mod tickets;
pub mod types;
pub mod watch_registry;
