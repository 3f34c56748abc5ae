pub mod allocation;
pub mod catalog;
pub mod commands;
pub mod constants;
pub mod costing;
pub mod db;
pub mod inbound;
pub mod models;
pub mod sales;
pub mod schema;
pub mod settings;
pub mod summary;
pub mod utils;

pub mod errors;
pub use commands::{CommandOutcome, LedgerCommands};

pub use errors::Error;
pub use errors::Result;
