pub(crate) mod commands_model;
pub(crate) mod ledger_commands;

pub use commands_model::{CommandOutcome, ErrorResponse};
pub use ledger_commands::{CloseMonthReport, LedgerCommands};
