//! Group expense splitting: split calculation, balances, debt simplification
//! and the per-group ledger, served over HTTP from MongoDB.
pub mod analytics;
pub mod auth;
pub mod balance;
pub mod error;
pub mod exchange;
pub mod insights;
pub mod ledger;
pub mod money;
pub mod routes;
pub mod schemas;
pub mod settings;
pub mod split;
pub mod store;

pub use balance::{compute_balances, Balances};
pub use error::{LedgerError, Result};
pub use exchange::{simplify_debts, Exchange};
pub use ledger::GroupLedger;
pub use money::Money;
pub use split::compute_splits;
