//! SQLite persistence for the StoryCraft backend.
//!
//! The repositories here own every transaction boundary of the credit
//! protocol: reserving, correlating, settling and refunding a spend always
//! happens in the same transaction as the matching balance and job
//! mutations, so the ledger can replay to the balance at any commit point.

pub mod db;
pub mod error;
pub mod jobs;
pub mod ledger;
pub mod users;

pub use db::Db;
pub use error::{StoreError, StoreResult};
pub use jobs::JobRepository;
pub use ledger::LedgerRepository;
pub use users::UserRepository;
