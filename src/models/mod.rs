//! Data model for the sync engine: accounts, raw CRM records, and the
//! normalized analytics actions derived from them.

pub mod account;
pub mod action;
pub mod record;

pub use account::{Account, LastPulledDates};
pub use action::{Action, ActionName, filter_null_values};
pub use record::RawRecord;
