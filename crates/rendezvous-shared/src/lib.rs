//! Domain vocabulary shared by the store and the client core: identifiers,
//! roles, appointment statuses and calendar values.

pub mod constants;
pub mod error;
pub mod identity;
pub mod types;

pub use error::SharedError;
