//! Account management module.
//!
//! Provides account names, the in-memory registry, and name validation.

mod model;
mod registry;
mod validation;

pub use model::{Account, AccountName};
pub use registry::AccountRegistry;
pub use validation::{RegistrationError, validate_account_name};
