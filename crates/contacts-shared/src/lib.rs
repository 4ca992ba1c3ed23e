pub mod constants;
pub mod contact;
pub mod error;
pub mod filter;
pub mod types;

pub use contact::{Contact, ContactInput};
pub use error::ValidationError;
pub use types::ContactId;
