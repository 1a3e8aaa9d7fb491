//! Types library for the threshold treasury
//!
//! Identity and lifecycle types shared by the contract layer and by any
//! caller that stores or displays proposal references.
//!
//! # Modules
//! - `ids`: Identifiers (AccountId, IssuanceId, WithdrawalId)
//! - `proposal`: Proposal kind and status
//! - `errors`: Identifier parsing errors

pub mod errors;
pub mod ids;
pub mod proposal;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::proposal::*;
}
