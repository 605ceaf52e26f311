//! Request/response contract types for the settlement HTTP surface.
//!
//! All amounts are 2-dp decimals on input and output; inputs are normalized
//! through `money::round2` by the services before persistence.

pub mod credits;
pub mod deliveries;
pub mod expenses;
pub mod payments;
pub mod refunds;
