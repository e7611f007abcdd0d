//! Authentication module
//!
//! AWS credentials and Signature Version 4 request signing.
//!
//! Every AWS call made by the shipper (RDS, CloudWatch Logs, STS) goes
//! through a `SigV4Signer` bound to one service and region. The object
//! store used for checkpoints signs its own requests.

mod signer;
mod types;

pub use signer::{SigV4Signer, SignedHeaders, ALGORITHM};
pub use types::Credentials;

#[cfg(test)]
mod tests;
