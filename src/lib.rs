//! Signing AWS API requests without effort.
//!
//! This crate computes [AWS Signature Version 4](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
//! signatures for outgoing HTTP requests: it canonicalizes the request,
//! derives a signing key scoped to date, region and service, and writes the
//! resulting `Authorization` and `x-amz-*` headers back onto the request.
//! Sending the request stays the job of whatever HTTP client is in use.
//!
//! # Example
//!
//! ```
//! use aws4sign::{Credential, Signer};
//!
//! fn main() -> aws4sign::Result<()> {
//!     // Credential is validated once at construction.
//!     let credential = Credential::new("access_key_id", "secret_access_key");
//!     let signer = Signer::new(credential)?;
//!
//!     // Construct request
//!     let (mut parts, body) = http::Request::get("https://s3.amazonaws.com/testbucket")
//!         .body(Vec::new())?
//!         .into_parts();
//!
//!     // Signing request with Signer
//!     signer.sign(&mut parts, &body, "s3", "us-east-1")?;
//!     assert!(parts.headers.contains_key(http::header::AUTHORIZATION));
//!     Ok(())
//! }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;

mod constants;

mod credential;
pub use credential::Credential;

mod error;
pub use error::{Error, ErrorKind, Result};

mod request;

mod v4;
pub use v4::Signer;
