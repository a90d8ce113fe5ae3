//! Signs outbound marketplace API calls.
//!
//! Each call is authenticated by an RSA-SHA256 (PKCS#1 v1.5) signature over the string
//! `"{consumer_id}\n{url}\n{method}\n{timestamp}\n"`, sent together with the timestamp, the
//! consumer id and a per-call correlation id as request headers.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use marketplace_auth::{Method, RequestSigner};
//!
//! # fn main() -> Result<(), marketplace_auth::SignError> {
//! let mut signer = RequestSigner::with_identity("consumer-id", "MIIEvQIBADANBgkqhkiG9w0BAQEFAASC...")
//!     .target("https://marketplace.walmartapis.com/v3/orders", Method::Get);
//! signer.sign_data()?;
//!
//! let mut headers: HashMap<String, String> = HashMap::new();
//! signer.apply_headers(&mut headers)?;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod algorithm;
pub mod clock;
#[cfg(feature = "config")]
pub mod config;
pub mod request;
mod signature;
mod signer;

pub use algorithm::{RsaSha256, SignatureAlgorithm};

pub use request::{header, Headers, Method, PrivateKey, SigningRequest, SigningRequestBuilder};

pub use signature::{
    canonical_string,
    sign,
    sign_with_buffer,
    KeyDecodingError,
    SignError,
    SigningResult,
};

pub use signer::RequestSigner;
