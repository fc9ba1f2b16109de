//! # csrtool - Private Keys and Certificate Signing Requests in Pure Rust
//!
//! csrtool generates a key pair and a PKCS#10 certificate signing request from
//! a single structured request, built entirely with rustcrypto libraries and
//! without dependencies on ring or openssl (except for testing).
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 and 4096-bit keys, public exponent 65537, signed with
//!   SHA-256 (PKCS#1 v1.5)
//! - **ECDSA**: P-256 (signed with SHA-256) and P-384 (signed with SHA-384)
//!
//! ## What Goes Into a Request
//!
//! - **Subject**: C, ST, L, O, OU, CN and an optional emailAddress, always in
//!   that order
//! - **Subject Alternative Name**: DNS names in input order followed by the
//!   email address, requested through the PKCS#9 extensionRequest attribute
//! - **Challenge password**: the optional PKCS#9 challengePassword attribute
//!
//! ## Quick Start
//!
//! ### The JSON Bridge
//!
//! ```rust,no_run
//! let response = csrtool::bridge::handle(r#"{
//!     "commonName": "test.example.com",
//!     "keyType": "ec256",
//!     "country": "US",
//!     "state": "California",
//!     "locality": "San Francisco",
//!     "org": "Example Inc",
//!     "orgUnit": "IT",
//!     "dnsNames": ["test.example.com"]
//! }"#);
//! println!("{response}");
//! ```
//!
//! ### Building a Request by Hand
//!
//! ```rust,no_run
//! use csrtool::{
//!     key::{KeyPair, KeyType},
//!     csr::{CertificationRequest, params::{CertificationRequestInfo, DistinguishedName}},
//! };
//!
//! # fn main() -> Result<(), csrtool::error::CsrToolError> {
//! let key_pair = KeyPair::generate(KeyType::EcdsaP256)?;
//!
//! let subject = DistinguishedName::builder()
//!     .common_name("example.com".to_string())
//!     .organization("Example Corp".to_string())
//!     .country("US".to_string())
//!     .build();
//!
//! let info = CertificationRequestInfo::builder()
//!     .subject(subject)
//!     .subject_public_key(key_pair.public_key())
//!     .build();
//!
//! let csr = CertificationRequest::build(&info, &key_pair)?;
//! println!("{}", csr.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`CsrToolError`](error::CsrToolError). The bridge turns
//! it into the `error` field of the response:
//!
//! ```rust
//! use csrtool::{bridge::CsrResponse, error::CsrToolError};
//!
//! let response: CsrResponse = serde_json::from_str(&csrtool::bridge::handle("{}")).unwrap();
//! assert!(response.error.as_deref().unwrap().starts_with("Invalid input"));
//! assert!(response.private_key.is_empty() && response.csr.is_empty());
//! # let _ = CsrToolError::ValidationError(String::new());
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, private key export and signatures
//! - [`csr`]: Subject, extension and attribute encoders and the request builder
//! - [`pem_utils`]: PEM framing of keys and requests
//! - [`bridge`]: The JSON request/response entry point
//! - [`error`]: Error types
//! - [`oid`]: Object identifiers used by the encoders

pub mod bridge;
pub mod csr;
pub mod error;
pub mod key;
pub mod oid;
pub mod pem_utils;

pub use bridge::{CsrRequest, CsrResponse, generate, handle};
pub use error::{CsrToolError, Result};
