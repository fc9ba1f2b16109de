use std::fmt;

use der::asn1::SetOfVec;
use der::oid::ObjectIdentifier;
use x509_cert::attr::Attribute;
use zeroize::Zeroize;

use super::extensions::single_value;
use super::params::{decode_string_value, encode_directory_string};
use crate::error::{CsrToolError, Result};
use crate::oid;

/// pkcs-9-ub-challengePassword
const UB_CHALLENGE_PASSWORD: usize = 255;

/// Trait for converting to and from PKCS#10 request attributes.
pub trait ToAndFromAttribute {
    /// The attribute type.
    const OID: ObjectIdentifier;

    /// Encodes the value as a single-valued attribute.
    fn to_attribute(&self) -> Result<Attribute>;

    /// Decodes the value from an attribute of type [`Self::OID`].
    fn from_attribute(attribute: &Attribute) -> Result<Self>
    where
        Self: Sized;
}

/// The PKCS#9 challengePassword attribute.
///
/// The password is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct ChallengePassword(String);

impl ChallengePassword {
    pub fn new(password: impl Into<String>) -> Result<Self> {
        let password = password.into();
        if password.is_empty() {
            return Err(CsrToolError::ValidationError(
                "challenge password must not be empty".to_string(),
            ));
        }
        if password.chars().count() > UB_CHALLENGE_PASSWORD {
            return Err(CsrToolError::ValidationError(format!(
                "challengePassword must be at most {UB_CHALLENGE_PASSWORD} characters"
            )));
        }
        Ok(Self(password))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChallengePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChallengePassword(<redacted>)")
    }
}

impl Drop for ChallengePassword {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl ToAndFromAttribute for ChallengePassword {
    const OID: ObjectIdentifier = oid::CHALLENGE_PASSWORD;

    fn to_attribute(&self) -> Result<Attribute> {
        let value = encode_directory_string(&self.0)?;
        Ok(Attribute {
            oid: Self::OID,
            values: SetOfVec::try_from(vec![value])?,
        })
    }

    fn from_attribute(attribute: &Attribute) -> Result<Self> {
        let value = single_value(attribute)?;
        Ok(Self(decode_string_value(value)?))
    }
}

/// Builds the challengePassword attribute.
///
/// An empty value means the attribute is omitted. The value is used as
/// given, surrounding whitespace included.
pub fn build_challenge_password(value: &str) -> Result<Option<ChallengePassword>> {
    if value.is_empty() {
        return Ok(None);
    }
    ChallengePassword::new(value).map(Some)
}
