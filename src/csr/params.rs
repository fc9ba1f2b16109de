use std::fmt;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tagged;
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec, Utf8StringRef};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::attributes::ChallengePassword;
use super::extensions::{ExtensionRequest, ToAndFromX509Extension, validate_email};
use crate::error::{CsrToolError, Result};
use crate::key::PublicKey;
use crate::oid;

/// Upper bounds from X.520, in characters.
const UB_COMMON_NAME: usize = 64;
const UB_ORGANIZATION_NAME: usize = 64;
const UB_ORGANIZATIONAL_UNIT_NAME: usize = 64;
const UB_LOCALITY_NAME: usize = 128;
const UB_STATE_NAME: usize = 128;
const UB_EMAIL_ADDRESS: usize = 255;

/// Everything that goes into the signed part of a certification request.
///
/// # Fields
/// * `subject` - The distinguished name of the requester.
/// * `subject_public_key` - The public key to be certified.
/// * `extension_request` - Requested extensions, omitted when there are none.
/// * `challenge_password` - Optional PKCS#9 challenge password.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    pub extension_request: Option<ExtensionRequest>,
    pub challenge_password: Option<ChallengePassword>,
}

/// Raw subject fields as entered by the user, before validation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubjectFields<'a> {
    pub common_name: &'a str,
    pub country: &'a str,
    pub state: &'a str,
    pub locality: &'a str,
    pub organization: &'a str,
    pub organization_unit: &'a str,
    pub email: &'a str,
}

/// Distinguished name of a certification request subject.
///
/// Attributes are always emitted in the order C, ST, L, O, OU, CN and
/// emailAddress, one attribute per RDN. Absent or empty attributes are left
/// out, except CN.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
/// * `email_address` - The PKCS#9 emailAddress.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
    pub email_address: Option<String>,
}

/// Validates the subject fields and builds the distinguished name.
///
/// Leading and trailing whitespace is trimmed before validation. Values are
/// otherwise kept as given, case included.
///
/// # Errors
/// `ValidationError` if the common name or any other required field is
/// empty, if the country is not exactly two letters, if a value is longer
/// than its X.520 upper bound, or if the email address is malformed.
pub fn build_name(fields: &SubjectFields<'_>) -> Result<DistinguishedName> {
    let country = fields.country.trim();
    if country.chars().count() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CsrToolError::ValidationError(format!(
            "country must be a two-letter ISO 3166-1 code, got \"{country}\""
        )));
    }

    let email = fields.email.trim();
    if !email.is_empty() {
        validate_email(email)?;
        check_length("email", email, UB_EMAIL_ADDRESS)?;
    }

    Ok(DistinguishedName {
        common_name: required("commonName", fields.common_name, UB_COMMON_NAME)?,
        country: Some(country.to_string()),
        state: Some(required("state", fields.state, UB_STATE_NAME)?),
        locality: Some(required("locality", fields.locality, UB_LOCALITY_NAME)?),
        organization: Some(required("org", fields.organization, UB_ORGANIZATION_NAME)?),
        organization_unit: Some(required(
            "orgUnit",
            fields.organization_unit,
            UB_ORGANIZATIONAL_UNIT_NAME,
        )?),
        email_address: (!email.is_empty()).then(|| email.to_string()),
    })
}

fn required(field: &str, value: &str, upper_bound: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CsrToolError::ValidationError(format!(
            "{field} must not be empty"
        )));
    }
    check_length(field, value, upper_bound)?;
    Ok(value.to_string())
}

fn check_length(field: &str, value: &str, upper_bound: usize) -> Result<()> {
    if value.chars().count() > upper_bound {
        return Err(CsrToolError::ValidationError(format!(
            "{field} must be at most {upper_bound} characters"
        )));
    }
    Ok(())
}

/// Encodes `value` as a DirectoryString: PrintableString when every
/// character is in the PrintableString set, UTF8String otherwise.
pub(crate) fn encode_directory_string(value: &str) -> Result<Any> {
    match PrintableStringRef::new(value) {
        Ok(printable) => Ok(Any::encode_from(&printable)?),
        Err(_) => Ok(Any::encode_from(&Utf8StringRef::new(value)?)?),
    }
}

/// Reads back a string attribute value of any of the string types this
/// crate emits.
pub(crate) fn decode_string_value(value: &Any) -> Result<String> {
    match value.tag() {
        der::Tag::PrintableString | der::Tag::Utf8String | der::Tag::Ia5String => {
            std::str::from_utf8(value.value())
                .map(str::to_string)
                .map_err(|e| CsrToolError::EncodingError(e.to_string()))
        }
        tag => Err(CsrToolError::EncodingError(format!(
            "unsupported string type {tag}"
        ))),
    }
}

impl DistinguishedName {
    /// The attributes that will be encoded, in canonical order.
    pub fn ordered_attributes(&self) -> Vec<(ObjectIdentifier, &str)> {
        let optional = [
            (oid::COUNTRY_NAME, &self.country),
            (oid::STATE_OR_PROVINCE_NAME, &self.state),
            (oid::LOCALITY_NAME, &self.locality),
            (oid::ORG_NAME, &self.organization),
            (oid::ORG_UNIT_NAME, &self.organization_unit),
        ];

        let mut attributes: Vec<(ObjectIdentifier, &str)> = optional
            .into_iter()
            .filter_map(|(oid, value)| {
                value
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (oid, v))
            })
            .collect();
        attributes.push((oid::COMMON_NAME, self.common_name.as_str()));
        if let Some(email) = self.email_address.as_deref().filter(|v| !v.is_empty()) {
            attributes.push((oid::EMAIL_ADDRESS, email));
        }
        attributes
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// # Returns
    /// An `x509_cert::name::DistinguishedName` object.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName> {
        let rdns = self
            .ordered_attributes()
            .into_iter()
            .map(|(oid, value)| -> Result<RelativeDistinguishedName> {
                let value = if oid == oid::COUNTRY_NAME {
                    Any::encode_from(&PrintableStringRef::new(value)?)?
                } else if oid == oid::EMAIL_ADDRESS {
                    Any::encode_from(&Ia5StringRef::new(value)?)?
                } else {
                    encode_directory_string(value)?
                };
                let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])?;
                Ok(RelativeDistinguishedName(set))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Attributes this crate does not emit are ignored.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Result<Self> {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let slot = match attr.oid {
                    id if id == oid::COMMON_NAME => {
                        dn.common_name = decode_string_value(&attr.value)?;
                        continue;
                    }
                    id if id == oid::COUNTRY_NAME => &mut dn.country,
                    id if id == oid::STATE_OR_PROVINCE_NAME => &mut dn.state,
                    id if id == oid::LOCALITY_NAME => &mut dn.locality,
                    id if id == oid::ORG_NAME => &mut dn.organization,
                    id if id == oid::ORG_UNIT_NAME => &mut dn.organization_unit,
                    id if id == oid::EMAIL_ADDRESS => &mut dn.email_address,
                    _ => continue,
                };
                *slot = Some(decode_string_value(&attr.value)?);
            }
        }
        Ok(dn)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ordered_attributes()
            .into_iter()
            .map(|(oid, value)| format!("{}={value}", short_name(oid)))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

fn short_name(attribute: ObjectIdentifier) -> &'static str {
    match attribute {
        id if id == oid::COUNTRY_NAME => "C",
        id if id == oid::STATE_OR_PROVINCE_NAME => "ST",
        id if id == oid::LOCALITY_NAME => "L",
        id if id == oid::ORG_NAME => "O",
        id if id == oid::ORG_UNIT_NAME => "OU",
        id if id == oid::COMMON_NAME => "CN",
        _ => "emailAddress",
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }

    pub fn to_x509(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())?,
        })
    }

    pub fn from_x509(extension: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: extension.extn_id,
            critical: extension.critical,
            value: extension.extn_value.as_bytes().to_vec(),
        }
    }
}
