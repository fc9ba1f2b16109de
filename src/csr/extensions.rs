use std::collections::HashSet;
use std::sync::LazyLock;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Any, Ia5String, SetOfVec},
    oid::ObjectIdentifier,
};
use regex::Regex;
use x509_cert::attr::Attribute;
use x509_cert::ext::pkix::name::GeneralName;

use super::attributes::ToAndFromAttribute;
use super::params::ExtensionParam;
use crate::error::{CsrToolError, Result};
use crate::oid;

static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid DNS label pattern")
});

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^@\s]+)@([^@\s]+)$").expect("valid email pattern"));

const MAX_DNS_NAME_LEN: usize = 253;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use csrtool::csr::extensions::{SanEntry, SubjectAltName, ToAndFromX509Extension};
/// let san = SubjectAltName { names: vec![SanEntry::DnsName("example.com".to_string())] };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san.names, decoded.names);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// One entry of a Subject Alternative Name extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanEntry {
    DnsName(String),
    Rfc822Name(String),
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// # Fields
/// * `names` - DNS names and email addresses, in encoding order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub names: Vec<SanEntry>,
}

impl SubjectAltName {
    pub fn dns_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().filter_map(|name| match name {
            SanEntry::DnsName(dns) => Some(dns.as_str()),
            SanEntry::Rfc822Name(_) => None,
        })
    }

    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.names.iter().filter_map(|name| match name {
            SanEntry::Rfc822Name(email) => Some(email.as_str()),
            SanEntry::DnsName(_) => None,
        })
    }
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(|name| match name {
                    SanEntry::DnsName(dns) => Ia5String::new(dns).map(GeneralName::DnsName),
                    SanEntry::Rfc822Name(email) => {
                        Ia5String::new(email).map(GeneralName::Rfc822Name)
                    }
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| CsrToolError::ValidationError(e.to_string()))?,
        );

        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let names = san
            .0
            .iter()
            .map(|name| match name {
                GeneralName::DnsName(dns) => Ok(SanEntry::DnsName(dns.to_string())),
                GeneralName::Rfc822Name(email) => Ok(SanEntry::Rfc822Name(email.to_string())),
                _ => Err(CsrToolError::EncodingError(
                    "Unsupported general name type".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { names })
    }
}

/// The PKCS#9 extensionRequest attribute: the extensions a requester asks
/// the CA to put into the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    pub extensions: Vec<ExtensionParam>,
}

impl ExtensionRequest {
    /// The Subject Alternative Name extension, if one was requested.
    pub fn subject_alt_name(&self) -> Result<Option<SubjectAltName>> {
        self.extensions
            .iter()
            .find(|ext| ext.oid == SubjectAltName::OID)
            .map(ExtensionParam::to_extension::<SubjectAltName>)
            .transpose()
    }
}

impl ToAndFromAttribute for ExtensionRequest {
    const OID: ObjectIdentifier = oid::EXTENSION_REQUEST;

    fn to_attribute(&self) -> Result<Attribute> {
        let extensions = self
            .extensions
            .iter()
            .map(ExtensionParam::to_x509)
            .collect::<Result<Vec<_>>>()?;
        let value = Any::encode_from(&extensions)?;
        Ok(Attribute {
            oid: Self::OID,
            values: SetOfVec::try_from(vec![value])?,
        })
    }

    fn from_attribute(attribute: &Attribute) -> Result<Self> {
        let value = single_value(attribute)?;
        let extensions = Vec::<x509_cert::ext::Extension>::from_der(&value.to_der()?)?;
        Ok(Self {
            extensions: extensions.iter().map(ExtensionParam::from_x509).collect(),
        })
    }
}

pub(crate) fn single_value(attribute: &Attribute) -> Result<&Any> {
    let mut values = attribute.values.iter();
    match (values.next(), values.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(CsrToolError::EncodingError(format!(
            "attribute {} must have exactly one value",
            attribute.oid
        ))),
    }
}

/// Builds the extensionRequest carrying the Subject Alternative Names.
///
/// DNS names come first, in input order, followed by the email address as
/// an `rfc822Name`. Blank DNS entries are skipped. Returns `None` when there
/// is nothing to request, because an empty SAN extension is invalid.
///
/// # Errors
/// `ValidationError` for a malformed or duplicated DNS name or a malformed
/// email address.
pub fn build_extension_request(dns_names: &[String], email: &str) -> Result<Option<ExtensionRequest>> {
    let mut names = Vec::with_capacity(dns_names.len() + 1);
    let mut seen = HashSet::new();

    for dns in dns_names.iter().map(|name| name.trim()).filter(|name| !name.is_empty()) {
        validate_dns_name(dns)?;
        if !seen.insert(dns.to_ascii_lowercase()) {
            return Err(CsrToolError::ValidationError(format!(
                "duplicate DNS name \"{dns}\""
            )));
        }
        names.push(SanEntry::DnsName(dns.to_string()));
    }

    let email = email.trim();
    if !email.is_empty() {
        validate_email(email)?;
        names.push(SanEntry::Rfc822Name(email.to_string()));
    }

    if names.is_empty() {
        return Ok(None);
    }

    let san = SubjectAltName { names };
    Ok(Some(ExtensionRequest {
        extensions: vec![ExtensionParam::from_extension(&san, false)?],
    }))
}

/// Basic hostname syntax: ASCII, dot-separated labels of letters, digits and
/// inner hyphens, no empty labels. A leading `*` label is allowed.
pub fn validate_dns_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        CsrToolError::ValidationError(format!("invalid DNS name \"{name}\": {reason}"))
    };

    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if !name.is_ascii() {
        return Err(invalid("must be ASCII"));
    }
    if name.len() > MAX_DNS_NAME_LEN {
        return Err(invalid("longer than 253 characters"));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid("leading or trailing dot"));
    }

    let labels: Vec<&str> = name.split('.').collect();
    for (index, label) in labels.iter().enumerate() {
        if index == 0 && *label == "*" && labels.len() > 1 {
            continue;
        }
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        if !DNS_LABEL.is_match(label) {
            return Err(invalid("malformed label"));
        }
    }
    Ok(())
}

/// Basic `local@domain` syntax; the domain must pass [`validate_dns_name`].
pub fn validate_email(email: &str) -> Result<()> {
    let invalid =
        || CsrToolError::ValidationError(format!("invalid email address \"{email}\""));

    if !email.is_ascii() {
        return Err(invalid());
    }
    let captures = EMAIL.captures(email).ok_or_else(invalid)?;
    let domain = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
    if domain.starts_with('*') {
        return Err(invalid());
    }
    validate_dns_name(domain).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_subject_alt_name_encoding_decoding() {
        let original = SubjectAltName {
            names: vec![
                SanEntry::DnsName("a.example.com".to_string()),
                SanEntry::Rfc822Name("admin@example.com".to_string()),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_dns_names_keep_order_and_email_goes_last() {
        let request = build_extension_request(
            &names(&["b.example.com", "a.example.com"]),
            "admin@example.com",
        )
        .unwrap()
        .unwrap();
        let san = request.subject_alt_name().unwrap().unwrap();
        assert_eq!(
            san.names,
            vec![
                SanEntry::DnsName("b.example.com".to_string()),
                SanEntry::DnsName("a.example.com".to_string()),
                SanEntry::Rfc822Name("admin@example.com".to_string()),
            ]
        );
        assert!(!request.extensions[0].critical);
    }

    #[test]
    fn test_nothing_requested() {
        assert_eq!(build_extension_request(&[], "").unwrap(), None);
        assert_eq!(build_extension_request(&names(&["  "]), " ").unwrap(), None);
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = build_extension_request(&names(&["a.example.com", "A.example.com"]), "");
        assert!(matches!(result, Err(CsrToolError::ValidationError(_))));
    }

    #[test]
    fn test_dns_name_syntax() {
        for good in ["localhost", "a.example.com", "*.example.com", "xn--bcher-kva.example", "a-b.c1"] {
            assert!(validate_dns_name(good).is_ok(), "{good} was rejected");
        }
        for bad in [
            "",
            ".example.com",
            "example.com.",
            "a..example.com",
            "-a.example.com",
            "a_b.example.com",
            "bücher.example",
            "*",
            "a.*.example.com",
        ] {
            assert!(validate_dns_name(bad).is_err(), "{bad} was accepted");
        }
    }

    #[test]
    fn test_email_syntax() {
        assert!(validate_email("first.last+tag@example.com").is_ok());
        for bad in ["plain", "@example.com", "a@", "a@b@c.com", "a b@example.com", "a@.example.com"] {
            assert!(validate_email(bad).is_err(), "{bad} was accepted");
        }
    }

    #[test]
    fn test_extension_request_attribute_round_trip() {
        let request = build_extension_request(&names(&["a.example.com"]), "")
            .unwrap()
            .unwrap();
        let attribute = request.to_attribute().unwrap();
        assert_eq!(attribute.oid, oid::EXTENSION_REQUEST);
        assert_eq!(ExtensionRequest::from_attribute(&attribute).unwrap(), request);
    }
}
