pub mod attributes;
pub mod extensions;
pub mod params;

use der::asn1::{AnyRef, BitString, SetOfVec};
use der::{Decode, Encode};
use log::{debug, error};
use x509_cert::attr::Attribute;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use attributes::{ChallengePassword, ToAndFromAttribute};
use extensions::{ExtensionRequest, SanEntry};
use params::{CertificationRequestInfo, DistinguishedName};

use crate::error::{CsrToolError, Result};
use crate::key::{KeyPair, KeyType, PublicKey};
use crate::pem_utils;

/// Represents the supported signature algorithms for certification requests.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
}

impl SignatureAlgorithm {
    /// The algorithm a key of `key_type` signs with.
    pub fn for_key_type(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Rsa2048 | KeyType::Rsa4096 => SignatureAlgorithm::Sha256WithRSA,
            KeyType::EcdsaP256 => SignatureAlgorithm::Sha256WithECDSA,
            KeyType::EcdsaP384 => SignatureAlgorithm::Sha384WithECDSA,
        }
    }

    /// Looks an algorithm up by its identifier.
    pub fn from_algorithm_identifier(identifier: &AlgorithmIdentifierOwned) -> Result<Self> {
        match identifier.oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                Ok(SignatureAlgorithm::Sha256WithRSA)
            }
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Ok(SignatureAlgorithm::Sha256WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_384 => Ok(SignatureAlgorithm::Sha384WithECDSA),
            other => Err(CsrToolError::EncodingError(format!(
                "Unsupported signature algorithm {other}"
            ))),
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA identifiers carry explicit NULL parameters, ECDSA identifiers
    /// carry none.
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(AnyRef::NULL.into()),
            },
            SignatureAlgorithm::Sha256WithECDSA => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            SignatureAlgorithm::Sha384WithECDSA => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
        }
    }
}

impl CertificationRequestInfo {
    /// Request attributes in their fixed order: extensionRequest, then
    /// challengePassword. Absent attributes are skipped.
    pub fn attributes(&self) -> Result<Vec<Attribute>> {
        let mut attributes = Vec::with_capacity(2);
        if let Some(extension_request) = &self.extension_request {
            attributes.push(extension_request.to_attribute()?);
        }
        if let Some(challenge_password) = &self.challenge_password {
            attributes.push(challenge_password.to_attribute()?);
        }
        Ok(attributes)
    }

    /// Converts to the x509-cert structure that gets DER-encoded and signed.
    pub fn to_cert_req_info(&self) -> Result<CertReqInfo> {
        Ok(CertReqInfo {
            version: Version::V1,
            subject: self.subject.as_x509_name()?,
            public_key: self.subject_public_key.to_x509spki()?,
            // SET OF: DER sorts the members canonically.
            attributes: SetOfVec::try_from(self.attributes()?)?,
        })
    }
}

/// Represents a PKCS#10 certification request.
///
/// This struct provides methods to encode the request into DER or PEM
/// formats and to read back its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationRequest {
    /// The inner representation of the request.
    pub inner: CertReq,
}

impl CertificationRequest {
    /// Builds and signs a certification request.
    ///
    /// The `CertificationRequestInfo` is DER-encoded once and exactly those
    /// bytes are signed with `key`.
    ///
    /// # Errors
    /// `SigningError` if `key` is not the private half of the subject public
    /// key, or if signing fails. `EncodingError` if a structure cannot be
    /// encoded.
    pub fn build(info: &CertificationRequestInfo, key: &KeyPair) -> Result<Self> {
        let declared = SignatureAlgorithm::for_key_type(info.subject_public_key.key_type());
        if key.signature_algorithm() != declared {
            let err = CsrToolError::SigningError(format!(
                "a {} key cannot sign with {declared:?}",
                key.key_type()
            ));
            error!("{err}");
            return Err(err);
        }
        if key.public_key() != info.subject_public_key {
            let err = CsrToolError::SigningError(
                "private key does not match the subject public key".to_string(),
            );
            error!("{err}");
            return Err(err);
        }

        let cert_req_info = info.to_cert_req_info()?;
        let tbs = cert_req_info.to_der()?;
        let signature = key.sign_data(&tbs)?;
        debug!(
            "signed {} byte certification request info with {declared:?}",
            tbs.len()
        );

        Ok(Self {
            inner: CertReq {
                info: cert_req_info,
                algorithm: declared.into(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    /// Encodes the request into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CsrToolError::EncodingError(e.to_string()))
    }

    /// Encodes the request into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        pem_utils::encode_csr(self)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_der(der)?,
        })
    }

    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let der = pem_utils::pem_to_der(pem_str, pem_utils::CSR_LABELS)?;
        Self::from_der(&der)
    }

    /// DER encoding of the signed `CertificationRequestInfo`.
    pub fn info_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.info.to_der()?)
    }

    pub fn subject(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.info.subject)
    }

    /// The subject public key info exactly as encoded in the request.
    pub fn public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.info.public_key
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_algorithm_identifier(&self.inner.algorithm)
    }

    /// All attributes of the given type, in encoding order.
    pub fn attributes_of_type<A: ToAndFromAttribute>(&self) -> Vec<&Attribute> {
        self.inner
            .info
            .attributes
            .iter()
            .filter(|attribute| attribute.oid == A::OID)
            .collect()
    }

    pub fn extension_request(&self) -> Result<Option<ExtensionRequest>> {
        self.single_attribute::<ExtensionRequest>()
    }

    pub fn challenge_password(&self) -> Result<Option<ChallengePassword>> {
        self.single_attribute::<ChallengePassword>()
    }

    /// Entries of the requested Subject Alternative Name extension; empty
    /// when none was requested.
    pub fn subject_alt_names(&self) -> Result<Vec<SanEntry>> {
        let names = match self.extension_request()? {
            Some(request) => request
                .subject_alt_name()?
                .map(|san| san.names)
                .unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(names)
    }

    /// Verifies the signature against the public key embedded in the
    /// request.
    pub fn verify(&self) -> Result<()> {
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CsrToolError::SigningError("signature has unused bits".to_string())
        })?;
        self.public_key()?
            .verify(&self.signature_algorithm()?, &self.info_der()?, signature)
    }

    fn single_attribute<A: ToAndFromAttribute>(&self) -> Result<Option<A>> {
        match self.attributes_of_type::<A>().as_slice() {
            [] => Ok(None),
            [attribute] => A::from_attribute(attribute).map(Some),
            _ => Err(CsrToolError::EncodingError(format!(
                "attribute {} appears more than once",
                A::OID
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::attributes::build_challenge_password;
    use crate::csr::extensions::build_extension_request;
    use der::Tagged;

    fn subject() -> DistinguishedName {
        DistinguishedName::builder()
            .common_name("test.example.com".to_string())
            .country("US".to_string())
            .organization("Example Inc".to_string())
            .build()
    }

    #[test]
    fn test_build_and_verify() {
        let key_pair = KeyPair::generate_ecdsa_p256();
        let info = CertificationRequestInfo::builder()
            .subject(subject())
            .subject_public_key(key_pair.public_key())
            .maybe_extension_request(
                build_extension_request(&["a.example.com".to_string()], "").unwrap(),
            )
            .maybe_challenge_password(build_challenge_password("secret1").unwrap())
            .build();

        let csr = CertificationRequest::build(&info, &key_pair).unwrap();
        csr.verify().unwrap();
        assert_eq!(csr.inner.info.version, Version::V1);
        assert_eq!(csr.subject().unwrap(), subject());
        assert_eq!(
            csr.signature_algorithm().unwrap(),
            SignatureAlgorithm::Sha256WithECDSA
        );
        assert_eq!(csr.challenge_password().unwrap().unwrap().as_str(), "secret1");
        assert_eq!(
            csr.subject_alt_names().unwrap(),
            vec![SanEntry::DnsName("a.example.com".to_string())]
        );

        let decoded = CertificationRequest::from_der(&csr.to_der().unwrap()).unwrap();
        assert_eq!(decoded, csr);
    }

    #[test]
    fn test_info_encoding_is_deterministic() {
        let key_pair = KeyPair::generate_ecdsa_p384();
        let info = CertificationRequestInfo::builder()
            .subject(subject())
            .subject_public_key(key_pair.public_key())
            .build();
        let first = CertificationRequest::build(&info, &key_pair).unwrap();
        let second = CertificationRequest::build(&info, &key_pair).unwrap();
        assert_eq!(first.info_der().unwrap(), second.info_der().unwrap());
        assert_ne!(first.inner.signature, second.inner.signature);
        second.verify().unwrap();
    }

    #[test]
    fn test_rejects_mismatched_key() {
        let key_pair = KeyPair::generate_ecdsa_p256();
        let other = KeyPair::generate_ecdsa_p256();
        let info = CertificationRequestInfo::builder()
            .subject(subject())
            .subject_public_key(other.public_key())
            .build();
        assert!(matches!(
            CertificationRequest::build(&info, &key_pair),
            Err(CsrToolError::SigningError(_))
        ));

        let p384 = KeyPair::generate_ecdsa_p384();
        assert!(matches!(
            CertificationRequest::build(&info, &p384),
            Err(CsrToolError::SigningError(_))
        ));
    }

    #[test]
    fn test_tampered_request_fails_verification() {
        let key_pair = KeyPair::generate_ecdsa_p256();
        let info = CertificationRequestInfo::builder()
            .subject(subject())
            .subject_public_key(key_pair.public_key())
            .build();
        let mut csr = CertificationRequest::build(&info, &key_pair).unwrap();
        csr.inner.info.subject = DistinguishedName::builder()
            .common_name("evil.example.com".to_string())
            .build()
            .as_x509_name()
            .unwrap();
        assert!(csr.verify().is_err());
    }

    #[test]
    fn test_rsa_algorithm_identifier_has_null_parameters() {
        let identifier: AlgorithmIdentifierOwned = SignatureAlgorithm::Sha256WithRSA.into();
        assert_eq!(identifier.parameters.unwrap().tag(), der::Tag::Null);
        let identifier: AlgorithmIdentifierOwned = SignatureAlgorithm::Sha384WithECDSA.into();
        assert!(identifier.parameters.is_none());
    }
}
