use std::fmt;
use std::str::FromStr;

use der::{Decode, Encode};
use ecdsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand_core::{OsRng, RngCore};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs1v15::{
    Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey,
};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use zeroize::Zeroizing;

use crate::csr::SignatureAlgorithm;
use crate::error::{CsrToolError, Result};
use crate::oid;

/// Public exponent of every generated RSA key.
pub const RSA_PUBLIC_EXPONENT: u64 = 65537;

/// Key algorithms a request may ask for.
///
/// The serialized names are part of the JSON contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA with a 2048-bit modulus.
    #[serde(rename = "rsa2048")]
    Rsa2048,
    /// RSA with a 4096-bit modulus.
    #[serde(rename = "rsa4096")]
    Rsa4096,
    /// ECDSA on NIST P-256.
    #[serde(rename = "ec256", alias = "ecP256")]
    EcdsaP256,
    /// ECDSA on NIST P-384.
    #[serde(rename = "ec384", alias = "ecP384")]
    EcdsaP384,
}

impl KeyType {
    pub const ALL: [KeyType; 4] = [
        KeyType::Rsa2048,
        KeyType::Rsa4096,
        KeyType::EcdsaP256,
        KeyType::EcdsaP384,
    ];

    /// The name used on the wire and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Rsa2048 => "rsa2048",
            KeyType::Rsa4096 => "rsa4096",
            KeyType::EcdsaP256 => "ec256",
            KeyType::EcdsaP384 => "ec384",
        }
    }

    pub fn is_rsa(&self) -> bool {
        matches!(self, KeyType::Rsa2048 | KeyType::Rsa4096)
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = CsrToolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsa2048" => Ok(KeyType::Rsa2048),
            "rsa4096" => Ok(KeyType::Rsa4096),
            "ec256" | "ecp256" => Ok(KeyType::EcdsaP256),
            "ec384" | "ecp384" => Ok(KeyType::EcdsaP384),
            other => Err(CsrToolError::ValidationError(format!(
                "unsupported key type \"{other}\", expected one of rsa2048, rsa4096, ec256, ec384"
            ))),
        }
    }
}

/// How a private key is framed when exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivateKeyFormat {
    /// PKCS#8 `PrivateKeyInfo`, labelled `PRIVATE KEY` for every key type.
    #[default]
    Pkcs8,
    /// PKCS#1 `RSAPrivateKey` for RSA keys, SEC1 `ECPrivateKey` for EC keys.
    Traditional,
}

impl FromStr for PrivateKeyFormat {
    type Err = CsrToolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pkcs8" => Ok(PrivateKeyFormat::Pkcs8),
            "traditional" | "pkcs1" | "sec1" => Ok(PrivateKeyFormat::Traditional),
            other => Err(CsrToolError::ValidationError(format!(
                "unsupported private key format \"{other}\", expected pkcs8 or traditional"
            ))),
        }
    }
}

/// A freshly generated key pair.
///
/// The private halves zeroize themselves when dropped, so letting a
/// `KeyPair` go out of scope is enough to scrub the key from memory.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_type", &self.key_type())
            .field("private", &"<redacted>")
            .finish()
    }
}

impl KeyPair {
    /// Generate a key pair of the requested type from the operating system's
    /// secure random source.
    ///
    /// # Errors
    /// Returns `KeyGenerationError` if the random source is unavailable or the
    /// underlying generator fails. Nothing is retried.
    pub fn generate(key_type: KeyType) -> Result<Self> {
        ensure_entropy()?;
        match key_type {
            KeyType::Rsa2048 => Self::generate_rsa(2048),
            KeyType::Rsa4096 => Self::generate_rsa(4096),
            KeyType::EcdsaP256 => Ok(Self::generate_ecdsa_p256()),
            KeyType::EcdsaP384 => Ok(Self::generate_ecdsa_p384()),
        }
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if !(2048..=4096).contains(&bits) || bits % 8 != 0 {
            return Err(CsrToolError::KeyGenerationError(format!(
                "unsupported RSA modulus size {bits}"
            )));
        }
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
        let private = RsaPrivateKey::new_with_exp(&mut OsRng, bits, &exponent)
            .map_err(|e| CsrToolError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let signing_key = P256SigningKey::random(&mut OsRng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let signing_key = P384SigningKey::random(&mut OsRng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Rsa { public, .. } => rsa_key_type(public),
            KeyPair::EcdsaP256 { .. } => KeyType::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyType::EcdsaP384,
        }
    }

    /// The signature algorithm this key signs with.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// Signs `data` with the algorithm returned by
    /// [`signature_algorithm`](Self::signature_algorithm).
    ///
    /// RSA signatures are PKCS#1 v1.5 and deterministic. ECDSA signatures are
    /// DER-encoded `Ecdsa-Sig-Value`s with a fresh random nonce.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = RsaSigningKey::<Sha256>::new(private.as_ref().clone());
                let signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CsrToolError::SigningError(e.to_string()))?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature = signing_key
                    .try_sign_with_rng(&mut OsRng, data)
                    .map_err(|e| CsrToolError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature = signing_key
                    .try_sign_with_rng(&mut OsRng, data)
                    .map_err(|e| CsrToolError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }

    /// Checks a signature made by [`sign_data`](Self::sign_data).
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        self.public_key()
            .verify(&self.signature_algorithm(), data, signature)
    }

    /// DER encoding of the private key in the requested framing.
    pub fn to_private_key_der(&self, format: PrivateKeyFormat) -> Result<Zeroizing<Vec<u8>>> {
        match (self, format) {
            (KeyPair::Rsa { private, .. }, PrivateKeyFormat::Pkcs8) => {
                let document = private.to_pkcs8_der()?;
                Ok(Zeroizing::new(document.as_bytes().to_vec()))
            }
            (KeyPair::Rsa { private, .. }, PrivateKeyFormat::Traditional) => {
                let document = private
                    .to_pkcs1_der()
                    .map_err(|e| CsrToolError::EncodingError(e.to_string()))?;
                Ok(Zeroizing::new(document.as_bytes().to_vec()))
            }
            (KeyPair::EcdsaP256 { signing_key, .. }, format) => {
                let secret_key = p256::SecretKey::from(signing_key);
                match format {
                    PrivateKeyFormat::Pkcs8 => {
                        let document = secret_key.to_pkcs8_der()?;
                        Ok(Zeroizing::new(document.as_bytes().to_vec()))
                    }
                    PrivateKeyFormat::Traditional => Ok(secret_key.to_sec1_der()?),
                }
            }
            (KeyPair::EcdsaP384 { signing_key, .. }, format) => {
                let secret_key = p384::SecretKey::from(signing_key);
                match format {
                    PrivateKeyFormat::Pkcs8 => {
                        let document = secret_key.to_pkcs8_der()?;
                        Ok(Zeroizing::new(document.as_bytes().to_vec()))
                    }
                    PrivateKeyFormat::Traditional => Ok(secret_key.to_sec1_der()?),
                }
            }
        }
    }

    /// PEM label matching [`to_private_key_der`](Self::to_private_key_der).
    pub fn private_key_label(&self, format: PrivateKeyFormat) -> &'static str {
        match (self, format) {
            (_, PrivateKeyFormat::Pkcs8) => "PRIVATE KEY",
            (KeyPair::Rsa { .. }, PrivateKeyFormat::Traditional) => "RSA PRIVATE KEY",
            (_, PrivateKeyFormat::Traditional) => "EC PRIVATE KEY",
        }
    }
}

/// Public half of a [`KeyPair`], or a public key read back from a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Rsa(public) => rsa_key_type(public),
            PublicKey::EcdsaP256(_) => KeyType::EcdsaP256,
            PublicKey::EcdsaP384(_) => KeyType::EcdsaP384,
        }
    }

    /// Size of the RSA modulus or of the curve order, in bits.
    pub fn bits(&self) -> usize {
        match self {
            PublicKey::Rsa(public) => public.size() * 8,
            PublicKey::EcdsaP256(_) => 256,
            PublicKey::EcdsaP384(_) => 384,
        }
    }

    /// Encodes the key as a `SubjectPublicKeyInfo`.
    pub fn to_x509spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let document = match self {
            PublicKey::Rsa(public) => public.to_public_key_der()?,
            PublicKey::EcdsaP256(verifying_key) => verifying_key.to_public_key_der()?,
            PublicKey::EcdsaP384(verifying_key) => verifying_key.to_public_key_der()?,
        };
        Ok(SubjectPublicKeyInfoOwned::from_der(document.as_bytes())?)
    }

    /// Decodes an RSA, P-256 or P-384 key from a `SubjectPublicKeyInfo`.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki.to_der()?;
        if spki.algorithm.oid == oid::RSA_ENCRYPTION {
            return Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(&der)?));
        }
        if spki.algorithm.oid != oid::EC_PUBLIC_KEY {
            return Err(CsrToolError::EncodingError(format!(
                "unsupported public key algorithm {}",
                spki.algorithm.oid
            )));
        }
        let curve = spki
            .algorithm
            .parameters
            .as_ref()
            .map(|parameters| parameters.decode_as::<const_oid::ObjectIdentifier>())
            .transpose()?;
        match curve {
            Some(curve) if curve == oid::EC_SECP_256_R1 => Ok(PublicKey::EcdsaP256(
                P256VerifyingKey::from_public_key_der(&der)?,
            )),
            Some(curve) if curve == oid::EC_SECP_384_R1 => Ok(PublicKey::EcdsaP384(
                P384VerifyingKey::from_public_key_der(&der)?,
            )),
            Some(curve) => Err(CsrToolError::EncodingError(format!(
                "unsupported elliptic curve {curve}"
            ))),
            None => Err(CsrToolError::EncodingError(
                "elliptic curve public key without named curve".to_string(),
            )),
        }
    }

    /// Checks `signature` over `data` made with `algorithm`.
    ///
    /// # Errors
    /// `SigningError` if the algorithm does not belong to this key or the
    /// signature does not verify.
    pub fn verify(
        &self,
        algorithm: &SignatureAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let invalid = |e: ecdsa::signature::Error| CsrToolError::SigningError(e.to_string());
        match (self, algorithm) {
            (PublicKey::Rsa(public), SignatureAlgorithm::Sha256WithRSA) => {
                let signature = RsaSignature::try_from(signature).map_err(invalid)?;
                RsaVerifyingKey::<Sha256>::new(public.clone())
                    .verify(data, &signature)
                    .map_err(invalid)
            }
            (PublicKey::EcdsaP256(verifying_key), SignatureAlgorithm::Sha256WithECDSA) => {
                let signature = p256::ecdsa::Signature::from_der(signature).map_err(invalid)?;
                verifying_key.verify(data, &signature).map_err(invalid)
            }
            (PublicKey::EcdsaP384(verifying_key), SignatureAlgorithm::Sha384WithECDSA) => {
                let signature = p384::ecdsa::Signature::from_der(signature).map_err(invalid)?;
                verifying_key.verify(data, &signature).map_err(invalid)
            }
            (key, algorithm) => Err(CsrToolError::SigningError(format!(
                "{algorithm:?} cannot be used with a {} key",
                key.key_type()
            ))),
        }
    }
}

fn rsa_key_type(public: &RsaPublicKey) -> KeyType {
    if public.size() * 8 > 2048 {
        KeyType::Rsa4096
    } else {
        KeyType::Rsa2048
    }
}

// Probe the OS random source so an unavailable source surfaces as an error
// instead of a panic inside the key generators.
fn ensure_entropy() -> Result<()> {
    let mut probe = Zeroizing::new([0u8; 32]);
    OsRng.try_fill_bytes(&mut probe[..]).map_err(|e| {
        CsrToolError::KeyGenerationError(format!("secure random source unavailable: {e}"))
    })
}
