use zeroize::{Zeroize, Zeroizing};

use crate::csr::CertificationRequest;
use crate::error::{CsrToolError, Result};
use crate::key::{KeyPair, PrivateKeyFormat};

/// PEM label of a PKCS#10 request.
pub const CSR_LABEL: &str = "CERTIFICATE REQUEST";

/// Labels accepted when reading a request back; the second is the legacy
/// Netscape spelling.
pub const CSR_LABELS: &[&str] = &[CSR_LABEL, "NEW CERTIFICATE REQUEST"];

const LINE_WRAP: usize = 64;

fn encode_config() -> pem::EncodeConfig {
    pem::EncodeConfig::new()
        .set_line_ending(pem::LineEnding::LF)
        .set_line_wrap(LINE_WRAP)
}

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
///
/// Lines are wrapped at 64 characters and the output ends with a newline.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, encode_config())
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, checking the label
/// against `labels`.
pub fn pem_to_der(pem_str: &str, labels: &[&str]) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str).map_err(|e| CsrToolError::EncodingError(e.to_string()))?;
    if !labels.contains(&pem.tag()) {
        return Err(CsrToolError::EncodingError(format!(
            "unexpected PEM label \"{}\"",
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}

/// Frames the private key of `key_pair` as PEM.
///
/// The label follows the key type and `format`. The intermediate DER copy
/// is wiped before returning and the returned string is wiped when dropped.
pub fn encode_private_key(
    key_pair: &KeyPair,
    format: PrivateKeyFormat,
) -> Result<Zeroizing<String>> {
    let der = key_pair.to_private_key_der(format)?;
    let pem = pem::Pem::new(key_pair.private_key_label(format), der.as_slice());
    let encoded = Zeroizing::new(pem::encode_config(&pem, encode_config()));
    pem.into_contents().zeroize();
    Ok(encoded)
}

/// Frames a certification request as a `CERTIFICATE REQUEST` PEM block.
pub fn encode_csr(csr: &CertificationRequest) -> Result<String> {
    Ok(der_to_pem(&csr.to_der()?, CSR_LABEL))
}
