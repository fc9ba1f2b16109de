//! Command line argument parsing
#![allow(missing_docs)]

use std::path::PathBuf;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use csrtool::bridge::CsrRequest;
use csrtool::key::{KeyType, PrivateKeyFormat};

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version)]
/// csrtool: generate a private key and a PKCS#10 certificate signing request
pub struct Options {
    /// Type of key to generate (rsa2048, rsa4096, ec256, ec384)
    #[bpaf(long, argument::<KeyType>("TYPE"), fallback(KeyType::Rsa2048), display_fallback)]
    pub key_type: KeyType,
    /// Private key framing (pkcs8, traditional)
    #[bpaf(long, argument::<PrivateKeyFormat>("FORMAT"), fallback(PrivateKeyFormat::Pkcs8))]
    pub key_format: PrivateKeyFormat,
    /// Common Name (CN), required when generating
    #[bpaf(long, argument("CN"))]
    pub common_name: Option<String>,
    /// Country (C), two letters
    #[bpaf(long, argument("CC"))]
    pub country: Option<String>,
    /// State or province (ST)
    #[bpaf(long, argument("ST"))]
    pub state: Option<String>,
    /// Locality (L)
    #[bpaf(long, argument("L"))]
    pub locality: Option<String>,
    /// Organization (O)
    #[bpaf(long, argument("O"))]
    pub organization: Option<String>,
    /// Organizational unit (OU)
    #[bpaf(long, argument("OU"))]
    pub organizational_unit: Option<String>,
    /// Email address, added to the subject and as a SAN entry
    #[bpaf(long, argument("EMAIL"))]
    pub email: Option<String>,
    /// DNS Subject Alt Name (apply multiple times for multiple names)
    #[bpaf(long("dns-name"), argument::<String>("NAME"), many)]
    pub dns_names: Vec<String>,
    /// PKCS#9 challenge password
    #[bpaf(long, argument("PASSWORD"))]
    pub challenge_password: Option<String>,
    /// Output file for the private key, written with mode 0600
    #[bpaf(long, argument("PATH"))]
    pub output_key: Option<PathBuf>,
    /// Output file for the CSR
    #[bpaf(long, argument("PATH"))]
    pub output_csr: Option<PathBuf>,
    /// Read a JSON request from stdin and print the JSON response
    #[bpaf(long)]
    pub json: bool,
    /// Verify the CSR in PATH and print its contents
    #[bpaf(long, argument("PATH"))]
    pub verify: Option<PathBuf>,
}

impl Options {
    /// The request described by the generation flags.
    pub fn to_request(&self) -> Result<CsrRequest> {
        let Some(common_name) = &self.common_name else {
            bail!("--common-name is required to generate a CSR");
        };
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        Ok(CsrRequest::builder()
            .common_name(common_name.as_str())
            .key_type(self.key_type)
            .country(text(&self.country))
            .state(text(&self.state))
            .locality(text(&self.locality))
            .org(text(&self.organization))
            .org_unit(text(&self.organizational_unit))
            .email(text(&self.email))
            .dns_names(self.dns_names.clone())
            .challenge_password(text(&self.challenge_password))
            .key_format(self.key_format)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = options()
            .run_inner(&["--common-name", "test.example.com"])
            .unwrap();
        assert_eq!(opts.key_type, KeyType::Rsa2048);
        assert_eq!(opts.key_format, PrivateKeyFormat::Pkcs8);
        assert!(!opts.json);
        assert!(opts.dns_names.is_empty());

        let request = opts.to_request().unwrap();
        assert_eq!(request.common_name, "test.example.com");
        assert!(request.country.is_empty());
        assert!(request.challenge_password.is_empty());
    }

    #[test]
    fn test_repeated_dns_names() {
        let opts = options()
            .run_inner(&[
                "--common-name",
                "a.example.com",
                "--key-type",
                "EC384",
                "--dns-name",
                "a.example.com",
                "--dns-name",
                "b.example.com",
                "--organizational-unit",
                "IT",
            ])
            .unwrap();
        assert_eq!(opts.key_type, KeyType::EcdsaP384);
        let request = opts.to_request().unwrap();
        assert_eq!(request.dns_names, vec!["a.example.com", "b.example.com"]);
        assert_eq!(request.org_unit, "IT");
    }

    #[test]
    fn test_rejects_unknown_key_type() {
        assert!(options().run_inner(&["--key-type", "dsa"]).is_err());
    }

    #[test]
    fn test_common_name_required_for_generation() {
        let opts = options().run_inner(&["--json"]).unwrap();
        assert!(opts.to_request().is_err());
    }
}
