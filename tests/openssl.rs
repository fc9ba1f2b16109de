mod util;

use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::X509Req;
use regex::Regex;
use std::fs;
use std::process::Command;

const REQUEST_EXTRAS: &str = r#""dnsNames":["a.example.com","b.example.com"],"email":"admin@example.com","challengePassword":"secret1""#;

#[test]
fn test_openssl_crate_validate_csr() {
    for key_type in ["rsa2048", "ec256", "ec384"] {
        let (response, _) = util::generate_csr(&util::example_json(key_type, REQUEST_EXTRAS));

        let req = X509Req::from_pem(response.csr.as_bytes()).expect("Failed to parse CSR PEM");
        let public_key = req.public_key().unwrap();
        assert!(req.verify(&public_key).unwrap(), "{key_type}: signature does not verify");
        assert_eq!(req.version(), 0);

        let private_key = PKey::private_key_from_pem(response.private_key.as_bytes())
            .expect("Failed to parse private key PEM");
        assert!(private_key.public_eq(&public_key), "{key_type}: key mismatch");

        let entries: Vec<(Nid, String)> = req
            .subject_name()
            .entries()
            .map(|entry| {
                (
                    entry.object().nid(),
                    entry.data().as_utf8().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(
            entries,
            vec![
                (Nid::COUNTRYNAME, "US".to_string()),
                (Nid::STATEORPROVINCENAME, "California".to_string()),
                (Nid::LOCALITYNAME, "San Francisco".to_string()),
                (Nid::ORGANIZATIONNAME, "Example Inc".to_string()),
                (Nid::ORGANIZATIONALUNITNAME, "IT".to_string()),
                (Nid::COMMONNAME, "test.example.com".to_string()),
                (Nid::PKCS9_EMAILADDRESS, "admin@example.com".to_string()),
            ]
        );
    }
}

#[test]
fn test_openssl_crate_reads_rsa_key_size() {
    let (response, _) = util::generate_csr(&util::example_json("rsa2048", ""));
    let private_key = PKey::private_key_from_pem(response.private_key.as_bytes()).unwrap();
    assert_eq!(private_key.bits(), 2048);
    assert_eq!(private_key.rsa().unwrap().e().to_dec_str().unwrap().to_string(), "65537");
}

#[test]
fn test_openssl_crate_reads_traditional_keys() {
    for (key_type, label) in [("rsa2048", "RSA PRIVATE KEY"), ("ec256", "EC PRIVATE KEY")] {
        let (response, _) =
            util::generate_csr(&util::example_json(key_type, r#""keyFormat":"traditional""#));
        assert!(response.private_key.starts_with(&format!("-----BEGIN {label}-----\n")));
        PKey::private_key_from_pem(response.private_key.as_bytes())
            .unwrap_or_else(|e| panic!("{key_type}: {e}"));
    }
}

#[test]
fn test_openssl_validate_csr() {
    let (response, _) = util::generate_csr(&util::example_json("ec256", REQUEST_EXTRAS));

    // Save the CSR to a temporary file
    let csr_path = std::env::temp_dir().join(format!("csrtool_test_{}.csr", std::process::id()));
    fs::write(&csr_path, &response.csr).expect("Failed to write CSR");

    // Use OpenSSL CLI to verify and print the request
    let output = Command::new("openssl")
        .arg("req")
        .arg("-in")
        .arg(&csr_path)
        .arg("-noout")
        .arg("-text")
        .arg("-verify")
        .output()
        .expect("Failed to execute OpenSSL command");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output_text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(output_text.contains("verify OK"), "Signature was not verified");
    assert!(
        output_text.contains("Version: 1 (0x0)"),
        "Version field is incorrect"
    );
    assert!(
        output_text.contains("DNS:a.example.com, DNS:b.example.com, email:admin@example.com"),
        "Subject Alternative Name is incorrect"
    );
    assert!(
        output_text.contains("Signature Algorithm: ecdsa-with-SHA256"),
        "Signature Algorithm field is incorrect"
    );

    let subject_regex =
        Regex::new(r"Subject: C\s?=\s?US, ST\s?=\s?California, L\s?=\s?San Francisco, O\s?=\s?Example Inc, OU\s?=\s?IT, CN\s?=\s?test\.example\.com").unwrap();
    assert!(subject_regex.is_match(&output_text), "Subject field is incorrect");

    let challenge_regex = Regex::new(r"challengePassword\s*:\s*secret1").unwrap();
    assert!(challenge_regex.is_match(&output_text), "challengePassword is missing");

    // Clean up temporary files
    fs::remove_file(&csr_path).expect("Failed to remove test CSR");
}
