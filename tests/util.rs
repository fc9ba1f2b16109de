#![allow(dead_code)]

use csrtool::bridge::{self, CsrRequest, CsrResponse};
use csrtool::csr::CertificationRequest;
use csrtool::key::KeyType;

/// The subject used throughout the tests: US / California / San Francisco /
/// Example Inc / IT / test.example.com, nothing optional.
pub fn example_request(key_type: KeyType) -> CsrRequest {
    CsrRequest::builder()
        .common_name("test.example.com")
        .key_type(key_type)
        .country("US")
        .state("California")
        .locality("San Francisco")
        .org("Example Inc")
        .org_unit("IT")
        .build()
}

/// The same subject as a JSON document, with `extra` spliced in as
/// additional members (e.g. `"dnsNames": ["a.example.com"]`).
pub fn example_json(key_type: &str, extra: &str) -> String {
    let mut json = format!(
        r#"{{"commonName":"test.example.com","keyType":"{key_type}","country":"US","state":"California","locality":"San Francisco","org":"Example Inc","orgUnit":"IT""#
    );
    if !extra.is_empty() {
        json.push(',');
        json.push_str(extra);
    }
    json.push('}');
    json
}

/// Runs a JSON request through the bridge and parses the response.
pub fn handle(request_json: &str) -> CsrResponse {
    serde_json::from_str(&bridge::handle(request_json)).expect("response is valid JSON")
}

/// Runs a JSON request that must succeed and decodes the CSR.
pub fn generate_csr(request_json: &str) -> (CsrResponse, CertificationRequest) {
    let response = handle(request_json);
    assert_eq!(response.error, None, "generation failed");
    let csr = CertificationRequest::from_pem(&response.csr).expect("CSR decodes");
    (response, csr)
}
