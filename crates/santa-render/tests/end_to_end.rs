use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use santa_generators::Registry;
use santa_render::{mask, Renderer, MASK};
use santa_types::{GeneratorConfig, SantaError, SecurityViolation};
use serde_json::{json, Value};
use std::sync::Arc;
use x509_parser::pem::parse_x509_pem;

fn renderer() -> Renderer {
    Renderer::new(Arc::new(Registry::with_defaults()))
}

fn entry(name: &str, kind: &str, config: Value) -> GeneratorConfig {
    GeneratorConfig::new(name, kind).with_config(config)
}

#[test]
fn test_password_scenario() {
    let configs = vec![entry("Password", "random_password", json!({"length": 16}))];
    let out = renderer()
        .render("password: {{.Password.value}}", &configs)
        .unwrap();
    let pattern = Regex::new(r"^password: .{16}$").unwrap();
    assert!(pattern.is_match(&out), "{}", out);
}

#[test]
fn test_aes_key_scenario() {
    let configs = vec![entry("AESKey", "crypto_aes_key", json!({"key_size": 256}))];
    let out = renderer().render("key: {{.AESKey.key_base64}}", &configs).unwrap();
    let encoded = out.strip_prefix("key: ").unwrap();
    assert_eq!(STANDARD.decode(encoded).unwrap().len(), 32);
}

#[test]
fn test_json_masking_scenario() {
    let masked = mask(r#"{"password":"s3cr3t","nested":{"x":"y"}}"#);
    let value: Value = serde_json::from_str(&masked).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["password"], MASK);
    assert_eq!(object["nested"], json!({"x": MASK}));
}

#[test]
fn test_locally_signed_chain() {
    let renderer = renderer();
    let first = renderer
        .generate(&[
            entry(
                "CA",
                "tls_self_signed_cert",
                json!({"key_algorithm": "ECDSA", "common_name": "Santa Root CA", "is_ca_certificate": true}),
            ),
            entry("Leaf", "tls_private_key", json!({"algorithm": "ECDSA", "ecdsa_curve": "P256"})),
            entry("Other", "tls_private_key", json!({"algorithm": "ED25519"})),
        ])
        .unwrap();
    let ca_cert = first["CA"]["cert_pem"].clone();
    let ca_key = first["CA"]["private_key_pem"].clone();

    let second = renderer
        .generate(&[entry(
            "CSR",
            "tls_cert_request",
            json!({
                "private_key_pem": first["Leaf"]["private_key_pem"],
                "common_name": "api.internal",
                "dns_names": ["api.internal"]
            }),
        )])
        .unwrap();
    let csr = second["CSR"]["cert_request_pem"].clone();

    let template = "{{ .Cert.cert_pem }}";
    let signed = renderer
        .render(
            template,
            &[entry(
                "Cert",
                "tls_locally_signed_cert",
                json!({"cert_request_pem": csr, "ca_private_key_pem": ca_key, "ca_cert_pem": ca_cert, "validity_period_hours": 24}),
            )],
        )
        .unwrap();

    let (_, ca_pem) = parse_x509_pem(ca_cert.as_bytes()).unwrap();
    let ca = ca_pem.parse_x509().unwrap();
    let (_, leaf_pem) = parse_x509_pem(signed.as_bytes()).unwrap();
    let leaf = leaf_pem.parse_x509().unwrap();
    leaf.verify_signature(Some(ca.public_key())).unwrap();
    assert_eq!(leaf.issuer(), ca.subject());

    // A key that does not belong to the CA certificate is refused.
    let err = renderer
        .generate(&[entry(
            "Cert",
            "tls_locally_signed_cert",
            json!({
                "cert_request_pem": csr,
                "ca_private_key_pem": first["Other"]["private_key_pem"],
                "ca_cert_pem": ca_cert
            }),
        )])
        .unwrap_err();
    assert!(matches!(err.root_cause(), SantaError::ChainValidation(_)), "{}", err);
}

#[test]
fn test_security_patterns_rejected_before_generation() {
    let renderer = renderer();
    let configs = vec![entry("User", "random_uuid", json!({}))];
    let cases = [
        ("{{.}}", SecurityViolation::RootContextAccess),
        ("{{range .}}{{end}}", SecurityViolation::RangeOverRoot),
        ("{{with .}}{{end}}", SecurityViolation::WithRoot),
        ("{{ call .User.value }}", SecurityViolation::CallFunction),
        ("{{ js .User.value }}", SecurityViolation::JsFunction),
        ("{{ urlquery .User.value }}", SecurityViolation::UrlQueryFunction),
    ];
    let mut messages = Vec::new();
    for (template, violation) in cases {
        let err = renderer.validate(template, &configs).unwrap_err();
        assert!(
            matches!(err, SantaError::TemplateSecurity(v) if v == violation),
            "{}: {}",
            template,
            err
        );
        messages.push(err.to_string());
    }
    messages.sort();
    messages.dedup();
    assert_eq!(messages.len(), cases.len());

    assert!(renderer.validate("{{.User.value}}", &configs).is_ok());
    assert!(renderer
        .validate("{{range .Items}}{{.name}}{{end}}", &configs)
        .is_ok());
}

#[test]
fn test_entropy_and_integer_in_templates() {
    let renderer = renderer();
    let out = renderer
        .render(
            "{{ entropy \"abc\" \"abcdefghijklmnopqrstuvwxyz\" | printf \"%.2f\" }} {{ .N.value }}",
            &[entry("N", "random_integer", json!({"min": 10, "max": 20}))],
        )
        .unwrap();
    let (entropy, value) = out.split_once(' ').unwrap();
    assert_eq!(entropy, "14.10");
    let value: i64 = value.parse().unwrap();
    assert!((10..=20).contains(&value));

    let err = renderer
        .generate(&[entry("N", "random_integer", json!({"min": 20, "max": 10}))])
        .unwrap_err();
    assert!(matches!(err.root_cause(), SantaError::Config { .. }));
}

#[test]
fn test_rsa_sizes_rejected() {
    let renderer = renderer();
    for size in [2047, 8193, 2049] {
        let err = renderer
            .generate(&[entry("Key", "crypto_rsa_key", json!({"key_size": size}))])
            .unwrap_err();
        assert!(
            matches!(err.root_cause(), SantaError::Config { ref field, .. } if field == "key_size"),
            "{}: {}",
            size,
            err
        );
    }
}

#[test]
fn test_static_time_fields() {
    let out = renderer()
        .render(
            "{{ .T.year }}-{{ .T.month }}-{{ .T.day }} {{ .T.unix }}",
            &[entry("T", "time_static", json!({"rfc3339": "2024-03-05T07:08:09Z"}))],
        )
        .unwrap();
    assert_eq!(out, "2024-3-5 1709622489");
}

#[test]
fn test_duplicate_names_rejected_before_generation() {
    let configs = vec![
        entry("Same", "random_uuid", json!({})),
        entry("Same", "random_password", json!({})),
    ];
    let err = renderer().render("{{ .Same.value }}", &configs).unwrap_err();
    assert!(matches!(err, SantaError::DuplicateName(ref n) if n == "Same"));
}
