// Path: crates/token/src/chain/tests/mod.rs
use super::*;

#[test]
fn test_v0_payload_layout() {
    let next = KeyPair::generate(Algorithm::Ed25519);
    let payload = block_signature_payload(0, b"data", &next.public(), None, None).unwrap();

    let mut expected = b"data".to_vec();
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend_from_slice(&next.public().to_bytes());
    assert_eq!(payload, expected);
}

#[test]
fn test_v0_payload_includes_external_signature() {
    let next = KeyPair::generate(Algorithm::Ed25519);
    let external = ExternalSignature {
        public_key: KeyPair::generate(Algorithm::Ed25519).public(),
        signature: Signature::from_vec(vec![9u8; 64]),
    };
    let payload =
        block_signature_payload(0, b"data", &next.public(), Some(&external), None).unwrap();

    let mut expected = b"data".to_vec();
    expected.extend_from_slice(&[9u8; 64]);
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend_from_slice(&next.public().to_bytes());
    assert_eq!(payload, expected);
}

#[test]
fn test_v1_payload_layout() {
    let next = KeyPair::generate(Algorithm::Secp256r1);
    let previous = Signature::from_vec(vec![7u8; 64]);
    let payload =
        block_signature_payload(1, b"data", &next.public(), None, Some(&previous)).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(b"\0BLOCK\0\0VERSION\0");
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.extend_from_slice(b"\0PAYLOAD\0");
    expected.extend_from_slice(b"data");
    expected.extend_from_slice(b"\0ALGORITHM\0");
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.extend_from_slice(b"\0NEXTKEY\0");
    expected.extend_from_slice(&next.public().to_bytes());
    expected.extend_from_slice(b"\0PREVSIG\0");
    expected.extend_from_slice(previous.as_bytes());
    assert_eq!(payload, expected);
}

#[test]
fn test_external_payload_layouts() {
    let previous_key = KeyPair::generate(Algorithm::Ed25519).public();
    let previous_signature = Signature::from_vec(vec![3u8; 64]);

    let v0 = external_signature_payload(0, b"payload", &previous_key, None).unwrap();
    let mut expected = b"payload".to_vec();
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend_from_slice(&previous_key.to_bytes());
    assert_eq!(v0, expected);

    let v1 =
        external_signature_payload(1, b"payload", &previous_key, Some(&previous_signature))
            .unwrap();
    let mut expected = Vec::new();
    expected.extend_from_slice(b"\0EXTERNAL\0\0VERSION\0");
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.extend_from_slice(b"\0PAYLOAD\0");
    expected.extend_from_slice(b"payload");
    expected.extend_from_slice(b"\0PREVSIG\0");
    expected.extend_from_slice(previous_signature.as_bytes());
    assert_eq!(v1, expected);

    // v1 requires the previous signature.
    assert_eq!(
        external_signature_payload(1, b"payload", &previous_key, None),
        Err(FormatError::InvalidFormat)
    );
}

#[test]
fn test_version_selection_rules() {
    let ed = Algorithm::Ed25519;
    let p256 = Algorithm::Secp256r1;

    // Plain Ed25519 chains stay at version 0.
    assert_eq!(signature_version(false, 3, ed, ed, 0), 0);
    // External signatures force version 1.
    assert_eq!(signature_version(true, 3, ed, ed, 0), 1);
    // Datalog 3.3 forces version 1.
    assert_eq!(signature_version(false, 6, ed, ed, 0), 1);
    // A P-256 key on either side forces version 1.
    assert_eq!(signature_version(false, 3, p256, ed, 0), 1);
    assert_eq!(signature_version(false, 3, ed, p256, 0), 1);
    // Once a chain is at version 1, it stays there.
    assert_eq!(signature_version(false, 3, ed, ed, 1), 1);

    // External signature versions follow the same feature rule.
    assert_eq!(external_signature_version(3, ed, ed), 0);
    assert_eq!(external_signature_version(6, ed, ed), 1);
    assert_eq!(external_signature_version(3, ed, p256), 1);
}

#[test]
fn test_sealing_payload_layout() {
    let next = KeyPair::generate(Algorithm::Ed25519);
    let block = ChainBlock {
        payload: b"last".to_vec(),
        next_key: next.public(),
        signature: Signature::from_vec(vec![5u8; 64]),
        external_signature: None,
    };

    let payload = seal_signature_payload(&block);
    let mut expected = b"last".to_vec();
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend_from_slice(&next.public().to_bytes());
    expected.extend_from_slice(&[5u8; 64]);
    assert_eq!(payload, expected);
}

#[test]
fn test_unsupported_payload_version_is_rejected() {
    let next = KeyPair::generate(Algorithm::Ed25519);
    assert_eq!(
        block_signature_payload(2, b"data", &next.public(), None, None),
        Err(FormatError::Version {
            minimum: 0,
            maximum: 1,
            actual: 2
        })
    );
}
