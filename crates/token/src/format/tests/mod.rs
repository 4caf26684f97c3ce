// Path: crates/token/src/format/tests/mod.rs
use super::*;
use tessera_crypto::Algorithm;

fn empty_block(version: u32) -> wire::Block {
    wire::Block {
        version: Some(version),
        ..Default::default()
    }
}

fn ed25519() -> KeyPair {
    KeyPair::generate(Algorithm::Ed25519)
}

#[test]
fn test_build_verify_roundtrip() {
    let root = ed25519();
    let next = ed25519();

    let token = SerializedToken::new(None, &root, &next, &empty_block(3)).unwrap();
    token.verify().unwrap();

    let bytes = token.to_bytes().unwrap();
    let container = SerializedToken::container_from_bytes(&bytes).unwrap();
    let parsed = SerializedToken::deserialize(container, root.public()).unwrap();
    parsed.verify().unwrap();

    assert_eq!(parsed.authority, token.authority);
    assert_eq!(parsed.revocation_identifiers(), token.revocation_identifiers());
}

#[test]
fn test_append_preserves_verification() {
    let root = ed25519();
    let token = SerializedToken::new(None, &root, &ed25519(), &empty_block(3)).unwrap();

    let appended = token
        .append(&ed25519(), &empty_block(3), None)
        .unwrap();
    appended.verify().unwrap();
    assert_eq!(appended.blocks.len(), 1);

    // The original is untouched and still verifies.
    token.verify().unwrap();
}

#[test]
fn test_seal_preserves_verification_and_blocks_appends() {
    let root = ed25519();
    let token = SerializedToken::new(None, &root, &ed25519(), &empty_block(3)).unwrap();

    let sealed = token.seal().unwrap();
    sealed.verify().unwrap();
    assert!(sealed.is_sealed());

    assert_eq!(
        sealed.append(&ed25519(), &empty_block(3), None).err(),
        Some(FormatError::SealedSignature)
    );
    assert_eq!(sealed.seal().err(), Some(FormatError::SealedSignature));
}

#[test]
fn test_wrong_root_key_fails() {
    let root = ed25519();
    let token = SerializedToken::new(None, &root, &ed25519(), &empty_block(3)).unwrap();

    let bytes = token.to_bytes().unwrap();
    let container = SerializedToken::container_from_bytes(&bytes).unwrap();
    let parsed = SerializedToken::deserialize(container, ed25519().public()).unwrap();

    assert!(matches!(
        parsed.verify(),
        Err(FormatError::InvalidSignature(_))
    ));
}

#[test]
fn test_tampering_any_signature_byte_fails() {
    let root = ed25519();
    let token = SerializedToken::new(None, &root, &ed25519(), &empty_block(3)).unwrap();
    let appended = token.append(&ed25519(), &empty_block(3), None).unwrap();

    let bytes = appended.to_bytes().unwrap();
    let container = SerializedToken::container_from_bytes(&bytes).unwrap();

    // Flip one signature byte on the appended block.
    let mut tampered = container.clone();
    tampered.blocks[0].signature[10] ^= 0x01;
    let parsed = SerializedToken::deserialize(tampered, root.public()).unwrap();
    assert!(parsed.verify().is_err());

    // Flip one payload byte on the authority block.
    let mut tampered = container;
    tampered.authority.block.push(0xff);
    let parsed = SerializedToken::deserialize(tampered, root.public()).unwrap();
    assert!(parsed.verify().is_err());
}

#[test]
fn test_p256_chain_uses_v1_and_verifies() {
    let root = KeyPair::generate(Algorithm::Secp256r1);
    let next = KeyPair::generate(Algorithm::Secp256r1);

    let token = SerializedToken::new(None, &root, &next, &empty_block(3)).unwrap();
    assert_eq!(token.signature_versions().unwrap(), vec![1]);
    token.verify().unwrap();

    // Mixing curves keeps the chain at version 1.
    let appended = token.append(&ed25519(), &empty_block(3), None).unwrap();
    assert_eq!(appended.signature_versions().unwrap(), vec![1, 1]);
    appended.verify().unwrap();
}

#[test]
fn test_datalog_3_3_blocks_force_v1() {
    let root = ed25519();
    let token = SerializedToken::new(None, &root, &ed25519(), &empty_block(6)).unwrap();
    assert_eq!(token.signature_versions().unwrap(), vec![1]);
    token.verify().unwrap();
}

#[test]
fn test_missing_proof_is_invalid_format() {
    let root = ed25519();
    let token = SerializedToken::new(None, &root, &ed25519(), &empty_block(3)).unwrap();

    let mut container = token.to_wire();
    container.proof = wire::Proof { content: None };
    assert_eq!(
        SerializedToken::deserialize(container, root.public()).err(),
        Some(FormatError::InvalidFormat)
    );
}
