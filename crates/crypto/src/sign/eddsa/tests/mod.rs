// Path: crates/crypto/src/sign/eddsa/tests/mod.rs
use super::*;

#[test]
fn test_keypair_generation() {
    let keypair = Ed25519KeyPair::generate();
    let message = b"Test message";

    // Sign
    let signature = keypair.sign(message).unwrap();

    // Verify
    let public_key = keypair.public();
    assert!(public_key.verify(message, &signature).is_ok());
}

#[test]
fn test_encoding_roundtrip() {
    let keypair = Ed25519KeyPair::generate();

    // Encode both halves
    let public_bytes = keypair.public().to_raw();
    let private_bytes = keypair.secret().to_raw();

    // Verify lengths
    assert_eq!(public_bytes.len(), 32);
    assert_eq!(private_bytes.len(), 32); // Just the seed

    // Decode
    let public_key = Ed25519PublicKey::from_raw(&public_bytes).unwrap();
    let private_key = Ed25519PrivateKey::from_raw(&private_bytes).unwrap();

    // The decoded seed must derive the same verifying key
    let derived_public = private_key.public_key();
    assert_eq!(public_key.to_raw(), derived_public.to_raw());
}

#[test]
fn test_signatures_are_deterministic() {
    let keypair = Ed25519KeyPair::generate();
    let message = b"Test message for determinism";

    let first = keypair.sign(message).unwrap();

    // Rebuild the identity from its encoded seed
    let private_bytes = keypair.secret().to_raw();
    let loaded_private = Ed25519PrivateKey::from_raw(&private_bytes).unwrap();
    let reconstructed = Ed25519KeyPair::from_private_key(&loaded_private);

    let second = reconstructed.sign(message).unwrap();

    // Ed25519 signatures are deterministic and identical
    assert_eq!(first.to_raw(), second.to_raw());
    assert_eq!(first.to_raw().len(), SIGNATURE_SIZE);
}

#[test]
fn test_wrong_key_fails() {
    let keypair1 = Ed25519KeyPair::generate();
    let keypair2 = Ed25519KeyPair::generate();

    let message = b"Test message";
    let signature = keypair1.sign(message).unwrap();

    // Checking with keypair2's public half should fail
    let public_key2 = keypair2.public();
    assert_eq!(
        public_key2.verify(message, &signature),
        Err(CryptoError::SignatureRejected)
    );
}

#[test]
fn test_tampered_message_fails() {
    let keypair = Ed25519KeyPair::generate();
    let message = b"Original message";
    let signature = keypair.sign(message).unwrap();

    let public_key = keypair.public();
    assert!(public_key.verify(b"Tampered message", &signature).is_err());
}

#[test]
fn test_invalid_sizes_are_rejected() {
    assert_eq!(
        Ed25519PublicKey::from_raw(&[0u8; 31]),
        Err(CryptoError::InvalidKeySize(31))
    );
    assert_eq!(
        Ed25519PrivateKey::from_raw(&[0u8; 33]).err(),
        Some(CryptoError::InvalidKeySize(33))
    );
    assert_eq!(
        Ed25519Signature::from_raw(&[0u8; 63]),
        Err(CryptoError::InvalidSignatureSize(63))
    );
}
