// Path: crates/crypto/src/sign/ecdsa/tests/mod.rs
use super::*;

#[test]
fn test_keypair_generation() {
    let keypair = P256KeyPair::generate();
    let message = b"Test message";

    let signature = keypair.sign(message).unwrap();

    let public_key = keypair.public();
    assert!(public_key.verify(message, &signature).is_ok());
}

#[test]
fn test_encoding_roundtrip() {
    let keypair = P256KeyPair::generate();

    let public_bytes = keypair.public().to_raw();
    let private_bytes = keypair.secret().to_raw();

    // Compressed SEC1 point and raw scalar
    assert_eq!(public_bytes.len(), 33);
    assert!(public_bytes[0] == 0x02 || public_bytes[0] == 0x03);
    assert_eq!(private_bytes.len(), 32);

    let public_key = P256PublicKey::from_raw(&public_bytes).unwrap();
    let private_key = P256PrivateKey::from_raw(&private_bytes).unwrap();

    let derived_public = private_key.public_key();
    assert_eq!(public_key.to_raw(), derived_public.to_raw());
}

#[test]
fn test_der_signature_size_bounds() {
    let keypair = P256KeyPair::generate();

    for i in 0u8..16 {
        let message = [i; 24];
        let signature = keypair.sign(&message).unwrap();
        let len = signature.to_raw().len();
        assert!(
            (MIN_SIGNATURE_SIZE..=MAX_SIGNATURE_SIZE).contains(&len),
            "DER signature length {len} out of bounds"
        );
    }
}

#[test]
fn test_wrong_key_fails() {
    let keypair1 = P256KeyPair::generate();
    let keypair2 = P256KeyPair::generate();

    let message = b"Test message";
    let signature = keypair1.sign(message).unwrap();

    assert_eq!(
        keypair2.public().verify(message, &signature),
        Err(CryptoError::SignatureRejected)
    );
}

#[test]
fn test_garbage_signature_is_rejected_early() {
    assert_eq!(
        P256Signature::from_raw(&[0u8; 70]).err(),
        Some(CryptoError::InvalidSignatureSize(70))
    );
    assert_eq!(
        P256Signature::from_raw(&[0u8; 64]).err(),
        Some(CryptoError::InvalidSignatureSize(64))
    );
}
