// Path: crates/token/src/chain/mod.rs
//! Signature payload formats for the signed block chain.
//!
//! Every block is signed by the previous block's next key, starting from
//! the root key, so the whole chain verifies given only the root public
//! key. The entire chain must be checked on every verification: trust
//! narrows block by block, and a shortcut over intermediate signatures
//! would let an attenuated token be forged.

use tessera_crypto::{Algorithm, KeyPair, PrivateKey, PublicKey, Signature};
use tessera_types::error::FormatError;
use tessera_types::DATALOG_3_3;

/// Magic prefix of the v1 block signature payload.
const BLOCK_VERSION_HEADER: &[u8] = b"\0BLOCK\0\0VERSION\0";
/// Magic prefix of the v1 external signature payload.
const EXTERNAL_VERSION_HEADER: &[u8] = b"\0EXTERNAL\0\0VERSION\0";
const PAYLOAD_HEADER: &[u8] = b"\0PAYLOAD\0";
const ALGORITHM_HEADER: &[u8] = b"\0ALGORITHM\0";
const NEXT_KEY_HEADER: &[u8] = b"\0NEXTKEY\0";
const PREVIOUS_SIGNATURE_HEADER: &[u8] = b"\0PREVSIG\0";
const EXTERNAL_SIGNATURE_HEADER: &[u8] = b"\0EXTERNALSIG\0";

/// A third-party signature attached to a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSignature {
    /// The external signer's public key.
    pub public_key: PublicKey,
    /// The signature over the external signature payload.
    pub signature: Signature,
}

/// One signed block of the chain.
///
/// The signature payload version is not stored: it is recomputed
/// deterministically from the block contents and the chain position, both
/// when signing and when verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    /// The serialized block payload.
    pub payload: Vec<u8>,
    /// The key verifying the next block.
    pub next_key: PublicKey,
    /// The signature over this block's signature payload.
    pub signature: Signature,
    /// The third-party signature, when present.
    pub external_signature: Option<ExternalSignature>,
}

/// The chain proof.
#[derive(Clone)]
pub enum Proof {
    /// The private half of the last block's next key; appending stays
    /// possible.
    NextSecret(PrivateKey),
    /// A final signature; the token is sealed.
    FinalSignature(Signature),
}

impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Proof::NextSecret(_) => f.write_str("Proof::NextSecret(<redacted>)"),
            Proof::FinalSignature(sig) => {
                write!(f, "Proof::FinalSignature({})", hex::encode(sig.as_bytes()))
            }
        }
    }
}

fn algorithm_le(algorithm: Algorithm) -> [u8; 4] {
    (algorithm as u32).to_le_bytes()
}

/// Selects the signature payload version for a block.
///
/// In order: an externally signed block always uses v1; a block built
/// against Datalog 3.3 or later uses v1; any non-Ed25519 key on either
/// side of the signature uses v1; otherwise the chain keeps the highest
/// version seen so far, starting at 0.
pub fn signature_version(
    has_external_signature: bool,
    schema_version: u32,
    block_key_algorithm: Algorithm,
    next_key_algorithm: Algorithm,
    previous_versions_max: u32,
) -> u32 {
    if has_external_signature
        || schema_version >= DATALOG_3_3
        || block_key_algorithm != Algorithm::Ed25519
        || next_key_algorithm != Algorithm::Ed25519
    {
        1
    } else {
        previous_versions_max
    }
}

/// Selects the external signature payload version.
pub fn external_signature_version(
    schema_version: u32,
    previous_key_algorithm: Algorithm,
    external_key_algorithm: Algorithm,
) -> u32 {
    if schema_version >= DATALOG_3_3
        || previous_key_algorithm != Algorithm::Ed25519
        || external_key_algorithm != Algorithm::Ed25519
    {
        1
    } else {
        0
    }
}

/// Builds the byte sequence a block signature covers.
///
/// `previous_signature` must be present for every block after the
/// authority block when the version is 1.
pub fn block_signature_payload(
    version: u32,
    payload: &[u8],
    next_key: &PublicKey,
    external_signature: Option<&ExternalSignature>,
    previous_signature: Option<&Signature>,
) -> Result<Vec<u8>, FormatError> {
    match version {
        0 => {
            let mut out = Vec::new();
            out.extend_from_slice(payload);
            if let Some(external) = external_signature {
                out.extend_from_slice(external.signature.as_bytes());
            }
            out.extend_from_slice(&algorithm_le(next_key.algorithm()));
            out.extend_from_slice(&next_key.to_bytes());
            Ok(out)
        }
        1 => {
            let mut out = Vec::new();
            out.extend_from_slice(BLOCK_VERSION_HEADER);
            out.extend_from_slice(&version.to_le_bytes());
            out.extend_from_slice(PAYLOAD_HEADER);
            out.extend_from_slice(payload);
            out.extend_from_slice(ALGORITHM_HEADER);
            out.extend_from_slice(&algorithm_le(next_key.algorithm()));
            out.extend_from_slice(NEXT_KEY_HEADER);
            out.extend_from_slice(&next_key.to_bytes());
            if let Some(previous) = previous_signature {
                out.extend_from_slice(PREVIOUS_SIGNATURE_HEADER);
                out.extend_from_slice(previous.as_bytes());
            }
            if let Some(external) = external_signature {
                out.extend_from_slice(EXTERNAL_SIGNATURE_HEADER);
                out.extend_from_slice(external.signature.as_bytes());
            }
            Ok(out)
        }
        other => Err(FormatError::Version {
            minimum: 0,
            maximum: 1,
            actual: other,
        }),
    }
}

/// Builds the byte sequence an external (third-party) signature covers.
pub fn external_signature_payload(
    version: u32,
    payload: &[u8],
    previous_key: &PublicKey,
    previous_signature: Option<&Signature>,
) -> Result<Vec<u8>, FormatError> {
    match version {
        0 => {
            let mut out = Vec::new();
            out.extend_from_slice(payload);
            out.extend_from_slice(&algorithm_le(previous_key.algorithm()));
            out.extend_from_slice(&previous_key.to_bytes());
            Ok(out)
        }
        1 => {
            let previous_signature = previous_signature.ok_or(FormatError::InvalidFormat)?;
            let mut out = Vec::new();
            out.extend_from_slice(EXTERNAL_VERSION_HEADER);
            out.extend_from_slice(&version.to_le_bytes());
            out.extend_from_slice(PAYLOAD_HEADER);
            out.extend_from_slice(payload);
            out.extend_from_slice(PREVIOUS_SIGNATURE_HEADER);
            out.extend_from_slice(previous_signature.as_bytes());
            Ok(out)
        }
        other => Err(FormatError::Version {
            minimum: 0,
            maximum: 1,
            actual: other,
        }),
    }
}

/// Builds the byte sequence a sealing signature covers (v0 layout).
pub fn seal_signature_payload(last: &ChainBlock) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&last.payload);
    out.extend_from_slice(&algorithm_le(last.next_key.algorithm()));
    out.extend_from_slice(&last.next_key.to_bytes());
    out.extend_from_slice(last.signature.as_bytes());
    out
}

/// Signs a new block with the current chain key.
pub fn sign_block(
    keypair: &KeyPair,
    version: u32,
    payload: &[u8],
    next_key: &PublicKey,
    external_signature: Option<&ExternalSignature>,
    previous_signature: Option<&Signature>,
) -> Result<Signature, FormatError> {
    let to_sign = block_signature_payload(
        version,
        payload,
        next_key,
        external_signature,
        previous_signature,
    )?;
    keypair.sign(&to_sign).map_err(FormatError::from)
}

#[cfg(test)]
mod tests;
