// Path: crates/token/src/format/mod.rs
//! The wire container: parsing, serialization and chain verification.

use prost::Message;
use tessera_crypto::{KeyPair, PrivateKey, PublicKey, Signature};
use tessera_types::error::FormatError;
use tessera_types::{wire, MIN_SCHEMA_VERSION};

use crate::chain::{
    block_signature_payload, external_signature_payload, external_signature_version,
    seal_signature_payload, sign_block, signature_version, ChainBlock, ExternalSignature, Proof,
};

pub mod convert;

/// Decodes just enough of a block payload to read its declared schema
/// version.
pub fn payload_schema_version(payload: &[u8]) -> Result<u32, FormatError> {
    let block = wire::Block::decode(payload).map_err(|e| {
        FormatError::BlockDeserializationError(format!("error deserializing block: {e}"))
    })?;
    Ok(block.version.unwrap_or(MIN_SCHEMA_VERSION))
}

/// The parsed wire container: the signed chain plus the resolved root key.
///
/// The root key is not part of the wire format; it is supplied by the
/// caller at build or verification time and kept so that later appends can
/// recompute the chain's signature payload versions.
#[derive(Debug, Clone)]
pub struct SerializedToken {
    /// Optional hint identifying the root key.
    pub root_key_id: Option<u32>,
    /// The root public key this chain was built or verified against.
    pub root_key: PublicKey,
    /// The authority block.
    pub authority: ChainBlock,
    /// Attenuation blocks, in append order.
    pub blocks: Vec<ChainBlock>,
    /// The chain proof.
    pub proof: Proof,
}

impl SerializedToken {
    /// Creates a new chain with a single authority block.
    pub fn new(
        root_key_id: Option<u32>,
        root: &KeyPair,
        next: &KeyPair,
        authority: &wire::Block,
    ) -> Result<Self, FormatError> {
        let payload = authority.encode_to_vec();
        let schema = authority.version.unwrap_or(MIN_SCHEMA_VERSION);
        let version =
            signature_version(false, schema, root.algorithm(), next.algorithm(), 0);
        let signature = sign_block(root, version, &payload, &next.public(), None, None)?;

        Ok(SerializedToken {
            root_key_id,
            root_key: root.public(),
            authority: ChainBlock {
                payload,
                next_key: next.public(),
                signature,
                external_signature: None,
            },
            blocks: Vec::new(),
            proof: Proof::NextSecret(next.private()),
        })
    }

    /// The key pair able to sign the next block, unless the chain is
    /// sealed.
    pub fn next_keypair(&self) -> Result<KeyPair, FormatError> {
        match &self.proof {
            Proof::NextSecret(private_key) => Ok(KeyPair::from_private_key(private_key)),
            Proof::FinalSignature(_) => Err(FormatError::SealedSignature),
        }
    }

    /// Appends a block, consuming the current next secret.
    pub fn append(
        &self,
        next: &KeyPair,
        block: &wire::Block,
        external_signature: Option<ExternalSignature>,
    ) -> Result<Self, FormatError> {
        self.append_serialized(next, block.encode_to_vec(), external_signature)
    }

    /// Appends an already-serialized block payload (third-party blocks
    /// arrive in this form so their signature stays valid byte for byte).
    pub fn append_serialized(
        &self,
        next: &KeyPair,
        payload: Vec<u8>,
        external_signature: Option<ExternalSignature>,
    ) -> Result<Self, FormatError> {
        let keypair = self.next_keypair()?;
        let schema = payload_schema_version(&payload)?;
        let previous_max = self.signature_versions()?.into_iter().max().unwrap_or(0);
        let version = signature_version(
            external_signature.is_some(),
            schema,
            keypair.algorithm(),
            next.algorithm(),
            previous_max,
        );

        let previous_signature = &self.last_block().signature;
        let signature = sign_block(
            &keypair,
            version,
            &payload,
            &next.public(),
            external_signature.as_ref(),
            Some(previous_signature),
        )?;

        let mut blocks = self.blocks.clone();
        blocks.push(ChainBlock {
            payload,
            next_key: next.public(),
            signature,
            external_signature,
        });

        Ok(SerializedToken {
            root_key_id: self.root_key_id,
            root_key: self.root_key.clone(),
            authority: self.authority.clone(),
            blocks,
            proof: Proof::NextSecret(next.private()),
        })
    }

    /// Seals the chain, replacing the next secret with a final signature.
    pub fn seal(&self) -> Result<Self, FormatError> {
        let keypair = self.next_keypair()?;
        let payload = seal_signature_payload(self.last_block());
        let signature = keypair.sign(&payload).map_err(FormatError::from)?;

        Ok(SerializedToken {
            root_key_id: self.root_key_id,
            root_key: self.root_key.clone(),
            authority: self.authority.clone(),
            blocks: self.blocks.clone(),
            proof: Proof::FinalSignature(signature),
        })
    }

    /// True when the chain is sealed.
    pub fn is_sealed(&self) -> bool {
        matches!(self.proof, Proof::FinalSignature(_))
    }

    fn last_block(&self) -> &ChainBlock {
        self.blocks.last().unwrap_or(&self.authority)
    }

    /// Recomputes every block's signature payload version.
    fn signature_versions(&self) -> Result<Vec<u32>, FormatError> {
        let mut versions = Vec::with_capacity(1 + self.blocks.len());
        let mut current_algorithm = self.root_key.algorithm();
        let mut previous_max = 0;

        for block in std::iter::once(&self.authority).chain(self.blocks.iter()) {
            let schema = payload_schema_version(&block.payload)?;
            let version = signature_version(
                block.external_signature.is_some(),
                schema,
                current_algorithm,
                block.next_key.algorithm(),
                previous_max,
            );
            previous_max = previous_max.max(version);
            versions.push(version);
            current_algorithm = block.next_key.algorithm();
        }
        Ok(versions)
    }

    /// Walks the chain and verifies every block signature, every external
    /// signature, and the proof.
    pub fn verify(&self) -> Result<(), FormatError> {
        let mut current_key = self.root_key.clone();
        let mut previous_signature: Option<&Signature> = None;
        let mut previous_max = 0;

        for (index, block) in std::iter::once(&self.authority)
            .chain(self.blocks.iter())
            .enumerate()
        {
            let schema = payload_schema_version(&block.payload)?;
            let version = signature_version(
                block.external_signature.is_some(),
                schema,
                current_key.algorithm(),
                block.next_key.algorithm(),
                previous_max,
            );
            previous_max = previous_max.max(version);

            let payload = block_signature_payload(
                version,
                &block.payload,
                &block.next_key,
                block.external_signature.as_ref(),
                if index == 0 { None } else { previous_signature },
            )?;
            current_key
                .verify(&payload, &block.signature)
                .map_err(FormatError::from)?;

            if let Some(external) = &block.external_signature {
                let external_version = external_signature_version(
                    schema,
                    current_key.algorithm(),
                    external.public_key.algorithm(),
                );
                let external_payload = external_signature_payload(
                    external_version,
                    &block.payload,
                    &current_key,
                    previous_signature,
                )?;
                external
                    .public_key
                    .verify(&external_payload, &external.signature)
                    .map_err(FormatError::from)?;
            }

            log::trace!("verified signature of block {index}");
            previous_signature = Some(&block.signature);
            current_key = block.next_key.clone();
        }

        match &self.proof {
            Proof::NextSecret(private_key) => {
                if private_key.public_key() != current_key {
                    return Err(FormatError::InvalidFormat);
                }
            }
            Proof::FinalSignature(signature) => {
                let payload = seal_signature_payload(self.last_block());
                current_key
                    .verify(&payload, signature)
                    .map_err(FormatError::from)?;
            }
        }

        Ok(())
    }

    /// The raw signature bytes of every block, in order. These are the
    /// token's revocation identifiers.
    pub fn revocation_identifiers(&self) -> Vec<Vec<u8>> {
        std::iter::once(&self.authority)
            .chain(self.blocks.iter())
            .map(|block| block.signature.as_bytes().to_vec())
            .collect()
    }

    /// Parses a wire container against an already-resolved root key. No
    /// signature is checked here; call [`SerializedToken::verify`].
    pub fn deserialize(
        container: wire::TokenContainer,
        root_key: PublicKey,
    ) -> Result<Self, FormatError> {
        let authority = parse_signed_block(container.authority)?;
        let blocks = container
            .blocks
            .into_iter()
            .map(parse_signed_block)
            .collect::<Result<Vec<_>, _>>()?;

        let last_next_key = blocks
            .last()
            .map(|b| &b.next_key)
            .unwrap_or(&authority.next_key);

        let proof = match container.proof.content {
            Some(wire::proof::Content::NextSecret(bytes)) => Proof::NextSecret(
                PrivateKey::from_bytes(last_next_key.algorithm(), &bytes)
                    .map_err(FormatError::from)?,
            ),
            Some(wire::proof::Content::FinalSignature(bytes)) => {
                Proof::FinalSignature(Signature::from_vec(bytes))
            }
            None => return Err(FormatError::InvalidFormat),
        };

        Ok(SerializedToken {
            root_key_id: container.root_key_id,
            root_key,
            authority,
            blocks,
            proof,
        })
    }

    /// Decodes a raw byte buffer into a container.
    pub fn container_from_bytes(bytes: &[u8]) -> Result<wire::TokenContainer, FormatError> {
        wire::TokenContainer::decode(bytes)
            .map_err(|e| FormatError::DeserializationError(format!("deserialization error: {e}")))
    }

    /// Encodes the chain back into its wire container.
    pub fn to_wire(&self) -> wire::TokenContainer {
        wire::TokenContainer {
            root_key_id: self.root_key_id,
            authority: chain_block_to_wire(&self.authority),
            blocks: self.blocks.iter().map(chain_block_to_wire).collect(),
            proof: wire::Proof {
                content: Some(match &self.proof {
                    Proof::NextSecret(private_key) => {
                        wire::proof::Content::NextSecret(private_key.to_bytes().to_vec())
                    }
                    Proof::FinalSignature(signature) => {
                        wire::proof::Content::FinalSignature(signature.as_bytes().to_vec())
                    }
                }),
            },
        }
    }

    /// Serializes the chain to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let container = self.to_wire();
        let mut bytes = Vec::with_capacity(container.encoded_len());
        container
            .encode(&mut bytes)
            .map_err(|e| FormatError::SerializationError(format!("serialization error: {e}")))?;
        Ok(bytes)
    }
}

fn parse_signed_block(input: wire::SignedBlock) -> Result<ChainBlock, FormatError> {
    let next_key = PublicKey::from_wire(&input.next_key).map_err(FormatError::from)?;
    let external_signature = input
        .external_signature
        .map(|external| {
            Ok::<_, FormatError>(ExternalSignature {
                public_key: PublicKey::from_wire(&external.public_key)
                    .map_err(FormatError::from)?,
                signature: Signature::from_vec(external.signature),
            })
        })
        .transpose()?;

    Ok(ChainBlock {
        payload: input.block,
        next_key,
        signature: Signature::from_vec(input.signature),
        external_signature,
    })
}

fn chain_block_to_wire(block: &ChainBlock) -> wire::SignedBlock {
    wire::SignedBlock {
        block: block.payload.clone(),
        next_key: block.next_key.to_wire(),
        signature: block.signature.as_bytes().to_vec(),
        external_signature: block.external_signature.as_ref().map(|external| {
            wire::ExternalSignature {
                signature: external.signature.as_bytes().to_vec(),
                public_key: external.public_key.to_wire(),
            }
        }),
    }
}

#[cfg(test)]
mod tests;
