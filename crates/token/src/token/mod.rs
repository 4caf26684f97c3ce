// Path: crates/token/src/token/mod.rs
//! The token lifecycle: build, append, seal, serialize, verify.

use prost::Message;
use tessera_crypto::{Algorithm, KeyPair, PublicKey};
use tessera_datalog::{default_symbol_table, SymbolTable};
use tessera_types::error::{FormatError, TokenError};
use tessera_types::wire;

use crate::authorizer::Authorizer;
use crate::block::Block;
use crate::builder::{BlockBuilder, Check, Fact, Rule, Scope};
use crate::chain::{external_signature_payload, external_signature_version};
use crate::format::convert::{proto_block_to_token_block, token_block_to_proto_block};
use crate::format::SerializedToken;
use crate::root::RootKeyProvider;
use crate::third_party::{ThirdPartyBlock, ThirdPartyRequest};

/// Builds the authority block of a new token.
#[derive(Debug, Clone, Default)]
pub struct TokenBuilder {
    block: BlockBuilder,
    root_key_id: Option<u32>,
}

impl TokenBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        TokenBuilder::default()
    }

    /// Adds an authority fact.
    pub fn fact(mut self, fact: Fact) -> Self {
        self.block = self.block.fact(fact);
        self
    }

    /// Adds an authority rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.block = self.block.rule(rule);
        self
    }

    /// Adds an authority check.
    pub fn check(mut self, check: Check) -> Self {
        self.block = self.block.check(check);
        self
    }

    /// Adds an authority-level trust scope.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.block = self.block.scope(scope);
        self
    }

    /// Sets the authority block's context string.
    pub fn context(mut self, context: &str) -> Self {
        self.block = self.block.context(context);
        self
    }

    /// Sets the root key id hint stored in the token.
    pub fn root_key_id(mut self, id: u32) -> Self {
        self.root_key_id = Some(id);
        self
    }

    /// Signs the authority block with the root key, generating a fresh
    /// Ed25519 next key.
    pub fn build(self, root: &KeyPair) -> Result<Token, TokenError> {
        self.build_with_key_pairs(root, &KeyPair::generate(Algorithm::Ed25519))
    }

    /// Signs the authority block with the root key and an explicit next
    /// key pair.
    pub fn build_with_key_pairs(self, root: &KeyPair, next: &KeyPair) -> Result<Token, TokenError> {
        let authority = self.block.build(&default_symbol_table())?;

        let mut symbols = default_symbol_table();
        symbols.append(authority.symbols.strings());
        for key in authority.public_keys.keys() {
            symbols.public_keys.insert(key);
        }

        let proto = token_block_to_proto_block(&authority);
        let container = SerializedToken::new(self.root_key_id, root, next, &proto)?;

        log::debug!("created token with authority block version {}", authority.version);

        Ok(Token {
            root_key_id: self.root_key_id,
            blocks: vec![authority],
            symbols,
            container,
        })
    }
}

/// A verified bearer token: a chain of signed blocks carrying Datalog.
#[derive(Debug, Clone)]
pub struct Token {
    root_key_id: Option<u32>,
    /// Decoded blocks; the index is the block id, 0 being the authority.
    pub(crate) blocks: Vec<Block>,
    /// The accumulated symbol table: default symbols plus every regular
    /// block's strings, and every block's public keys.
    pub(crate) symbols: SymbolTable,
    pub(crate) container: SerializedToken,
}

impl Token {
    /// Starts building a new token.
    pub fn builder() -> TokenBuilder {
        TokenBuilder::new()
    }

    /// The optional root key id hint.
    pub fn root_key_id(&self) -> Option<u32> {
        self.root_key_id
    }

    /// The number of blocks, at least 1.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// True when the token is sealed.
    pub fn is_sealed(&self) -> bool {
        self.container.is_sealed()
    }

    /// The context string of every block, in order.
    pub fn context(&self) -> Vec<Option<String>> {
        self.blocks.iter().map(|b| b.context.clone()).collect()
    }

    /// The external public key of every block, in order. Blocks carrying
    /// one are third-party blocks.
    pub fn external_public_keys(&self) -> Vec<Option<PublicKey>> {
        self.blocks.iter().map(|b| b.external_key.clone()).collect()
    }

    /// The raw signature bytes of every block, in order. Tokens generated
    /// separately with the same contents still get unique identifiers.
    pub fn revocation_identifiers(&self) -> Vec<Vec<u8>> {
        self.container.revocation_identifiers()
    }

    /// Appends an attenuation block, generating a fresh Ed25519 next key.
    pub fn append(&self, block: BlockBuilder) -> Result<Token, TokenError> {
        self.append_with_keypair(&KeyPair::generate(Algorithm::Ed25519), block)
    }

    /// Appends an attenuation block with an explicit next key pair.
    pub fn append_with_keypair(
        &self,
        next: &KeyPair,
        block: BlockBuilder,
    ) -> Result<Token, TokenError> {
        if self.is_sealed() {
            return Err(tessera_types::error::StructureError::Sealed.into());
        }

        let block = block.build(&self.symbols)?;

        let mut symbols = self.symbols.clone();
        symbols.extend(block.symbols.strings())?;
        for key in block.public_keys.keys() {
            symbols.public_keys.insert(key);
        }

        let proto = token_block_to_proto_block(&block);
        let container = self.container.append(next, &proto, None)?;

        let mut blocks = self.blocks.clone();
        blocks.push(block);

        Ok(Token {
            root_key_id: self.root_key_id,
            blocks,
            symbols,
            container,
        })
    }

    /// Builds the request an external signer needs to produce a
    /// third-party block for this token.
    pub fn third_party_request(&self) -> Result<ThirdPartyRequest, TokenError> {
        if self.is_sealed() {
            return Err(tessera_types::error::StructureError::Sealed.into());
        }
        let last = self
            .container
            .blocks
            .last()
            .unwrap_or(&self.container.authority);
        Ok(ThirdPartyRequest {
            previous_key: last.next_key.clone(),
            public_keys: self.symbols.public_keys.keys().to_vec(),
            previous_signature: last.signature.clone(),
        })
    }

    /// Appends a third-party block, generating a fresh Ed25519 next key.
    pub fn append_third_party(&self, block: &ThirdPartyBlock) -> Result<Token, TokenError> {
        self.append_third_party_with_keypair(&KeyPair::generate(Algorithm::Ed25519), block)
    }

    /// Appends a serialized third-party block.
    pub fn append_third_party_bytes(&self, slice: &[u8]) -> Result<Token, TokenError> {
        self.append_third_party(&ThirdPartyBlock::from_bytes(slice)?)
    }

    /// Appends a third-party block with an explicit next key pair.
    ///
    /// The external signature is checked against the chain position before
    /// anything is signed, so a stale or misdirected response fails here
    /// rather than at the receiving verifier.
    pub fn append_third_party_with_keypair(
        &self,
        next: &KeyPair,
        third_party: &ThirdPartyBlock,
    ) -> Result<Token, TokenError> {
        if self.is_sealed() {
            return Err(tessera_types::error::StructureError::Sealed.into());
        }

        let external_key = third_party.external_signature.public_key.clone();
        let wire_block = wire::Block::decode(&third_party.payload[..]).map_err(|e| {
            FormatError::BlockDeserializationError(format!("error deserializing block: {e}"))
        })?;
        let block = proto_block_to_token_block(&wire_block, Some(external_key.clone()))?;

        let last = self
            .container
            .blocks
            .last()
            .unwrap_or(&self.container.authority);
        let version = external_signature_version(
            block.version,
            last.next_key.algorithm(),
            external_key.algorithm(),
        );
        let payload = external_signature_payload(
            version,
            &third_party.payload,
            &last.next_key,
            Some(&last.signature),
        )?;
        external_key
            .verify(&payload, &third_party.external_signature.signature)
            .map_err(FormatError::from)?;

        let container = self.container.append_serialized(
            next,
            third_party.payload.clone(),
            Some(third_party.external_signature.clone()),
        )?;

        // Third-party symbols stay self-contained; only the declared public
        // keys join the token-level table.
        let mut symbols = self.symbols.clone();
        for key in block.public_keys.keys() {
            symbols.public_keys.insert(key);
        }

        let mut blocks = self.blocks.clone();
        blocks.push(block);

        Ok(Token {
            root_key_id: self.root_key_id,
            blocks,
            symbols,
            container,
        })
    }

    /// Seals the token, preventing further attenuation.
    pub fn seal(&self) -> Result<Token, TokenError> {
        let container = self.container.seal()?;
        Ok(Token {
            root_key_id: self.root_key_id,
            blocks: self.blocks.clone(),
            symbols: self.symbols.clone(),
            container,
        })
    }

    /// Serializes the token.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TokenError> {
        self.container.to_bytes().map_err(TokenError::from)
    }

    /// Serializes the token to URL-safe base64.
    pub fn to_base64(&self) -> Result<String, TokenError> {
        use base64::Engine;
        Ok(base64::engine::general_purpose::URL_SAFE.encode(self.to_bytes()?))
    }

    /// Deserializes a token and verifies the whole signature chain against
    /// the root key chosen by the provider.
    pub fn from_bytes<KP: RootKeyProvider>(bytes: &[u8], provider: KP) -> Result<Token, TokenError> {
        let container = SerializedToken::container_from_bytes(bytes)?;
        let root_key = provider.choose(container.root_key_id)?;

        let serialized = SerializedToken::deserialize(container, root_key)?;
        serialized.verify()?;

        let mut symbols = default_symbol_table();
        let mut blocks = Vec::with_capacity(1 + serialized.blocks.len());

        for chain_block in std::iter::once(&serialized.authority).chain(serialized.blocks.iter()) {
            let wire_block = wire::Block::decode(&chain_block.payload[..]).map_err(|e| {
                FormatError::BlockDeserializationError(format!("error deserializing block: {e}"))
            })?;
            let external_key = chain_block
                .external_signature
                .as_ref()
                .map(|external| external.public_key.clone());
            let block = proto_block_to_token_block(&wire_block, external_key)?;

            if block.external_key.is_none() {
                symbols.append(block.symbols.strings());
            }
            for key in block.public_keys.keys() {
                symbols.public_keys.insert(key);
            }
            blocks.push(block);
        }

        log::debug!("verified token with {} blocks", blocks.len());

        Ok(Token {
            root_key_id: serialized.root_key_id,
            blocks,
            symbols,
            container: serialized,
        })
    }

    /// Deserializes a token from URL-safe base64 and verifies it.
    pub fn from_base64<KP: RootKeyProvider>(
        encoded: &str,
        provider: KP,
    ) -> Result<Token, TokenError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::URL_SAFE
            .decode(encoded)
            .map_err(|e| FormatError::DeserializationError(format!("base64 error: {e}")))?;
        Self::from_bytes(&bytes, provider)
    }

    /// Renders a block as Datalog source.
    pub fn print_block_source(&self, index: usize) -> Result<String, TokenError> {
        let block = self.blocks.get(index).ok_or_else(|| {
            TokenError::Structure(tessera_types::error::StructureError::InvalidBlockIndex {
                expected: self.blocks.len().saturating_sub(1),
                found: index,
            })
        })?;
        Ok(block.print_source(&self.resolution_table(block)))
    }

    /// Creates an authorizer preloaded with this token.
    pub fn authorizer(&self) -> Result<Authorizer, TokenError> {
        let mut authorizer = Authorizer::new();
        authorizer.add_token(self)?;
        Ok(authorizer)
    }

    /// The symbol table a block's contents resolve against: the token's
    /// accumulated table, or the block's own for third-party blocks.
    pub(crate) fn resolution_table(&self, block: &Block) -> SymbolTable {
        let mut table = if block.external_key.is_some() {
            let mut table = default_symbol_table();
            table.append(block.symbols.strings());
            table
        } else {
            self.symbols.clone()
        };
        // Key references are token-level for every block.
        table.public_keys = self.symbols.public_keys.clone();
        table
    }
}
