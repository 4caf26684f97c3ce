// Path: crates/types/src/error/mod.rs
//! Core error types for the Tessera authorization kernel.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maps every error variant onto a short constant identifier.
///
/// Display strings may be reworded between releases; these identifiers are
/// frozen, so callers can match on them and log pipelines can aggregate
/// by them.
pub trait ErrorCode {
    /// The frozen identifier for this variant.
    fn code(&self) -> &'static str;
}

/// Errors related to the wire format and the signed block chain.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatError {
    /// The container layout is malformed, for example a proof that does not
    /// match the chain state.
    #[error("invalid token format")]
    InvalidFormat,
    /// A signature in the block chain failed verification.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// A signing operation was attempted on a sealed chain.
    #[error("cannot sign a sealed token")]
    SealedSignature,
    /// No root public key was available to verify against.
    #[error("no root key available")]
    EmptyKeys,
    /// The token's root key id did not resolve to a known public key.
    #[error("unknown root public key")]
    UnknownPublicKey,
    /// The container bytes could not be decoded.
    #[error("deserialization error: {0}")]
    DeserializationError(String),
    /// The container could not be encoded.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// A block payload could not be decoded.
    #[error("block deserialization error: {0}")]
    BlockDeserializationError(String),
    /// A block payload could not be encoded.
    #[error("block serialization error: {0}")]
    BlockSerializationError(String),
    /// The block declares a schema version outside the supported range.
    #[error("unsupported block version: expected {minimum}..={maximum}, got {actual}")]
    Version {
        /// The lowest version this implementation accepts.
        minimum: u32,
        /// The highest version this implementation accepts.
        maximum: u32,
        /// The version declared by the block.
        actual: u32,
    },
    /// A signature had an invalid byte length for its algorithm.
    #[error("invalid signature size: {0} bytes")]
    InvalidSignatureSize(usize),
    /// A key had an invalid byte length for its algorithm.
    #[error("invalid key size: {0} bytes")]
    InvalidKeySize(usize),
    /// A key was malformed or used an unknown algorithm.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl ErrorCode for FormatError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "FORMAT_INVALID",
            Self::InvalidSignature(_) => "FORMAT_INVALID_SIGNATURE",
            Self::SealedSignature => "FORMAT_SEALED_SIGNATURE",
            Self::EmptyKeys => "FORMAT_EMPTY_KEYS",
            Self::UnknownPublicKey => "FORMAT_UNKNOWN_PUBLIC_KEY",
            Self::DeserializationError(_) => "FORMAT_DESERIALIZATION_ERROR",
            Self::SerializationError(_) => "FORMAT_SERIALIZATION_ERROR",
            Self::BlockDeserializationError(_) => "FORMAT_BLOCK_DESERIALIZATION_ERROR",
            Self::BlockSerializationError(_) => "FORMAT_BLOCK_SERIALIZATION_ERROR",
            Self::Version { .. } => "FORMAT_UNSUPPORTED_VERSION",
            Self::InvalidSignatureSize(_) => "FORMAT_INVALID_SIGNATURE_SIZE",
            Self::InvalidKeySize(_) => "FORMAT_INVALID_KEY_SIZE",
            Self::InvalidKey(_) => "FORMAT_INVALID_KEY",
        }
    }
}

/// Errors in cryptographic primitives, reported by the signature backends.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptoError {
    /// A key could not be parsed for the requested algorithm.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// A key had an invalid byte length for its algorithm.
    #[error("invalid key size: {0} bytes")]
    InvalidKeySize(usize),
    /// A signature had an invalid byte length for its algorithm.
    #[error("invalid signature size: {0} bytes")]
    InvalidSignatureSize(usize),
    /// A signature failed verification against a message and public key.
    #[error("signature verification failed")]
    SignatureRejected,
    /// The signing operation itself failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),
    /// An algorithm identifier from the wire was not recognized.
    #[error("unsupported algorithm identifier: {0}")]
    UnsupportedAlgorithm(i32),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidKeySize(_) => "CRYPTO_INVALID_KEY_SIZE",
            Self::InvalidSignatureSize(_) => "CRYPTO_INVALID_SIGNATURE_SIZE",
            Self::SignatureRejected => "CRYPTO_SIGNATURE_REJECTED",
            Self::SigningFailed(_) => "CRYPTO_SIGNING_FAILED",
            Self::UnsupportedAlgorithm(_) => "CRYPTO_UNSUPPORTED_ALGORITHM",
        }
    }
}

impl From<CryptoError> for FormatError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKey(s) => FormatError::InvalidKey(s),
            CryptoError::InvalidKeySize(n) => FormatError::InvalidKeySize(n),
            CryptoError::InvalidSignatureSize(n) => FormatError::InvalidSignatureSize(n),
            CryptoError::SignatureRejected => {
                FormatError::InvalidSignature("signature verification failed".to_string())
            }
            CryptoError::SigningFailed(s) => FormatError::InvalidSignature(s),
            CryptoError::UnsupportedAlgorithm(a) => {
                FormatError::InvalidKey(format!("unsupported algorithm identifier: {a}"))
            }
        }
    }
}

/// Errors in the structure of a token, independent of signatures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureError {
    /// The authority block was not at index 0.
    #[error("the authority block must be at index 0")]
    InvalidAuthorityIndex,
    /// A block was found at an index other than its declared position.
    #[error("invalid block index: expected {expected}, found {found}")]
    InvalidBlockIndex {
        /// The index the block should occupy.
        expected: usize,
        /// The index the block was found at.
        found: usize,
    },
    /// A block introduces a symbol that is already interned by the default
    /// table or an earlier block.
    #[error("a block redefines an already interned symbol")]
    SymbolTableOverlap,
    /// A symbol id did not resolve against the accumulated symbol table.
    #[error("some symbol ids could not be resolved")]
    MissingSymbols,
    /// The token is sealed and cannot be attenuated further.
    #[error("the token is sealed")]
    Sealed,
}

impl ErrorCode for StructureError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAuthorityIndex => "STRUCTURE_INVALID_AUTHORITY_INDEX",
            Self::InvalidBlockIndex { .. } => "STRUCTURE_INVALID_BLOCK_INDEX",
            Self::SymbolTableOverlap => "STRUCTURE_SYMBOL_TABLE_OVERLAP",
            Self::MissingSymbols => "STRUCTURE_MISSING_SYMBOLS",
            Self::Sealed => "STRUCTURE_SEALED",
        }
    }
}

/// A check that failed during authorization, with its rendered source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailedCheck {
    /// A check carried by a token block.
    Block(FailedBlockCheck),
    /// A check added directly to the authorizer.
    Authorizer(FailedAuthorizerCheck),
}

impl fmt::Display for FailedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(b) => write!(
                f,
                "check {} in block {} failed: {}",
                b.check_id, b.block_id, b.rule
            ),
            Self::Authorizer(a) => write!(f, "authorizer check {} failed: {}", a.check_id, a.rule),
        }
    }
}

/// A failed check from a token block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBlockCheck {
    /// The id of the block carrying the check (0 is the authority block).
    pub block_id: usize,
    /// The index of the check inside its block.
    pub check_id: usize,
    /// The check rendered as Datalog source.
    pub rule: String,
}

/// A failed check declared on the authorizer itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAuthorizerCheck {
    /// The index of the check on the authorizer.
    pub check_id: usize,
    /// The check rendered as Datalog source.
    pub rule: String,
}

/// The policy that fixed the authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchedPolicy {
    /// An `allow` policy matched, at the given index.
    Allow(usize),
    /// A `deny` policy matched, at the given index.
    Deny(usize),
}

impl fmt::Display for MatchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow(i) => write!(f, "allow policy {i}"),
            Self::Deny(i) => write!(f, "deny policy {i}"),
        }
    }
}

/// Errors produced by the authorization logic.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicError {
    /// The authority block carried a fact it is not allowed to define.
    #[error("invalid authority fact: {0}")]
    InvalidAuthorityFact(String),
    /// The authorizer carried a fact it is not allowed to define.
    #[error("invalid ambient fact: {0}")]
    InvalidAmbientFact(String),
    /// An attenuation block carried a fact it is not allowed to define.
    #[error("invalid fact in block {0}: {1}")]
    InvalidBlockFact(usize, String),
    /// An attenuation block carried a rule it is not allowed to define.
    #[error("invalid rule in block {0}: {1}")]
    InvalidBlockRule(usize, String),
    /// Authorization was rejected, either by a deny policy or failed checks.
    #[error("authorization rejected by {policy}")]
    Unauthorized {
        /// The policy that fixed the decision.
        policy: MatchedPolicy,
        /// Every check that failed during evaluation, in declaration order.
        checks: Vec<FailedCheck>,
    },
    /// Every policy was evaluated and none matched.
    #[error("no matching policy")]
    NoMatchingPolicy {
        /// Every check that failed during evaluation, in declaration order.
        checks: Vec<FailedCheck>,
    },
    /// A token was added to an authorizer that already contains one.
    #[error("the authorizer already contains a token")]
    AuthorizerNotEmpty,
}

impl ErrorCode for LogicError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAuthorityFact(_) => "LOGIC_INVALID_AUTHORITY_FACT",
            Self::InvalidAmbientFact(_) => "LOGIC_INVALID_AMBIENT_FACT",
            Self::InvalidBlockFact(..) => "LOGIC_INVALID_BLOCK_FACT",
            Self::InvalidBlockRule(..) => "LOGIC_INVALID_BLOCK_RULE",
            Self::Unauthorized { .. } => "LOGIC_UNAUTHORIZED",
            Self::NoMatchingPolicy { .. } => "LOGIC_NO_MATCHING_POLICY",
            Self::AuthorizerNotEmpty => "LOGIC_AUTHORIZER_NOT_EMPTY",
        }
    }
}

/// Resource limit violations raised by the Datalog solver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunLimitError {
    /// The world grew past the configured fact count.
    #[error("too many facts generated")]
    TooManyFacts,
    /// The solver ran past the configured iteration count.
    #[error("too many iterations")]
    TooManyIterations,
    /// The solver ran past the configured deadline.
    #[error("spent too much time verifying")]
    Timeout,
}

impl ErrorCode for RunLimitError {
    fn code(&self) -> &'static str {
        match self {
            Self::TooManyFacts => "RUN_LIMIT_TOO_MANY_FACTS",
            Self::TooManyIterations => "RUN_LIMIT_TOO_MANY_ITERATIONS",
            Self::Timeout => "RUN_LIMIT_TIMEOUT",
        }
    }
}

/// Failures raised while evaluating an expression on the term stack.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionError {
    /// The op sequence was malformed: stack underflow, leftover values,
    /// unbound variables, division by zero, or an invalid regex.
    #[error("expression execution failure: {0}")]
    Execution(String),
    /// Checked integer arithmetic overflowed.
    #[error("integer arithmetic overflow")]
    Overflow,
    /// An operator was applied to operands of the wrong type.
    #[error("invalid operand types")]
    InvalidType,
    /// A closure parameter shadows a variable that is already bound.
    #[error("closure parameter shadows variable {0}")]
    ShadowedVariable(u32),
}

impl ErrorCode for ExecutionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Execution(_) => "EXECUTION_FAILURE",
            Self::Overflow => "EXECUTION_OVERFLOW",
            Self::InvalidType => "EXECUTION_INVALID_TYPE",
            Self::ShadowedVariable(_) => "EXECUTION_SHADOWED_VARIABLE",
        }
    }
}

/// Errors raised at the builder stage, before anything is signed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageError {
    /// Builder input could not be interpreted.
    #[error("parse error: {0}")]
    ParseError(String),
    /// Variables appear in a rule head or expression without appearing in
    /// any body predicate.
    #[error("undefined variables in rule: {0:?}")]
    InvalidVariables(Vec<String>),
    /// A variable was referenced but never introduced.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
}

impl ErrorCode for LanguageError {
    fn code(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "LANGUAGE_PARSE_ERROR",
            Self::InvalidVariables(_) => "LANGUAGE_INVALID_VARIABLES",
            Self::UnknownVariable(_) => "LANGUAGE_UNKNOWN_VARIABLE",
        }
    }
}

/// The top-level error type for every token operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenError {
    /// A wire format or signature failure.
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    /// A token structure failure.
    #[error("structure error: {0}")]
    Structure(#[from] StructureError),
    /// An authorization logic failure.
    #[error("logic error: {0}")]
    Logic(#[from] LogicError),
    /// A solver resource limit was exceeded.
    #[error("run limit exceeded: {0}")]
    RunLimit(#[from] RunLimitError),
    /// An expression failed to evaluate.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
    /// Builder input was rejected.
    #[error("language error: {0}")]
    Language(#[from] LanguageError),
}

impl ErrorCode for TokenError {
    fn code(&self) -> &'static str {
        match self {
            Self::Format(e) => e.code(),
            Self::Structure(e) => e.code(),
            Self::Logic(e) => e.code(),
            Self::RunLimit(e) => e.code(),
            Self::Execution(e) => e.code(),
            Self::Language(e) => e.code(),
        }
    }
}

impl From<CryptoError> for TokenError {
    fn from(e: CryptoError) -> Self {
        TokenError::Format(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            FormatError::InvalidSignature("x".into()).code(),
            "FORMAT_INVALID_SIGNATURE"
        );
        assert_eq!(RunLimitError::Timeout.code(), "RUN_LIMIT_TIMEOUT");
        assert_eq!(
            TokenError::from(LogicError::AuthorizerNotEmpty).code(),
            "LOGIC_AUTHORIZER_NOT_EMPTY"
        );
    }

    #[test]
    fn test_crypto_error_maps_into_format_error() {
        let e: FormatError = CryptoError::InvalidKeySize(31).into();
        assert_eq!(e, FormatError::InvalidKeySize(31));

        let e: FormatError = CryptoError::SignatureRejected.into();
        assert!(matches!(e, FormatError::InvalidSignature(_)));
    }

    #[test]
    fn test_failed_check_display() {
        let check = FailedCheck::Block(FailedBlockCheck {
            block_id: 1,
            check_id: 0,
            rule: "check if resource(\"file1\")".to_string(),
        });
        assert_eq!(
            check.to_string(),
            "check 0 in block 1 failed: check if resource(\"file1\")"
        );
    }
}
