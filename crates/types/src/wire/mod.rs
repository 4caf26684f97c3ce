// Path: crates/types/src/wire/mod.rs
//! The Protocol Buffers wire schema for tokens.
//!
//! Messages are declared with hand-written `prost` derives so the schema
//! lives next to the code that validates it, with no build-time code
//! generation. The layout is a protocol constant: field numbers and the
//! default symbol table must never change once published.

/// The top-level token container.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokenContainer {
    /// Optional hint identifying which root public key signed the authority
    /// block.
    #[prost(uint32, optional, tag = "1")]
    pub root_key_id: Option<u32>,
    /// The authority block, signed by the root key.
    #[prost(message, required, tag = "2")]
    pub authority: SignedBlock,
    /// Attenuation blocks, in append order.
    #[prost(message, repeated, tag = "3")]
    pub blocks: Vec<SignedBlock>,
    /// The chain proof: either the next secret key or a final signature.
    #[prost(message, required, tag = "4")]
    pub proof: Proof,
}

/// A serialized block together with its chain signature.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedBlock {
    /// The serialized [`Block`] payload.
    #[prost(bytes = "vec", required, tag = "1")]
    pub block: Vec<u8>,
    /// The public key that verifies the next block in the chain.
    #[prost(message, required, tag = "2")]
    pub next_key: PublicKey,
    /// The signature over this block's signature payload.
    #[prost(bytes = "vec", required, tag = "3")]
    pub signature: Vec<u8>,
    /// The third-party signature, when this block was externally signed.
    #[prost(message, optional, tag = "4")]
    pub external_signature: Option<ExternalSignature>,
}

/// A third-party signature over a block payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExternalSignature {
    /// The signature bytes.
    #[prost(bytes = "vec", required, tag = "1")]
    pub signature: Vec<u8>,
    /// The external public key that produced the signature.
    #[prost(message, required, tag = "2")]
    pub public_key: PublicKey,
}

/// A public key tagged with its signature algorithm.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct PublicKey {
    /// The signature algorithm, one of [`Algorithm`].
    #[prost(enumeration = "Algorithm", required, tag = "1")]
    pub algorithm: i32,
    /// The raw key bytes: 32 bytes for Ed25519, 33 compressed SEC1 bytes
    /// for SECP256R1.
    #[prost(bytes = "vec", required, tag = "2")]
    pub key: Vec<u8>,
}

/// The signature algorithms understood by this implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Algorithm {
    /// Ed25519 (EdDSA over Curve25519).
    Ed25519 = 0,
    /// ECDSA over NIST P-256, DER-encoded signatures.
    Secp256r1 = 1,
}

/// The chain proof carried at the end of a token.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proof {
    /// Exactly one of the proof forms.
    #[prost(oneof = "proof::Content", tags = "1, 2")]
    pub content: Option<proof::Content>,
}

/// Nested types for [`Proof`].
pub mod proof {
    /// The two proof forms.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        /// The private key matching the last block's next key; the token can
        /// still be attenuated.
        #[prost(bytes, tag = "1")]
        NextSecret(Vec<u8>),
        /// A final signature over the last block; the token is sealed.
        #[prost(bytes, tag = "2")]
        FinalSignature(Vec<u8>),
    }
}

/// The logical content of one block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    /// Strings newly interned by this block, in interning order.
    #[prost(string, repeated, tag = "1")]
    pub symbols: Vec<String>,
    /// Free-form context describing the block.
    #[prost(string, optional, tag = "2")]
    pub context: Option<String>,
    /// The Datalog schema version this block was built against.
    #[prost(uint32, optional, tag = "3")]
    pub version: Option<u32>,
    /// Facts asserted by this block.
    #[prost(message, repeated, tag = "4")]
    pub facts: Vec<Fact>,
    /// Rules contributed by this block.
    #[prost(message, repeated, tag = "5")]
    pub rules: Vec<Rule>,
    /// Checks that must hold for the token to be accepted.
    #[prost(message, repeated, tag = "6")]
    pub checks: Vec<Check>,
    /// Default trust scopes for rules and checks in this block.
    #[prost(message, repeated, tag = "7")]
    pub scope: Vec<Scope>,
    /// Public keys newly interned by this block, in interning order.
    #[prost(message, repeated, tag = "8")]
    pub public_keys: Vec<PublicKey>,
}

/// A ground predicate.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fact {
    /// The predicate; every term must be ground.
    #[prost(message, required, tag = "1")]
    pub predicate: Predicate,
}

/// A rule: head, body, constraining expressions and trust scopes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Rule {
    /// The derived predicate.
    #[prost(message, required, tag = "1")]
    pub head: Predicate,
    /// The predicates matched against the fact store.
    #[prost(message, repeated, tag = "2")]
    pub body: Vec<Predicate>,
    /// Expressions that must all evaluate to `true`.
    #[prost(message, repeated, tag = "3")]
    pub expressions: Vec<Expression>,
    /// Trust scope annotations (`trusting …`).
    #[prost(message, repeated, tag = "4")]
    pub scope: Vec<Scope>,
}

/// A check: one or more rule-shaped queries and a matching kind.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Check {
    /// The queries; semantics depend on [`check::Kind`].
    #[prost(message, repeated, tag = "1")]
    pub queries: Vec<Rule>,
    /// The matching kind; absent means [`check::Kind::One`].
    #[prost(enumeration = "check::Kind", optional, tag = "2")]
    pub kind: Option<i32>,
}

/// Nested types for [`Check`].
pub mod check {
    /// How a check's queries decide success.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Kind {
        /// At least one query must produce a match.
        One = 0,
        /// Every unification of every query must satisfy its expressions.
        All = 1,
        /// No query may produce a match.
        Reject = 2,
    }
}

/// A trust scope annotation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Scope {
    /// Exactly one scope form.
    #[prost(oneof = "scope::Content", tags = "1, 2")]
    pub content: Option<scope::Content>,
}

/// Nested types for [`Scope`].
pub mod scope {
    /// The scope forms.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        /// A well-known scope, one of [`ScopeType`].
        #[prost(enumeration = "super::ScopeType", tag = "1")]
        ScopeType(i32),
        /// An index into the token's public key table.
        #[prost(int64, tag = "2")]
        PublicKey(i64),
    }
}

/// The well-known scopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ScopeType {
    /// Trust facts from the authority block.
    Authority = 0,
    /// Trust facts from all previous blocks.
    Previous = 1,
}

/// A predicate: an interned name applied to an ordered list of terms.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Predicate {
    /// The interned predicate name.
    #[prost(uint64, required, tag = "1")]
    pub name: u64,
    /// The terms, in order.
    #[prost(message, repeated, tag = "2")]
    pub terms: Vec<Term>,
}

/// A Datalog term.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Term {
    /// Exactly one term form.
    #[prost(oneof = "term::Content", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10")]
    pub content: Option<term::Content>,
}

/// Nested types for [`Term`].
pub mod term {
    /// The term forms.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        /// A variable, identified by an interned symbol id.
        #[prost(uint32, tag = "1")]
        Variable(u32),
        /// A signed 64-bit integer.
        #[prost(int64, tag = "2")]
        Integer(i64),
        /// An interned string.
        #[prost(uint64, tag = "3")]
        String(u64),
        /// Seconds since the Unix epoch.
        #[prost(uint64, tag = "4")]
        Date(u64),
        /// An opaque byte string.
        #[prost(bytes, tag = "5")]
        Bytes(Vec<u8>),
        /// A boolean.
        #[prost(bool, tag = "6")]
        Bool(bool),
        /// An unordered set of ground terms.
        #[prost(message, tag = "7")]
        Set(super::TermSet),
        /// The null value.
        #[prost(message, tag = "8")]
        Null(super::Empty),
        /// An ordered sequence of ground terms.
        #[prost(message, tag = "9")]
        Array(super::Array),
        /// An unordered map from keys to ground terms.
        #[prost(message, tag = "10")]
        Map(super::Map),
    }
}

/// An empty message, used for the null term.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Empty {}

/// The elements of a set term.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TermSet {
    /// The set elements.
    #[prost(message, repeated, tag = "1")]
    pub set: Vec<Term>,
}

/// The elements of an array term.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Array {
    /// The array elements, in order.
    #[prost(message, repeated, tag = "1")]
    pub array: Vec<Term>,
}

/// The entries of a map term.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Map {
    /// The map entries.
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<MapEntry>,
}

/// One key/value pair of a map term.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapEntry {
    /// The entry key.
    #[prost(message, required, tag = "1")]
    pub key: MapKey,
    /// The entry value.
    #[prost(message, required, tag = "2")]
    pub value: Term,
}

/// A map key: an integer or an interned string.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapKey {
    /// Exactly one key form.
    #[prost(oneof = "map_key::Content", tags = "1, 2")]
    pub content: Option<map_key::Content>,
}

/// Nested types for [`MapKey`].
pub mod map_key {
    /// The key forms.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        /// A signed 64-bit integer key.
        #[prost(int64, tag = "1")]
        Integer(i64),
        /// An interned string key.
        #[prost(uint64, tag = "2")]
        String(u64),
    }
}

/// A compiled expression: a linear op sequence for the stack machine.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Expression {
    /// The ops, in evaluation order.
    #[prost(message, repeated, tag = "1")]
    pub ops: Vec<Op>,
}

/// One stack machine op.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Op {
    /// Exactly one op form.
    #[prost(oneof = "op::Content", tags = "1, 2, 3, 4")]
    pub content: Option<op::Content>,
}

/// Nested types for [`Op`].
pub mod op {
    /// The op forms.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        /// Push a term.
        #[prost(message, tag = "1")]
        Value(super::Term),
        /// Apply a unary operator.
        #[prost(message, tag = "2")]
        Unary(super::OpUnary),
        /// Apply a binary operator.
        #[prost(message, tag = "3")]
        Binary(super::OpBinary),
        /// Push a closure.
        #[prost(message, tag = "4")]
        Closure(super::OpClosure),
    }
}

/// A unary operator op.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpUnary {
    /// The operator, one of [`op_unary::Kind`].
    #[prost(enumeration = "op_unary::Kind", required, tag = "1")]
    pub kind: i32,
}

/// Nested types for [`OpUnary`].
pub mod op_unary {
    /// The unary operators.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Kind {
        /// Logical negation.
        Negate = 0,
        /// Identity, preserved for printing.
        Parens = 1,
        /// Cardinality or byte length.
        Length = 2,
        /// Canonical type name.
        TypeOf = 3,
    }
}

/// A binary operator op.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpBinary {
    /// The operator, one of [`op_binary::Kind`].
    #[prost(enumeration = "op_binary::Kind", required, tag = "1")]
    pub kind: i32,
}

/// Nested types for [`OpBinary`].
pub mod op_binary {
    /// The binary operators.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Kind {
        /// `<` on integers or dates.
        LessThan = 0,
        /// `>` on integers or dates.
        GreaterThan = 1,
        /// `<=` on integers or dates.
        LessOrEqual = 2,
        /// `>=` on integers or dates.
        GreaterOrEqual = 3,
        /// `===`, strict same-type equality.
        Equal = 4,
        /// Substring, membership, subset or key lookup.
        Contains = 5,
        /// String or array prefix.
        Prefix = 6,
        /// String or array suffix.
        Suffix = 7,
        /// Regular expression search.
        Regex = 8,
        /// Checked addition or string concatenation.
        Add = 9,
        /// Checked subtraction.
        Sub = 10,
        /// Checked multiplication.
        Mul = 11,
        /// Truncating division.
        Div = 12,
        /// Eager logical and.
        And = 13,
        /// Eager logical or.
        Or = 14,
        /// Set intersection.
        Intersection = 15,
        /// Set union.
        Union = 16,
        /// Bitwise and.
        BitwiseAnd = 17,
        /// Bitwise or.
        BitwiseOr = 18,
        /// Bitwise xor.
        BitwiseXor = 19,
        /// `!==`, strict same-type inequality.
        NotEqual = 20,
        /// `==`, permissive equality.
        HeterogeneousEqual = 21,
        /// `!=`, permissive inequality.
        HeterogeneousNotEqual = 22,
        /// Short-circuit and; right operand is a closure.
        LazyAnd = 23,
        /// Short-circuit or; right operand is a closure.
        LazyOr = 24,
        /// Every element satisfies the closure.
        All = 25,
        /// Some element satisfies the closure.
        Any = 26,
        /// Array index or map key lookup.
        Get = 27,
        /// Evaluate a closure, falling back to a default on failure.
        TryOr = 29,
    }
}

/// A closure op: formal parameters and a compiled body.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpClosure {
    /// The parameter symbol ids.
    #[prost(uint32, repeated, tag = "1")]
    pub params: Vec<u32>,
    /// The body op sequence.
    #[prost(message, repeated, tag = "2")]
    pub ops: Vec<Op>,
}

/// A request sent to a third-party signer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThirdPartyBlockRequest {
    /// The next key of the token's last block.
    #[prost(message, required, tag = "1")]
    pub previous_key: PublicKey,
    /// The token's accumulated public key table.
    #[prost(message, repeated, tag = "2")]
    pub public_keys: Vec<PublicKey>,
    /// The last block's signature, needed by the v1 external payload.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub previous_signature: Option<Vec<u8>>,
}

/// A third-party signer's response: a block payload and its signature.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThirdPartyBlockContents {
    /// The serialized [`Block`] payload.
    #[prost(bytes = "vec", required, tag = "1")]
    pub payload: Vec<u8>,
    /// The external signature over the payload.
    #[prost(message, required, tag = "2")]
    pub external_signature: ExternalSignature,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_container_roundtrip() {
        let container = TokenContainer {
            root_key_id: Some(1),
            authority: SignedBlock {
                block: vec![1, 2, 3],
                next_key: PublicKey {
                    algorithm: Algorithm::Ed25519 as i32,
                    key: vec![0u8; 32],
                },
                signature: vec![4u8; 64],
                external_signature: None,
            },
            blocks: Vec::new(),
            proof: Proof {
                content: Some(proof::Content::NextSecret(vec![9u8; 32])),
            },
        };

        let bytes = container.encode_to_vec();
        let decoded = TokenContainer::decode(&bytes[..]).unwrap();
        assert_eq!(container, decoded);
    }

    #[test]
    fn test_term_oneof_roundtrip() {
        let term = Term {
            content: Some(term::Content::Map(Map {
                entries: vec![MapEntry {
                    key: MapKey {
                        content: Some(map_key::Content::Integer(7)),
                    },
                    value: Term {
                        content: Some(term::Content::Bool(true)),
                    },
                }],
            })),
        };

        let bytes = term.encode_to_vec();
        assert_eq!(Term::decode(&bytes[..]).unwrap(), term);
    }

    #[test]
    fn test_algorithm_identifiers_are_wire_constants() {
        assert_eq!(Algorithm::Ed25519 as i32, 0);
        assert_eq!(Algorithm::Secp256r1 as i32, 1);
    }
}
