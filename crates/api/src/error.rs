// Path: crates/api/src/error.rs
//! One import path for the error taxonomy defined in `tessera-types`.

pub use tessera_types::error::{
    CryptoError, ErrorCode, ExecutionError, FailedAuthorizerCheck, FailedBlockCheck, FailedCheck,
    FormatError, LanguageError, LogicError, MatchedPolicy, RunLimitError, StructureError,
    TokenError,
};
