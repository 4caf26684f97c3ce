// Path: crates/datalog/src/symbol/mod.rs
//! Symbol and public-key interning.
//!
//! Every string in a token is replaced by a small integer id. Ids below
//! [`DEFAULT_SYMBOLS_OFFSET`] refer to the hard-coded default table, which
//! is a protocol constant: its exact contents and order are part of the
//! wire format and must never change. Ids at or above the offset index the
//! user symbols accumulated block by block.

use tessera_crypto::PublicKey;
use tessera_types::error::StructureError;

/// An interned string id.
pub type SymbolIndex = u64;

/// User symbols start at this id; everything below refers to the default
/// table.
pub const DEFAULT_SYMBOLS_OFFSET: u64 = 1024;

/// The published default symbol table. Order is a wire format constant.
const DEFAULT_SYMBOLS: [&str; 28] = [
    "read",
    "write",
    "resource",
    "operation",
    "right",
    "time",
    "role",
    "owner",
    "tenant",
    "namespace",
    "user",
    "team",
    "service",
    "admin",
    "email",
    "group",
    "member",
    "ip_address",
    "client",
    "client_ip",
    "domain",
    "path",
    "version",
    "cluster",
    "node",
    "hostname",
    "nonce",
    "query",
];

/// Builds the symbol table every token starts from.
pub fn default_symbol_table() -> SymbolTable {
    SymbolTable::new()
}

/// A per-token string interning table.
///
/// Only user symbols are stored; the default table is implicit. The table
/// also carries the token's interned public keys, since scope annotations
/// reference keys by table index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<String>,
    /// The public keys interned by the token, in interning order.
    pub public_keys: KeyTable,
}

impl SymbolTable {
    /// Creates an empty table (default symbols only).
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Creates a table from already-interned user symbols.
    pub fn from_symbols(symbols: Vec<String>) -> Self {
        SymbolTable {
            symbols,
            public_keys: KeyTable::new(),
        }
    }

    /// The number of user symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no user symbols have been interned.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The user symbols, in interning order.
    pub fn strings(&self) -> &[String] {
        &self.symbols
    }

    /// Looks up the id of a string without interning it.
    pub fn get(&self, symbol: &str) -> Option<SymbolIndex> {
        if let Some(index) = DEFAULT_SYMBOLS.iter().position(|s| *s == symbol) {
            return Some(index as u64);
        }
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| i as u64 + DEFAULT_SYMBOLS_OFFSET)
    }

    /// Interns a string, returning its existing id when already present.
    pub fn insert(&mut self, symbol: &str) -> SymbolIndex {
        match self.get(symbol) {
            Some(index) => index,
            None => {
                self.symbols.push(symbol.to_string());
                (self.symbols.len() - 1) as u64 + DEFAULT_SYMBOLS_OFFSET
            }
        }
    }

    /// Resolves an id to its string.
    pub fn get_symbol(&self, id: SymbolIndex) -> Option<&str> {
        if id < DEFAULT_SYMBOLS_OFFSET {
            DEFAULT_SYMBOLS.get(id as usize).copied()
        } else {
            self.symbols
                .get((id - DEFAULT_SYMBOLS_OFFSET) as usize)
                .map(|s| s.as_str())
        }
    }

    /// Resolves an id for printing, marking unknown ids instead of failing.
    pub fn print_symbol(&self, id: SymbolIndex) -> String {
        self.get_symbol(id)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("<unknown symbol {id}>"))
    }

    /// True when none of `symbols` are already interned here.
    pub fn is_disjoint(&self, symbols: &[String]) -> bool {
        symbols.iter().all(|s| self.get(s).is_none())
    }

    /// Appends symbols without checking for redefinitions.
    ///
    /// Used when reading an already-signed token: a duplicate there only
    /// shadows the later id, while outer resolution keeps the earliest one.
    pub fn append(&mut self, symbols: &[String]) {
        self.symbols.extend(symbols.iter().cloned());
    }

    /// Appends another block's symbols, rejecting redefinitions.
    pub fn extend(&mut self, symbols: &[String]) -> Result<(), StructureError> {
        if !self.is_disjoint(symbols) {
            return Err(StructureError::SymbolTableOverlap);
        }
        self.symbols.extend(symbols.iter().cloned());
        Ok(())
    }

    /// The user symbols interned after the first `base_len` entries. Used to
    /// extract a block's newly-introduced strings.
    pub fn split_at(&self, base_len: usize) -> Vec<String> {
        self.symbols.get(base_len..).unwrap_or_default().to_vec()
    }
}

/// A per-token public key interning table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTable {
    keys: Vec<PublicKey>,
}

impl KeyTable {
    /// Creates an empty key table.
    pub fn new() -> Self {
        KeyTable::default()
    }

    /// The interned keys, in interning order.
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// The number of interned keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no keys have been interned.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Interns a key, returning its existing id when already present.
    pub fn insert(&mut self, key: &PublicKey) -> u64 {
        match self.get_key_id(key) {
            Some(index) => index,
            None => {
                self.keys.push(key.clone());
                (self.keys.len() - 1) as u64
            }
        }
    }

    /// Looks up the id of a key without interning it.
    pub fn get_key_id(&self, key: &PublicKey) -> Option<u64> {
        self.keys.iter().position(|k| k == key).map(|i| i as u64)
    }

    /// Resolves an id to its key.
    pub fn get_key(&self, id: u64) -> Option<&PublicKey> {
        self.keys.get(id as usize)
    }

    /// The keys interned after the first `base_len` entries.
    pub fn split_at(&self, base_len: usize) -> Vec<PublicKey> {
        self.keys.get(base_len..).unwrap_or_default().to_vec()
    }
}

/// A scratch view over a [`SymbolTable`] for evaluation-scoped interning.
///
/// Expression evaluation can mint new strings (concatenation, `.type()`)
/// that must not leak into the token's table. Ids handed out here live
/// past the base table's range and are discarded with the view.
pub struct TemporarySymbolTable<'a> {
    base: &'a SymbolTable,
    offset: u64,
    symbols: Vec<String>,
}

impl<'a> TemporarySymbolTable<'a> {
    /// Creates a scratch view over `base`.
    pub fn new(base: &'a SymbolTable) -> Self {
        let offset = DEFAULT_SYMBOLS_OFFSET + base.len() as u64;
        TemporarySymbolTable {
            base,
            offset,
            symbols: Vec::new(),
        }
    }

    /// Resolves an id against the base table or the scratch entries.
    pub fn get_symbol(&self, id: SymbolIndex) -> Option<&str> {
        if id < self.offset {
            self.base.get_symbol(id)
        } else {
            self.symbols
                .get((id - self.offset) as usize)
                .map(|s| s.as_str())
        }
    }

    /// Interns a string into the scratch entries.
    pub fn insert(&mut self, symbol: &str) -> SymbolIndex {
        if let Some(id) = self.base.get(symbol) {
            return id;
        }
        if let Some(index) = self.symbols.iter().position(|s| s == symbol) {
            return index as u64 + self.offset;
        }
        self.symbols.push(symbol.to_string());
        (self.symbols.len() - 1) as u64 + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_crypto::{Algorithm, KeyPair};

    #[test]
    fn test_default_symbols_are_wire_constants() {
        let table = default_symbol_table();
        assert_eq!(table.get("read"), Some(0));
        assert_eq!(table.get("write"), Some(1));
        assert_eq!(table.get("resource"), Some(2));
        assert_eq!(table.get("operation"), Some(3));
        assert_eq!(table.get("query"), Some(27));
        assert_eq!(table.get_symbol(25), Some("hostname"));
    }

    #[test]
    fn test_user_symbols_start_at_offset() {
        let mut table = default_symbol_table();
        let id = table.insert("file1");
        assert_eq!(id, DEFAULT_SYMBOLS_OFFSET);
        // Interning again returns the same id.
        assert_eq!(table.insert("file1"), id);
        // Default symbols are never re-interned.
        assert_eq!(table.insert("read"), 0);
    }

    #[test]
    fn test_extend_rejects_redefinitions() {
        let mut table = default_symbol_table();
        table.insert("file1");

        assert!(table.extend(&["file2".to_string()]).is_ok());
        assert_eq!(
            table.extend(&["file1".to_string()]),
            Err(StructureError::SymbolTableOverlap)
        );
        assert_eq!(
            table.extend(&["read".to_string()]),
            Err(StructureError::SymbolTableOverlap)
        );
    }

    #[test]
    fn test_temporary_symbols_do_not_leak() {
        let mut table = default_symbol_table();
        table.insert("file1");

        let mut temporary = TemporarySymbolTable::new(&table);
        let id = temporary.insert("scratch");
        assert_eq!(id, DEFAULT_SYMBOLS_OFFSET + 1);
        assert_eq!(temporary.get_symbol(id), Some("scratch"));
        // Base lookups resolve through the view.
        assert_eq!(temporary.get_symbol(0), Some("read"));

        drop(temporary);
        assert_eq!(table.get_symbol(id), None);
    }

    #[test]
    fn test_key_table_interns_by_value() {
        let mut keys = KeyTable::new();
        let a = KeyPair::generate(Algorithm::Ed25519).public();
        let b = KeyPair::generate(Algorithm::Ed25519).public();

        assert_eq!(keys.insert(&a), 0);
        assert_eq!(keys.insert(&b), 1);
        assert_eq!(keys.insert(&a), 0);
        assert_eq!(keys.get_key(1), Some(&b));
        assert_eq!(keys.get_key_id(&a), Some(0));
    }
}
