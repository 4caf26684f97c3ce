// Path: crates/token/src/root.rs
//! Root public key resolution for verification.

use std::collections::HashMap;

use tessera_crypto::PublicKey;
use tessera_types::error::FormatError;

/// Resolves the root public key a token should be verified against.
///
/// The token's optional `root_key_id` is only a hint for key selection;
/// it carries no security on its own, since verification fails anyway
/// under the wrong key.
pub trait RootKeyProvider {
    /// Picks the public key for the given root key id hint.
    fn choose(&self, root_key_id: Option<u32>) -> Result<PublicKey, FormatError>;
}

impl RootKeyProvider for PublicKey {
    fn choose(&self, _root_key_id: Option<u32>) -> Result<PublicKey, FormatError> {
        Ok(self.clone())
    }
}

impl RootKeyProvider for HashMap<Option<u32>, PublicKey> {
    fn choose(&self, root_key_id: Option<u32>) -> Result<PublicKey, FormatError> {
        if self.is_empty() {
            return Err(FormatError::EmptyKeys);
        }
        self.get(&root_key_id)
            .cloned()
            .ok_or(FormatError::UnknownPublicKey)
    }
}

impl<F> RootKeyProvider for F
where
    F: Fn(Option<u32>) -> Option<PublicKey>,
{
    fn choose(&self, root_key_id: Option<u32>) -> Result<PublicKey, FormatError> {
        self(root_key_id).ok_or_else(|| {
            FormatError::InvalidKey(format!("no key found for root key id {root_key_id:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_crypto::{Algorithm, KeyPair};

    #[test]
    fn test_public_key_ignores_the_hint() {
        let key = KeyPair::generate(Algorithm::Ed25519).public();
        assert_eq!(key.choose(None).unwrap(), key);
        assert_eq!(key.choose(Some(42)).unwrap(), key);
    }

    #[test]
    fn test_map_provider_reports_missing_ids() {
        let key = KeyPair::generate(Algorithm::Ed25519).public();

        let empty: HashMap<Option<u32>, PublicKey> = HashMap::new();
        assert_eq!(empty.choose(Some(1)).err(), Some(FormatError::EmptyKeys));

        let mut keys = HashMap::new();
        keys.insert(Some(1), key.clone());
        assert_eq!(keys.choose(Some(1)).unwrap(), key);
        assert_eq!(
            keys.choose(Some(2)).err(),
            Some(FormatError::UnknownPublicKey)
        );
    }

    #[test]
    fn test_closure_provider_maps_none_to_invalid_key() {
        let key = KeyPair::generate(Algorithm::Ed25519).public();
        let stored = key.clone();
        let provider = move |id: Option<u32>| if id == Some(1) { Some(stored.clone()) } else { None };

        assert_eq!(provider.choose(Some(1)).unwrap(), key);
        assert!(matches!(
            provider.choose(Some(2)),
            Err(FormatError::InvalidKey(_))
        ));
    }
}
