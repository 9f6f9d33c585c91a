//! Vault registry (spec.md §4.4 — C4).
//!
//! An immutable pair of sink account identifiers. Structurally these are
//! ordinary accounts; nothing here prevents an arbitrary credit to them,
//! only the router's own use of them as fee-split destinations.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_VAULT_GROWTH, DEFAULT_VAULT_SAFETY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRegistry {
    safety_vault: String,
    growth_vault: String,
}

impl VaultRegistry {
    pub fn new(safety_vault: impl Into<String>, growth_vault: impl Into<String>) -> Self {
        Self {
            safety_vault: safety_vault.into(),
            growth_vault: growth_vault.into(),
        }
    }

    pub fn safety_vault(&self) -> &str {
        &self.safety_vault
    }

    pub fn growth_vault(&self) -> &str {
        &self.growth_vault
    }
}

impl Default for VaultRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_VAULT_SAFETY, DEFAULT_VAULT_GROWTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vaults_are_distinct() {
        let vaults = VaultRegistry::default();
        assert_ne!(vaults.safety_vault(), vaults.growth_vault());
    }

    #[test]
    fn custom_vaults_are_preserved() {
        let vaults = VaultRegistry::new("vault:s", "vault:g");
        assert_eq!(vaults.safety_vault(), "vault:s");
        assert_eq!(vaults.growth_vault(), "vault:g");
    }
}
