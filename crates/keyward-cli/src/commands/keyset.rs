//! Keyset manifest commands
//!
//! A manifest is a JSON array describing keys by what they are bound to
//! rather than by their commitments:
//!
//! ```json
//! [
//!   { "kind": "raw_signature", "address": "0x…", "role": "owner", "weight": 1 },
//!   { "kind": "email_domain", "email": "alice@example.com", "pepper": "0x…", "role": "guardian", "weight": 50 },
//!   { "kind": "identity_token", "issuer": "https://id.example", "subject": "alice", "role": "guardian", "weight": 50 }
//! ]
//! ```

use std::path::Path;

use anyhow::Context;
use keyward_core::{derive_wallet_address, Key, KeySet};
use keyward_types::{Address, Role, H256};
use serde::{Deserialize, Serialize};

use crate::config::KeywardConfig;
use crate::display;

/// What a manifest key is bound to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyBinding {
    RawSignature { address: Address },
    ContractDelegated { address: Address },
    EmailDomain { email: String, pepper: H256 },
    IdentityToken { issuer: String, subject: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestKey {
    #[serde(flatten)]
    pub binding: KeyBinding,
    pub role: Role,
    pub weight: u32,
}

impl ManifestKey {
    pub fn to_key(&self) -> Key {
        match &self.binding {
            KeyBinding::RawSignature { address } => Key::raw(address, self.role, self.weight),
            KeyBinding::ContractDelegated { address } => Key::contract(address, self.role, self.weight),
            KeyBinding::EmailDomain { email, pepper } => Key::email(email, pepper, self.role, self.weight),
            KeyBinding::IdentityToken { issuer, subject } => {
                Key::token(issuer, subject, self.role, self.weight)
            }
        }
    }
}

/// Parse a manifest into a canonical keyset
pub fn parse_manifest(json: &str) -> anyhow::Result<KeySet> {
    let entries: Vec<ManifestKey> = serde_json::from_str(json).context("malformed keyset manifest")?;
    let keys = entries.iter().map(ManifestKey::to_key).collect();
    Ok(KeySet::new(keys)?)
}

fn load_manifest(path: &Path) -> anyhow::Result<KeySet> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_manifest(&json)
}

/// Print the keyset hash and per-role weight
pub fn show_hash(path: &Path, config: &KeywardConfig, json: bool) -> anyhow::Result<()> {
    let keyset = load_manifest(path)?;
    keyset.validate_thresholds(&config.wallet.thresholds)?;

    if json {
        let report = serde_json::json!({
            "keyset_hash": keyset.hash(),
            "keys": keyset.keys(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    display::section("Keyset");
    display::labeled("Hash", &keyset.hash().to_hex());
    display::labeled("Keys", &keyset.len().to_string());
    for role in Role::ALL {
        display::kv(
            &role.to_string(),
            &format!(
                "{} (threshold {})",
                keyset.weight_of(role),
                config.wallet.thresholds.for_role(role)
            ),
        );
    }
    Ok(())
}

/// Print the counterfactual wallet address for a manifest
pub fn show_address(
    path: &Path,
    config: &KeywardConfig,
    factory: Option<Address>,
    implementation: Option<Address>,
) -> anyhow::Result<()> {
    let keyset = load_manifest(path)?;
    keyset.validate_thresholds(&config.wallet.thresholds)?;

    let factory = factory.unwrap_or(config.factory.address);
    let implementation = implementation.unwrap_or(config.factory.implementation);
    let address = derive_wallet_address(&factory, &implementation, &keyset.hash());

    display::section("Wallet address");
    display::labeled("Factory", &factory.to_hex());
    display::labeled("Implementation", &implementation.to_hex());
    display::labeled("Keyset", &keyset.hash().to_hex());
    display::labeled("Address", &address.to_hex());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[
        { "kind": "raw_signature", "address": "0x1111111111111111111111111111111111111111", "role": "owner", "weight": 1 },
        { "kind": "raw_signature", "address": "0x2222222222222222222222222222222222222222", "role": "owner", "weight": 1 },
        { "kind": "identity_token", "issuer": "https://id.example", "subject": "alice", "role": "guardian", "weight": 50 }
    ]"#;

    #[test]
    fn test_manifest_matches_direct_keys() {
        let keyset = parse_manifest(MANIFEST).unwrap();
        let expected = KeySet::new(vec![
            Key::token("https://id.example", "alice", Role::Guardian, 50),
            Key::raw(&Address([0x22; 20]), Role::Owner, 1),
            Key::raw(&Address([0x11; 20]), Role::Owner, 1),
        ])
        .unwrap();
        assert_eq!(keyset.hash(), expected.hash());
        assert_eq!(keyset.weight_of(Role::Owner), 2);
    }

    #[test]
    fn test_duplicate_manifest_key_rejected() {
        let manifest = r#"[
            { "kind": "raw_signature", "address": "0x1111111111111111111111111111111111111111", "role": "owner", "weight": 1 },
            { "kind": "raw_signature", "address": "0x1111111111111111111111111111111111111111", "role": "owner", "weight": 2 }
        ]"#;
        assert!(parse_manifest(manifest).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let manifest = r#"[{ "kind": "passkey", "role": "owner", "weight": 1 }]"#;
        assert!(parse_manifest(manifest).is_err());
    }
}
