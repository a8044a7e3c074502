//! Counterfactual wallet addresses and deployment
//!
//! A wallet's address is known before it exists: it is derived from the
//! factory, the implementation, and the *initial* keyset hash. Deployment is
//! idempotent, so registering a wallet and deploying it can happen in any
//! order.

use std::collections::HashMap;

use keyward_crypto::{keccak256, keccak256_all};
use keyward_types::{Address, H256};
use tracing::info;

use crate::config::{ConfigError, WalletConfig};
use crate::wallet::Wallet;

/// `keccak256(0xff ‖ factory ‖ keyset_hash ‖ keccak256(implementation))[12..]`
pub fn derive_wallet_address(factory: &Address, implementation: &Address, keyset_hash: &H256) -> Address {
    let code_hash = keccak256(implementation.as_bytes());
    let hash = keccak256_all(&[
        &[0xffu8][..],
        factory.as_bytes(),
        keyset_hash.as_bytes(),
        code_hash.as_bytes(),
    ]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash.0[12..]);
    Address(address)
}

/// Deploys wallet instances at their derived addresses
pub trait WalletFactory {
    /// Address a wallet with this initial keyset has (or will have)
    fn predict_address(&self, keyset_hash: &H256) -> Address;

    fn is_deployed(&self, address: &Address) -> bool;

    /// Deploy if absent; returns the address either way
    fn ensure_deployed(&mut self, keyset_hash: H256) -> Result<Address, ConfigError>;
}

/// Factory keeping deployed wallets in memory
#[derive(Debug, Clone)]
pub struct InMemoryFactory {
    address: Address,
    implementation: Address,
    config: WalletConfig,
    wallets: HashMap<Address, Wallet>,
}

impl InMemoryFactory {
    pub fn new(address: Address, implementation: Address, config: WalletConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            address,
            implementation,
            config,
            wallets: HashMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn implementation(&self) -> Address {
        self.implementation
    }

    pub fn wallet(&self, address: &Address) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    pub fn wallet_mut(&mut self, address: &Address) -> Option<&mut Wallet> {
        self.wallets.get_mut(address)
    }
}

impl WalletFactory for InMemoryFactory {
    fn predict_address(&self, keyset_hash: &H256) -> Address {
        derive_wallet_address(&self.address, &self.implementation, keyset_hash)
    }

    fn is_deployed(&self, address: &Address) -> bool {
        self.wallets.contains_key(address)
    }

    fn ensure_deployed(&mut self, keyset_hash: H256) -> Result<Address, ConfigError> {
        let address = self.predict_address(&keyset_hash);
        if !self.wallets.contains_key(&address) {
            let wallet = Wallet::new(address, keyset_hash, self.implementation, &self.config)?;
            info!(wallet = %address, keyset = %keyset_hash, "wallet deployed");
            self.wallets.insert(address, wallet);
        }
        Ok(address)
    }
}
