#![allow(dead_code)]

use keyward_core::{
    derive_wallet_address, Action, BundleEntry, Environment, InMemoryAllowList, KeySet,
    RoleThresholds, SignatureBundle, Submission, SubmitReceipt, Wallet, WalletConfig,
};
use keyward_credentials::{
    signer_identity, InMemoryProofVerifier, InMemoryRegistry, InMemorySignerOracle, RawSignature,
};
use keyward_crypto::Secp256k1KeyPair;
use keyward_ledger::SimulatedChain;
use keyward_types::{Address, H256};

pub const NOW: u64 = 1_700_000_000;
pub const FACTORY: Address = Address([0xfa; 20]);
pub const IMPLEMENTATION: Address = Address([0x1c; 20]);
pub const NEXT_IMPLEMENTATION: Address = Address([0x2c; 20]);
pub const TWO_DAYS: u64 = 172_800;

pub fn keypair(label: &str) -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_label(label).unwrap()
}

pub fn thresholds(owner: u64, assets_op: u64, guardian: u64, guardian_immediate: u64) -> RoleThresholds {
    RoleThresholds {
        owner,
        assets_op,
        guardian,
        guardian_immediate,
    }
}

pub fn raw_entry(signer: &Secp256k1KeyPair, digest: &H256) -> BundleEntry {
    BundleEntry::new(
        signer_identity(&signer.address()),
        RawSignature::sign(signer, digest).unwrap(),
    )
}

/// A deployed wallet plus in-memory collaborators
pub struct Harness {
    pub registry: InMemoryRegistry,
    pub oracle: InMemorySignerOracle,
    pub prover: InMemoryProofVerifier,
    pub allow_list: InMemoryAllowList,
    pub chain: SimulatedChain,
    pub wallet: Wallet,
    pub keyset: KeySet,
    pub now: u64,
}

impl Harness {
    pub fn new(keyset: KeySet, thresholds: RoleThresholds) -> Self {
        let config = WalletConfig::default().with_thresholds(thresholds);
        config.validate().unwrap();
        keyset.validate_thresholds(&config.thresholds).unwrap();

        let address = derive_wallet_address(&FACTORY, &IMPLEMENTATION, &keyset.hash());
        let wallet = Wallet::new(address, keyset.hash(), IMPLEMENTATION, &config).unwrap();
        Self {
            registry: InMemoryRegistry::new(),
            oracle: InMemorySignerOracle::new(),
            prover: InMemoryProofVerifier::new(),
            allow_list: [IMPLEMENTATION, NEXT_IMPLEMENTATION].into_iter().collect(),
            chain: SimulatedChain::new(),
            wallet,
            keyset,
            now: NOW,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Next nonce for `action` and the digest signers approve
    pub fn prepare(&self, action: &Action) -> (u64, H256) {
        let nonce = self.wallet.next_nonce(action.nonce_kind());
        (nonce, self.wallet.digest_for(action, nonce))
    }

    pub fn submission(&self, action: Action, nonce: u64, bundle: SignatureBundle) -> Submission {
        Submission {
            action,
            nonce,
            keyset: self.keyset.clone(),
            bundle,
        }
    }

    /// Prepare, sign with raw keys, and build the submission
    pub fn signed(&self, action: Action, signers: &[&Secp256k1KeyPair]) -> Submission {
        let (nonce, digest) = self.prepare(&action);
        let bundle = signers.iter().map(|signer| raw_entry(signer, &digest)).collect();
        self.submission(action, nonce, bundle)
    }

    pub fn submit(&mut self, submission: &Submission) -> keyward_types::Result<SubmitReceipt> {
        let mut env = Environment {
            domain_keys: &self.registry,
            issuers: &self.registry,
            signer_oracle: &self.oracle,
            proof_verifier: &self.prover,
            allow_list: &self.allow_list,
            executor: &mut self.chain,
        };
        self.wallet.submit(submission, &mut env, self.now)
    }
}
