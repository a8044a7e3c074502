//! External collaborators consulted during verification
//!
//! All lookups are synchronous and read-only. The in-memory implementations
//! back tests, the CLI demo, and embedders without a live registry.

use std::collections::{HashMap, HashSet};

use keyward_crypto::{Packed, RecoverableSignature};
use keyward_types::{Address, H256};
use serde::{Deserialize, Serialize};

/// Mail-domain key registry: (selector, domain) -> ed25519 public key
pub trait DomainKeyRegistry {
    fn domain_key(&self, selector: &str, domain: &str) -> Option<[u8; 32]>;
}

/// Identity-token issuer registry with an issuer/audience allow-list
pub trait IssuerRegistry {
    /// Issuer signing key for (issuer, key id)
    fn issuer_key(&self, issuer: &str, kid: &str) -> Option<[u8; 32]>;

    /// Whether tokens from `issuer` may target `audience`
    fn is_audience_allowed(&self, issuer: &str, audience: &str) -> bool;
}

/// Contract signer oracle (ERC-1271 style)
pub trait SignerOracle {
    /// Whether `signer` accepts `payload` as its signature over `digest`
    fn is_valid_signature(&self, signer: &Address, digest: &H256, payload: &[u8]) -> bool;
}

/// Public inputs an email succinct proof attests to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPublicInputs {
    /// SHA-256 of the canonicalized header block
    pub header_hash: H256,
    /// Identity commitment of the sender (address + pepper)
    pub from_hash: H256,
    /// Message digest embedded in the subject
    pub digest: H256,
    /// Signing mail domain
    pub domain: String,
}

impl EmailPublicInputs {
    /// Single-word commitment to all public inputs
    pub fn commitment(&self) -> H256 {
        Packed::tagged("keyward.email.inputs")
            .h256(&self.header_hash)
            .h256(&self.from_hash)
            .h256(&self.digest)
            .bytes(self.domain.as_bytes())
            .keccak()
    }
}

/// Verifier for succinct email proofs produced by an external prover
pub trait ProofVerifier {
    /// `Ok(true)` accepts, `Ok(false)` rejects, `Err` means the blob is unusable
    fn verify(&self, inputs: &EmailPublicInputs, proof: &[u8]) -> Result<bool, String>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// In-memory domain-key and issuer registry
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    domain_keys: HashMap<(String, String), [u8; 32]>,
    issuer_keys: HashMap<(String, String), [u8; 32]>,
    audiences: HashSet<(String, String)>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a mail-domain key
    pub fn set_domain_key(&mut self, selector: &str, domain: &str, public_key: [u8; 32]) {
        self.domain_keys.insert(
            (selector.to_string(), domain.to_ascii_lowercase()),
            public_key,
        );
    }

    /// Remove a mail-domain key
    pub fn remove_domain_key(&mut self, selector: &str, domain: &str) {
        self.domain_keys
            .remove(&(selector.to_string(), domain.to_ascii_lowercase()));
    }

    /// Register or replace an issuer signing key
    pub fn set_issuer_key(&mut self, issuer: &str, kid: &str, public_key: [u8; 32]) {
        self.issuer_keys
            .insert((issuer.to_string(), kid.to_string()), public_key);
    }

    /// Allow tokens from `issuer` for `audience`
    pub fn allow_audience(&mut self, issuer: &str, audience: &str) {
        self.audiences
            .insert((issuer.to_string(), audience.to_string()));
    }

    /// Revoke an issuer/audience pair
    pub fn revoke_audience(&mut self, issuer: &str, audience: &str) {
        self.audiences
            .remove(&(issuer.to_string(), audience.to_string()));
    }
}

impl DomainKeyRegistry for InMemoryRegistry {
    fn domain_key(&self, selector: &str, domain: &str) -> Option<[u8; 32]> {
        self.domain_keys
            .get(&(selector.to_string(), domain.to_ascii_lowercase()))
            .copied()
    }
}

impl IssuerRegistry for InMemoryRegistry {
    fn issuer_key(&self, issuer: &str, kid: &str) -> Option<[u8; 32]> {
        self.issuer_keys
            .get(&(issuer.to_string(), kid.to_string()))
            .copied()
    }

    fn is_audience_allowed(&self, issuer: &str, audience: &str) -> bool {
        self.audiences
            .contains(&(issuer.to_string(), audience.to_string()))
    }
}

/// Signer oracle for contract wallets controlled by a single secp256k1 owner.
/// The payload is the owner's recoverable signature over the digest.
#[derive(Debug, Default, Clone)]
pub struct InMemorySignerOracle {
    owners: HashMap<Address, Address>,
}

impl InMemorySignerOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract signer and its owner
    pub fn register(&mut self, contract: Address, owner: Address) {
        self.owners.insert(contract, owner);
    }
}

impl SignerOracle for InMemorySignerOracle {
    fn is_valid_signature(&self, signer: &Address, digest: &H256, payload: &[u8]) -> bool {
        let Some(owner) = self.owners.get(signer) else {
            return false;
        };
        RecoverableSignature::from_slice(payload)
            .and_then(|signature| signature.recover(digest))
            .map(|recovered| &recovered == owner)
            .unwrap_or(false)
    }
}

/// Proof verifier that accepts exactly the proofs it has attested.
///
/// Stands in for an on-chain succinct-proof verifier: `attest` plays the
/// external prover's role and records the inputs commitment.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProofVerifier {
    attested: HashSet<H256>,
}

impl InMemoryProofVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a proof blob for `inputs` and remember it as valid
    pub fn attest(&mut self, inputs: &EmailPublicInputs) -> Vec<u8> {
        let commitment = inputs.commitment();
        self.attested.insert(commitment);
        commitment.0.to_vec()
    }
}

impl ProofVerifier for InMemoryProofVerifier {
    fn verify(&self, inputs: &EmailPublicInputs, proof: &[u8]) -> Result<bool, String> {
        let blob = H256::from_slice(proof).map_err(|e| format!("proof blob: {e}"))?;
        Ok(blob == inputs.commitment() && self.attested.contains(&blob))
    }
}
