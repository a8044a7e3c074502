//! Every credential kind driven through `Wallet::submit`

mod common;

use common::*;
use keyward_core::{Action, BundleEntry, Key, KeySet, KeysetUpdate, SignatureBundle};
use keyward_credentials::{
    approval_headers, contract_identity, subject_identity, ContractSignature, EmailProof,
    IdentityToken, TokenClaims,
};
use keyward_crypto::{keccak256, Ed25519KeyPair, Secp256k1KeyPair};
use keyward_types::{
    Address, AuthorizationError, CredentialError, ErrorCategory, NonceKind, Role, WalletError,
    H256,
};

const ISSUER: &str = "https://accounts.example";
const KID: &str = "k1";
const AUDIENCE: &str = "keyward";
const DOMAIN: &str = "mail.example.com";
const SELECTOR: &str = "s1";
const GUARDIAN_EMAIL: &str = "grace@mail.example.com";
const VAULT: Address = Address([0xc0; 20]);

struct Fixture {
    h: Harness,
    owner: Secp256k1KeyPair,
    vault_owner: Secp256k1KeyPair,
    issuer: Ed25519KeyPair,
    mail: Ed25519KeyPair,
    pepper: H256,
    next: KeySet,
}

/// Owners: one raw key and one contract signer. Guardians: an identity-token
/// subject and an email address, 50 each.
fn fixture() -> Fixture {
    let owner = keypair("owner");
    let vault_owner = keypair("vault-owner");
    let issuer = Ed25519KeyPair::from_label("issuer");
    let mail = Ed25519KeyPair::from_label("mail-domain");
    let pepper = keccak256(b"grace-pepper");

    let keyset = KeySet::new(vec![
        Key::raw(&owner.address(), Role::Owner, 1),
        Key::contract(&VAULT, Role::Owner, 1),
        Key::raw(&keypair("operator").address(), Role::AssetsOp, 1),
        Key::token(ISSUER, "frank", Role::Guardian, 50),
        Key::email(GUARDIAN_EMAIL, &pepper, Role::Guardian, 50),
    ])
    .unwrap();
    let next = KeySet::new(vec![
        Key::raw(&keypair("heir").address(), Role::Owner, 2),
        Key::raw(&keypair("heir").address(), Role::AssetsOp, 1),
        Key::token(ISSUER, "frank", Role::Guardian, 100),
    ])
    .unwrap();

    let mut h = Harness::new(keyset, thresholds(2, 1, 50, 100));
    h.registry.set_issuer_key(ISSUER, KID, issuer.public_key());
    h.registry.allow_audience(ISSUER, AUDIENCE);
    h.registry.set_domain_key(SELECTOR, DOMAIN, mail.public_key());
    h.oracle.register(VAULT, vault_owner.address());

    Fixture {
        h,
        owner,
        vault_owner,
        issuer,
        mail,
        pepper,
        next,
    }
}

impl Fixture {
    fn propose(&self) -> Action {
        Action::UpdateKeysetHash(KeysetUpdate::Propose {
            new_keyset_hash: self.next.hash(),
            immediate: false,
        })
    }

    fn token_entry(&self, claims: &TokenClaims) -> BundleEntry {
        let token = IdentityToken::issue(&self.issuer, KID, claims).unwrap();
        BundleEntry::new(subject_identity(ISSUER, "frank"), token)
    }

    fn signed_email(&self, digest: &H256, sent_at: u64) -> EmailProof {
        let headers = approval_headers(GUARDIAN_EMAIL, "wallet@keyward.dev", digest, sent_at);
        EmailProof::sign(&self.mail, SELECTOR, DOMAIN, &headers, self.pepper).unwrap()
    }

    fn email_entry(&mut self, digest: &H256) -> BundleEntry {
        let proof = self.signed_email(digest, self.h.now);
        let blob = self.h.prover.attest(&proof.public_inputs(digest).unwrap());
        let proof = proof.with_proof(blob);
        BundleEntry::new(proof.sender_identity().unwrap(), proof)
    }
}

fn credential_error(err: WalletError) -> (usize, CredentialError) {
    match err {
        WalletError::Authorization(AuthorizationError::Credential { index, source }) => (index, source),
        WalletError::Proof { index, source } => (index, source),
        other => panic!("expected a credential failure, got {other:?}"),
    }
}

// ============================================================================
// Identity tokens
// ============================================================================

#[test]
fn test_identity_token_guardian_locks_wallet() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let claims = TokenClaims::for_digest(ISSUER, AUDIENCE, "frank", &digest, NOW, 600);
    let bundle = SignatureBundle::new().with(f.token_entry(&claims));

    let receipt = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap();

    assert_eq!(receipt.authorization.signers, vec![subject_identity(ISSUER, "frank")]);
    assert!(f.h.wallet.lock_info().is_locked);
}

#[test]
fn test_identity_token_for_foreign_audience_rejected() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let claims = TokenClaims::for_digest(ISSUER, "some-other-app", "frank", &digest, NOW, 600);
    let bundle = SignatureBundle::new().with(f.token_entry(&claims));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert!(matches!(
        credential_error(err),
        (0, CredentialError::NotAllowListed { .. })
    ));
    assert!(!f.h.wallet.lock_info().is_locked);
}

#[test]
fn test_expired_identity_token_rejected() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let claims = TokenClaims::for_digest(ISSUER, AUDIENCE, "frank", &digest, NOW - 600, 600);
    let bundle = SignatureBundle::new().with(f.token_entry(&claims));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert_eq!(
        credential_error(err),
        (
            0,
            CredentialError::ExpiredCredential {
                expired_at: NOW,
                now: NOW,
            }
        )
    );
}

#[test]
fn test_identity_token_for_other_action_rejected() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, _) = f.h.prepare(&action);
    let elsewhere = f.h.wallet.digest_for(&action, nonce + 1);
    let claims = TokenClaims::for_digest(ISSUER, AUDIENCE, "frank", &elsewhere, NOW, 600);
    let bundle = SignatureBundle::new().with(f.token_entry(&claims));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert!(matches!(
        credential_error(err),
        (0, CredentialError::DigestMismatch { .. })
    ));
}

#[test]
fn test_identity_token_from_unknown_key_rejected() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let claims = TokenClaims::for_digest(ISSUER, AUDIENCE, "frank", &digest, NOW, 600);
    let token = IdentityToken::issue(&f.issuer, "rotated-away", &claims).unwrap();
    let bundle = SignatureBundle::new().with(BundleEntry::new(subject_identity(ISSUER, "frank"), token));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert!(matches!(
        credential_error(err),
        (0, CredentialError::UnknownIssuer { .. })
    ));
}

// ============================================================================
// Email approvals
// ============================================================================

#[test]
fn test_email_guardian_locks_wallet() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let bundle = SignatureBundle::new().with(f.email_entry(&digest));

    f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap();

    assert_eq!(f.h.wallet.lock_info().pending_keyset_hash, Some(f.next.hash()));
}

#[test]
fn test_unattested_email_proof_is_a_proof_error() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let proof = f.signed_email(&digest, NOW);
    // Well-formed blob the verifier never produced
    let blob = proof.public_inputs(&digest).unwrap().commitment().0.to_vec();
    let proof = proof.with_proof(blob);
    let bundle =
        SignatureBundle::new().with(BundleEntry::new(proof.sender_identity().unwrap(), proof));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Proof);
    assert!(matches!(
        credential_error(err),
        (0, CredentialError::ProofVerificationFailed { .. })
    ));
    assert_eq!(f.h.wallet.nonce(NonceKind::Config), 0);
}

#[test]
fn test_truncated_email_proof_is_malformed() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let proof = f.signed_email(&digest, NOW).with_proof(vec![0xde, 0xad]);
    let bundle =
        SignatureBundle::new().with(BundleEntry::new(proof.sender_identity().unwrap(), proof));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert_eq!(err.error_code(), "PROOF_REJECTED");
    assert!(matches!(
        credential_error(err),
        (0, CredentialError::MalformedProof { .. })
    ));
}

#[test]
fn test_stale_email_rejected() {
    let mut f = fixture();
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let sent_at = NOW - 2 * 86_400;
    let proof = f.signed_email(&digest, sent_at);
    let blob = f.h.prover.attest(&proof.public_inputs(&digest).unwrap());
    let proof = proof.with_proof(blob);
    let bundle =
        SignatureBundle::new().with(BundleEntry::new(proof.sender_identity().unwrap(), proof));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert!(matches!(
        credential_error(err),
        (0, CredentialError::ExpiredCredential { .. })
    ));
}

#[test]
fn test_email_from_unregistered_domain_rejected() {
    let mut f = fixture();
    f.h.registry.remove_domain_key(SELECTOR, DOMAIN);
    let action = f.propose();
    let (nonce, digest) = f.h.prepare(&action);
    let bundle = SignatureBundle::new().with(f.email_entry(&digest));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert!(matches!(
        credential_error(err),
        (0, CredentialError::UnknownIssuer { .. })
    ));
}

#[test]
fn test_email_and_token_guardians_combine_for_immediate_lock() {
    let mut f = fixture();
    let action = Action::UpdateKeysetHash(KeysetUpdate::Propose {
        new_keyset_hash: f.next.hash(),
        immediate: true,
    });
    let (nonce, digest) = f.h.prepare(&action);
    let claims = TokenClaims::for_digest(ISSUER, AUDIENCE, "frank", &digest, NOW, 600);
    let bundle = SignatureBundle::new()
        .with(f.token_entry(&claims))
        .with(f.email_entry(&digest));

    let receipt = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap();

    assert_eq!(receipt.authorization.weight, 100);
    assert_eq!(f.h.wallet.poll(NOW).map(|_| f.h.wallet.keyset_hash()), Some(f.next.hash()));
}

// ============================================================================
// Contract signers
// ============================================================================

#[test]
fn test_contract_signer_counts_toward_owner_threshold() {
    let mut f = fixture();
    let action = Action::UpdateTimelockDuration { duration: 7_200 };
    let (nonce, digest) = f.h.prepare(&action);
    let payload = f.vault_owner.sign_digest(&digest).unwrap();
    let bundle = SignatureBundle::new()
        .with(raw_entry(&f.owner, &digest))
        .with(BundleEntry::new(
            contract_identity(&VAULT),
            ContractSignature::new(VAULT, payload.0.to_vec()),
        ));

    let receipt = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap();

    assert_eq!(receipt.authorization.weight, 2);
    assert_eq!(f.h.wallet.timelock_duration(), 7_200);
}

#[test]
fn test_contract_signer_rejecting_payload_fails_bundle() {
    let mut f = fixture();
    let action = Action::UpdateTimelockDuration { duration: 7_200 };
    let (nonce, digest) = f.h.prepare(&action);
    let payload = keypair("stranger").sign_digest(&digest).unwrap();
    let bundle = SignatureBundle::new()
        .with(raw_entry(&f.owner, &digest))
        .with(BundleEntry::new(
            contract_identity(&VAULT),
            ContractSignature::new(VAULT, payload.0.to_vec()),
        ));

    let err = f.h.submit(&f.h.submission(action, nonce, bundle)).unwrap_err();

    assert!(matches!(
        credential_error(err),
        (1, CredentialError::BadSignature { .. })
    ));
    assert_eq!(f.h.wallet.timelock_duration(), TWO_DAYS);
}
