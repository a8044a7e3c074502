//! Scripted demos against the in-memory chain
//!
//! Both demos build the same wallet:
//! - owners: Alice (raw key) and Bob (contract signer), weight 1 each, threshold 2
//! - assets operator: one raw key with weight 2, threshold 1
//! - guardians: Carol (identity token) and Dave (email), weight 50 each;
//!   50 locks with a timelock, 100 locks immediately

use anyhow::{bail, Context};
use keyward_core::{
    Action, BundleEntry, Environment, InMemoryAllowList, InMemoryFactory, Key, KeySet,
    KeysetUpdate, RoleThresholds, SignatureBundle, StateDelta, Submission, SubmitReceipt, Wallet,
    WalletConfig, WalletFactory,
};
use keyward_credentials::{
    approval_headers, contract_identity, signer_identity, subject_identity, ContractSignature,
    EmailProof, IdentityToken, InMemoryProofVerifier, InMemoryRegistry, InMemorySignerOracle,
    RawSignature, SessionDelegation, TokenClaims,
};
use keyward_crypto::{keccak256, Ed25519KeyPair, Secp256k1KeyPair};
use keyward_ledger::{encode_transfer, Asset, SimulatedChain};
use keyward_types::{Address, CallRequest, NonceKind, Role, WalletError, H256};

use crate::config::KeywardConfig;
use crate::display;

const ISSUER: &str = "https://id.keyward.dev";
const ISSUER_KID: &str = "demo-2024";
const AUDIENCE: &str = "keyward-wallet";
const MAIL_DOMAIN: &str = "mail.keyward.dev";
const MAIL_SELECTOR: &str = "s1";
const DAVE_EMAIL: &str = "dave@mail.keyward.dev";

struct Signers {
    alice: Secp256k1KeyPair,
    bob: Secp256k1KeyPair,
    bob_contract: Address,
    operator: Secp256k1KeyPair,
    session: Secp256k1KeyPair,
    erin: Secp256k1KeyPair,
    issuer: Ed25519KeyPair,
    mail_domain: Ed25519KeyPair,
    dave_pepper: H256,
}

impl Signers {
    fn derive() -> anyhow::Result<Self> {
        Ok(Self {
            alice: Secp256k1KeyPair::from_label("demo/alice")?,
            bob: Secp256k1KeyPair::from_label("demo/bob")?,
            bob_contract: Address([0xb0; 20]),
            operator: Secp256k1KeyPair::from_label("demo/operator")?,
            session: Secp256k1KeyPair::from_label("demo/session")?,
            erin: Secp256k1KeyPair::from_label("demo/erin")?,
            issuer: Ed25519KeyPair::from_label("demo/issuer"),
            mail_domain: Ed25519KeyPair::from_label("demo/mail-domain"),
            dave_pepper: keccak256(b"demo/dave-pepper"),
        })
    }

    fn keyset(&self) -> anyhow::Result<KeySet> {
        Ok(KeySet::new(vec![
            Key::raw(&self.alice.address(), Role::Owner, 1),
            Key::contract(&self.bob_contract, Role::Owner, 1),
            Key::raw(&self.operator.address(), Role::AssetsOp, 2),
            Key::token(ISSUER, "carol", Role::Guardian, 50),
            Key::email(DAVE_EMAIL, &self.dave_pepper, Role::Guardian, 50),
        ])?)
    }

    /// Keyset the guardians recover to: Erin replaces every owner and operator key
    fn recovered_keyset(&self) -> anyhow::Result<KeySet> {
        Ok(KeySet::new(vec![
            Key::raw(&self.erin.address(), Role::Owner, 2),
            Key::raw(&self.erin.address(), Role::AssetsOp, 1),
            Key::token(ISSUER, "carol", Role::Guardian, 50),
            Key::email(DAVE_EMAIL, &self.dave_pepper, Role::Guardian, 50),
        ])?)
    }
}

/// Wallet plus every collaborator it talks to
struct World {
    registry: InMemoryRegistry,
    oracle: InMemorySignerOracle,
    prover: InMemoryProofVerifier,
    allow_list: InMemoryAllowList,
    chain: SimulatedChain,
    factory: InMemoryFactory,
    address: Address,
    keyset: KeySet,
    signers: Signers,
    now: u64,
}

impl World {
    fn new(config: &KeywardConfig) -> anyhow::Result<Self> {
        let signers = Signers::derive()?;
        let keyset = signers.keyset()?;

        let wallet_config: WalletConfig = config.wallet.with_thresholds(RoleThresholds {
            owner: 2,
            assets_op: 1,
            guardian: 50,
            guardian_immediate: 100,
        });
        wallet_config.validate()?;
        keyset.validate_thresholds(&wallet_config.thresholds)?;

        let mut registry = InMemoryRegistry::new();
        registry.set_issuer_key(ISSUER, ISSUER_KID, signers.issuer.public_key());
        registry.allow_audience(ISSUER, AUDIENCE);
        registry.set_domain_key(MAIL_SELECTOR, MAIL_DOMAIN, signers.mail_domain.public_key());

        let mut oracle = InMemorySignerOracle::new();
        oracle.register(signers.bob_contract, signers.bob.address());

        let mut allow_list = InMemoryAllowList::new();
        allow_list.allow(config.factory.implementation);

        let mut factory = InMemoryFactory::new(
            config.factory.address,
            config.factory.implementation,
            wallet_config,
        )?;
        let predicted = factory.predict_address(&keyset.hash());
        let address = factory.ensure_deployed(keyset.hash())?;
        if predicted != address {
            bail!("factory deployed {address}, predicted {predicted}");
        }

        Ok(Self {
            registry,
            oracle,
            prover: InMemoryProofVerifier::new(),
            allow_list,
            chain: SimulatedChain::new(),
            factory,
            address,
            keyset,
            signers,
            now: chrono::Utc::now().timestamp().max(0) as u64,
        })
    }

    fn wallet(&self) -> anyhow::Result<&Wallet> {
        self.factory.wallet(&self.address).context("wallet not deployed")
    }

    /// Next nonce and digest for `action`
    fn prepare(&self, action: &Action) -> anyhow::Result<(u64, H256)> {
        let wallet = self.wallet()?;
        let nonce = wallet.next_nonce(action.nonce_kind());
        Ok((nonce, wallet.digest_for(action, nonce)))
    }

    fn submit(&mut self, submission: &Submission) -> anyhow::Result<SubmitReceipt> {
        let World {
            registry,
            oracle,
            prover,
            allow_list,
            chain,
            factory,
            address,
            now,
            ..
        } = self;
        let wallet = factory.wallet_mut(address).context("wallet not deployed")?;
        let mut env = Environment {
            domain_keys: &*registry,
            issuers: &*registry,
            signer_oracle: &*oracle,
            proof_verifier: &*prover,
            allow_list: &*allow_list,
            executor: chain,
        };
        Ok(wallet.submit(submission, &mut env, *now)?)
    }

    fn raw_entry(keypair: &Secp256k1KeyPair, digest: &H256) -> anyhow::Result<BundleEntry> {
        Ok(BundleEntry::new(
            signer_identity(&keypair.address()),
            RawSignature::sign(keypair, digest)?,
        ))
    }

    fn bob_entry(&self, digest: &H256) -> anyhow::Result<BundleEntry> {
        let payload = self.signers.bob.sign_digest(digest)?;
        Ok(BundleEntry::new(
            contract_identity(&self.signers.bob_contract),
            ContractSignature::new(self.signers.bob_contract, payload.0.to_vec()),
        ))
    }

    fn carol_entry(&self, digest: &H256) -> anyhow::Result<BundleEntry> {
        let claims = TokenClaims::for_digest(ISSUER, AUDIENCE, "carol", digest, self.now, 600);
        let token = IdentityToken::issue(&self.signers.issuer, ISSUER_KID, &claims)?;
        Ok(BundleEntry::new(subject_identity(ISSUER, "carol"), token))
    }

    fn dave_entry(&mut self, digest: &H256) -> anyhow::Result<BundleEntry> {
        let headers = approval_headers(DAVE_EMAIL, "recovery@keyward.dev", digest, self.now);
        let proof = EmailProof::sign(
            &self.signers.mail_domain,
            MAIL_SELECTOR,
            MAIL_DOMAIN,
            &headers,
            self.signers.dave_pepper,
        )?;
        let blob = self.prover.attest(&proof.public_inputs(digest)?);
        let proof = proof.with_proof(blob);
        Ok(BundleEntry::new(proof.sender_identity()?, proof))
    }

    fn owners_bundle(&self, digest: &H256) -> anyhow::Result<SignatureBundle> {
        Ok(SignatureBundle::new()
            .with(Self::raw_entry(&self.signers.alice, digest)?)
            .with(self.bob_entry(digest)?))
    }

    fn submission(&self, action: Action, nonce: u64, bundle: SignatureBundle) -> Submission {
        Submission {
            action,
            nonce,
            keyset: self.keyset.clone(),
            bundle,
        }
    }

    fn show_balances(&self, token: &Address, accounts: &[(&str, Address)]) {
        for (name, account) in accounts {
            display::kv(
                name,
                &format!(
                    "{} native, {} token",
                    self.chain.balance_of(account, &Asset::Native),
                    self.chain.token_balance(token, account)
                ),
            );
        }
    }
}

fn show_receipt(receipt: &SubmitReceipt) {
    display::success(&format!(
        "{} committed ({} nonce {}, weight {}/{})",
        receipt.action,
        receipt.nonce_kind,
        receipt.nonce,
        receipt.authorization.weight,
        receipt.authorization.required
    ));
    if let Some(StateDelta::RecoverySettled { previous, current }) = &receipt.settled {
        display::kv("settled", &format!("{previous} -> {current}"));
    }
}

/// Print an expected rejection; an acceptance aborts the demo
fn expect_rejection(what: &str, result: anyhow::Result<SubmitReceipt>) -> anyhow::Result<()> {
    match result {
        Ok(receipt) => bail!("{what} was accepted as {}", receipt.action),
        Err(err) => {
            let code = err
                .downcast_ref::<WalletError>()
                .map(WalletError::error_code)
                .unwrap_or("UNKNOWN");
            display::rejected(&format!("{what}: [{code}] {err}"));
            Ok(())
        }
    }
}

/// Batched transfers, replay protection, session keys, threshold boundary
pub fn run_batch_demo(config: &KeywardConfig) -> anyhow::Result<()> {
    let mut world = World::new(config)?;
    let token = Address([0x70; 20]);
    let shop = Address([0xa1; 20]);
    let cafe = Address([0xa2; 20]);

    display::section("Wallet");
    display::labeled("Address", &world.address.to_hex());
    display::labeled("Keyset", &world.keyset.hash().to_hex());
    display::labeled("Keys", &world.keyset.len().to_string());

    world.chain.mint_native(world.address, 1_000)?;
    world.chain.deploy_token(token);
    world.chain.mint_token(token, world.address, 500)?;
    display::info("funded with 1000 native and 500 token");

    display::section("Batch signed by the assets operator");
    let action = Action::ExecuteBatch {
        calls: vec![CallRequest::transfer(shop, 10), CallRequest::transfer(cafe, 20)],
    };
    let (nonce, digest) = world.prepare(&action)?;
    let bundle = SignatureBundle::new().with(World::raw_entry(&world.signers.operator, &digest)?);
    let submission = world.submission(action, nonce, bundle);
    let receipt = world.submit(&submission)?;
    show_receipt(&receipt);
    world.show_balances(&token, &[("wallet", world.address), ("shop", shop), ("cafe", cafe)]);

    display::section("Replay");
    expect_rejection("same submission again", world.submit(&submission))?;

    display::section("Session key");
    let action = Action::ExecuteBatch {
        calls: vec![CallRequest::invoke(token, encode_transfer(&shop, 5))],
    };
    let (nonce, digest) = world.prepare(&action)?;
    let delegation = SessionDelegation::sign(&world.signers.session, world.now + 3_600, 2, &digest)?;
    let permit = delegation.permit_digest(&digest);
    let entry = BundleEntry::delegated(
        signer_identity(&world.signers.operator.address()),
        RawSignature::sign(&world.signers.operator, &permit)?,
        delegation,
    );
    let receipt = world.submit(&world.submission(action, nonce, SignatureBundle::new().with(entry)))?;
    show_receipt(&receipt);
    world.show_balances(&token, &[("wallet", world.address), ("shop", shop)]);

    display::section("Best-effort batch");
    world.chain.mark_reverting(cafe);
    let action = Action::ExecuteBatch {
        calls: vec![
            CallRequest::transfer(cafe, 1).with_revert_on_error(false),
            CallRequest::transfer(shop, 2),
        ],
    };
    let (nonce, digest) = world.prepare(&action)?;
    let bundle = SignatureBundle::new().with(World::raw_entry(&world.signers.operator, &digest)?);
    let receipt = world.submit(&world.submission(action, nonce, bundle))?;
    show_receipt(&receipt);
    if let StateDelta::BatchExecuted(outcome) = &receipt.delta {
        for failure in outcome.failures() {
            display::kv("call failed", &failure.to_string());
        }
    }

    display::section("Owner threshold");
    let rotated = Signers::recovered_keyset(&world.signers)?.hash();
    let action = Action::UpdateKeysetHash(KeysetUpdate::Rotate {
        new_keyset_hash: rotated,
    });
    let (nonce, digest) = world.prepare(&action)?;
    let alice_only = SignatureBundle::new().with(World::raw_entry(&world.signers.alice, &digest)?);
    expect_rejection(
        "rotation signed by Alice alone",
        world.submit(&world.submission(action.clone(), nonce, alice_only)),
    )?;
    display::labeled(
        "Config nonce",
        &world.wallet()?.nonce(NonceKind::Config).to_string(),
    );
    let both = world.owners_bundle(&digest)?;
    let receipt = world.submit(&world.submission(action, nonce, both))?;
    show_receipt(&receipt);
    display::labeled("Keyset", &world.wallet()?.keyset_hash().to_hex());

    Ok(())
}

/// Guardian lock, owner cancel, timelocked and immediate recovery
pub fn run_recovery_demo(config: &KeywardConfig) -> anyhow::Result<()> {
    let mut world = World::new(config)?;
    let recovered = world.signers.recovered_keyset()?;
    world.chain.mint_native(world.address, 100)?;

    display::section("Guardian proposal");
    let action = Action::UpdateKeysetHash(KeysetUpdate::Propose {
        new_keyset_hash: recovered.hash(),
        immediate: false,
    });
    let (nonce, digest) = world.prepare(&action)?;
    let bundle = SignatureBundle::new().with(world.carol_entry(&digest)?);
    show_receipt(&world.submit(&world.submission(action, nonce, bundle))?);
    let lock = world.wallet()?.lock_info();
    display::kv("locked", &lock.is_locked.to_string());
    if let Some(unlock_at) = lock.unlock_timestamp {
        display::kv("unlock at", &unlock_at.to_string());
    }

    let action = Action::ExecuteBatch {
        calls: vec![CallRequest::transfer(Address([0xa1; 20]), 1)],
    };
    let (nonce, digest) = world.prepare(&action)?;
    let bundle = SignatureBundle::new().with(World::raw_entry(&world.signers.operator, &digest)?);
    expect_rejection(
        "batch while locked",
        world.submit(&world.submission(action, nonce, bundle)),
    )?;

    display::section("Owners cancel");
    let action = Action::UpdateKeysetHash(KeysetUpdate::Cancel);
    let (nonce, digest) = world.prepare(&action)?;
    let bundle = world.owners_bundle(&digest)?;
    show_receipt(&world.submit(&world.submission(action, nonce, bundle))?);

    display::section("Timelocked recovery");
    let action = Action::UpdateKeysetHash(KeysetUpdate::Propose {
        new_keyset_hash: recovered.hash(),
        immediate: false,
    });
    let (nonce, digest) = world.prepare(&action)?;
    let bundle = SignatureBundle::new().with(world.dave_entry(&digest)?);
    show_receipt(&world.submit(&world.submission(action, nonce, bundle))?);

    let timelock = world.wallet()?.timelock_duration();
    world.now += timelock;
    display::info(&format!("clock advanced by {timelock}s"));

    let settled = world
        .factory
        .wallet_mut(&world.address)
        .context("wallet not deployed")?
        .poll(world.now);
    if let Some(StateDelta::RecoverySettled { previous, current }) = settled {
        display::success(&format!("recovery settled: {previous} -> {current}"));
    }

    let action = Action::ExecuteBatch {
        calls: vec![CallRequest::transfer(Address([0xa1; 20]), 1)],
    };
    let (nonce, digest) = world.prepare(&action)?;
    let bundle = SignatureBundle::new().with(World::raw_entry(&world.signers.operator, &digest)?);
    expect_rejection(
        "old keyset after recovery",
        world.submit(&world.submission(action.clone(), nonce, bundle)),
    )?;

    world.keyset = recovered;
    let bundle = SignatureBundle::new().with(World::raw_entry(&world.signers.erin, &digest)?);
    show_receipt(&world.submit(&world.submission(action, nonce, bundle))?);

    display::section("Immediate recovery");
    let fresh = KeySet::new(vec![
        Key::raw(&world.signers.alice.address(), Role::Owner, 2),
        Key::raw(&world.signers.alice.address(), Role::AssetsOp, 1),
        Key::token(ISSUER, "carol", Role::Guardian, 50),
        Key::email(DAVE_EMAIL, &world.signers.dave_pepper, Role::Guardian, 50),
    ])?;
    let action = Action::UpdateKeysetHash(KeysetUpdate::Propose {
        new_keyset_hash: fresh.hash(),
        immediate: true,
    });
    let (nonce, digest) = world.prepare(&action)?;
    let carol_only = SignatureBundle::new().with(world.carol_entry(&digest)?);
    expect_rejection(
        "immediate lock with one guardian",
        world.submit(&world.submission(action.clone(), nonce, carol_only)),
    )?;
    let bundle = SignatureBundle::new()
        .with(world.carol_entry(&digest)?)
        .with(world.dave_entry(&digest)?);
    show_receipt(&world.submit(&world.submission(action, nonce, bundle))?);

    let settled = world
        .factory
        .wallet_mut(&world.address)
        .context("wallet not deployed")?
        .poll(world.now);
    if settled.is_some() {
        display::success("immediate recovery settled on the next interaction");
    }
    display::labeled("Keyset", &world.wallet()?.keyset_hash().to_hex());

    Ok(())
}
