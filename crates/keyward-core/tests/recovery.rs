mod common;

use common::*;
use keyward_core::{Action, AccountSync, Key, KeySet, KeysetUpdate, StateDelta};
use keyward_crypto::Secp256k1KeyPair;
use keyward_types::{
    Address, AuthorizationError, CallRequest, NonceKind, Role, StateError, WalletError,
};

struct Keys {
    owner_a: Secp256k1KeyPair,
    owner_b: Secp256k1KeyPair,
    operator: Secp256k1KeyPair,
    guardian_a: Secp256k1KeyPair,
    guardian_b: Secp256k1KeyPair,
    heir: Secp256k1KeyPair,
}

fn keys() -> Keys {
    Keys {
        owner_a: keypair("owner-a"),
        owner_b: keypair("owner-b"),
        operator: keypair("operator"),
        guardian_a: keypair("guardian-a"),
        guardian_b: keypair("guardian-b"),
        heir: keypair("heir"),
    }
}

fn harness(keys: &Keys) -> Harness {
    let keyset = KeySet::new(vec![
        Key::raw(&keys.owner_a.address(), Role::Owner, 1),
        Key::raw(&keys.owner_b.address(), Role::Owner, 1),
        Key::raw(&keys.operator.address(), Role::AssetsOp, 1),
        Key::raw(&keys.guardian_a.address(), Role::Guardian, 50),
        Key::raw(&keys.guardian_b.address(), Role::Guardian, 50),
    ])
    .unwrap();
    let mut h = Harness::new(keyset, thresholds(2, 1, 50, 100));
    let wallet = h.address();
    h.chain.mint_native(wallet, 100).unwrap();
    h
}

/// The heir holds every role after recovery
fn heir_keyset(keys: &Keys) -> KeySet {
    KeySet::new(vec![
        Key::raw(&keys.heir.address(), Role::Owner, 2),
        Key::raw(&keys.heir.address(), Role::AssetsOp, 1),
        Key::raw(&keys.guardian_a.address(), Role::Guardian, 50),
        Key::raw(&keys.guardian_b.address(), Role::Guardian, 50),
    ])
    .unwrap()
}

fn propose(new_keyset: &KeySet, immediate: bool) -> Action {
    Action::UpdateKeysetHash(KeysetUpdate::Propose {
        new_keyset_hash: new_keyset.hash(),
        immediate,
    })
}

fn cancel() -> Action {
    Action::UpdateKeysetHash(KeysetUpdate::Cancel)
}

fn transfer(amount: u128) -> Action {
    Action::ExecuteBatch {
        calls: vec![CallRequest::transfer(Address([0xa1; 20]), amount)],
    }
}

#[test]
fn test_guardian_lock_then_owner_cancel() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);

    let receipt = h
        .submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();
    assert_eq!(
        receipt.delta,
        StateDelta::RecoveryProposed {
            pending_keyset_hash: heir.hash(),
            unlock_at: NOW + TWO_DAYS,
            immediate: false,
        }
    );
    let lock = h.wallet.lock_info();
    assert!(lock.is_locked);
    assert_eq!(lock.pending_keyset_hash, Some(heir.hash()));
    assert_eq!(lock.unlock_timestamp, Some(NOW + TWO_DAYS));

    // Asset movement is frozen while locked
    let err = h.submit(&h.signed(transfer(10), &[&keys.operator])).unwrap_err();
    assert!(matches!(err, WalletError::State(StateError::Locked { .. })));
    assert_eq!(h.wallet.nonce(NonceKind::Assets), 0);

    h.now = NOW + TWO_DAYS - 1;
    let receipt = h
        .submit(&h.signed(cancel(), &[&keys.owner_a, &keys.owner_b]))
        .unwrap();
    assert_eq!(
        receipt.delta,
        StateDelta::RecoveryCancelled {
            pending_keyset_hash: heir.hash(),
        }
    );
    assert!(!h.wallet.lock_info().is_locked);
    assert_eq!(h.wallet.keyset_hash(), h.keyset.hash());
    assert_eq!(h.wallet.nonce(NonceKind::Config), 2);

    h.now = NOW + TWO_DAYS;
    assert_eq!(h.wallet.poll(h.now), None);
    h.submit(&h.signed(transfer(10), &[&keys.operator])).unwrap();
}

#[test]
fn test_guardians_cannot_cancel() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);
    h.submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();

    let err = h
        .submit(&h.signed(cancel(), &[&keys.guardian_a, &keys.guardian_b]))
        .unwrap_err();

    assert!(matches!(
        err,
        WalletError::Authorization(AuthorizationError::ThresholdNotMet {
            role: Role::Owner,
            accumulated: 0,
            ..
        })
    ));
    assert!(h.wallet.lock_info().is_locked);
}

#[test]
fn test_matured_rotation_replaces_keyset() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);
    h.submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();

    assert_eq!(h.wallet.poll(NOW + TWO_DAYS - 1), None);
    assert_eq!(
        h.wallet.poll(NOW + TWO_DAYS),
        Some(StateDelta::RecoverySettled {
            previous: h.keyset.hash(),
            current: heir.hash(),
        })
    );
    assert_eq!(h.wallet.keyset_hash(), heir.hash());
    assert!(!h.wallet.lock_info().is_locked);

    h.now = NOW + TWO_DAYS;
    let err = h.submit(&h.signed(transfer(10), &[&keys.operator])).unwrap_err();
    assert!(matches!(
        err,
        WalletError::Authorization(AuthorizationError::KeysetMismatch { .. })
    ));

    h.keyset = heir;
    h.submit(&h.signed(transfer(10), &[&keys.heir])).unwrap();
    assert_eq!(h.chain.balance(&Address([0xa1; 20])), 10);
}

#[test]
fn test_submit_settles_matured_recovery_first() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);
    let old = h.keyset.hash();
    h.submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();

    h.now = NOW + TWO_DAYS;
    h.keyset = heir.clone();
    let receipt = h.submit(&h.signed(transfer(10), &[&keys.heir])).unwrap();

    assert_eq!(
        receipt.settled,
        Some(StateDelta::RecoverySettled {
            previous: old,
            current: heir.hash(),
        })
    );
}

#[test]
fn test_second_proposal_while_locked_rejected() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);
    h.submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();

    let err = h
        .submit(&h.signed(propose(&h.keyset.clone(), false), &[&keys.guardian_b]))
        .unwrap_err();

    assert_eq!(err, WalletError::State(StateError::AlreadyLocked));
    assert_eq!(h.wallet.lock_info().pending_keyset_hash, Some(heir.hash()));
    assert_eq!(h.wallet.nonce(NonceKind::Config), 1);
}

#[test]
fn test_cancel_without_lock_rejected() {
    let keys = keys();
    let mut h = harness(&keys);

    let err = h
        .submit(&h.signed(cancel(), &[&keys.owner_a, &keys.owner_b]))
        .unwrap_err();

    assert_eq!(err, WalletError::State(StateError::NotLocked));
    assert_eq!(h.wallet.nonce(NonceKind::Config), 0);
}

#[test]
fn test_immediate_lock_needs_higher_guardian_weight() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);

    let err = h
        .submit(&h.signed(propose(&heir, true), &[&keys.guardian_a]))
        .unwrap_err();
    assert!(matches!(
        err,
        WalletError::Authorization(AuthorizationError::ThresholdNotMet {
            role: Role::Guardian,
            accumulated: 50,
            required: 100,
        })
    ));

    let receipt = h
        .submit(&h.signed(propose(&heir, true), &[&keys.guardian_a, &keys.guardian_b]))
        .unwrap();
    assert_eq!(
        receipt.delta,
        StateDelta::RecoveryProposed {
            pending_keyset_hash: heir.hash(),
            unlock_at: NOW,
            immediate: true,
        }
    );
}

#[test]
fn test_immediate_recovery_leaves_no_cancel_window() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);
    h.submit(&h.signed(propose(&heir, true), &[&keys.guardian_a, &keys.guardian_b]))
        .unwrap();

    // The cancel settles the recovery before it is checked, so the old owners no longer match
    let err = h
        .submit(&h.signed(cancel(), &[&keys.owner_a, &keys.owner_b]))
        .unwrap_err();

    assert!(matches!(
        err,
        WalletError::Authorization(AuthorizationError::KeysetMismatch { .. })
    ));
    assert_eq!(h.wallet.keyset_hash(), heir.hash());
    assert!(!h.wallet.lock_info().is_locked);
}

#[test]
fn test_timelock_update_respects_floor() {
    let keys = keys();
    let mut h = harness(&keys);

    let err = h
        .submit(&h.signed(
            Action::UpdateTimelockDuration { duration: 1_800 },
            &[&keys.owner_a, &keys.owner_b],
        ))
        .unwrap_err();
    assert_eq!(
        err,
        WalletError::State(StateError::TimelockBelowMinimum {
            requested: 1_800,
            minimum: 3_600,
        })
    );
    assert_eq!(h.wallet.nonce(NonceKind::Config), 0);

    let receipt = h
        .submit(&h.signed(
            Action::UpdateTimelockDuration { duration: 7_200 },
            &[&keys.owner_a, &keys.owner_b],
        ))
        .unwrap();
    assert_eq!(
        receipt.delta,
        StateDelta::TimelockUpdated {
            previous: TWO_DAYS,
            current: 7_200,
        }
    );

    let heir = heir_keyset(&keys);
    let receipt = h
        .submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();
    assert!(matches!(
        receipt.delta,
        StateDelta::RecoveryProposed { unlock_at, .. } if unlock_at == NOW + 7_200
    ));
}

#[test]
fn test_owner_rotation_clears_pending_recovery() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);
    h.submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();

    let replacement = KeySet::new(vec![
        Key::raw(&keys.owner_a.address(), Role::Owner, 2),
        Key::raw(&keys.operator.address(), Role::AssetsOp, 1),
        Key::raw(&keys.guardian_b.address(), Role::Guardian, 50),
    ])
    .unwrap();
    let receipt = h
        .submit(&h.signed(
            Action::UpdateKeysetHash(KeysetUpdate::Rotate {
                new_keyset_hash: replacement.hash(),
            }),
            &[&keys.owner_a, &keys.owner_b],
        ))
        .unwrap();

    assert!(matches!(
        receipt.delta,
        StateDelta::KeysetRotated { cleared_pending: Some(pending), .. } if pending == heir.hash()
    ));
    assert!(!h.wallet.lock_info().is_locked);
    assert_eq!(h.wallet.poll(NOW + TWO_DAYS), None);
    assert_eq!(h.wallet.keyset_hash(), replacement.hash());
}

// ============================================================================
// Account sync
// ============================================================================

fn sync(keys: &Keys, implementation: Address, timelock_duration: u64) -> Action {
    Action::SyncAccount(AccountSync {
        keyset_hash: heir_keyset(keys).hash(),
        timelock_duration,
        implementation,
    })
}

#[test]
fn test_sync_updates_everything_at_once() {
    let keys = keys();
    let mut h = harness(&keys);

    let receipt = h
        .submit(&h.signed(
            sync(&keys, NEXT_IMPLEMENTATION, 7_200),
            &[&keys.owner_a, &keys.owner_b],
        ))
        .unwrap();

    assert_eq!(
        receipt.delta,
        StateDelta::AccountSynced {
            keyset_hash: heir_keyset(&keys).hash(),
            timelock_duration: 7_200,
            implementation: NEXT_IMPLEMENTATION,
            previous_implementation: IMPLEMENTATION,
        }
    );
    assert_eq!(h.wallet.implementation(), NEXT_IMPLEMENTATION);
    assert_eq!(h.wallet.keyset_hash(), heir_keyset(&keys).hash());
    assert_eq!(h.wallet.timelock_duration(), 7_200);
    assert_eq!(h.wallet.nonce(NonceKind::Config), 1);
}

#[test]
fn test_sync_to_unlisted_implementation_changes_nothing() {
    let keys = keys();
    let mut h = harness(&keys);
    let rogue = Address([0xee; 20]);

    let err = h
        .submit(&h.signed(sync(&keys, rogue, 7_200), &[&keys.owner_a, &keys.owner_b]))
        .unwrap_err();

    assert_eq!(
        err,
        WalletError::UnauthorizedImplementation {
            implementation: rogue
        }
    );
    assert_eq!(h.wallet.implementation(), IMPLEMENTATION);
    assert_eq!(h.wallet.keyset_hash(), h.keyset.hash());
    assert_eq!(h.wallet.timelock_duration(), TWO_DAYS);
    assert_eq!(h.wallet.nonce(NonceKind::Config), 0);
}

#[test]
fn test_sync_below_timelock_floor_rejected() {
    let keys = keys();
    let mut h = harness(&keys);

    let err = h
        .submit(&h.signed(
            sync(&keys, NEXT_IMPLEMENTATION, 60),
            &[&keys.owner_a, &keys.owner_b],
        ))
        .unwrap_err();

    assert!(matches!(
        err,
        WalletError::State(StateError::TimelockBelowMinimum { requested: 60, .. })
    ));
    assert_eq!(h.wallet.implementation(), IMPLEMENTATION);
}

#[test]
fn test_sync_clears_pending_recovery() {
    let keys = keys();
    let mut h = harness(&keys);
    let heir = heir_keyset(&keys);
    h.submit(&h.signed(propose(&heir, false), &[&keys.guardian_a]))
        .unwrap();

    h.submit(&h.signed(
        sync(&keys, NEXT_IMPLEMENTATION, 7_200),
        &[&keys.owner_a, &keys.owner_b],
    ))
    .unwrap();

    assert!(!h.wallet.lock_info().is_locked);
}
