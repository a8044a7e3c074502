//! Keyward Ledger - In-memory simulated chain for wallet execution
//!
//! The ledger is:
//! - Asset-scoped (native value plus ERC-20 style tokens)
//! - Account-keyed by [`Address`]
//! - Double-entry (every credit has a corresponding debit, mints excepted)
//! - Journaled (entries are append-only until rolled back)
//!
//! It implements [`CallExecutor`], so wallets can drive it directly.
//! Checkpoints are journal positions; rolling back pops entries and undoes
//! their balance effects in reverse order.
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Every balance change has a journal entry
//! 3. A failed call leaves no entries behind

use std::collections::{HashMap, HashSet};

use keyward_types::{Address, CallExecutor, CallFailure, CallRequest, CallType, Checkpoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// `transfer(address,uint256)` function selector
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Gas charged for a plain value transfer
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Gas charged for a token transfer
pub const TOKEN_TRANSFER_GAS: u64 = 52_000;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient {asset} balance for {account}: have {available}, need {required}")]
    InsufficientBalance {
        account: Address,
        asset: Asset,
        available: u128,
        required: u128,
    },

    #[error("Balance overflow for {account}")]
    Overflow { account: Address },

    #[error("Unknown token: {token}")]
    UnknownToken { token: Address },

    #[error("Malformed call data: {reason}")]
    MalformedCallData { reason: String },

    #[error("Out of gas: limit {limit}, needed {needed}")]
    OutOfGas { limit: u64, needed: u64 },

    #[error("Execution reverted by {target}")]
    Reverted { target: Address },

    #[error("Unsupported call: {reason}")]
    Unsupported { reason: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Asset tracked by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Native,
    Token(Address),
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(token) => write!(f, "token {token}"),
        }
    }
}

/// Type of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Credit (increase) to an account
    Credit,
    /// Debit (decrease) from an account
    Debit,
}

/// Reason for a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// Funds created out of thin air (test setup, faucet)
    Mint,
    /// Transfer between accounts
    Transfer { from: Address, to: Address },
}

/// One side of a balance movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub account: Address,
    pub asset: Asset,
    pub entry_type: EntryType,
    pub amount: u128,
    pub balance_after: u128,
    pub reason: EntryReason,
}

/// Account state in the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub balances: HashMap<Asset, u128>,
    pub entry_count: u64,
}

impl AccountState {
    pub fn balance(&self, asset: &Asset) -> u128 {
        self.balances.get(asset).copied().unwrap_or(0)
    }
}

/// Encode `transfer(to, amount)` call data
pub fn encode_transfer(to: &Address, amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_bytes());
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&amount.to_be_bytes());
    data
}

/// Decode `transfer(to, amount)` call data
pub fn decode_transfer(data: &[u8]) -> Result<(Address, u128)> {
    let malformed = |reason: &str| LedgerError::MalformedCallData {
        reason: reason.to_string(),
    };
    if data.len() != 4 + 64 {
        return Err(malformed("transfer call data must be 68 bytes"));
    }
    if data[..4] != TRANSFER_SELECTOR {
        return Err(malformed("unknown function selector"));
    }
    if data[4..16].iter().any(|b| *b != 0) {
        return Err(malformed("recipient word has dirty high bytes"));
    }
    if data[36..52].iter().any(|b| *b != 0) {
        return Err(malformed("amount exceeds 128 bits"));
    }
    let to = Address::from_slice(&data[16..36]).map_err(|e| malformed(&e.to_string()))?;
    let mut amount = [0u8; 16];
    amount.copy_from_slice(&data[52..68]);
    Ok((to, u128::from_be_bytes(amount)))
}

/// The simulated chain
///
/// Holds native and token balances, knows which addresses are token
/// contracts, and can be told to make calls to an address revert.
#[derive(Debug, Clone, Default)]
pub struct SimulatedChain {
    accounts: HashMap<Address, AccountState>,
    entries: Vec<LedgerEntry>,
    tokens: HashSet<Address>,
    reverting: HashSet<Address>,
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` as a token contract
    pub fn deploy_token(&mut self, address: Address) {
        self.tokens.insert(address);
    }

    pub fn is_token(&self, address: &Address) -> bool {
        self.tokens.contains(address)
    }

    /// Make every call to `target` revert
    pub fn mark_reverting(&mut self, target: Address) {
        self.reverting.insert(target);
    }

    pub fn clear_reverting(&mut self, target: &Address) {
        self.reverting.remove(target);
    }

    /// Native balance
    pub fn balance(&self, account: &Address) -> u128 {
        self.balance_of(account, &Asset::Native)
    }

    /// Token balance
    pub fn token_balance(&self, token: &Address, account: &Address) -> u128 {
        self.balance_of(account, &Asset::Token(*token))
    }

    pub fn balance_of(&self, account: &Address, asset: &Asset) -> u128 {
        self.accounts
            .get(account)
            .map(|a| a.balance(asset))
            .unwrap_or(0)
    }

    /// Credit native value out of thin air
    pub fn mint_native(&mut self, account: Address, amount: u128) -> Result<u128> {
        self.credit(account, Asset::Native, amount, EntryReason::Mint)
    }

    /// Mint tokens to `account`
    pub fn mint_token(&mut self, token: Address, account: Address, amount: u128) -> Result<u128> {
        if !self.is_token(&token) {
            return Err(LedgerError::UnknownToken { token });
        }
        self.credit(account, Asset::Token(token), amount, EntryReason::Mint)
    }

    /// Move `amount` of `asset` between accounts. Both sides are checked
    /// before either is written.
    pub fn transfer(&mut self, from: Address, to: Address, asset: Asset, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let reason = EntryReason::Transfer { from, to };
        let available = self.balance_of(&from, &asset);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                asset,
                available,
                required: amount,
            });
        }
        if from != to && self.balance_of(&to, &asset).checked_add(amount).is_none() {
            return Err(LedgerError::Overflow { account: to });
        }
        self.debit(from, asset, amount, reason)?;
        self.credit(to, asset, amount, reason)?;
        debug!(%from, %to, %asset, amount, "transfer applied");
        Ok(())
    }

    /// All journal entries, oldest first
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn account_state(&self, account: &Address) -> Option<&AccountState> {
        self.accounts.get(account)
    }

    fn credit(&mut self, account: Address, asset: Asset, amount: u128, reason: EntryReason) -> Result<u128> {
        let state = self.accounts.entry(account).or_default();
        let balance_after = state
            .balance(&asset)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { account })?;
        state.balances.insert(asset, balance_after);
        state.entry_count += 1;
        self.push_entry(account, asset, EntryType::Credit, amount, balance_after, reason);
        Ok(balance_after)
    }

    fn debit(&mut self, account: Address, asset: Asset, amount: u128, reason: EntryReason) -> Result<u128> {
        let state = self.accounts.entry(account).or_default();
        let available = state.balance(&asset);
        let balance_after = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account,
                asset,
                available,
                required: amount,
            })?;
        state.balances.insert(asset, balance_after);
        state.entry_count += 1;
        self.push_entry(account, asset, EntryType::Debit, amount, balance_after, reason);
        Ok(balance_after)
    }

    fn push_entry(
        &mut self,
        account: Address,
        asset: Asset,
        entry_type: EntryType,
        amount: u128,
        balance_after: u128,
        reason: EntryReason,
    ) {
        let sequence = self.entries.len() as u64;
        self.entries.push(LedgerEntry {
            sequence,
            account,
            asset,
            entry_type,
            amount,
            balance_after,
            reason,
        });
    }

    /// Undo the most recent entry
    fn undo(&mut self, entry: &LedgerEntry) {
        let Some(state) = self.accounts.get_mut(&entry.account) else {
            return;
        };
        let balance = state.balance(&entry.asset);
        let restored = match entry.entry_type {
            EntryType::Credit => balance.saturating_sub(entry.amount),
            EntryType::Debit => balance.saturating_add(entry.amount),
        };
        state.balances.insert(entry.asset, restored);
        state.entry_count = state.entry_count.saturating_sub(1);
    }

    fn execute(&mut self, from: Address, request: &CallRequest) -> Result<Vec<u8>> {
        if request.call_type == CallType::DelegateCall {
            return Err(LedgerError::Unsupported {
                reason: "delegatecall is not simulated".to_string(),
            });
        }
        if self.reverting.contains(&request.target) {
            return Err(LedgerError::Reverted {
                target: request.target,
            });
        }

        if self.is_token(&request.target) {
            if request.value != 0 {
                return Err(LedgerError::Unsupported {
                    reason: "token contracts do not accept value".to_string(),
                });
            }
            charge_gas(request.gas_limit, TOKEN_TRANSFER_GAS)?;
            let (to, amount) = decode_transfer(&request.data)?;
            self.transfer(from, to, Asset::Token(request.target), amount)?;
            // ABI-encoded `true`
            let mut output = vec![0u8; 32];
            output[31] = 1;
            return Ok(output);
        }

        charge_gas(request.gas_limit, NATIVE_TRANSFER_GAS)?;
        self.transfer(from, request.target, Asset::Native, request.value)?;
        Ok(Vec::new())
    }
}

/// A gas limit of 0 means no per-call limit
fn charge_gas(limit: u64, needed: u64) -> Result<()> {
    if limit != 0 && needed > limit {
        return Err(LedgerError::OutOfGas { limit, needed });
    }
    Ok(())
}

impl CallExecutor for SimulatedChain {
    fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint(self.entries.len() as u64)
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        let keep = usize::try_from(checkpoint.0).unwrap_or(usize::MAX);
        while self.entries.len() > keep {
            if let Some(entry) = self.entries.pop() {
                self.undo(&entry);
            }
        }
    }

    fn call(&mut self, from: Address, request: &CallRequest) -> std::result::Result<Vec<u8>, CallFailure> {
        let checkpoint = self.checkpoint();
        self.execute(from, request).map_err(|e| {
            self.rollback(checkpoint);
            CallFailure::new(e.to_string())
        })
    }
}
