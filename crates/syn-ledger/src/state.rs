//! The ledger's read/write state contract.
//!
//! [`StateRW`] is the typed key/value surface every state consumer (VM
//! handlers, token operations, contract management) runs against. Two
//! implementations exist: [`LedgerState`], the authoritative in-memory
//! map, and [`SnapshotFrame`], a copy-on-write overlay whose writes land
//! only when its closure succeeds.
//!
//! Token, contract, UTXO and log operations are default methods over the
//! raw KV surface, so they transparently participate in whichever frame
//! they run inside.

use crate::errors::{LedgerError, LedgerResult};
use crate::keys;
use crate::tokens::TokenMeta;
use shared_types::{
    canonical_decode, canonical_encode, sha256, Address, Contract, Hash, Log, TokenId, Utxo,
};
use std::collections::BTreeMap;

/// Pending-log key prefix (drained into a block on append).
const PENDING_LOG_PREFIX: &[u8] = b"logs:pending:";

/// Kinds of nested contract invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Plain internal call; callee state, callee context.
    Internal,
    /// Run callee code against the caller's storage.
    Delegated,
    /// Read-only call; writes are rejected.
    Static,
}

/// Typed key/value state surface with token/contract/UTXO semantics.
pub trait StateRW {
    /// Read a raw key.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Write a raw key.
    fn put(&mut self, key: &[u8], value: &[u8]) -> LedgerResult<()>;

    /// Delete a raw key.
    fn delete(&mut self, key: &[u8]) -> LedgerResult<()>;

    /// All pairs under `prefix`, in key order.
    fn prefix_iter(&self, prefix: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>;

    // -------------------------------------------------------------------------
    // TOKENS
    // -------------------------------------------------------------------------

    /// Register a token; rejects duplicate ids.
    fn register_token(&mut self, meta: &TokenMeta) -> LedgerResult<()> {
        let key = keys::token_meta(meta.id);
        if self.get(&key).is_some() {
            return Err(LedgerError::AlreadyExists(format!("token {}", meta.id)));
        }
        self.put(&key, &canonical_encode(meta)?)
    }

    /// Declared metadata for a token.
    fn token_meta(&self, token: TokenId) -> LedgerResult<TokenMeta> {
        let bytes = self
            .get(&keys::token_meta(token))
            .ok_or_else(|| LedgerError::NotFound(format!("token {token}")))?;
        Ok(canonical_decode(&bytes)?)
    }

    /// Balance of `address` in `token`; unknown holders read as zero.
    fn token_balance(&self, token: TokenId, address: &Address) -> u128 {
        self.get(&keys::token_balance(token, address))
            .map(|bytes| keys::decode_u128(&bytes))
            .unwrap_or(0)
    }

    /// Circulating supply of `token`.
    fn token_supply(&self, token: TokenId) -> u128 {
        self.get(&keys::token_supply(token))
            .map(|bytes| keys::decode_u128(&bytes))
            .unwrap_or(0)
    }

    /// Mint `amount` to `to`, respecting any declared supply cap.
    fn token_mint(&mut self, token: TokenId, to: &Address, amount: u128) -> LedgerResult<()> {
        let meta = self.token_meta(token)?;
        let supply = self.token_supply(token);
        let would_be = supply.saturating_add(amount);
        if let Some(cap) = meta.supply_cap {
            if would_be > cap {
                return Err(LedgerError::SupplyCapExceeded {
                    token: token.0,
                    cap,
                    would_be,
                });
            }
        }
        let balance = self.token_balance(token, to);
        self.put(
            &keys::token_balance(token, to),
            &keys::encode_u128(balance.saturating_add(amount)),
        )?;
        self.put(&keys::token_supply(token), &keys::encode_u128(would_be))
    }

    /// Burn `amount` from `from`.
    fn token_burn(&mut self, token: TokenId, from: &Address, amount: u128) -> LedgerResult<()> {
        let balance = self.token_balance(token, from);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }
        let supply = self.token_supply(token);
        self.put(
            &keys::token_balance(token, from),
            &keys::encode_u128(balance - amount),
        )?;
        self.put(
            &keys::token_supply(token),
            &keys::encode_u128(supply.saturating_sub(amount)),
        )
    }

    /// Move `amount` from `from` to `to`.
    fn token_transfer(
        &mut self,
        token: TokenId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LedgerResult<()> {
        let from_balance = self.token_balance(token, from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }
        let to_balance = self.token_balance(token, to);
        self.put(
            &keys::token_balance(token, from),
            &keys::encode_u128(from_balance - amount),
        )?;
        self.put(
            &keys::token_balance(token, to),
            &keys::encode_u128(to_balance.saturating_add(amount)),
        )
    }

    /// Approved allowance of `spender` over `owner`'s balance.
    fn allowance(&self, token: TokenId, owner: &Address, spender: &Address) -> u128 {
        self.get(&keys::allowance(token, owner, spender))
            .map(|bytes| keys::decode_u128(&bytes))
            .unwrap_or(0)
    }

    /// Set the allowance of `spender` over `owner`'s balance.
    fn approve(
        &mut self,
        token: TokenId,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> LedgerResult<()> {
        self.put(
            &keys::allowance(token, owner, spender),
            &keys::encode_u128(amount),
        )
    }

    /// Spend from an allowance and transfer.
    fn transfer_from(
        &mut self,
        token: TokenId,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: u128,
    ) -> LedgerResult<()> {
        let allowed = self.allowance(token, owner, spender);
        if allowed < amount {
            return Err(LedgerError::Unauthorized(format!(
                "allowance {allowed} below {amount}"
            )));
        }
        self.token_transfer(token, owner, to, amount)?;
        self.put(
            &keys::allowance(token, owner, spender),
            &keys::encode_u128(allowed - amount),
        )
    }

    // -------------------------------------------------------------------------
    // ACCOUNTS
    // -------------------------------------------------------------------------

    /// Current nonce of an account.
    fn account_nonce(&self, address: &Address) -> u64 {
        self.get(&keys::account_nonce(address))
            .map(|bytes| keys::decode_u64(&bytes))
            .unwrap_or(0)
    }

    /// Advance an account nonce by one.
    fn bump_account_nonce(&mut self, address: &Address) -> LedgerResult<u64> {
        let next = self.account_nonce(address) + 1;
        self.put(&keys::account_nonce(address), &keys::encode_u64(next))?;
        Ok(next)
    }

    // -------------------------------------------------------------------------
    // UTXO
    // -------------------------------------------------------------------------

    /// Fetch an unspent output.
    fn utxo_get(&self, tx_hash: &Hash, output_index: u32) -> Option<Utxo> {
        self.get(&keys::utxo(tx_hash, output_index))
            .and_then(|bytes| canonical_decode(&bytes).ok())
    }

    /// Insert an unspent output.
    fn utxo_insert(&mut self, utxo: &Utxo) -> LedgerResult<()> {
        self.put(
            &keys::utxo(&utxo.outpoint.tx_hash, utxo.outpoint.output_index),
            &canonical_encode(utxo)?,
        )
    }

    /// Remove a spent output; missing outputs are an error.
    fn utxo_spend(&mut self, tx_hash: &Hash, output_index: u32) -> LedgerResult<Utxo> {
        let utxo = self
            .utxo_get(tx_hash, output_index)
            .ok_or_else(|| LedgerError::NotFound(format!("utxo {}", hex::encode(tx_hash))))?;
        self.delete(&keys::utxo(tx_hash, output_index))?;
        Ok(utxo)
    }

    // -------------------------------------------------------------------------
    // CONTRACTS
    // -------------------------------------------------------------------------

    /// Deploy a contract; the address must be unused.
    fn contract_deploy(&mut self, contract: &Contract, owner: &Address) -> LedgerResult<()> {
        let code_key = keys::contract_code(&contract.address);
        if self.get(&code_key).is_some() {
            return Err(LedgerError::AlreadyExists(format!(
                "contract {}",
                contract.address
            )));
        }
        self.put(&code_key, &contract.bytecode)?;
        self.put(
            &keys::contract_meta(&contract.address),
            &canonical_encode(contract)?,
        )?;
        self.put(&keys::contract_owner(&contract.address), owner.as_bytes())?;
        self.put(&keys::contract_paused(&contract.address), &[0u8])
    }

    /// Fetch a contract record.
    fn contract_get(&self, address: &Address) -> Option<Contract> {
        self.get(&keys::contract_meta(address))
            .and_then(|bytes| canonical_decode(&bytes).ok())
    }

    /// Contract bytecode, if deployed.
    fn contract_code(&self, address: &Address) -> Option<Vec<u8>> {
        self.get(&keys::contract_code(address))
    }

    /// SHA-256 of the deployed bytecode.
    fn contract_code_hash(&self, address: &Address) -> Option<Hash> {
        self.contract_code(address).map(|code| sha256(&code))
    }

    /// Whether the contract is paused.
    fn contract_paused(&self, address: &Address) -> bool {
        self.get(&keys::contract_paused(address))
            .map(|bytes| bytes == [1u8])
            .unwrap_or(false)
    }

    /// Pause or resume a contract; only the owner may.
    fn contract_set_paused(
        &mut self,
        address: &Address,
        caller: &Address,
        paused: bool,
    ) -> LedgerResult<()> {
        self.require_contract_owner(address, caller)?;
        self.put(&keys::contract_paused(address), &[u8::from(paused)])
    }

    /// Replace bytecode through the management path. The address and the
    /// paused flag are preserved.
    fn contract_upgrade(
        &mut self,
        address: &Address,
        caller: &Address,
        bytecode: Vec<u8>,
        abi: Vec<u8>,
    ) -> LedgerResult<()> {
        self.require_contract_owner(address, caller)?;
        let mut contract = self
            .contract_get(address)
            .ok_or_else(|| LedgerError::NotFound(format!("contract {address}")))?;
        contract.bytecode = bytecode;
        contract.abi = abi;
        self.put(&keys::contract_code(address), &contract.bytecode)?;
        self.put(&keys::contract_meta(address), &canonical_encode(&contract)?)
    }

    /// Schedule a selfdestruct; deletion happens when the enclosing frame
    /// commits.
    fn contract_selfdestruct(&mut self, address: &Address, caller: &Address) -> LedgerResult<()> {
        self.require_contract_owner(address, caller)?;
        self.put(&keys::contract_destroy(address), &[1u8])
    }

    /// Owner check used by the management operations.
    fn require_contract_owner(&self, address: &Address, caller: &Address) -> LedgerResult<()> {
        let owner = self
            .get(&keys::contract_owner(address))
            .ok_or_else(|| LedgerError::NotFound(format!("contract {address}")))?;
        if owner != caller.as_bytes() {
            return Err(LedgerError::Unauthorized(format!(
                "{caller} is not the owner of {address}"
            )));
        }
        Ok(())
    }

    /// Charge storage rent for `bytes` held by `address` at `rate_per_byte`
    /// (base-currency units per byte); collected into `collector`.
    fn charge_storage_rent(
        &mut self,
        address: &Address,
        bytes: u64,
        rate_per_byte: u128,
        collector: &Address,
    ) -> LedgerResult<u128> {
        let due = rate_per_byte.saturating_mul(bytes as u128);
        if due > 0 {
            self.token_transfer(TokenId::SYN, address, collector, due)?;
        }
        Ok(due)
    }

    // -------------------------------------------------------------------------
    // LOGS
    // -------------------------------------------------------------------------

    /// Append an event record to the pending block's log list.
    fn emit_log(&mut self, log: &Log) -> LedgerResult<()> {
        let seq = self.prefix_iter(PENDING_LOG_PREFIX).count() as u64;
        let mut key = PENDING_LOG_PREFIX.to_vec();
        key.extend_from_slice(&seq.to_be_bytes());
        self.put(&key, &canonical_encode(log)?)
    }
}

/// Drain the pending log list, in emission order.
pub(crate) fn drain_pending_logs(state: &mut dyn StateRW) -> LedgerResult<Vec<Log>> {
    let entries: Vec<(Vec<u8>, Vec<u8>)> = state.prefix_iter(PENDING_LOG_PREFIX).collect();
    let mut logs = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        logs.push(canonical_decode(&value)?);
        state.delete(&key)?;
    }
    Ok(logs)
}

// =============================================================================
// AUTHORITATIVE STATE
// =============================================================================

/// The authoritative in-memory state map.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl LedgerState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from snapshot entries.
    pub fn from_entries(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Export every entry (snapshot writes).
    pub fn to_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no keys are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateRW for LedgerState {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> LedgerResult<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> LedgerResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_> {
        let prefix = prefix.to_vec();
        Box::new(
            self.entries
                .range(prefix.clone()..)
                .take_while(move |(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

// =============================================================================
// SNAPSHOT FRAMES
// =============================================================================

/// A copy-on-write overlay over any [`StateRW`].
///
/// Reads fall through to the parent; writes and deletes stay in the
/// overlay until [`SnapshotFrame::into_writes`] hands them to the parent.
/// Dropping the frame discards everything, which is what gives snapshot
/// closures their all-or-nothing behavior. Frames nest: an overlay over
/// an overlay collapses into the outer frame on commit.
pub struct SnapshotFrame<'a> {
    parent: &'a dyn StateRW,
    /// `Some(bytes)` = written, `None` = deleted.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> SnapshotFrame<'a> {
    /// Open a frame over `parent`.
    pub fn new(parent: &'a dyn StateRW) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// The accumulated writes, consumed on commit.
    pub fn into_writes(self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        self.writes.into_iter().collect()
    }

    /// Number of dirty keys in this frame.
    pub fn dirty_len(&self) -> usize {
        self.writes.len()
    }
}

impl StateRW for SnapshotFrame<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(Some(value)) => Some(value.clone()),
            Some(None) => None,
            None => self.parent.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> LedgerResult<()> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> LedgerResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_> {
        // Merge parent entries with overlay writes, overlay winning.
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .parent
            .prefix_iter(prefix)
            .collect();
        for (key, value) in self.writes.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Box::new(merged.into_iter())
    }
}

/// Run `f` inside a nested frame over `state`; merge on `Ok`, discard on
/// `Err`. This is the re-entrant form snapshot closures and VM handlers
/// use for per-transaction atomicity.
pub fn with_frame<T>(
    state: &mut dyn StateRW,
    f: impl FnOnce(&mut dyn StateRW) -> LedgerResult<T>,
) -> LedgerResult<T> {
    let mut frame = SnapshotFrame::new(state);
    let value = f(&mut frame)?;
    let writes = frame.into_writes();
    for (key, write) in writes {
        match write {
            Some(bytes) => state.put(&key, &bytes)?,
            None => state.delete(&key)?,
        }
    }
    Ok(value)
}
