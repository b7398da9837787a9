//! VM service: the ledger-facing execution surface.
//!
//! Implements the ledger's `CallDispatcher` hook so delegated/static/
//! internal calls route through the opcode dispatcher, and offers the
//! transaction-level entry point that runs a payload under a revertable
//! frame with gas settlement.

use crate::context::{ExecutionContext, MessageInfo};
use crate::dispatcher::Dispatcher;
use crate::errors::{VmError, VmResult};
use shared_types::{Address, Transaction};
use syn_ledger::{with_frame, CallDispatcher, CallKind, LedgerError, LedgerResult, StateRW};
use tracing::debug;

/// The VM as a node service.
pub struct VmService {
    dispatcher: Dispatcher,
    chain_id: u64,
}

impl VmService {
    /// Build the service; fails on an opcode collision (fatal at boot).
    pub fn new(chain_id: u64) -> VmResult<Self> {
        Ok(Self {
            dispatcher: Dispatcher::new()?,
            chain_id,
        })
    }

    /// The frozen dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Execute a transaction's contract payload over `state`.
    ///
    /// Runs inside a nested frame: on any VM error the frame's writes are
    /// discarded and the error surfaces unchanged. Gas is consumed up to
    /// the failing operation; the settled amount (after the refund cap)
    /// is what fee collection should charge.
    pub fn execute_transaction(
        &self,
        state: &mut dyn StateRW,
        tx: &Transaction,
        block_height: u64,
    ) -> VmResult<Vec<u8>> {
        let contract = tx
            .contract
            .ok_or_else(|| VmError::InvalidCallTarget("transaction has no contract".into()))?;
        let code = state
            .contract_code(&contract)
            .ok_or_else(|| VmError::InvalidCallTarget(format!("no code at {contract}")))?;

        let msg = MessageInfo {
            caller: tx.from,
            origin: tx.from,
            contract,
            value: tx.value,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            block_height,
            timestamp_ms: tx.timestamp_ms,
            chain_id: self.chain_id,
        };
        let input = tx
            .payload
            .as_ref()
            .map(|p| p.data.clone())
            .unwrap_or_default();

        let mut gas_used = 0u64;
        let mut vm_error: Option<VmError> = None;
        let result = with_frame(state, |frame| {
            let mut ctx = ExecutionContext::new(msg.clone(), frame).with_input(input.clone());
            let output = self.dispatcher.execute(&code, &mut ctx);
            gas_used = ctx.meter.settled();
            output.map_err(|e| {
                let discard = LedgerError::SnapshotRolledBack(e.to_string());
                vm_error = Some(e);
                discard
            })
        });

        debug!(tx = %tx.id_hex(), gas_used, ok = result.is_ok(), "Executed transaction payload");
        match result {
            Ok(output) => Ok(output),
            // The frame already discarded its writes; surface the original
            // VM error kind unchanged.
            Err(discard) => Err(vm_error.unwrap_or(VmError::State(discard))),
        }
    }
}

impl CallDispatcher for VmService {
    fn dispatch(
        &self,
        kind: CallKind,
        state: &mut dyn StateRW,
        target: Address,
        input: &[u8],
        gas: u64,
    ) -> LedgerResult<Vec<u8>> {
        let code = state
            .contract_code(&target)
            .ok_or_else(|| LedgerError::NotFound(format!("contract {target}")))?;

        let msg = MessageInfo {
            caller: Address::ZERO,
            origin: Address::ZERO,
            contract: target,
            value: 0,
            gas_price: 0,
            gas_limit: gas,
            block_height: 0,
            timestamp_ms: 0,
            chain_id: self.chain_id,
        };
        let mut ctx = ExecutionContext::new(msg, state).with_input(input.to_vec());
        ctx.read_only = kind == CallKind::Static;

        self.dispatcher
            .execute(&code, &mut ctx)
            .map_err(|e| LedgerError::InvalidState(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::to_bytecode;
    use shared_types::Contract;
    use syn_ledger::LedgerState;

    fn deploy(state: &mut LedgerState, address: Address, ops: &[&str]) {
        let mut bytecode = Vec::new();
        for op in ops {
            bytecode.extend_from_slice(&to_bytecode(op).unwrap());
        }
        state
            .contract_deploy(
                &Contract {
                    address,
                    deploy_tx_hash: [0u8; 32],
                    deploy_block_height: 1,
                    bytecode,
                    abi: Vec::new(),
                    metadata: Vec::new(),
                },
                &Address([1u8; 20]),
            )
            .unwrap();
    }

    #[test]
    fn test_dispatch_static_discards_writes() {
        let service = VmService::new(1).unwrap();
        let mut state = LedgerState::new();
        let target = Address([0xAAu8; 20]);
        deploy(&mut state, target, &["opPUSH0", "opSTOP"]);

        let before = state.prefix_iter(b"").count();
        service
            .dispatch(CallKind::Static, &mut state, target, &[], 10_000)
            .unwrap();
        assert_eq!(state.prefix_iter(b"").count(), before);
    }

    #[test]
    fn test_execute_transaction_reverts_frame_on_error() {
        let service = VmService::new(1).unwrap();
        let mut state = LedgerState::new();
        let contract = Address([0xAAu8; 20]);
        // opPOP underflows immediately.
        deploy(&mut state, contract, &["opPOP"]);

        let mut tx = Transaction::transfer(Address([1u8; 20]), contract, 0, 1);
        tx.contract = Some(contract);
        tx.gas_limit = 10_000;

        let before: Vec<_> = state.prefix_iter(b"").collect();
        assert!(service
            .execute_transaction(&mut state, &tx, 1)
            .is_err());
        let after: Vec<_> = state.prefix_iter(b"").collect();
        assert_eq!(before, after, "failed execution left no writes");
    }

    #[test]
    fn test_missing_contract_is_invalid_target() {
        let service = VmService::new(1).unwrap();
        let mut state = LedgerState::new();
        let mut tx = Transaction::transfer(Address([1u8; 20]), Address([9u8; 20]), 0, 1);
        tx.contract = Some(Address([9u8; 20]));

        assert!(matches!(
            service.execute_transaction(&mut state, &tx, 1),
            Err(VmError::InvalidCallTarget(_))
        ));
    }
}
