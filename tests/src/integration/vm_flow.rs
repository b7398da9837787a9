//! VM gas-exhaustion and snapshot-rollback scenarios.

use primitive_types::U256;
use shared_types::{Address, TokenId};
use syn_ledger::{LedgerError, LedgerResult, LedgerState, StateRW};
use syn_vm::{Dispatcher, ExecutionContext, MessageInfo, VmError};

fn message(gas_limit: u64) -> MessageInfo {
    MessageInfo {
        caller: Address([1u8; 20]),
        origin: Address([1u8; 20]),
        contract: Address([2u8; 20]),
        value: 0,
        gas_price: 1,
        gas_limit,
        block_height: 1,
        timestamp_ms: 0,
        chain_id: 1,
    }
}

/// Scenario: opcode gas exhaustion. `opADD` pre-charges 3 gas; a 2-gas
/// context fails with `OutOfGas` and mutates nothing.
#[test]
fn test_opcode_gas_exhaustion() {
    let dispatcher = Dispatcher::new().unwrap();
    let mut state = LedgerState::new();
    state.put(b"sentinel", b"untouched").unwrap();

    let mut ctx = ExecutionContext::new(message(2), &mut state);
    ctx.stack.push(U256::from(1)).unwrap();
    ctx.stack.push(U256::from(2)).unwrap();

    let err = dispatcher.dispatch_name("opADD", &mut ctx).unwrap_err();
    assert!(matches!(
        err,
        VmError::OutOfGas {
            needed: 3,
            remaining: 2
        }
    ));
    assert_eq!(state.get(b"sentinel"), Some(b"untouched".to_vec()));
}

/// Scenario: snapshot rollback. A closure credits an account by 100 and
/// fails; the post-state balance equals the pre-state balance exactly.
#[test]
fn test_snapshot_rollback_restores_balance() {
    let mut state = LedgerState::new();
    state
        .register_token(&syn_ledger::TokenMeta::base_currency())
        .unwrap();
    let account = Address([5u8; 20]);
    state.token_mint(TokenId::SYN, &account, 250).unwrap();
    let before = state.to_entries();

    let result: LedgerResult<()> = syn_ledger::with_frame(&mut state, |frame| {
        frame.token_mint(TokenId::SYN, &account, 100)?;
        assert_eq!(frame.token_balance(TokenId::SYN, &account), 350);
        Err(LedgerError::InvalidState("deliberate failure".into()))
    });

    assert!(result.is_err());
    assert_eq!(state.token_balance(TokenId::SYN, &account), 250);
    assert_eq!(state.to_entries(), before, "post-state equals pre-state");
}

/// Gas monotonicity across a handler sequence: remaining gas drops by
/// exactly the sum of the base costs.
#[test]
fn test_gas_monotonicity() {
    let dispatcher = Dispatcher::new().unwrap();
    let mut state = LedgerState::new();
    let mut ctx = ExecutionContext::new(message(10_000), &mut state);

    // opPUSH0 = 2, opPUSH0 = 2, opADD = 3, opISZERO = 3
    for name in ["opPUSH0", "opPUSH0", "opADD", "opISZERO"] {
        dispatcher.dispatch_name(name, &mut ctx).unwrap();
    }
    assert_eq!(ctx.meter.used(), 10);
    assert_eq!(ctx.meter.remaining(), 9_990);
}
