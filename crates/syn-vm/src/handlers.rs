//! Built-in opcode handlers.
//!
//! Handlers assume the dispatcher already charged the base cost; dynamic
//! charges (memory expansion, per-byte log fees, child-call gas) go
//! through the context meter here. State-writing handlers honor the
//! `read_only` flag set by static calls.

use crate::context::{ExecutionContext, MessageInfo};
use crate::dispatcher::{Dispatcher, Flow, Handler};
use crate::errors::{VmError, VmResult};
use crate::gas::{costs, GasMeter};
use crate::memory::WORD_SIZE;
use crate::stack::Stack;
use primitive_types::U256;
use shared_crypto::sha256;
use shared_types::{Log, TokenId};
use syn_ledger::{keys, CallKind, SnapshotFrame, StateRW};

/// Maximum nested call depth.
pub const MAX_CALL_DEPTH: u32 = 64;

/// Resolve the handler for a catalogued name.
///
/// # Errors
///
/// `UnknownOpcodeName` when no handler exists — the catalogue and this
/// table must stay in lockstep.
pub fn handler_for(name: &str) -> VmResult<Handler> {
    Ok(match name {
        "opADD" => op_add,
        "opSUB" => op_sub,
        "opMUL" => op_mul,
        "opDIV" => op_div,
        "opMOD" => op_mod,
        "opLT" => op_lt,
        "opGT" => op_gt,
        "opEQ" => op_eq,
        "opISZERO" => op_iszero,
        "opAND" => op_and,
        "opOR" => op_or,
        "opXOR" => op_xor,
        "opNOT" => op_not,
        "opPOP" => op_pop,
        "opPUSH0" => op_push0,
        "opDUP1" => op_dup1,
        "opSWAP1" => op_swap1,
        "opMLOAD" => op_mload,
        "opMSTORE" => op_mstore,
        "opMSIZE" => op_msize,
        "opSHA256" => op_sha256,
        "opADDRESS" => op_address,
        "opCALLER" => op_caller,
        "opORIGIN" => op_origin,
        "opCALLVALUE" => op_callvalue,
        "opGASPRICE" => op_gasprice,
        "opNUMBER" => op_number,
        "opTIMESTAMP" => op_timestamp,
        "opCHAINID" => op_chainid,
        "opGAS" => op_gas,
        "opSLOAD" => op_sload,
        "opSSTORE" => op_sstore,
        "opBALANCE" => op_balance,
        "opCODEHASH" => op_codehash,
        "opRENT" => op_rent,
        "opBALANCEOF" => op_balanceof,
        "opTRANSFER" => op_transfer,
        "opLOG0" => op_log0,
        "opSTOP" => op_stop,
        "opRETURN" => op_return,
        "opREVERT" => op_revert,
        "opCALL" => op_call,
        "opDELEGATECALL" => op_delegatecall,
        "opSTATICCALL" => op_staticcall,
        "opSELFDESTRUCT" => op_selfdestruct,
        _ => return Err(VmError::UnknownOpcodeName(name.to_string())),
    })
}

fn storage_key(contract: &shared_types::Address, slot: U256) -> Vec<u8> {
    let mut word = [0u8; 32];
    slot.to_big_endian(&mut word);
    format!(
        "storage:{}:{}",
        hex::encode(contract.as_bytes()),
        hex::encode(word)
    )
    .into_bytes()
}

fn pop_usize(stack: &mut Stack) -> VmResult<usize> {
    let word = stack.pop()?;
    Ok(word.low_u64() as usize)
}

fn require_writable(ctx: &ExecutionContext<'_>) -> VmResult<()> {
    if ctx.read_only {
        return Err(VmError::StaticViolation);
    }
    Ok(())
}

fn charge_memory_growth(ctx: &mut ExecutionContext<'_>, new_words: usize) -> VmResult<()> {
    if new_words > 0 {
        ctx.meter.consume(costs::VERY_LOW * new_words as u64)?;
    }
    Ok(())
}

// =============================================================================
// ARITHMETIC
// =============================================================================

fn binary_op(
    ctx: &mut ExecutionContext<'_>,
    f: impl FnOnce(U256, U256) -> U256,
) -> VmResult<Flow> {
    let a = ctx.stack.pop()?;
    let b = ctx.stack.pop()?;
    ctx.stack.push(f(a, b))?;
    Ok(Flow::Continue)
}

fn op_add(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| a.overflowing_add(b).0)
}

fn op_sub(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| a.overflowing_sub(b).0)
}

fn op_mul(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| a.overflowing_mul(b).0)
}

fn op_div(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| if b.is_zero() { U256::zero() } else { a / b })
}

fn op_mod(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| if b.is_zero() { U256::zero() } else { a % b })
}

// =============================================================================
// COMPARISON / BITWISE
// =============================================================================

fn bool_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

fn op_lt(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| bool_word(a < b))
}

fn op_gt(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| bool_word(a > b))
}

fn op_eq(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| bool_word(a == b))
}

fn op_iszero(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let a = ctx.stack.pop()?;
    ctx.stack.push(bool_word(a.is_zero()))?;
    Ok(Flow::Continue)
}

fn op_and(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| a & b)
}

fn op_or(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| a | b)
}

fn op_xor(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    binary_op(ctx, |a, b| a ^ b)
}

fn op_not(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let a = ctx.stack.pop()?;
    ctx.stack.push(!a)?;
    Ok(Flow::Continue)
}

// =============================================================================
// STACK / MEMORY
// =============================================================================

fn op_pop(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.pop()?;
    Ok(Flow::Continue)
}

fn op_push0(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::zero())?;
    Ok(Flow::Continue)
}

fn op_dup1(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.dup_top()?;
    Ok(Flow::Continue)
}

fn op_swap1(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.swap_top()?;
    Ok(Flow::Continue)
}

fn op_mload(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let offset = pop_usize(&mut ctx.stack)?;
    let grown = ctx.memory.expand(offset.saturating_add(WORD_SIZE))?;
    charge_memory_growth(ctx, grown)?;
    let word = ctx.memory.read_word(offset);
    ctx.stack.push(U256::from_big_endian(&word))?;
    Ok(Flow::Continue)
}

fn op_mstore(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let offset = pop_usize(&mut ctx.stack)?;
    let value = ctx.stack.pop()?;
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    let grown = ctx.memory.write_word(offset, &word)?;
    charge_memory_growth(ctx, grown)
        .map(|()| Flow::Continue)
}

fn op_msize(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::from(ctx.memory.len()))?;
    Ok(Flow::Continue)
}

// =============================================================================
// CRYPTO
// =============================================================================

fn op_sha256(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let offset = pop_usize(&mut ctx.stack)?;
    let len = pop_usize(&mut ctx.stack)?;
    let words = len.div_ceil(WORD_SIZE) as u64;
    ctx.meter.consume(costs::HASH_WORD * words)?;
    let data = ctx.memory.read_bytes(offset, len);
    ctx.stack.push(U256::from_big_endian(&sha256(&data)))?;
    Ok(Flow::Continue)
}

// =============================================================================
// CONTEXT
// =============================================================================

fn op_address(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let word = ExecutionContext::address_word(&ctx.msg.contract);
    ctx.stack.push(word)?;
    Ok(Flow::Continue)
}

fn op_caller(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let word = ExecutionContext::address_word(&ctx.msg.caller);
    ctx.stack.push(word)?;
    Ok(Flow::Continue)
}

fn op_origin(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let word = ExecutionContext::address_word(&ctx.msg.origin);
    ctx.stack.push(word)?;
    Ok(Flow::Continue)
}

fn op_callvalue(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::from(ctx.msg.value))?;
    Ok(Flow::Continue)
}

fn op_gasprice(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::from(ctx.msg.gas_price))?;
    Ok(Flow::Continue)
}

fn op_number(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::from(ctx.msg.block_height))?;
    Ok(Flow::Continue)
}

fn op_timestamp(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::from(ctx.msg.timestamp_ms))?;
    Ok(Flow::Continue)
}

fn op_chainid(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::from(ctx.msg.chain_id))?;
    Ok(Flow::Continue)
}

fn op_gas(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    ctx.stack.push(U256::from(ctx.meter.remaining()))?;
    Ok(Flow::Continue)
}

// =============================================================================
// STATE
// =============================================================================

fn op_sload(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let slot = ctx.stack.pop()?;
    let key = storage_key(&ctx.msg.contract, slot);
    let value = ctx
        .state
        .get(&key)
        .map(|bytes| U256::from_big_endian(&bytes))
        .unwrap_or_default();
    ctx.stack.push(value)?;
    Ok(Flow::Continue)
}

fn op_sstore(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    require_writable(ctx)?;
    let slot = ctx.stack.pop()?;
    let value = ctx.stack.pop()?;
    let key = storage_key(&ctx.msg.contract, slot);
    if value.is_zero() {
        if ctx.state.get(&key).is_some() {
            ctx.meter.refund(costs::SSTORE / 2);
        }
        ctx.state.delete(&key)?;
    } else {
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        ctx.state.put(&key, &word)?;
    }
    Ok(Flow::Continue)
}

fn op_balance(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let address = ExecutionContext::word_address(ctx.stack.pop()?);
    let balance = ctx.state.token_balance(TokenId::SYN, &address);
    ctx.stack.push(U256::from(balance))?;
    Ok(Flow::Continue)
}

fn op_codehash(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let address = ExecutionContext::word_address(ctx.stack.pop()?);
    let word = ctx
        .state
        .contract_code_hash(&address)
        .map(|hash| U256::from_big_endian(&hash))
        .unwrap_or_default();
    ctx.stack.push(word)?;
    Ok(Flow::Continue)
}

fn op_rent(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    require_writable(ctx)?;
    let bytes = ctx.stack.pop()?.low_u64();
    let rate = ctx.stack.pop()?.low_u128();
    // Rent is burned from the executing contract's balance.
    let due = rate.saturating_mul(bytes as u128);
    if due > 0 {
        ctx.state.token_burn(TokenId::SYN, &ctx.msg.contract, due)?;
    }
    ctx.stack.push(U256::from(due))?;
    Ok(Flow::Continue)
}

// =============================================================================
// TOKENS
// =============================================================================

fn op_balanceof(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let token = TokenId(ctx.stack.pop()?.low_u32());
    let address = ExecutionContext::word_address(ctx.stack.pop()?);
    let balance = ctx.state.token_balance(token, &address);
    ctx.stack.push(U256::from(balance))?;
    Ok(Flow::Continue)
}

fn op_transfer(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    require_writable(ctx)?;
    let token = TokenId(ctx.stack.pop()?.low_u32());
    let to = ExecutionContext::word_address(ctx.stack.pop()?);
    let amount = ctx.stack.pop()?.low_u128();
    let from = ctx.msg.contract;
    ctx.state.token_transfer(token, &from, &to, amount)?;
    Ok(Flow::Continue)
}

// =============================================================================
// LOGS
// =============================================================================

fn op_log0(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    require_writable(ctx)?;
    let offset = pop_usize(&mut ctx.stack)?;
    let len = pop_usize(&mut ctx.stack)?;
    ctx.meter.consume(costs::LOG_DATA * len as u64)?;
    let data = ctx.memory.read_bytes(offset, len);
    let log = Log {
        address: ctx.msg.contract,
        topics: Vec::new(),
        data,
        block_height: ctx.msg.block_height,
        tx_hash: [0u8; 32],
    };
    ctx.state.emit_log(&log)?;
    Ok(Flow::Continue)
}

// =============================================================================
// SYSTEM
// =============================================================================

fn op_stop(_: &Dispatcher, _: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    Ok(Flow::Stop)
}

fn op_return(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let offset = pop_usize(&mut ctx.stack)?;
    let len = pop_usize(&mut ctx.stack)?;
    Ok(Flow::Return(ctx.memory.read_bytes(offset, len)))
}

fn op_revert(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    let offset = pop_usize(&mut ctx.stack)?;
    let len = pop_usize(&mut ctx.stack)?;
    Ok(Flow::Revert(ctx.memory.read_bytes(offset, len)))
}

fn op_call(d: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    nested_call(d, ctx, CallKind::Internal)
}

fn op_delegatecall(d: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    nested_call(d, ctx, CallKind::Delegated)
}

fn op_staticcall(d: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    nested_call(d, ctx, CallKind::Static)
}

/// Shared machinery for the three call kinds. The child runs over a
/// nested snapshot frame; its writes merge into the caller's frame only
/// on success. The caller pays the child's gas and receives a success
/// flag on the stack.
fn nested_call(d: &Dispatcher, ctx: &mut ExecutionContext<'_>, kind: CallKind) -> VmResult<Flow> {
    let target = ExecutionContext::word_address(ctx.stack.pop()?);
    let in_offset = pop_usize(&mut ctx.stack)?;
    let in_len = pop_usize(&mut ctx.stack)?;

    if ctx.depth >= MAX_CALL_DEPTH {
        return Err(VmError::CallDepthExceeded);
    }
    let code = ctx
        .state
        .contract_code(&target)
        .ok_or_else(|| VmError::InvalidCallTarget(format!("no code at {target}")))?;
    if ctx.state.contract_paused(&target) {
        return Err(VmError::InvalidCallTarget(format!("{target} is paused")));
    }

    let input = ctx.memory.read_bytes(in_offset, in_len);
    let (caller, contract) = match kind {
        CallKind::Delegated => (ctx.msg.caller, ctx.msg.contract),
        CallKind::Internal | CallKind::Static => (ctx.msg.contract, target),
    };
    let child_gas = ctx.meter.remaining() - ctx.meter.remaining() / 64;
    let child_msg = MessageInfo {
        caller,
        origin: ctx.msg.origin,
        contract,
        value: 0,
        gas_price: ctx.msg.gas_price,
        gas_limit: child_gas,
        block_height: ctx.msg.block_height,
        timestamp_ms: ctx.msg.timestamp_ms,
        chain_id: ctx.msg.chain_id,
    };
    let read_only = ctx.read_only || kind == CallKind::Static;
    let depth = ctx.depth + 1;

    let (result, child_used, writes) = {
        let mut frame = SnapshotFrame::new(&*ctx.state);
        let mut child = ExecutionContext {
            msg: child_msg,
            stack: Stack::new(),
            memory: crate::memory::Memory::new(),
            meter: GasMeter::new(child_gas),
            state: &mut frame,
            input,
            depth,
            read_only,
        };
        let result = d.execute(&code, &mut child);
        let used = child.meter.used();
        drop(child);
        (result, used, frame.into_writes())
    };

    ctx.meter.consume(child_used)?;
    match result {
        Ok(_output) => {
            if kind != CallKind::Static {
                for (key, write) in writes {
                    match write {
                        Some(bytes) => ctx.state.put(&key, &bytes)?,
                        None => ctx.state.delete(&key)?,
                    }
                }
            }
            ctx.stack.push(U256::one())?;
        }
        Err(_) => {
            // Child failure rolls its writes back and surfaces as a zero
            // success flag; the caller continues.
            ctx.stack.push(U256::zero())?;
        }
    }
    Ok(Flow::Continue)
}

fn op_selfdestruct(_: &Dispatcher, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
    require_writable(ctx)?;
    // The executing contract schedules its own deletion; it happens when
    // the enclosing frame commits.
    let marker = keys::contract_destroy(&ctx.msg.contract);
    ctx.state.put(&marker, &[1u8])?;
    Ok(Flow::Stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::to_bytecode;
    use shared_types::{Address, Contract};
    use syn_ledger::{LedgerState, TokenMeta};

    fn msg(contract: Address, gas_limit: u64) -> MessageInfo {
        MessageInfo {
            caller: Address([1u8; 20]),
            origin: Address([1u8; 20]),
            contract,
            value: 5,
            gas_price: 2,
            gas_limit,
            block_height: 9,
            timestamp_ms: 1_234,
            chain_id: 77,
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new().unwrap()
    }

    #[test]
    fn test_arithmetic_wraps() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(Address([2u8; 20]), 1_000), &mut state);

        ctx.stack.push(U256::one()).unwrap();
        ctx.stack.push(U256::MAX).unwrap();
        d.dispatch_name("opADD", &mut ctx).unwrap();
        assert_eq!(ctx.stack.pop().unwrap(), U256::zero());
    }

    #[test]
    fn test_div_by_zero_is_zero() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(Address([2u8; 20]), 1_000), &mut state);

        ctx.stack.push(U256::zero()).unwrap();
        ctx.stack.push(U256::from(10)).unwrap();
        d.dispatch_name("opDIV", &mut ctx).unwrap();
        assert_eq!(ctx.stack.pop().unwrap(), U256::zero());
    }

    #[test]
    fn test_sstore_sload_roundtrip() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let contract = Address([2u8; 20]);
        let mut ctx = ExecutionContext::new(msg(contract, 10_000), &mut state);

        // opSSTORE pops slot then value.
        ctx.stack.push(U256::from(99)).unwrap(); // value
        ctx.stack.push(U256::from(7)).unwrap(); // slot
        d.dispatch_name("opSSTORE", &mut ctx).unwrap();

        ctx.stack.push(U256::from(7)).unwrap();
        d.dispatch_name("opSLOAD", &mut ctx).unwrap();
        assert_eq!(ctx.stack.pop().unwrap(), U256::from(99));
    }

    #[test]
    fn test_sstore_rejected_in_static_context() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(Address([2u8; 20]), 10_000), &mut state);
        ctx.read_only = true;

        ctx.stack.push(U256::from(99)).unwrap();
        ctx.stack.push(U256::from(7)).unwrap();
        assert!(matches!(
            d.dispatch_name("opSSTORE", &mut ctx),
            Err(VmError::StaticViolation)
        ));
    }

    #[test]
    fn test_context_queries() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let contract = Address([2u8; 20]);
        let mut ctx = ExecutionContext::new(msg(contract, 1_000), &mut state);

        d.dispatch_name("opNUMBER", &mut ctx).unwrap();
        assert_eq!(ctx.stack.pop().unwrap(), U256::from(9));

        d.dispatch_name("opCHAINID", &mut ctx).unwrap();
        assert_eq!(ctx.stack.pop().unwrap(), U256::from(77));

        d.dispatch_name("opADDRESS", &mut ctx).unwrap();
        assert_eq!(
            ExecutionContext::word_address(ctx.stack.pop().unwrap()),
            contract
        );
    }

    #[test]
    fn test_token_transfer_moves_balance() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        state.register_token(&TokenMeta::base_currency()).unwrap();
        let contract = Address([2u8; 20]);
        let to = Address([3u8; 20]);
        state.token_mint(TokenId::SYN, &contract, 500).unwrap();

        let mut ctx = ExecutionContext::new(msg(contract, 10_000), &mut state);
        ctx.stack.push(U256::from(200)).unwrap(); // amount
        ctx.stack
            .push(ExecutionContext::address_word(&to))
            .unwrap(); // to
        ctx.stack.push(U256::from(TokenId::SYN.0)).unwrap(); // token
        d.dispatch_name("opTRANSFER", &mut ctx).unwrap();

        assert_eq!(state.token_balance(TokenId::SYN, &to), 200);
        assert_eq!(state.token_balance(TokenId::SYN, &contract), 300);
    }

    #[test]
    fn test_log0_emits_pending_log() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(Address([2u8; 20]), 10_000), &mut state);

        ctx.memory.write_bytes(0, b"hello").unwrap();
        ctx.stack.push(U256::from(5)).unwrap(); // len
        ctx.stack.push(U256::zero()).unwrap(); // offset
        d.dispatch_name("opLOG0", &mut ctx).unwrap();

        assert_eq!(state.prefix_iter(b"logs:pending:").count(), 1);
    }

    #[test]
    fn test_nested_call_runs_target_code() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let owner = Address([1u8; 20]);
        let target = Address([0xAAu8; 20]);

        // Target bytecode: opPUSH0, opSTOP.
        let mut bytecode = Vec::new();
        bytecode.extend_from_slice(&to_bytecode("opPUSH0").unwrap());
        bytecode.extend_from_slice(&to_bytecode("opSTOP").unwrap());
        state
            .contract_deploy(
                &Contract {
                    address: target,
                    deploy_tx_hash: [0u8; 32],
                    deploy_block_height: 1,
                    bytecode,
                    abi: Vec::new(),
                    metadata: Vec::new(),
                },
                &owner,
            )
            .unwrap();

        let mut ctx = ExecutionContext::new(msg(Address([2u8; 20]), 100_000), &mut state);
        ctx.stack.push(U256::zero()).unwrap(); // in_len
        ctx.stack.push(U256::zero()).unwrap(); // in_offset
        ctx.stack
            .push(ExecutionContext::address_word(&target))
            .unwrap();
        d.dispatch_name("opCALL", &mut ctx).unwrap();

        assert_eq!(ctx.stack.pop().unwrap(), U256::one(), "call succeeded");
    }

    #[test]
    fn test_call_to_missing_contract_fails() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(Address([2u8; 20]), 100_000), &mut state);

        ctx.stack.push(U256::zero()).unwrap();
        ctx.stack.push(U256::zero()).unwrap();
        ctx.stack
            .push(ExecutionContext::address_word(&Address([0xEEu8; 20])))
            .unwrap();
        assert!(matches!(
            d.dispatch_name("opCALL", &mut ctx),
            Err(VmError::InvalidCallTarget(_))
        ));
    }

    #[test]
    fn test_selfdestruct_schedules_marker() {
        let d = dispatcher();
        let mut state = LedgerState::new();
        let contract = Address([2u8; 20]);
        let mut ctx = ExecutionContext::new(msg(contract, 100_000), &mut state);

        let flow = d.dispatch_name("opSELFDESTRUCT", &mut ctx).unwrap();
        assert_eq!(flow, Flow::Stop);
        assert!(state.get(&keys::contract_destroy(&contract)).is_some());
    }
}
