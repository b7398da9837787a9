//! # Gas Schedule and Meter
//!
//! Every catalogued opcode name maps to a fixed base cost, pre-charged by
//! the dispatcher before the handler runs. Names missing from the table
//! fall back to a punitive default and are logged once. Dynamic charges
//! (per-word memory fees, storage rent, call stipends) happen inside
//! handlers through the same meter.

use crate::errors::{VmError, VmResult};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Gas costs for common operation classes.
pub mod costs {
    /// Cheapest operations (context reads).
    pub const BASE: u64 = 2;
    /// Arithmetic and stack shuffles.
    pub const VERY_LOW: u64 = 3;
    /// Multiplication-class arithmetic.
    pub const LOW: u64 = 5;
    /// Hashing base cost.
    pub const HASH: u64 = 30;
    /// Hashing cost per 32-byte word.
    pub const HASH_WORD: u64 = 6;
    /// Storage read.
    pub const SLOAD: u64 = 50;
    /// Storage write.
    pub const SSTORE: u64 = 100;
    /// Balance / token queries.
    pub const ACCOUNT_READ: u64 = 20;
    /// Token transfer.
    pub const TOKEN_TRANSFER: u64 = 200;
    /// Log base cost.
    pub const LOG: u64 = 375;
    /// Log cost per byte of data.
    pub const LOG_DATA: u64 = 8;
    /// Call base cost.
    pub const CALL: u64 = 700;
    /// Selfdestruct.
    pub const SELFDESTRUCT: u64 = 5_000;
    /// Punitive default for names missing from the table.
    pub const PUNITIVE_DEFAULT: u64 = 10_000;
}

/// Frozen name → base-cost table.
pub struct GasTable {
    by_name: HashMap<&'static str, u64>,
    /// Names already warned about, so the punitive fallback logs once.
    warned: Mutex<HashSet<String>>,
}

impl GasTable {
    /// The canonical schedule.
    #[rustfmt::skip]
    pub fn canonical() -> Self {
        let mut by_name = HashMap::new();
        // Arithmetic
        by_name.insert("opADD", costs::VERY_LOW);
        by_name.insert("opSUB", costs::VERY_LOW);
        by_name.insert("opMUL", costs::LOW);
        by_name.insert("opDIV", costs::LOW);
        by_name.insert("opMOD", costs::LOW);
        // Comparison / bitwise
        by_name.insert("opLT", costs::VERY_LOW);
        by_name.insert("opGT", costs::VERY_LOW);
        by_name.insert("opEQ", costs::VERY_LOW);
        by_name.insert("opISZERO", costs::VERY_LOW);
        by_name.insert("opAND", costs::VERY_LOW);
        by_name.insert("opOR", costs::VERY_LOW);
        by_name.insert("opXOR", costs::VERY_LOW);
        by_name.insert("opNOT", costs::VERY_LOW);
        // Stack / memory
        by_name.insert("opPOP", costs::BASE);
        by_name.insert("opPUSH0", costs::BASE);
        by_name.insert("opDUP1", costs::VERY_LOW);
        by_name.insert("opSWAP1", costs::VERY_LOW);
        by_name.insert("opMLOAD", costs::VERY_LOW);
        by_name.insert("opMSTORE", costs::VERY_LOW);
        by_name.insert("opMSIZE", costs::BASE);
        // Crypto
        by_name.insert("opSHA256", costs::HASH);
        // Context
        by_name.insert("opADDRESS", costs::BASE);
        by_name.insert("opCALLER", costs::BASE);
        by_name.insert("opORIGIN", costs::BASE);
        by_name.insert("opCALLVALUE", costs::BASE);
        by_name.insert("opGASPRICE", costs::BASE);
        by_name.insert("opNUMBER", costs::BASE);
        by_name.insert("opTIMESTAMP", costs::BASE);
        by_name.insert("opCHAINID", costs::BASE);
        by_name.insert("opGAS", costs::BASE);
        // State
        by_name.insert("opSLOAD", costs::SLOAD);
        by_name.insert("opSSTORE", costs::SSTORE);
        by_name.insert("opBALANCE", costs::ACCOUNT_READ);
        by_name.insert("opCODEHASH", costs::ACCOUNT_READ);
        by_name.insert("opRENT", costs::SSTORE);
        // Token
        by_name.insert("opBALANCEOF", costs::ACCOUNT_READ);
        by_name.insert("opTRANSFER", costs::TOKEN_TRANSFER);
        // Logs
        by_name.insert("opLOG0", costs::LOG);
        // System
        by_name.insert("opSTOP", 0);
        by_name.insert("opRETURN", 0);
        by_name.insert("opREVERT", 0);
        by_name.insert("opCALL", costs::CALL);
        by_name.insert("opDELEGATECALL", costs::CALL);
        by_name.insert("opSTATICCALL", costs::CALL);
        by_name.insert("opSELFDESTRUCT", costs::SELFDESTRUCT);

        Self {
            by_name,
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Base cost for an opcode name. Unknown names cost the punitive
    /// default and are logged once.
    pub fn cost(&self, name: &str) -> u64 {
        match self.by_name.get(name) {
            Some(cost) => *cost,
            None => {
                let mut warned = self.warned.lock().expect("gas table lock poisoned");
                if warned.insert(name.to_string()) {
                    tracing::warn!(name, cost = costs::PUNITIVE_DEFAULT, "Opcode missing from gas table");
                }
                costs::PUNITIVE_DEFAULT
            }
        }
    }
}

/// Per-execution gas accounting.
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: u64,
    used: u64,
    refunded: u64,
}

impl GasMeter {
    /// Fresh meter over `limit` gas.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: 0,
            refunded: 0,
        }
    }

    /// Gas not yet consumed.
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Gas consumed so far.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Accumulated refund.
    pub fn refunded(&self) -> u64 {
        self.refunded
    }

    /// Charge `amount` gas.
    ///
    /// # Errors
    ///
    /// `OutOfGas` when the charge exceeds the remainder; the meter is
    /// left drained so partial execution cannot continue.
    pub fn consume(&mut self, amount: u64) -> VmResult<()> {
        if amount > self.remaining() {
            let remaining = self.remaining();
            self.used = self.limit;
            return Err(VmError::OutOfGas {
                needed: amount,
                remaining,
            });
        }
        self.used += amount;
        Ok(())
    }

    /// Record a refund; capped at the gas actually used at settlement.
    pub fn refund(&mut self, amount: u64) {
        self.refunded = self.refunded.saturating_add(amount);
    }

    /// Gas owed at settlement: used minus the capped refund.
    pub fn settled(&self) -> u64 {
        self.used - self.refunded.min(self.used / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_costs() {
        let table = GasTable::canonical();
        assert_eq!(table.cost("opADD"), 3);
        assert_eq!(table.cost("opSTOP"), 0);
        assert_eq!(table.cost("opSSTORE"), costs::SSTORE);
    }

    #[test]
    fn test_unknown_name_is_punitive() {
        let table = GasTable::canonical();
        assert_eq!(table.cost("opMYSTERY"), costs::PUNITIVE_DEFAULT);
        // Second lookup takes the warned path without logging again.
        assert_eq!(table.cost("opMYSTERY"), costs::PUNITIVE_DEFAULT);
    }

    #[test]
    fn test_every_catalogued_name_has_a_cost() {
        let table = GasTable::canonical();
        for (name, _) in crate::opcode::CATALOGUE {
            assert!(
                table.by_name.contains_key(name),
                "{name} missing from gas table"
            );
        }
    }

    #[test]
    fn test_meter_consume_and_remaining() {
        let mut meter = GasMeter::new(10);
        meter.consume(3).unwrap();
        meter.consume(4).unwrap();
        assert_eq!(meter.remaining(), 3);
        assert_eq!(meter.used(), 7);
    }

    #[test]
    fn test_meter_out_of_gas_drains() {
        let mut meter = GasMeter::new(2);
        let err = meter.consume(3).unwrap_err();
        assert!(matches!(
            err,
            VmError::OutOfGas {
                needed: 3,
                remaining: 2
            }
        ));
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_refund_capped_at_half_used() {
        let mut meter = GasMeter::new(100);
        meter.consume(60).unwrap();
        meter.refund(50);
        assert_eq!(meter.settled(), 30);
    }
}
