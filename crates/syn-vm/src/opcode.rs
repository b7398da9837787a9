//! 24-bit opcode words and the frozen catalogue.
//!
//! Format: `0xCCNNNN` — `CC` is the category byte, `NNNN` the ordinal
//! within the category. The catalogue is the single authoritative list of
//! `(name, code)` pairs; the dispatcher freezes it at construction and a
//! duplicate name or code fails the boot.

use crate::errors::{VmError, VmResult};

/// Opcode categories (the `CC` byte).
pub mod category {
    /// Arithmetic over 256-bit words.
    pub const ARITHMETIC: u8 = 0x01;
    /// Comparison and bitwise logic.
    pub const LOGIC: u8 = 0x02;
    /// Stack and memory manipulation.
    pub const STACK_MEMORY: u8 = 0x03;
    /// Hashing.
    pub const CRYPTO: u8 = 0x04;
    /// Execution context queries.
    pub const CONTEXT: u8 = 0x05;
    /// Persistent state access.
    pub const STATE: u8 = 0x06;
    /// Token operations.
    pub const TOKEN: u8 = 0x07;
    /// Event logs.
    pub const LOG: u8 = 0x08;
    /// Calls and control flow.
    pub const SYSTEM: u8 = 0x09;
}

/// A 24-bit opcode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(pub u32);

impl Opcode {
    /// Build from category and ordinal.
    pub const fn new(category: u8, ordinal: u16) -> Self {
        Opcode(((category as u32) << 16) | ordinal as u32)
    }

    /// The category byte.
    pub const fn category(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// The ordinal within the category.
    pub const fn ordinal(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Big-endian 3-byte wire form.
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            (self.0 >> 16) as u8,
            (self.0 >> 8) as u8,
            self.0 as u8,
        ]
    }
}

/// Parse a 3-byte big-endian opcode word.
///
/// # Errors
///
/// `InvalidOpcodeLength` unless exactly 3 bytes are given.
pub fn parse_opcode(bytes: &[u8]) -> VmResult<Opcode> {
    if bytes.len() != 3 {
        return Err(VmError::InvalidOpcodeLength(bytes.len()));
    }
    Ok(Opcode(
        ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32,
    ))
}

/// The frozen opcode catalogue: every externally exposed operation.
#[rustfmt::skip]
pub const CATALOGUE: &[(&str, Opcode)] = &[
    // Arithmetic
    ("opADD",          Opcode::new(category::ARITHMETIC, 0x0001)),
    ("opSUB",          Opcode::new(category::ARITHMETIC, 0x0002)),
    ("opMUL",          Opcode::new(category::ARITHMETIC, 0x0003)),
    ("opDIV",          Opcode::new(category::ARITHMETIC, 0x0004)),
    ("opMOD",          Opcode::new(category::ARITHMETIC, 0x0005)),
    // Comparison / bitwise
    ("opLT",           Opcode::new(category::LOGIC, 0x0001)),
    ("opGT",           Opcode::new(category::LOGIC, 0x0002)),
    ("opEQ",           Opcode::new(category::LOGIC, 0x0003)),
    ("opISZERO",       Opcode::new(category::LOGIC, 0x0004)),
    ("opAND",          Opcode::new(category::LOGIC, 0x0005)),
    ("opOR",           Opcode::new(category::LOGIC, 0x0006)),
    ("opXOR",          Opcode::new(category::LOGIC, 0x0007)),
    ("opNOT",          Opcode::new(category::LOGIC, 0x0008)),
    // Stack / memory
    ("opPOP",          Opcode::new(category::STACK_MEMORY, 0x0001)),
    ("opPUSH0",        Opcode::new(category::STACK_MEMORY, 0x0002)),
    ("opDUP1",         Opcode::new(category::STACK_MEMORY, 0x0003)),
    ("opSWAP1",        Opcode::new(category::STACK_MEMORY, 0x0004)),
    ("opMLOAD",        Opcode::new(category::STACK_MEMORY, 0x0005)),
    ("opMSTORE",       Opcode::new(category::STACK_MEMORY, 0x0006)),
    ("opMSIZE",        Opcode::new(category::STACK_MEMORY, 0x0007)),
    // Crypto
    ("opSHA256",       Opcode::new(category::CRYPTO, 0x0001)),
    // Context
    ("opADDRESS",      Opcode::new(category::CONTEXT, 0x0001)),
    ("opCALLER",       Opcode::new(category::CONTEXT, 0x0002)),
    ("opORIGIN",       Opcode::new(category::CONTEXT, 0x0003)),
    ("opCALLVALUE",    Opcode::new(category::CONTEXT, 0x0004)),
    ("opGASPRICE",     Opcode::new(category::CONTEXT, 0x0005)),
    ("opNUMBER",       Opcode::new(category::CONTEXT, 0x0006)),
    ("opTIMESTAMP",    Opcode::new(category::CONTEXT, 0x0007)),
    ("opCHAINID",      Opcode::new(category::CONTEXT, 0x0008)),
    ("opGAS",          Opcode::new(category::CONTEXT, 0x0009)),
    // State
    ("opSLOAD",        Opcode::new(category::STATE, 0x0001)),
    ("opSSTORE",       Opcode::new(category::STATE, 0x0002)),
    ("opBALANCE",      Opcode::new(category::STATE, 0x0003)),
    ("opCODEHASH",     Opcode::new(category::STATE, 0x0004)),
    ("opRENT",         Opcode::new(category::STATE, 0x0005)),
    // Token
    ("opBALANCEOF",    Opcode::new(category::TOKEN, 0x0001)),
    ("opTRANSFER",     Opcode::new(category::TOKEN, 0x0002)),
    // Logs
    ("opLOG0",         Opcode::new(category::LOG, 0x0001)),
    // System
    ("opSTOP",         Opcode::new(category::SYSTEM, 0x0001)),
    ("opRETURN",       Opcode::new(category::SYSTEM, 0x0002)),
    ("opREVERT",       Opcode::new(category::SYSTEM, 0x0003)),
    ("opCALL",         Opcode::new(category::SYSTEM, 0x0004)),
    ("opDELEGATECALL", Opcode::new(category::SYSTEM, 0x0005)),
    ("opSTATICCALL",   Opcode::new(category::SYSTEM, 0x0006)),
    ("opSELFDESTRUCT", Opcode::new(category::SYSTEM, 0x0007)),
];

/// Look up the wire form of a catalogued name.
///
/// # Errors
///
/// `UnknownOpcodeName` when the name is not in the catalogue.
pub fn to_bytecode(name: &str) -> VmResult<[u8; 3]> {
    CATALOGUE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| code.to_bytes())
        .ok_or_else(|| VmError::UnknownOpcodeName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_layout() {
        let op = Opcode::new(0xAB, 0x1234);
        assert_eq!(op.0, 0xAB1234);
        assert_eq!(op.category(), 0xAB);
        assert_eq!(op.ordinal(), 0x1234);
    }

    #[test]
    fn test_parse_requires_three_bytes() {
        assert!(matches!(
            parse_opcode(&[1, 2]),
            Err(VmError::InvalidOpcodeLength(2))
        ));
        assert!(matches!(
            parse_opcode(&[1, 2, 3, 4]),
            Err(VmError::InvalidOpcodeLength(4))
        ));
        assert_eq!(parse_opcode(&[0x01, 0x00, 0x01]).unwrap(), Opcode(0x010001));
    }

    #[test]
    fn test_wire_roundtrip_for_every_name() {
        for (name, code) in CATALOGUE {
            let bytes = to_bytecode(name).unwrap();
            assert_eq!(parse_opcode(&bytes).unwrap(), *code, "{name}");
        }
    }

    #[test]
    fn test_catalogue_has_no_duplicates() {
        use std::collections::HashSet;
        let mut names = HashSet::new();
        let mut codes = HashSet::new();
        for (name, code) in CATALOGUE {
            assert!(names.insert(*name), "duplicate name {name}");
            assert!(codes.insert(code.0), "duplicate code {:#08x}", code.0);
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(matches!(
            to_bytecode("opNOPE"),
            Err(VmError::UnknownOpcodeName(_))
        ));
    }
}
