// EVM Opcodes
//
// Opcode constants and the byte -> mnemonic table used by the opcode census.

/// STOP opcode
pub const STOP: u8 = 0x00;

/// ADD opcode
pub const ADD: u8 = 0x01;

/// SHA3 opcode
pub const SHA3: u8 = 0x20;

/// ORIGIN opcode
pub const ORIGIN: u8 = 0x32;

/// CALLER opcode
pub const CALLER: u8 = 0x33;

/// SLOAD opcode
pub const SLOAD: u8 = 0x54;

/// SSTORE opcode
pub const SSTORE: u8 = 0x55;

/// JUMPI opcode
pub const JUMPI: u8 = 0x57;

/// JUMPDEST opcode
pub const JUMPDEST: u8 = 0x5B;

/// PUSH0 opcode
pub const PUSH0: u8 = 0x5F;

/// PUSH1 opcode
pub const PUSH1: u8 = 0x60;

/// PUSH4 opcode, the carrier of function selectors in dispatcher code
pub const PUSH4: u8 = 0x63;

/// PUSH32 opcode
pub const PUSH32: u8 = 0x7F;

/// CREATE opcode
pub const CREATE: u8 = 0xF0;

/// CALL opcode
pub const CALL: u8 = 0xF1;

/// CALLCODE opcode
pub const CALLCODE: u8 = 0xF2;

/// RETURN opcode
pub const RETURN: u8 = 0xF3;

/// DELEGATECALL opcode
pub const DELEGATECALL: u8 = 0xF4;

/// CREATE2 opcode
pub const CREATE2: u8 = 0xF5;

/// STATICCALL opcode
pub const STATICCALL: u8 = 0xFA;

/// REVERT opcode
pub const REVERT: u8 = 0xFD;

/// INVALID opcode
pub const INVALID: u8 = 0xFE;

/// SELFDESTRUCT opcode
pub const SELFDESTRUCT: u8 = 0xFF;

const PUSH_NAMES: [&str; 32] = [
    "PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8",
    "PUSH9", "PUSH10", "PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16",
    "PUSH17", "PUSH18", "PUSH19", "PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24",
    "PUSH25", "PUSH26", "PUSH27", "PUSH28", "PUSH29", "PUSH30", "PUSH31", "PUSH32",
];

const DUP_NAMES: [&str; 16] = [
    "DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8",
    "DUP9", "DUP10", "DUP11", "DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
];

const SWAP_NAMES: [&str; 16] = [
    "SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8",
    "SWAP9", "SWAP10", "SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
];

/// Mnemonic for an opcode byte, or `None` for bytes that are not assigned
/// an instruction.
pub fn mnemonic(opcode: u8) -> Option<&'static str> {
    let name = match opcode {
        STOP => "STOP",
        ADD => "ADD",
        0x02 => "MUL",
        0x03 => "SUB",
        0x04 => "DIV",
        0x05 => "SDIV",
        0x06 => "MOD",
        0x07 => "SMOD",
        0x08 => "ADDMOD",
        0x09 => "MULMOD",
        0x0A => "EXP",
        0x0B => "SIGNEXTEND",
        0x10 => "LT",
        0x11 => "GT",
        0x12 => "SLT",
        0x13 => "SGT",
        0x14 => "EQ",
        0x15 => "ISZERO",
        0x16 => "AND",
        0x17 => "OR",
        0x18 => "XOR",
        0x19 => "NOT",
        0x1A => "BYTE",
        0x1B => "SHL",
        0x1C => "SHR",
        0x1D => "SAR",
        SHA3 => "SHA3",
        0x30 => "ADDRESS",
        0x31 => "BALANCE",
        ORIGIN => "ORIGIN",
        CALLER => "CALLER",
        0x34 => "CALLVALUE",
        0x35 => "CALLDATALOAD",
        0x36 => "CALLDATASIZE",
        0x37 => "CALLDATACOPY",
        0x38 => "CODESIZE",
        0x39 => "CODECOPY",
        0x3A => "GASPRICE",
        0x3B => "EXTCODESIZE",
        0x3C => "EXTCODECOPY",
        0x3D => "RETURNDATASIZE",
        0x3E => "RETURNDATACOPY",
        0x3F => "EXTCODEHASH",
        0x40 => "BLOCKHASH",
        0x41 => "COINBASE",
        0x42 => "TIMESTAMP",
        0x43 => "NUMBER",
        0x44 => "DIFFICULTY",
        0x45 => "GASLIMIT",
        0x46 => "CHAINID",
        0x47 => "SELFBALANCE",
        0x48 => "BASEFEE",
        0x50 => "POP",
        0x51 => "MLOAD",
        0x52 => "MSTORE",
        0x53 => "MSTORE8",
        SLOAD => "SLOAD",
        SSTORE => "SSTORE",
        0x56 => "JUMP",
        JUMPI => "JUMPI",
        0x58 => "PC",
        0x59 => "MSIZE",
        0x5A => "GAS",
        JUMPDEST => "JUMPDEST",
        PUSH0 => "PUSH0",
        PUSH1..=PUSH32 => PUSH_NAMES[(opcode - PUSH1) as usize],
        0x80..=0x8F => DUP_NAMES[(opcode - 0x80) as usize],
        0x90..=0x9F => SWAP_NAMES[(opcode - 0x90) as usize],
        0xA0 => "LOG0",
        0xA1 => "LOG1",
        0xA2 => "LOG2",
        0xA3 => "LOG3",
        0xA4 => "LOG4",
        CREATE => "CREATE",
        CALL => "CALL",
        CALLCODE => "CALLCODE",
        RETURN => "RETURN",
        DELEGATECALL => "DELEGATECALL",
        CREATE2 => "CREATE2",
        STATICCALL => "STATICCALL",
        REVERT => "REVERT",
        INVALID => "INVALID",
        SELFDESTRUCT => "SELFDESTRUCT",
        _ => return None,
    };
    Some(name)
}

/// Check if an opcode is a PUSH1..PUSH32 opcode
pub fn is_push(opcode: u8) -> bool {
    (PUSH1..=PUSH32).contains(&opcode)
}

/// Get the size of a PUSH opcode's immediate value
pub fn push_size(opcode: u8) -> Option<usize> {
    if is_push(opcode) {
        Some((opcode - PUSH1 + 1) as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(mnemonic(STOP), Some("STOP"));
        assert_eq!(mnemonic(DELEGATECALL), Some("DELEGATECALL"));
        assert_eq!(mnemonic(SELFDESTRUCT), Some("SELFDESTRUCT"));
        assert_eq!(mnemonic(PUSH4), Some("PUSH4"));
        assert_eq!(mnemonic(PUSH32), Some("PUSH32"));
        assert_eq!(mnemonic(0x80), Some("DUP1"));
        assert_eq!(mnemonic(0x9F), Some("SWAP16"));
    }

    #[test]
    fn test_unassigned_bytes() {
        assert_eq!(mnemonic(0x0C), None);
        assert_eq!(mnemonic(0x21), None);
        assert_eq!(mnemonic(0xEF), None);
    }

    #[test]
    fn test_push_size() {
        assert_eq!(push_size(PUSH1), Some(1));
        assert_eq!(push_size(PUSH4), Some(4));
        assert_eq!(push_size(PUSH32), Some(32));
        assert_eq!(push_size(PUSH0), None);
        assert_eq!(push_size(CALL), None);
    }
}
