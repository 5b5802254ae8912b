//! the register file's identifier space.
//!
//! registers are a closed set; the wire code assigned to each variant is the
//! byte value the assembler/VM agree on when a register operand is encoded.
//! keep that identity explicit via `code()` rather than casting the enum
//! directly - the discriminant values are an implementation detail, the wire
//! codes are a contract.

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Register {
    AX,
    AL,
    AH,
    BX,
    BL,
    BH,
    CX,
    CL,
    CH,
    DX,
    DL,
    DH,
    SP,
    BP,
    CP,
    SI,
    DI,
    IP,
    ES,
    FLAGS,
}

/// registers callers may spell out in assembly source. `IP` and `FLAGS`
/// exist in the register file but are withheld from user-facing lookup -
/// see `from_str`.
pub const USER_REGISTERS: [Register; 17] = [
    Register::AX,
    Register::AL,
    Register::AH,
    Register::BX,
    Register::BL,
    Register::BH,
    Register::CX,
    Register::CL,
    Register::CH,
    Register::DX,
    Register::DL,
    Register::DH,
    Register::SP,
    Register::BP,
    Register::CP,
    Register::SI,
    Register::DI,
];

impl Register {
    /// the wire code used by the assembler and decoded by the VM.
    pub fn code(self) -> u8 {
        match self {
            Register::AX => 0,
            Register::AL => 1,
            Register::AH => 2,
            Register::BX => 3,
            Register::BL => 4,
            Register::BH => 5,
            Register::CX => 6,
            Register::CL => 7,
            Register::CH => 8,
            Register::DX => 9,
            Register::DL => 10,
            Register::DH => 11,
            Register::SP => 12,
            Register::BP => 13,
            Register::CP => 14,
            Register::SI => 15,
            Register::DI => 16,
            Register::IP => 17,
            Register::ES => 18,
            Register::FLAGS => 19,
        }
    }

    pub fn from_code(code: u8) -> Option<Register> {
        Some(match code {
            0 => Register::AX,
            1 => Register::AL,
            2 => Register::AH,
            3 => Register::BX,
            4 => Register::BL,
            5 => Register::BH,
            6 => Register::CX,
            7 => Register::CL,
            8 => Register::CH,
            9 => Register::DX,
            10 => Register::DL,
            11 => Register::DH,
            12 => Register::SP,
            13 => Register::BP,
            14 => Register::CP,
            15 => Register::SI,
            16 => Register::DI,
            17 => Register::IP,
            18 => Register::ES,
            19 => Register::FLAGS,
            _ => return None,
        })
    }

    /// true for the four byte-width aliases into AX/BX/CX/DX.
    pub fn is_8bit(self) -> bool {
        matches!(
            self,
            Register::AL
                | Register::AH
                | Register::BL
                | Register::BH
                | Register::CL
                | Register::CH
                | Register::DL
                | Register::DH
        )
    }

    pub fn is_16bit(self) -> bool {
        !self.is_8bit()
    }

    /// the 16-bit register an 8-bit alias is a slice of; a no-op for
    /// already-16-bit registers.
    pub fn widen(self) -> Register {
        match self {
            Register::AL | Register::AH => Register::AX,
            Register::BL | Register::BH => Register::BX,
            Register::CL | Register::CH => Register::CX,
            Register::DL | Register::DH => Register::DX,
            other => other,
        }
    }

    /// true if this alias addresses the high byte of its parent register.
    pub fn is_high_half(self) -> bool {
        matches!(
            self,
            Register::AH | Register::BH | Register::CH | Register::DH
        )
    }

    /// only the registers a mnemonic operand is allowed to name. `IP` and
    /// `FLAGS` are deliberately excluded here - see util/globals.cpp's
    /// `getRegisterFromString` in the original implementation, which omits
    /// them "to prevent user inputting them" even though both exist in the
    /// register file and are addressable by the VM internally.
    pub fn from_str(s: &str) -> Option<Register> {
        Some(match s {
            "AX" => Register::AX,
            "AL" => Register::AL,
            "AH" => Register::AH,
            "BX" => Register::BX,
            "BL" => Register::BL,
            "BH" => Register::BH,
            "CX" => Register::CX,
            "CL" => Register::CL,
            "CH" => Register::CH,
            "DX" => Register::DX,
            "DL" => Register::DL,
            "DH" => Register::DH,
            "SP" => Register::SP,
            "BP" => Register::BP,
            "CP" => Register::CP,
            "SI" => Register::SI,
            "DI" => Register::DI,
            _ => return None,
        })
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Register::AX => "AX",
            Register::AL => "AL",
            Register::AH => "AH",
            Register::BX => "BX",
            Register::BL => "BL",
            Register::BH => "BH",
            Register::CX => "CX",
            Register::CL => "CL",
            Register::CH => "CH",
            Register::DX => "DX",
            Register::DL => "DL",
            Register::DH => "DH",
            Register::SP => "SP",
            Register::BP => "BP",
            Register::CP => "CP",
            Register::SI => "SI",
            Register::DI => "DI",
            Register::IP => "IP",
            Register::ES => "ES",
            Register::FLAGS => "FLAGS",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips() {
        for code in 0..20u8 {
            let reg = Register::from_code(code).unwrap();
            assert_eq!(reg.code(), code);
        }
        assert!(Register::from_code(20).is_none());
    }

    #[test]
    fn user_register_lookup_excludes_ip_and_flags() {
        assert!(Register::from_str("IP").is_none());
        assert!(Register::from_str("FLAGS").is_none());
        assert_eq!(Register::from_str("AX"), Some(Register::AX));
        assert_eq!(Register::from_str("CP"), Some(Register::CP));
    }

    #[test]
    fn widen_maps_aliases_to_parent() {
        assert_eq!(Register::AL.widen(), Register::AX);
        assert_eq!(Register::DH.widen(), Register::DX);
        assert_eq!(Register::SP.widen(), Register::SP);
    }
}
