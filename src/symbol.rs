use std::str::FromStr;

/// Top nibble of every instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    /// Opcode shifted into bits 15-12.
    pub fn bits(self) -> u16 {
        (self as u16) << 12
    }
}

/// Trap vectors handled by the interpreter.
pub mod trap {
    pub const OUT: u16 = 0x21;
    pub const IN: u16 = 0x23;
    pub const HALT: u16 = 0x25;
}

/// Branch condition bits, one per letter of the `BR` suffix.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct BrFlags {
    pub n: bool,
    pub z: bool,
    pub p: bool,
}

impl BrFlags {
    pub const NZP: BrFlags = BrFlags {
        n: true,
        z: true,
        p: true,
    };

    /// Flags placed in bits 11 (n), 10 (z) and 9 (p).
    pub fn bits(self) -> u16 {
        (self.n as u16) << 11 | (self.z as u16) << 10 | (self.p as u16) << 9
    }

    pub fn from_bits(instr: u16) -> Self {
        BrFlags {
            n: instr & 0x0800 != 0,
            z: instr & 0x0400 != 0,
            p: instr & 0x0200 != 0,
        }
    }

    /// Parse the letters following `BR`. Each of `n`, `z`, `p` may appear at most once, in any
    /// order. An empty suffix gives a branch that is never taken.
    fn from_suffix(suffix: &str) -> Option<Self> {
        let mut flags = BrFlags::default();
        for c in suffix.chars() {
            let flag = match c.to_ascii_lowercase() {
                'n' => &mut flags.n,
                'z' => &mut flags.z,
                'p' => &mut flags.p,
                _ => return None,
            };
            if *flag {
                return None;
            }
            *flag = true;
        }
        Some(flags)
    }
}

/// Condition code of the machine. Read by `BR`.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum Condition {
    Negative,
    #[default]
    Zero,
    Positive,
}

impl Condition {
    pub fn matches(self, flags: BrFlags) -> bool {
        match self {
            Condition::Negative => flags.n,
            Condition::Zero => flags.z,
            Condition::Positive => flags.p,
        }
    }
}

/// Every mnemonic understood by the assembler.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    Add,
    And,
    Not,
    Ld,
    St,
    Ldi,
    Sti,
    Ldr,
    Str,
    Lea,
    Br(BrFlags),
    Jmp,
    Ret,
    Trap,
    Halt,
    Out,
    In,
    Fill,
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let mnemonic = match upper.as_str() {
            "ADD" => Mnemonic::Add,
            "AND" => Mnemonic::And,
            "NOT" => Mnemonic::Not,
            "LD" => Mnemonic::Ld,
            "ST" => Mnemonic::St,
            "LDI" => Mnemonic::Ldi,
            "STI" => Mnemonic::Sti,
            "LDR" => Mnemonic::Ldr,
            "STR" => Mnemonic::Str,
            "LEA" => Mnemonic::Lea,
            "JMP" => Mnemonic::Jmp,
            "RET" => Mnemonic::Ret,
            "TRAP" => Mnemonic::Trap,
            "HALT" => Mnemonic::Halt,
            "OUT" => Mnemonic::Out,
            "IN" => Mnemonic::In,
            ".FILL" => Mnemonic::Fill,
            br if br.starts_with("BR") => Mnemonic::Br(BrFlags::from_suffix(&br[2..]).ok_or(())?),
            _ => return Err(()),
        };
        Ok(mnemonic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn br_suffixes() {
        assert_eq!("BR".parse(), Ok(Mnemonic::Br(BrFlags::default())));
        assert_eq!("BRnzp".parse(), Ok(Mnemonic::Br(BrFlags::NZP)));
        assert_eq!("brPN".parse(), Ok(Mnemonic::Br(BrFlags { n: true, z: false, p: true })));
        assert_eq!("BRzz".parse::<Mnemonic>(), Err(()));
        assert_eq!("BRx".parse::<Mnemonic>(), Err(()));
    }

    #[test]
    fn br_flag_bits() {
        let flags = BrFlags { n: true, z: false, p: true };
        assert_eq!(flags.bits(), 0x0A00);
        assert_eq!(BrFlags::from_bits(0x0A00 | 0x1FF), flags);
        assert_eq!(BrFlags::default().bits(), 0);
    }

    #[test]
    fn mnemonics_are_case_insensitive() {
        assert_eq!("add".parse(), Ok(Mnemonic::Add));
        assert_eq!(".fill".parse(), Ok(Mnemonic::Fill));
        assert_eq!("Halt".parse(), Ok(Mnemonic::Halt));
        assert_eq!("MUL".parse::<Mnemonic>(), Err(()));
    }

    #[test]
    fn condition_matches_only_its_flag() {
        let z = BrFlags { z: true, ..Default::default() };
        assert!(Condition::Zero.matches(z));
        assert!(!Condition::Negative.matches(z));
        assert!(!Condition::Positive.matches(BrFlags::default()));
    }
}
