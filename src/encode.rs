//! Packing of operands into 16-bit instruction words.
//!
//! Every function validates its operands before packing: registers must be `R0`-`R7`, signed
//! fields must fit their width and trap vectors must be one of the three implemented services.
//! Nothing is ever truncated silently.

use crate::error::{Error, Result};
use crate::symbol::{trap, BrFlags, Opcode};

/// Immediate-mode selector for `ADD` and `AND`.
const IMM_BIT: u16 = 1 << 5;

fn check_reg(reg: u16) -> Result<u16> {
    if reg > 7 {
        return Err(Error::BadRegister {
            index: reg,
            span: None,
        });
    }
    Ok(reg)
}

/// Check that `value` fits in `bits` two's complement bits and return the masked field.
fn check_signed(value: i32, bits: u32) -> Result<u16> {
    debug_assert!(bits > 0 && bits < 16);
    let max = (1 << (bits - 1)) - 1;
    let min = -(1 << (bits - 1));
    if !(min..=max).contains(&value) {
        return Err(Error::OutOfRange {
            value,
            bits,
            min,
            max,
            span: None,
        });
    }
    Ok(value as u16 & ((1 << bits) - 1))
}

fn dst(reg: u16) -> Result<u16> {
    Ok(check_reg(reg)? << 9)
}

fn base(reg: u16) -> Result<u16> {
    Ok(check_reg(reg)? << 6)
}

pub fn add_reg(dest: u16, src: u16, src2: u16) -> Result<u16> {
    Ok(Opcode::Add.bits() | dst(dest)? | base(src)? | check_reg(src2)?)
}

pub fn add_imm(dest: u16, src: u16, imm5: i32) -> Result<u16> {
    Ok(Opcode::Add.bits() | dst(dest)? | base(src)? | IMM_BIT | check_signed(imm5, 5)?)
}

pub fn and_reg(dest: u16, src: u16, src2: u16) -> Result<u16> {
    Ok(Opcode::And.bits() | dst(dest)? | base(src)? | check_reg(src2)?)
}

pub fn and_imm(dest: u16, src: u16, imm5: i32) -> Result<u16> {
    Ok(Opcode::And.bits() | dst(dest)? | base(src)? | IMM_BIT | check_signed(imm5, 5)?)
}

pub fn not(dest: u16, src: u16) -> Result<u16> {
    Ok(Opcode::Not.bits() | dst(dest)? | base(src)? | 0x3F)
}

fn pc_relative(op: Opcode, reg: u16, offset9: i32) -> Result<u16> {
    Ok(op.bits() | dst(reg)? | check_signed(offset9, 9)?)
}

pub fn ld(dest: u16, offset9: i32) -> Result<u16> {
    pc_relative(Opcode::Ld, dest, offset9)
}

pub fn st(src: u16, offset9: i32) -> Result<u16> {
    pc_relative(Opcode::St, src, offset9)
}

pub fn ldi(dest: u16, offset9: i32) -> Result<u16> {
    pc_relative(Opcode::Ldi, dest, offset9)
}

pub fn sti(src: u16, offset9: i32) -> Result<u16> {
    pc_relative(Opcode::Sti, src, offset9)
}

pub fn lea(dest: u16, offset9: i32) -> Result<u16> {
    pc_relative(Opcode::Lea, dest, offset9)
}

pub fn ldr(dest: u16, base_r: u16, offset6: i32) -> Result<u16> {
    Ok(Opcode::Ldr.bits() | dst(dest)? | base(base_r)? | check_signed(offset6, 6)?)
}

pub fn str(src: u16, base_r: u16, offset6: i32) -> Result<u16> {
    Ok(Opcode::Str.bits() | dst(src)? | base(base_r)? | check_signed(offset6, 6)?)
}

pub fn br(flags: BrFlags, offset9: i32) -> Result<u16> {
    Ok(Opcode::Br.bits() | flags.bits() | check_signed(offset9, 9)?)
}

pub fn jmp(base_r: u16) -> Result<u16> {
    Ok(Opcode::Jmp.bits() | base(base_r)?)
}

pub fn trap(vect: i32) -> Result<u16> {
    match u16::try_from(vect) {
        Ok(v @ (trap::OUT | trap::IN | trap::HALT)) => Ok(Opcode::Trap.bits() | v),
        _ => Err(Error::BadTrapVector { vect, span: None }),
    }
}

/// Raw data word. Accepts anything representable as either a signed or an unsigned 16-bit value.
pub fn fill(value: i32) -> Result<u16> {
    if !(i16::MIN as i32..=u16::MAX as i32).contains(&value) {
        return Err(Error::OutOfRange {
            value,
            bits: 16,
            min: i16::MIN as i32,
            max: u16::MAX as i32,
            span: None,
        });
    }
    Ok(value as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_forms() {
        assert_eq!(add_reg(0, 1, 2).unwrap(), 0b0001_000_001_0_00_010);
        assert_eq!(add_imm(3, 4, -1).unwrap(), 0b0001_011_100_1_11111);
        assert_eq!(and_imm(7, 7, 0).unwrap(), 0b0101_111_111_1_00000);
        assert_eq!(and_reg(1, 2, 3).unwrap(), 0b0101_001_010_0_00_011);
    }

    #[test]
    fn add_imm_range() {
        assert!(add_imm(0, 0, 15).is_ok());
        assert!(add_imm(0, 0, -16).is_ok());
        assert!(matches!(
            add_imm(0, 0, 16),
            Err(Error::OutOfRange { value: 16, bits: 5, min: -16, max: 15, .. })
        ));
        assert!(add_imm(0, 0, -17).is_err());
    }

    #[test]
    fn register_range() {
        assert!(add_reg(7, 7, 7).is_ok());
        assert!(matches!(add_reg(8, 0, 0), Err(Error::BadRegister { index: 8, .. })));
        assert!(matches!(not(0, 8), Err(Error::BadRegister { index: 8, .. })));
        assert!(jmp(9).is_err());
        assert!(ldr(0, 8, 0).is_err());
    }

    #[test]
    fn not_sets_low_bits() {
        assert_eq!(not(0, 0).unwrap(), 0x903F);
        assert_eq!(not(1, 2).unwrap(), 0b1001_001_010_111111);
    }

    #[test]
    fn pc_relative_forms() {
        assert_eq!(ld(2, 5).unwrap(), 0x2405);
        assert_eq!(st(2, -1).unwrap(), 0x35FF);
        assert_eq!(ldi(0, 255).unwrap(), 0xA0FF);
        assert_eq!(sti(0, -256).unwrap(), 0xB100);
        assert_eq!(lea(1, 1).unwrap(), 0xE201);
        assert!(ld(0, 256).is_err());
        assert!(lea(0, -257).is_err());
    }

    #[test]
    fn base_offset_forms() {
        assert_eq!(ldr(1, 2, -1).unwrap(), 0b0110_001_010_111111);
        assert_eq!(str(3, 4, 31).unwrap(), 0b0111_011_100_011111);
        // Base register lands in its own field rather than aliasing the source
        assert_ne!(str(3, 4, 0).unwrap(), str(3, 3, 0).unwrap());
        assert!(ldr(0, 0, 32).is_err());
        assert!(str(0, 0, -33).is_err());
    }

    #[test]
    fn branch() {
        let z = BrFlags { z: true, ..Default::default() };
        assert_eq!(br(z, 6).unwrap(), 0x0406);
        assert_eq!(br(BrFlags::NZP, -1).unwrap(), 0x0FFF);
        assert_eq!(br(BrFlags::default(), 0).unwrap(), 0x0000);
        assert!(br(z, 256).is_err());
    }

    #[test]
    fn jump() {
        assert_eq!(jmp(7).unwrap(), 0xC1C0);
    }

    #[test]
    fn trap_vectors() {
        assert_eq!(trap(0x21).unwrap(), 0xF021);
        assert_eq!(trap(0x23).unwrap(), 0xF023);
        assert_eq!(trap(0x25).unwrap(), 0xF025);
        assert!(matches!(trap(0x20), Err(Error::BadTrapVector { vect: 0x20, .. })));
        assert!(trap(-1).is_err());
        assert!(trap(0x10025).is_err());
    }

    #[test]
    fn fill_words() {
        assert_eq!(fill(-1).unwrap(), 0xFFFF);
        assert_eq!(fill(0xFFFF).unwrap(), 0xFFFF);
        assert_eq!(fill(-32768).unwrap(), 0x8000);
        assert!(fill(0x10000).is_err());
        assert!(fill(-32769).is_err());
    }
}
