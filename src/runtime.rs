use colored::Colorize;

use crate::error::{Error, Result};
use crate::image::Image;
use crate::io::Console;
use crate::symbol::{trap, BrFlags, Condition};

/// Sign extend the low `bits` bits of `raw`.
///
/// If the top bit of the field is set the result is `field - 2^bits`, otherwise it is the field
/// itself.
pub fn sign_extend(raw: u16, bits: u32) -> i16 {
    debug_assert!(bits > 0 && bits < 16);
    let field = raw & ((1 << bits) - 1);
    if field & (1 << (bits - 1)) != 0 {
        (field as i32 - (1 << bits)) as i16
    } else {
        field as i16
    }
}

/// Represents complete machine state during runtime.
pub struct RunState {
    /// System memory, 128KB in size
    mem: Image,
    /// Program counter
    pc: u16,
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Condition code. No instruction writes it, only `BR` reads it.
    cond: Condition,
    halted: bool,
    /// Print every fetched word to stderr
    trace: bool,
}

type Handler = fn(&mut RunState, u16, &mut dyn Console) -> Result<()>;

impl RunState {
    /// Address execution starts at.
    pub const ORIGIN: u16 = 0x3000;

    pub fn new(mem: Image) -> Self {
        RunState {
            mem,
            pc: Self::ORIGIN,
            reg: [0; 8],
            cond: Condition::Zero,
            halted: false,
            trace: false,
        }
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Value of register `idx`. Panics if `idx > 7`.
    pub fn reg(&self, idx: usize) -> u16 {
        self.reg[idx]
    }

    pub fn set_reg(&mut self, idx: usize, val: u16) {
        self.reg[idx] = val;
    }

    pub fn cond(&self) -> Condition {
        self.cond
    }

    pub fn set_cond(&mut self, cond: Condition) {
        self.cond = cond;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn mem(&self) -> &Image {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Image {
        &mut self.mem
    }

    const OP_TABLE: [Handler; 16] = [
        Self::br,          // 0x0
        Self::add,         // 0x1
        Self::ld,          // 0x2
        Self::st,          // 0x3
        Self::unsupported, // 0x4 JSR
        Self::and,         // 0x5
        Self::ldr,         // 0x6
        Self::str,         // 0x7
        Self::unsupported, // 0x8 RTI
        Self::not,         // 0x9
        Self::ldi,         // 0xA
        Self::sti,         // 0xB
        Self::jmp,         // 0xC
        Self::unsupported, // 0xD reserved
        Self::lea,         // 0xE
        Self::trap,        // 0xF
    ];

    /// Fetch, decode and execute a single instruction.
    pub fn step(&mut self, io: &mut dyn Console) -> Result<()> {
        if self.halted {
            return Err(Error::HaltedMachine);
        }
        let instr = self.mem[self.pc];
        if self.trace {
            eprintln!("{:>12} x{:04X} = x{instr:04X}", "PC".cyan(), self.pc);
        }
        let opcode = (instr >> 12) as usize;
        Self::OP_TABLE[opcode](self, instr, io)
    }

    /// Step until the machine halts. Loops forever on programs that never halt.
    pub fn run(&mut self, io: &mut dyn Console) -> Result<()> {
        while !self.halted {
            self.step(io)?;
        }
        Ok(())
    }

    fn incr_pc(&mut self) -> Result<()> {
        self.pc = self.pc.checked_add(1).ok_or(Error::PcOverflow)?;
        Ok(())
    }

    /// `pc + sext(offset9)`, with `pc` already incremented.
    #[inline]
    fn pc_offset9(&self, instr: u16) -> u16 {
        self.pc.wrapping_add_signed(sign_extend(instr, 9))
    }

    /// `base + sext(offset6)`
    #[inline]
    fn base_offset6(&self, instr: u16) -> u16 {
        let br = (instr >> 6) & 0b111;
        self.reg[br as usize].wrapping_add_signed(sign_extend(instr, 6))
    }

    #[inline]
    fn reg_mut(&mut self, idx: u16) -> &mut u16 {
        &mut self.reg[(idx & 0b111) as usize]
    }

    /// Second operand of `ADD` and `AND`
    #[inline]
    fn src2(&self, instr: u16) -> u16 {
        if instr & 0b100000 == 0 {
            // reg
            self.reg[(instr & 0b111) as usize]
        } else {
            // imm
            sign_extend(instr, 5) as u16
        }
    }

    fn add(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let sr = (instr >> 6) & 0b111;
        let res = self.reg[sr as usize].wrapping_add(self.src2(instr));
        *self.reg_mut(instr >> 9) = res;
        Ok(())
    }

    fn and(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let sr = (instr >> 6) & 0b111;
        let res = self.reg[sr as usize] & self.src2(instr);
        *self.reg_mut(instr >> 9) = res;
        Ok(())
    }

    fn not(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let sr = (instr >> 6) & 0b111;
        let res = !self.reg[sr as usize];
        *self.reg_mut(instr >> 9) = res;
        Ok(())
    }

    fn br(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        if self.cond.matches(BrFlags::from_bits(instr)) {
            self.pc = self.pc_offset9(instr);
        }
        Ok(())
    }

    fn jmp(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.pc = *self.reg_mut(instr >> 6);
        Ok(())
    }

    fn ld(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let val = self.mem[self.pc_offset9(instr)];
        *self.reg_mut(instr >> 9) = val;
        Ok(())
    }

    fn ldi(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let ptr = self.mem[self.pc_offset9(instr)];
        let val = self.mem[ptr];
        *self.reg_mut(instr >> 9) = val;
        Ok(())
    }

    fn ldr(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let val = self.mem[self.base_offset6(instr)];
        *self.reg_mut(instr >> 9) = val;
        Ok(())
    }

    fn lea(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let val = self.pc_offset9(instr);
        *self.reg_mut(instr >> 9) = val;
        Ok(())
    }

    fn st(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let val = *self.reg_mut(instr >> 9);
        let addr = self.pc_offset9(instr);
        self.mem[addr] = val;
        Ok(())
    }

    fn sti(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let val = *self.reg_mut(instr >> 9);
        let ptr = self.mem[self.pc_offset9(instr)];
        self.mem[ptr] = val;
        Ok(())
    }

    fn str(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        self.incr_pc()?;
        let val = *self.reg_mut(instr >> 9);
        let addr = self.base_offset6(instr);
        self.mem[addr] = val;
        Ok(())
    }

    fn trap(&mut self, instr: u16, io: &mut dyn Console) -> Result<()> {
        let trap_vect = instr & 0xFF;
        match trap_vect {
            // halt, pc stays on the trap
            trap::HALT => self.halted = true,
            // out
            trap::OUT => {
                io.put_char((self.reg[0] & 0xFF) as u8)?;
                self.incr_pc()?;
            }
            // in
            trap::IN => {
                self.reg[0] = io.get_char()? as u16;
                self.incr_pc()?;
            }
            _ => {
                return Err(Error::UnimplementedTrap {
                    vect: trap_vect,
                    addr: self.pc,
                })
            }
        }
        Ok(())
    }

    fn unsupported(&mut self, instr: u16, _io: &mut dyn Console) -> Result<()> {
        Err(Error::UnknownOpcode {
            opcode: instr >> 12,
            word: instr,
            addr: self.pc,
        })
    }
}
