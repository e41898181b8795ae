//! Z80 disassembler.
//!
//! Zilog mnemonics, upper case, numbers as hex with an `H` suffix. Relative
//! jumps show their target address. Undocumented opcodes decode the way the
//! core executes them (`SLL`, `IXH`/`IXL`, `IN (C)`, `OUT (C),0`); bytes the
//! core treats as a no-op prefix or a 2-byte NOP come out as `DB`.

use super::IndexMode;

const R: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const RP: [&str; 4] = ["BC", "DE", "HL", "SP"];
const RP2: [&str; 4] = ["BC", "DE", "HL", "AF"];
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ALU: [&str; 8] = ["ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP "];
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];
const X0Z7: [&str; 8] = ["RLCA", "RRCA", "RLA", "RRA", "DAA", "CPL", "SCF", "CCF"];
const IM: [&str; 8] = ["0", "0", "1", "2", "0", "0", "1", "2"];
const BLOCK: [[&str; 4]; 4] = [
    ["LDI", "CPI", "INI", "OUTI"],
    ["LDD", "CPD", "IND", "OUTD"],
    ["LDIR", "CPIR", "INIR", "OTIR"],
    ["LDDR", "CPDR", "INDR", "OTDR"],
];

fn hex8(n: u8) -> String {
    format!("{n:02X}H")
}

fn hex16(n: u16) -> String {
    format!("{n:04X}H")
}

/// Decode the instruction at `pc`. `read` fetches memory and may be called
/// for any address after `pc`. Returns the text and the instruction length
/// in bytes.
pub fn disassemble(pc: u16, read: impl FnMut(u16) -> u8) -> (String, u16) {
    let mut dasm = Dasm { pc, len: 0, read };
    let text = dasm.op();
    (text, dasm.len)
}

struct Dasm<F> {
    pc: u16,
    len: u16,
    read: F,
}

impl<F: FnMut(u16) -> u8> Dasm<F> {
    fn byte(&mut self) -> u8 {
        let b = (self.read)(self.pc.wrapping_add(self.len));
        self.len += 1;
        b
    }

    fn word(&mut self) -> u16 {
        let lo = self.byte();
        let hi = self.byte();
        u16::from_le_bytes([lo, hi])
    }

    fn imm8(&mut self) -> String {
        let n = self.byte();
        hex8(n)
    }

    fn imm16(&mut self) -> String {
        let n = self.word();
        hex16(n)
    }

    fn rel(&mut self) -> String {
        let d = self.byte() as i8;
        hex16(self.pc.wrapping_add(self.len).wrapping_add(d as u16))
    }

    fn disp(&mut self, index: IndexMode) -> String {
        let d = self.byte() as i8;
        format!("({}{d:+})", hl(index))
    }

    /// Register `r`, with H/L/(HL) replaced under an index prefix.
    fn reg(&mut self, r: u8, index: IndexMode) -> String {
        match (r, index) {
            (6, IndexMode::HL) => "(HL)".to_string(),
            (6, _) => self.disp(index),
            (4, IndexMode::IX) => "IXH".to_string(),
            (5, IndexMode::IX) => "IXL".to_string(),
            (4, IndexMode::IY) => "IYH".to_string(),
            (5, IndexMode::IY) => "IYL".to_string(),
            _ => R[r as usize].to_string(),
        }
    }

    fn op(&mut self) -> String {
        let mut op = self.byte();
        let index = match op {
            0xDD => IndexMode::IX,
            0xFD => IndexMode::IY,
            _ => IndexMode::HL,
        };
        if index != IndexMode::HL {
            let prefix = op;
            op = self.byte();
            if matches!(op, 0xDD | 0xFD | 0xED) {
                // the prefix is dropped and the next one starts a new instruction
                self.len = 1;
                return format!("DB {}", hex8(prefix));
            }
        }
        match op {
            0xCB => self.cb(index),
            0xED => self.ed(),
            _ => self.main(op, index),
        }
    }

    fn main(&mut self, op: u8, index: IndexMode) -> String {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = (y >> 1) as usize;
        let q = y & 1;
        let rp = if p == 2 { hl(index) } else { RP[p] };
        let rp2 = if p == 2 { hl(index) } else { RP2[p] };
        match x {
            0 => match z {
                0 => match y {
                    0 => "NOP".to_string(),
                    1 => "EX AF,AF'".to_string(),
                    2 => format!("DJNZ {}", self.rel()),
                    3 => format!("JR {}", self.rel()),
                    _ => format!("JR {},{}", CC[y as usize - 4], self.rel()),
                },
                1 if q == 0 => format!("LD {rp},{}", self.imm16()),
                1 => format!("ADD {},{rp}", hl(index)),
                2 => match (q, p) {
                    (0, 0) => "LD (BC),A".to_string(),
                    (0, 1) => "LD (DE),A".to_string(),
                    (0, 2) => format!("LD ({}),{}", self.imm16(), hl(index)),
                    (0, _) => format!("LD ({}),A", self.imm16()),
                    (_, 0) => "LD A,(BC)".to_string(),
                    (_, 1) => "LD A,(DE)".to_string(),
                    (_, 2) => format!("LD {},({})", hl(index), self.imm16()),
                    _ => format!("LD A,({})", self.imm16()),
                },
                3 if q == 0 => format!("INC {rp}"),
                3 => format!("DEC {rp}"),
                4 => format!("INC {}", self.reg(y, index)),
                5 => format!("DEC {}", self.reg(y, index)),
                6 => format!("LD {},{}", self.reg(y, index), self.imm8()),
                _ => X0Z7[y as usize].to_string(),
            },
            1 => {
                if y == 6 && z == 6 {
                    return "HALT".to_string();
                }
                // with (IX+d) on one side the other side keeps plain H and L
                if y == 6 {
                    format!("LD {},{}", self.reg(6, index), R[z as usize])
                } else if z == 6 {
                    format!("LD {},{}", R[y as usize], self.reg(6, index))
                } else {
                    format!("LD {},{}", self.reg(y, index), self.reg(z, index))
                }
            }
            2 => format!("{}{}", ALU[y as usize], self.reg(z, index)),
            _ => match z {
                0 => format!("RET {}", CC[y as usize]),
                1 => match (q, p) {
                    (0, _) => format!("POP {rp2}"),
                    (_, 0) => "RET".to_string(),
                    (_, 1) => "EXX".to_string(),
                    (_, 2) => format!("JP ({})", hl(index)),
                    _ => format!("LD SP,{}", hl(index)),
                },
                2 => format!("JP {},{}", CC[y as usize], self.imm16()),
                3 => match y {
                    0 => format!("JP {}", self.imm16()),
                    2 => format!("OUT ({}),A", self.imm8()),
                    3 => format!("IN A,({})", self.imm8()),
                    4 => format!("EX (SP),{}", hl(index)),
                    5 => "EX DE,HL".to_string(),
                    6 => "DI".to_string(),
                    _ => "EI".to_string(),
                },
                4 => format!("CALL {},{}", CC[y as usize], self.imm16()),
                5 if q == 0 => format!("PUSH {rp2}"),
                5 => format!("CALL {}", self.imm16()),
                6 => format!("{}{}", ALU[y as usize], self.imm8()),
                _ => format!("RST {}", hex8(y * 8)),
            },
        }
    }

    fn cb(&mut self, index: IndexMode) -> String {
        // DD CB d op: the displacement comes before the opcode
        let target = match index {
            IndexMode::HL => None,
            _ => Some(self.disp(index)),
        };
        let op = self.byte();
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let operand = match &target {
            None => R[z as usize].to_string(),
            // undocumented: the result is also copied to a register
            Some(mem) if z != 6 && x != 1 => format!("{mem},{}", R[z as usize]),
            Some(mem) => mem.clone(),
        };
        match x {
            0 => format!("{} {operand}", ROT[y as usize]),
            1 => format!("BIT {y},{operand}"),
            2 => format!("RES {y},{operand}"),
            _ => format!("SET {y},{operand}"),
        }
    }

    fn ed(&mut self) -> String {
        let op = self.byte();
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = (y >> 1) as usize;
        let q = y & 1;
        match (x, z) {
            (1, 0) if y == 6 => "IN (C)".to_string(),
            (1, 0) => format!("IN {},(C)", R[y as usize]),
            (1, 1) if y == 6 => "OUT (C),0".to_string(),
            (1, 1) => format!("OUT (C),{}", R[y as usize]),
            (1, 2) if q == 0 => format!("SBC HL,{}", RP[p]),
            (1, 2) => format!("ADC HL,{}", RP[p]),
            (1, 3) if q == 0 => format!("LD ({}),{}", self.imm16(), RP[p]),
            (1, 3) => format!("LD {},({})", RP[p], self.imm16()),
            (1, 4) => "NEG".to_string(),
            (1, 5) if y == 1 => "RETI".to_string(),
            (1, 5) => "RETN".to_string(),
            (1, 6) => format!("IM {}", IM[y as usize]),
            (1, 7) => match y {
                0 => "LD I,A",
                1 => "LD R,A",
                2 => "LD A,I",
                3 => "LD A,R",
                4 => "RRD",
                5 => "RLD",
                _ => "NOP",
            }
            .to_string(),
            (2, 0..=3) if y >= 4 => BLOCK[y as usize - 4][z as usize].to_string(),
            _ => format!("DB EDH,{}", hex8(op)),
        }
    }
}

fn hl(index: IndexMode) -> &'static str {
    match index {
        IndexMode::HL => "HL",
        IndexMode::IX => "IX",
        IndexMode::IY => "IY",
    }
}
