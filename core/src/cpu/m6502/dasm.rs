//! 6502 disassembler.
//!
//! Standard MOS syntax with `$` hex operands. Branches show the target
//! address and accumulator shifts print without an operand. Undocumented
//! opcodes use their common names (`LAX`, `DCP`, `JAM`, ...).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl Mode {
    fn operand_len(self) -> u16 {
        match self {
            Mode::Implied | Mode::Accumulator => 0,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 2,
            _ => 1,
        }
    }
}

use Mode::*;

/// Modes of the `cc = 01` group by `bbb`, shared with most of `cc = 11`.
const GROUP1_MODES: [Mode; 8] = [
    IndirectX, ZeroPage, Immediate, Absolute, IndirectY, ZeroPageX, AbsoluteY, AbsoluteX,
];
const GROUP1: [&str; 8] = ["ORA", "AND", "EOR", "ADC", "STA", "LDA", "CMP", "SBC"];
const GROUP2: [&str; 8] = ["ASL", "ROL", "LSR", "ROR", "STX", "LDX", "DEC", "INC"];
const GROUP3: [&str; 8] = ["SLO", "RLA", "SRE", "RRA", "SAX", "LAX", "DCP", "ISB"];

/// Mnemonic and addressing mode, from the `aaabbbcc` opcode layout.
fn decode(op: u8) -> (&'static str, Mode) {
    let a = (op >> 5) as usize;
    let b = (op >> 2) & 7;
    match op & 3 {
        0 => match (b, a) {
            (0, 0) => ("BRK", Implied),
            (0, 1) => ("JSR", Absolute),
            (0, 2) => ("RTI", Implied),
            (0, 3) => ("RTS", Implied),
            (0, _) => (["NOP", "", "", "", "NOP", "LDY", "CPY", "CPX"][a], Immediate),
            (1, _) => (["NOP", "BIT", "NOP", "NOP", "STY", "LDY", "CPY", "CPX"][a], ZeroPage),
            (2, _) => (["PHP", "PLP", "PHA", "PLA", "DEY", "TAY", "INY", "INX"][a], Implied),
            (3, 3) => ("JMP", Indirect),
            (3, _) => (["NOP", "BIT", "JMP", "", "STY", "LDY", "CPY", "CPX"][a], Absolute),
            (4, _) => (["BPL", "BMI", "BVC", "BVS", "BCC", "BCS", "BNE", "BEQ"][a], Relative),
            (5, 4) => ("STY", ZeroPageX),
            (5, 5) => ("LDY", ZeroPageX),
            (5, _) => ("NOP", ZeroPageX),
            (6, _) => (["CLC", "SEC", "CLI", "SEI", "TYA", "CLV", "CLD", "SED"][a], Implied),
            (_, 4) => ("SHY", AbsoluteX),
            (_, 5) => ("LDY", AbsoluteX),
            _ => ("NOP", AbsoluteX),
        },
        1 if op == 0x89 => ("NOP", Immediate),
        1 => (GROUP1[a], GROUP1_MODES[b as usize]),
        2 => match (b, a) {
            (0, 5) => ("LDX", Immediate),
            (0, 0..=3) | (4, _) => ("JAM", Implied),
            (0, _) => ("NOP", Immediate),
            (2, 0..=3) => (GROUP2[a], Accumulator),
            (2, _) => (["", "", "", "", "TXA", "TAX", "DEX", "NOP"][a], Implied),
            (5, 4 | 5) => (GROUP2[a], ZeroPageY),
            (6, 4) => ("TXS", Implied),
            (6, 5) => ("TSX", Implied),
            (6, _) => ("NOP", Implied),
            (7, 4) => ("SHX", AbsoluteY),
            (7, 5) => ("LDX", AbsoluteY),
            _ => (GROUP2[a], GROUP1_MODES[b as usize]),
        },
        _ => match (b, a) {
            (2, _) => (["ANC", "ANC", "ALR", "ARR", "ANE", "LXA", "SBX", "SBC"][a], Immediate),
            (4, 4) => ("SHA", IndirectY),
            (5, 4 | 5) => (GROUP3[a], ZeroPageY),
            (6, 4) => ("TAS", AbsoluteY),
            (6, 5) => ("LAS", AbsoluteY),
            (7, 4) => ("SHA", AbsoluteY),
            (7, 5) => ("LAX", AbsoluteY),
            _ => (GROUP3[a], GROUP1_MODES[b as usize]),
        },
    }
}

/// Decode the instruction at `pc`. `read` fetches memory; it is called only
/// for the instruction's own bytes. Returns the text and the instruction
/// length in bytes.
pub fn disassemble(pc: u16, mut read: impl FnMut(u16) -> u8) -> (String, u16) {
    let op = read(pc);
    let (mnemonic, mode) = decode(op);
    let len = 1 + mode.operand_len();
    let lo = if len > 1 { read(pc.wrapping_add(1)) } else { 0 };
    let hi = if len > 2 { read(pc.wrapping_add(2)) } else { 0 };
    let abs = u16::from_le_bytes([lo, hi]);
    let operand = match mode {
        Implied | Accumulator => return (mnemonic.to_string(), len),
        Immediate => format!("#${lo:02X}"),
        ZeroPage => format!("${lo:02X}"),
        ZeroPageX => format!("${lo:02X},X"),
        ZeroPageY => format!("${lo:02X},Y"),
        Absolute => format!("${abs:04X}"),
        AbsoluteX => format!("${abs:04X},X"),
        AbsoluteY => format!("${abs:04X},Y"),
        Indirect => format!("(${abs:04X})"),
        IndirectX => format!("(${lo:02X},X)"),
        IndirectY => format!("(${lo:02X}),Y"),
        Relative => {
            let target = pc.wrapping_add(2).wrapping_add(lo as i8 as u16);
            format!("${target:04X}")
        }
    };
    (format!("{mnemonic} {operand}"), len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dasm_at(pc: u16, bytes: &[u8]) -> (String, u16) {
        disassemble(pc, |addr| bytes[addr.wrapping_sub(pc) as usize])
    }

    #[test]
    fn addressing_modes() {
        let cases: &[(&[u8], &str)] = &[
            (&[0xEA], "NOP"),
            (&[0xA9, 0x80], "LDA #$80"),
            (&[0xA5, 0x02], "LDA $02"),
            (&[0xB5, 0xF8], "LDA $F8,X"),
            (&[0xB6, 0x78], "LDX $78,Y"),
            (&[0xAD, 0xFF, 0xFF], "LDA $FFFF"),
            (&[0xBD, 0xF1, 0x0F], "LDA $0FF1,X"),
            (&[0xB9, 0x10, 0x0F], "LDA $0F10,Y"),
            (&[0x6C, 0xFF, 0x21], "JMP ($21FF)"),
            (&[0xA1, 0x70], "LDA ($70,X)"),
            (&[0xB1, 0x7F], "LDA ($7F),Y"),
            (&[0x0A], "ASL"),
            (&[0x76, 0x0F], "ROR $0F,X"),
            (&[0x96, 0x10], "STX $10,Y"),
            (&[0xBE, 0x31, 0xFF], "LDX $FF31,Y"),
            (&[0xBC, 0x0F, 0xFF], "LDY $FF0F,X"),
            (&[0x20, 0x05, 0x03], "JSR $0305"),
            (&[0x2C, 0x00, 0x10], "BIT $1000"),
            (&[0xE0, 0x01], "CPX #$01"),
        ];
        for &(bytes, text) in cases {
            assert_eq!(
                dasm_at(0x0200, bytes),
                (text.to_string(), bytes.len() as u16),
                "{bytes:02X?}"
            );
        }
    }

    #[test]
    fn implied_instructions() {
        let cases: &[(u8, &str)] = &[
            (0x00, "BRK"),
            (0x40, "RTI"),
            (0x60, "RTS"),
            (0x08, "PHP"),
            (0x68, "PLA"),
            (0x88, "DEY"),
            (0xE8, "INX"),
            (0x8A, "TXA"),
            (0xAA, "TAX"),
            (0xCA, "DEX"),
            (0x9A, "TXS"),
            (0xBA, "TSX"),
            (0x18, "CLC"),
            (0x58, "CLI"),
            (0x98, "TYA"),
            (0xB8, "CLV"),
            (0xF8, "SED"),
        ];
        for &(op, text) in cases {
            assert_eq!(dasm_at(0, &[op]), (text.to_string(), 1), "{op:02X}");
        }
    }

    #[test]
    fn branch_targets() {
        assert_eq!(dasm_at(0x0200, &[0xD0, 0x04]).0, "BNE $0206");
        assert_eq!(dasm_at(0x0200, &[0xF0, 0x06]).0, "BEQ $0208");
        assert_eq!(dasm_at(0x0207, &[0xF0, 0xF9]).0, "BEQ $0202");
        assert_eq!(dasm_at(0xFFFE, &[0x10, 0x00]).0, "BPL $0000");
    }

    #[test]
    fn undocumented_opcodes() {
        let cases: &[(&[u8], &str)] = &[
            (&[0xA7, 0x10], "LAX $10"),
            (&[0xB7, 0x10], "LAX $10,Y"),
            (&[0xBF, 0x00, 0x10], "LAX $1000,Y"),
            (&[0x87, 0x10], "SAX $10"),
            (&[0xC3, 0x20], "DCP ($20,X)"),
            (&[0xFB, 0x00, 0x10], "ISB $1000,Y"),
            (&[0x0B, 0x0F], "ANC #$0F"),
            (&[0xEB, 0x01], "SBC #$01"),
            (&[0x89, 0x01], "NOP #$01"),
            (&[0x1A], "NOP"),
            (&[0x04, 0x10], "NOP $10"),
            (&[0x1C, 0x00, 0x10], "NOP $1000,X"),
            (&[0x02], "JAM"),
            (&[0xB2], "JAM"),
            (&[0x9C, 0x00, 0x10], "SHY $1000,X"),
            (&[0x9E, 0x00, 0x10], "SHX $1000,Y"),
        ];
        for &(bytes, text) in cases {
            assert_eq!(
                dasm_at(0, bytes),
                (text.to_string(), bytes.len() as u16),
                "{bytes:02X?}"
            );
        }
    }

    #[test]
    fn every_opcode_decodes() {
        for op in 0..=255u8 {
            let (mnemonic, _) = decode(op);
            assert_eq!(mnemonic.len(), 3, "{op:02X}");
        }
    }
}
