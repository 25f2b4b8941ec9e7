//! A small Hack machine used by the tests: it assembles emitted text
//! and executes it against a 32K word RAM.
use std::collections::HashMap;

const RAM_SIZE: usize = 32768;
const FIRST_VARIABLE: u16 = 16;

#[derive(Clone, Debug)]
enum Op {
    Address(u16),
    Compute {
        dest: String,
        comp: String,
        jump: Option<String>,
    },
}

pub struct Machine {
    pub ram: Vec<i16>,
    rom: Vec<Op>,
    symbols: HashMap<String, u16>,
    a: i16,
    d: i16,
    pc: usize,
}

impl Machine {
    /// Assembles the given program. Panics on anything that is not valid Hack,
    /// so a test fails loudly when the emitter writes an unknown mnemonic.
    pub fn load(asm: &str) -> Self {
        let mut symbols: HashMap<String, u16> = HashMap::new();
        for (name, address) in &[("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4),
                                 ("SCREEN", 16384), ("KBD", 24576)] {
            symbols.insert(name.to_string(), *address);
        }
        for r in 0..16 {
            symbols.insert(format!("R{}", r), r);
        }

        // First pass: label addresses.
        let mut lines: Vec<&str> = Vec::new();
        for raw in asm.lines() {
            let line = match raw.find("//") {
                Some(start) => &raw[..start],
                None => raw,
            }.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('(') && line.ends_with(')') {
                let label = &line[1..line.len() - 1];
                assert!(!symbols.contains_key(label), "label `{}` defined twice", label);
                symbols.insert(label.to_owned(), lines.len() as u16);
            } else {
                lines.push(line);
            }
        }

        // Second pass: instructions, allocating variables as they appear.
        let mut next_variable = FIRST_VARIABLE;
        let mut rom = Vec::with_capacity(lines.len());
        for line in lines {
            if line.starts_with('@') {
                let symbol = &line[1..];
                let value = match symbol.parse::<u16>() {
                    Ok(value) => {
                        assert!(value <= 32767, "constant {} out of range", value);
                        value
                    },
                    Err(_) => *symbols.entry(symbol.to_owned()).or_insert_with(|| {
                        next_variable += 1;
                        next_variable - 1
                    }),
                };
                rom.push(Op::Address(value));
            } else {
                let (rest, jump) = match line.find(';') {
                    Some(i) => (&line[..i], Some(line[i + 1..].to_owned())),
                    None => (line, None),
                };
                let (dest, comp) = match rest.find('=') {
                    Some(i) => (&rest[..i], &rest[i + 1..]),
                    None => ("", rest),
                };
                rom.push(Op::Compute { dest: dest.to_owned(), comp: comp.to_owned(), jump });
            }
        }

        Machine { ram: vec![0; RAM_SIZE], rom, symbols, a: 0, d: 0, pc: 0 }
    }

    /// Where the assembler placed a label or variable.
    pub fn address_of(&self, symbol: &str) -> Option<u16> {
        self.symbols.get(symbol).copied()
    }

    pub fn sp(&self) -> usize {
        self.ram[0] as usize
    }

    pub fn top(&self) -> i16 {
        self.ram[self.sp() - 1]
    }

    /// Runs until execution falls off the end of the program or reaches a
    /// jump to itself. Panics after `max_steps`.
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() || !self.step() {
                return;
            }
        }
        panic!("program did not halt within {} steps", max_steps);
    }

    fn step(&mut self) -> bool {
        let op = self.rom[self.pc].clone();
        match op {
            Op::Address(value) => {
                self.a = value as i16;
                self.pc += 1;
            },
            Op::Compute { dest, comp, jump } => {
                let address = (self.a as u16 as usize) % RAM_SIZE;
                let value = self.compute(&comp, address);

                if dest.contains('M') {
                    self.ram[address] = value;
                }
                if dest.contains('A') {
                    self.a = value;
                }
                if dest.contains('D') {
                    self.d = value;
                }

                let taken = match jump.as_deref() {
                    None        => false,
                    Some("JGT") => value > 0,
                    Some("JEQ") => value == 0,
                    Some("JGE") => value >= 0,
                    Some("JLT") => value < 0,
                    Some("JNE") => value != 0,
                    Some("JLE") => value <= 0,
                    Some("JMP") => true,
                    Some(other) => panic!("unknown jump `{}`", other),
                };

                if taken {
                    let target = address;
                    if target + 1 == self.pc {
                        return false;
                    }
                    self.pc = target;
                } else {
                    self.pc += 1;
                }
            },
        }
        true
    }

    fn compute(&self, comp: &str, address: usize) -> i16 {
        let x = self.d;
        let y = if comp.contains('M') { self.ram[address] } else { self.a };
        match comp.replace('M', "A").as_str() {
            "0"         => 0,
            "1"         => 1,
            "-1"        => -1,
            "D"         => x,
            "A"         => y,
            "!D"        => !x,
            "!A"        => !y,
            "-D"        => x.wrapping_neg(),
            "-A"        => y.wrapping_neg(),
            "D+1"       => x.wrapping_add(1),
            "A+1"       => y.wrapping_add(1),
            "D-1"       => x.wrapping_sub(1),
            "A-1"       => y.wrapping_sub(1),
            "D+A"       => x.wrapping_add(y),
            "D-A"       => x.wrapping_sub(y),
            "A-D"       => y.wrapping_sub(x),
            "D&A"       => x & y,
            "D|A"       => x | y,
            other => panic!("`{}` is not a Hack computation", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_two_registers() {
        let mut machine = Machine::load("
            @2
            D=A
            @3
            D=D+A
            @0
            M=D
        ");
        machine.run(100);
        assert_eq!(machine.ram[0], 5);
    }

    #[test]
    fn test_labels_and_variables() {
        let mut machine = Machine::load("
            @10
            D=A
            @counter
            M=D
        (LOOP)
            @counter
            MD=M-1
            @LOOP
            D;JGT
        (END)
            @END
            0;JMP
        ");
        machine.run(1000);
        assert_eq!(machine.address_of("counter"), Some(16));
        assert_eq!(machine.address_of("LOOP"), Some(4));
        assert_eq!(machine.ram[16], 0);
    }

    #[test]
    #[should_panic]
    fn test_rejects_non_canonical_computation() {
        let mut machine = Machine::load("M=M&D");
        machine.run(10);
    }
}
