//! The Emitter writes Hack assembly for one VM command at a time.
//!
//! Register conventions:
//!
//! ```text
//! SP    RAM[0]   address of the next free stack slot
//! LCL   RAM[1]   base of the current function's local segment
//! ARG   RAM[2]   base of the current function's argument segment
//! THIS  RAM[3]   base of the this segment (pointer 0)
//! THAT  RAM[4]   base of the that segment (pointer 1)
//! R5-12          temp segment
//! R13-15         scratch
//! ```
use std::fmt::Display;
use std::io::Write;

use super::command::*;
use super::error::{Result, TranslateError};

pub struct Emitter<W: Write> {
    writer: W,
    /// Disambiguates the labels of comparison operators.
    comparisons: usize,
    /// Disambiguates return-address labels.
    calls: usize,
    module: Option<String>,
    /// Number of machine instructions written, i.e. the next ROM address.
    address: usize,
}

impl<W: Write> Emitter<W> {
    pub fn new(writer: W) -> Self {
        Emitter::with_counters(writer, 0, 0)
    }

    pub fn with_counters(writer: W, comparisons: usize, calls: usize) -> Self {
        Emitter { writer, comparisons, calls, module: None, address: 0 }
    }

    /// Sets the module used to name statics, labels and return addresses.
    /// Counters are not reset.
    pub fn set_module(&mut self, name: &str) {
        debug!("module context is now `{}`", name);
        self.module = Some(name.to_owned());
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn address(&self) -> usize {
        self.address
    }

    /// Flushes the output and returns it. Ends the run.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    pub fn comment(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "// {}", text)?;
        Ok(())
    }

    pub fn instruction(&mut self, instruction: &Instruction) -> Result<()> {
        use Instruction::*;
        match instruction {
            Arithmetic(op)          => self.arithmetic(*op),
            Push(segment, index)    => self.push_pop(StackOp::Push, *segment, *index),
            Pop(segment, index)     => self.push_pop(StackOp::Pop, *segment, *index),
            Label(name)             => self.label(name),
            Goto(name)              => self.goto(name),
            IfGoto(name)            => self.if_goto(name),
            Function(name, locals)  => self.function(name, *locals),
            Call(name, args)        => self.call(name, *args),
            Return                  => self.ret(),
        }
    }

    /// Sets SP to the stack base and calls the entry function.
    pub fn bootstrap(&mut self) -> Result<()> {
        self.load_constant(STACK_BASE)?;
        self.at(SP)?;
        self.asm("M=D")?;
        self.call(ENTRY_FUNCTION, 0)
    }

    pub fn arithmetic(&mut self, op: ArithmeticOp) -> Result<()> {
        if !op.is_unary() {
            // D holds y.
            self.pop_d()?;
        }

        // A points at x.
        self.decrement_sp()?;
        self.top()?;

        match op {
            ArithmeticOp::Add => self.asm("M=D+M")?,
            ArithmeticOp::Sub => self.asm("M=M-D")?,
            ArithmeticOp::And => self.asm("M=D&M")?,
            ArithmeticOp::Or  => self.asm("M=D|M")?,
            ArithmeticOp::Neg => self.asm("M=-M")?,
            ArithmeticOp::Not => self.asm("M=!M")?,
            ArithmeticOp::Eq |
            ArithmeticOp::Gt |
            ArithmeticOp::Lt  => self.comparison(op)?,
        }

        self.increment_sp()
    }

    fn comparison(&mut self, op: ArithmeticOp) -> Result<()> {
        let jump = match op.jump() {
            Some(jump) => jump,
            None => return Err(TranslateError::UnknownOperator(op.to_string())),
        };
        let if_true = format!("IF_TRUE_{}", self.comparisons);
        let end = format!("END_COMP_{}", self.comparisons);

        self.asm("D=M-D")?;
        self.at(&if_true)?;
        self.asm(&format!("D;{}", jump))?;

        self.top()?;
        self.asm("M=0")?;
        self.at(&end)?;
        self.asm("0;JMP")?;

        self.define(&if_true)?;
        self.top()?;
        self.asm("M=-1")?;
        self.define(&end)?;

        self.comparisons += 1;
        Ok(())
    }

    pub fn push_pop(&mut self, op: StackOp, segment: Segment, index: u16) -> Result<()> {
        match op {
            StackOp::Push => self.push(segment, index),
            StackOp::Pop  => self.pop(segment, index),
        }
    }

    fn push(&mut self, segment: Segment, index: u16) -> Result<()> {
        match segment.addressing() {
            Addressing::Immediate => self.load_constant(index)?,
            Addressing::Module => {
                let symbol = self.static_symbol(index)?;
                self.at(&symbol)?;
                self.asm("D=M")?;
            },
            Addressing::Indirect(register) => {
                self.load_constant(index)?;
                self.at(register)?;
                self.asm("A=D+M")?;
                self.asm("D=M")?;
            },
            Addressing::Direct(base) => {
                self.load_constant(index)?;
                self.at(base)?;
                self.asm("A=D+A")?;
                self.asm("D=M")?;
            },
        }
        self.push_d()
    }

    fn pop(&mut self, segment: Segment, index: u16) -> Result<()> {
        let base_to_d = match segment.addressing() {
            Addressing::Immediate => {
                return Err(TranslateError::UnsupportedOperation { operation: StackOp::Pop, segment });
            },
            Addressing::Module => {
                let symbol = self.static_symbol(index)?;
                self.pop_d()?;
                self.at(&symbol)?;
                return self.asm("M=D");
            },
            Addressing::Indirect(register) => {
                self.load_constant(index)?;
                self.at(register)?;
                "D=D+M"
            },
            Addressing::Direct(base) => {
                self.load_constant(index)?;
                self.at(base)?;
                "D=D+A"
            },
        };

        // Park the target address while D carries the popped value.
        self.asm(base_to_d)?;
        self.at(SCRATCH_ADDRESS)?;
        self.asm("M=D")?;

        self.pop_d()?;
        self.at(SCRATCH_ADDRESS)?;
        self.asm("A=M")?;
        self.asm("M=D")
    }

    pub fn label(&mut self, name: &str) -> Result<()> {
        let target = self.scoped(name);
        self.define(&target)
    }

    pub fn goto(&mut self, name: &str) -> Result<()> {
        let target = self.scoped(name);
        self.at(&target)?;
        self.asm("0;JMP")
    }

    /// Pops the top of the stack and jumps if it is non-zero.
    pub fn if_goto(&mut self, name: &str) -> Result<()> {
        let target = self.scoped(name);
        self.pop_d()?;
        self.at(&target)?;
        self.asm("D;JNE")
    }

    /// Function names are global, so the entry point is not scoped.
    pub fn function(&mut self, name: &str, locals: u16) -> Result<()> {
        self.define(name)?;
        for _ in 0..locals {
            self.asm("D=0")?;
            self.push_d()?;
        }
        Ok(())
    }

    pub fn call(&mut self, name: &str, args: u16) -> Result<()> {
        let return_address = self.scoped(&format!("ret.{}", self.calls));
        self.calls += 1;

        self.at(&return_address)?;
        self.asm("D=A")?;
        self.push_d()?;

        for register in FRAME_REGISTERS.iter() {
            self.at(register)?;
            self.asm("D=M")?;
            self.push_d()?;
        }

        // ARG = SP - args - 5
        self.at(SP)?;
        self.asm("D=M")?;
        self.at(u32::from(args) + u32::from(FRAME_SIZE))?;
        self.asm("D=D-A")?;
        self.at("ARG")?;
        self.asm("M=D")?;

        // LCL = SP
        self.at(SP)?;
        self.asm("D=M")?;
        self.at("LCL")?;
        self.asm("M=D")?;

        self.at(name)?;
        self.asm("0;JMP")?;
        self.define(&return_address)
    }

    pub fn ret(&mut self) -> Result<()> {
        // R13 = LCL, the end of the saved frame.
        self.at("LCL")?;
        self.asm("D=M")?;
        self.at(SCRATCH_ADDRESS)?;
        self.asm("M=D")?;

        // R14 = *(R13 - 5)
        self.at(FRAME_SIZE)?;
        self.asm("A=D-A")?;
        self.asm("D=M")?;
        self.at(SCRATCH_RETURN)?;
        self.asm("M=D")?;

        // *ARG = pop()
        self.pop_d()?;
        self.at("ARG")?;
        self.asm("A=M")?;
        self.asm("M=D")?;

        // SP = ARG + 1
        self.at("ARG")?;
        self.asm("D=M+1")?;
        self.at(SP)?;
        self.asm("M=D")?;

        // THAT, THIS, ARG, LCL = *(R13 - 1), ..., *(R13 - 4)
        for (offset, register) in FRAME_REGISTERS.iter().rev().enumerate() {
            self.at(SCRATCH_ADDRESS)?;
            self.asm("D=M")?;
            self.at(offset + 1)?;
            self.asm("A=D-A")?;
            self.asm("D=M")?;
            self.at(register)?;
            self.asm("M=D")?;
        }

        self.at(SCRATCH_RETURN)?;
        self.asm("A=M")?;
        self.asm("0;JMP")
    }

    fn static_symbol(&self, index: u16) -> Result<String> {
        match &self.module {
            Some(module) => Ok(format!("{}.{}", module, index)),
            None => Err(TranslateError::UnboundModule { index }),
        }
    }

    /// Qualifies a label with the current module.
    fn scoped(&self, name: &str) -> String {
        format!("{}${}", self.module.as_deref().unwrap_or(""), name)
    }

    fn load_constant(&mut self, value: u16) -> Result<()> {
        self.at(value)?;
        self.asm("D=A")
    }

    /// Points A at the top of the stack.
    fn top(&mut self) -> Result<()> {
        self.at(SP)?;
        self.asm("A=M")
    }

    fn pop_d(&mut self) -> Result<()> {
        self.at(SP)?;
        self.asm("AM=M-1")?;
        self.asm("D=M")
    }

    fn push_d(&mut self) -> Result<()> {
        self.top()?;
        self.asm("M=D")?;
        self.increment_sp()
    }

    fn increment_sp(&mut self) -> Result<()> {
        self.at(SP)?;
        self.asm("M=M+1")
    }

    fn decrement_sp(&mut self) -> Result<()> {
        self.at(SP)?;
        self.asm("M=M-1")
    }

    fn at<T: Display>(&mut self, symbol: T) -> Result<()> {
        self.asm(&format!("@{}", symbol))
    }

    fn asm(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        self.address += 1;
        Ok(())
    }

    fn define(&mut self, label: &str) -> Result<()> {
        writeln!(self.writer, "({})", label)?;
        Ok(())
    }
}
