//! This module describes a parsed VM command and the fixed vocabulary
//! (operators, segments, registers) shared by the reader and the emitter.
//!
//! Comments are prefixed with `//` and are single-line only.
//! Commands are delimited by newlines.
//!
//! Supported Commands:
//!
//! ```text
//! add | sub | neg | eq | gt | lt | and | or | not
//! push SEGMENT INDEX      ; SEGMENT[INDEX] goes on top of the stack
//! pop SEGMENT INDEX       ; top of the stack goes to SEGMENT[INDEX]
//! label NAME              ; jump target, scoped to the current file
//! goto NAME               ; unconditional jump
//! if-goto NAME            ; pop, jump if the popped value is non-zero
//! function NAME NLOCALS   ; function entry point with NLOCALS zeroed locals
//! call NAME NARGS         ; call NAME with the top NARGS values as arguments
//! return                  ; return the top of the stack to the caller
//! ```
//!
//! Example source file:
//!
//! ```text
//! function Main.double 0
//! push argument 0
//! push argument 0
//! add                 // Top of the stack is now 2 * arg 0
//! return
//! ```

use std::fmt;
use std::str::FromStr;

use super::error::TranslateError;

/// Stack pointer register.
pub const SP: &str = "SP";
/// Scratch registers used by pop and return.
pub const SCRATCH_ADDRESS: &str = "R13";
pub const SCRATCH_RETURN: &str = "R14";

/// Absolute base of the `pointer` segment (THIS, THAT).
pub const POINTER_BASE: u16 = 3;
/// Absolute base of the `temp` segment (R5-R12).
pub const TEMP_BASE: u16 = 5;
/// First stack address, as set by the bootstrap.
pub const STACK_BASE: u16 = 256;
/// Function called by the bootstrap.
pub const ENTRY_FUNCTION: &str = "Sys.init";

/// Largest value a Hack A-instruction can load.
pub const MAX_CONSTANT: u16 = 32767;

/// The saved frame registers, in the order Call pushes them.
pub const FRAME_REGISTERS: [&str; 4] = ["LCL", "ARG", "THIS", "THAT"];

/// Size of a saved frame: the return address plus the four frame registers.
pub const FRAME_SIZE: u16 = 5;

/// Call loads `args + FRAME_SIZE` as a constant, so it must stay loadable.
pub const MAX_CALL_ARGS: u16 = MAX_CONSTANT - FRAME_SIZE;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function(String, u16),
    Call(String, u16),
    Return,
}

impl Instruction {
    pub fn kind(&self) -> Kind {
        use Instruction::*;
        match self {
            Arithmetic(_)     => Kind::Arithmetic,
            Push(_, _)        => Kind::Push,
            Pop(_, _)         => Kind::Pop,
            Label(_)          => Kind::Label,
            Goto(_)           => Kind::Goto,
            IfGoto(_)         => Kind::IfGoto,
            Function(_, _)    => Kind::Function,
            Call(_, _)        => Kind::Call,
            Return            => Kind::Return,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;
        match self {
            Arithmetic(op)          => write!(f, "{}", op),
            Push(segment, index)    => write!(f, "push {} {}", segment, index),
            Pop(segment, index)     => write!(f, "pop {} {}", segment, index),
            Label(name)             => write!(f, "label {}", name),
            Goto(name)              => write!(f, "goto {}", name),
            IfGoto(name)            => write!(f, "if-goto {}", name),
            Function(name, locals)  => write!(f, "function {} {}", name, locals),
            Call(name, args)        => write!(f, "call {} {}", name, args),
            Return                  => write!(f, "return"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Kind {
    Arithmetic,
    Push,
    Pop,
    Label,
    Goto,
    IfGoto,
    Function,
    Return,
    Call,
}

impl Kind {
    /// Maps the first token of a command to its kind.
    /// Every operator name classifies as Arithmetic.
    pub fn classify(keyword: &str) -> Option<Kind> {
        match keyword {
            "push"      => Some(Kind::Push),
            "pop"       => Some(Kind::Pop),
            "label"     => Some(Kind::Label),
            "goto"      => Some(Kind::Goto),
            "if-goto"   => Some(Kind::IfGoto),
            "function"  => Some(Kind::Function),
            "call"      => Some(Kind::Call),
            "return"    => Some(Kind::Return),
            _ if keyword.parse::<ArithmeticOp>().is_ok() => Some(Kind::Arithmetic),
            _ => None,
        }
    }

    /// Number of whitespace-separated tokens a command of this kind has,
    /// including the keyword itself.
    pub fn arity(self) -> usize {
        use Kind::*;
        match self {
            Arithmetic | Return                  => 1,
            Label | Goto | IfGoto                => 2,
            Push | Pop | Function | Call         => 3,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StackOp {
    Push,
    Pop,
}

impl fmt::Display for StackOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StackOp::Push => write!(f, "push"),
            StackOp::Pop  => write!(f, "pop"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn is_unary(self) -> bool {
        matches!(self, ArithmeticOp::Neg | ArithmeticOp::Not)
    }

    /// The jump mnemonic taken when the comparison `x - y` holds.
    /// Returns None for operators that do not compare.
    pub fn jump(self) -> Option<&'static str> {
        match self {
            ArithmeticOp::Eq => Some("JEQ"),
            ArithmeticOp::Gt => Some("JGT"),
            ArithmeticOp::Lt => Some("JLT"),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        use ArithmeticOp::*;
        match self {
            Add => "add",
            Sub => "sub",
            Neg => "neg",
            Eq  => "eq",
            Gt  => "gt",
            Lt  => "lt",
            And => "and",
            Or  => "or",
            Not => "not",
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ArithmeticOp {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ArithmeticOp::*;
        match s {
            "add" => Ok(Add),
            "sub" => Ok(Sub),
            "neg" => Ok(Neg),
            "eq"  => Ok(Eq),
            "gt"  => Ok(Gt),
            "lt"  => Ok(Lt),
            "and" => Ok(And),
            "or"  => Ok(Or),
            "not" => Ok(Not),
            _ => Err(TranslateError::UnknownOperator(s.to_owned())),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
    Static,
}

/// How a segment turns an index into an address.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Addressing {
    /// The index is the value.
    Immediate,
    /// The named register holds a pointer; the index is an offset from it.
    Indirect(&'static str),
    /// The index is an offset from a fixed absolute address.
    Direct(u16),
    /// One symbol per index, named after the current module.
    Module,
}

impl Segment {
    pub fn addressing(self) -> Addressing {
        use Segment::*;
        match self {
            Constant => Addressing::Immediate,
            Local    => Addressing::Indirect("LCL"),
            Argument => Addressing::Indirect("ARG"),
            This     => Addressing::Indirect("THIS"),
            That     => Addressing::Indirect("THAT"),
            Pointer  => Addressing::Direct(POINTER_BASE),
            Temp     => Addressing::Direct(TEMP_BASE),
            Static   => Addressing::Module,
        }
    }

    pub fn name(self) -> &'static str {
        use Segment::*;
        match self {
            Constant => "constant",
            Local    => "local",
            Argument => "argument",
            This     => "this",
            That     => "that",
            Pointer  => "pointer",
            Temp     => "temp",
            Static   => "static",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Segment {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Segment::*;
        match s {
            "constant" => Ok(Constant),
            "local"    => Ok(Local),
            "argument" => Ok(Argument),
            "this"     => Ok(This),
            "that"     => Ok(That),
            "pointer"  => Ok(Pointer),
            "temp"     => Ok(Temp),
            "static"   => Ok(Static),
            _ => Err(TranslateError::UnknownSegment(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_from_str() {
        for op in &["add", "sub", "neg", "eq", "gt", "lt", "and", "or", "not"] {
            let parsed: ArithmeticOp = op.parse().unwrap();
            assert_eq!(parsed.name(), *op);
        }

        match "mul".parse::<ArithmeticOp>() {
            Err(TranslateError::UnknownOperator(name)) => assert_eq!(name, "mul"),
            other => panic!("expected UnknownOperator, got {:?}", other),
        }
        assert!("ADD".parse::<ArithmeticOp>().is_err());
    }

    #[test]
    fn test_segment_from_str() {
        assert_eq!("local".parse::<Segment>().unwrap(), Segment::Local);
        assert_eq!("static".parse::<Segment>().unwrap(), Segment::Static);

        match "heap".parse::<Segment>() {
            Err(TranslateError::UnknownSegment(name)) => assert_eq!(name, "heap"),
            other => panic!("expected UnknownSegment, got {:?}", other),
        }
    }

    #[test]
    fn test_addressing() {
        assert_eq!(Segment::Constant.addressing(), Addressing::Immediate);
        assert_eq!(Segment::Argument.addressing(), Addressing::Indirect("ARG"));
        assert_eq!(Segment::Pointer.addressing(), Addressing::Direct(3));
        assert_eq!(Segment::Temp.addressing(), Addressing::Direct(5));
        assert_eq!(Segment::Static.addressing(), Addressing::Module);
    }

    #[test]
    fn test_operator_classes() {
        assert!(ArithmeticOp::Neg.is_unary());
        assert!(ArithmeticOp::Not.is_unary());
        assert!(!ArithmeticOp::Sub.is_unary());

        assert_eq!(ArithmeticOp::Eq.jump(), Some("JEQ"));
        assert_eq!(ArithmeticOp::Gt.jump(), Some("JGT"));
        assert_eq!(ArithmeticOp::Lt.jump(), Some("JLT"));
        assert_eq!(ArithmeticOp::And.jump(), None);
    }

    #[test]
    fn test_kind_arity() {
        assert_eq!(Kind::classify("if-goto"), Some(Kind::IfGoto));
        assert_eq!(Kind::classify("add"), Some(Kind::Arithmetic));
        assert_eq!(Kind::classify("mul"), None);
        assert_eq!(Kind::classify("Push"), None);
        assert_eq!(Kind::Return.arity(), 1);
        assert_eq!(Kind::Goto.arity(), 2);
        assert_eq!(Kind::Call.arity(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::Push(Segment::Constant, 7).to_string(), "push constant 7");
        assert_eq!(Instruction::IfGoto("LOOP".to_owned()).to_string(), "if-goto LOOP");
        assert_eq!(Instruction::Arithmetic(ArithmeticOp::Lt).to_string(), "lt");
        assert_eq!(Instruction::Return.kind(), Kind::Return);
    }
}
