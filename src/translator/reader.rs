//! The Reader turns VM source text into a stream of Statements,
//! one command per non-blank line.
use std::io::{BufRead, BufReader, Lines, Read};

use regex::Regex;

use super::command::{Instruction, Kind, MAX_CALL_ARGS, MAX_CONSTANT};
use super::error::{Result, TranslateError};

/// Hack symbols: letters, digits, `_`, `.`, `$` and `:`, not starting with a digit.
const SYMBOL_PATTERN: &str = r"^[A-Za-z_.$:][A-Za-z0-9_.$:]*$";

/// A parsed command and where it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Statement {
    /// 1-based source line.
    pub line: usize,
    /// The command text with comments and surrounding whitespace removed.
    pub text: String,
    pub instruction: Instruction,
}

pub struct Reader<R: Read> {
    lines: Lines<BufReader<R>>,
    line: usize,
    symbol: Regex,
}

impl<R: Read> Reader<R> {
    pub fn new(reader: R) -> Self {
        Reader {
            lines: BufReader::new(reader).lines(),
            line: 0,
            symbol: symbol_regex(),
        }
    }

    /// The last line read, 1-based. Zero before anything was read.
    pub fn line(&self) -> usize {
        self.line
    }

    fn parse(&self, text: &str) -> Result<Instruction> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let keyword = tokens[0];

        let kind = match Kind::classify(keyword) {
            Some(kind) => kind,
            None => return Err(self.malformed(format!("unrecognized command `{}`", keyword))),
        };

        if tokens.len() != kind.arity() {
            return Err(self.malformed(format!(
                "`{}` takes {} argument(s), found {}",
                keyword,
                kind.arity() - 1,
                tokens.len() - 1
            )));
        }

        let instruction = match kind {
            Kind::Arithmetic => Instruction::Arithmetic(keyword.parse()?),
            Kind::Push       => Instruction::Push(tokens[1].parse()?, self.number(tokens[2], MAX_CONSTANT)?),
            Kind::Pop        => Instruction::Pop(tokens[1].parse()?, self.number(tokens[2], MAX_CONSTANT)?),
            Kind::Label      => Instruction::Label(self.symbol(tokens[1])?),
            Kind::Goto       => Instruction::Goto(self.symbol(tokens[1])?),
            Kind::IfGoto     => Instruction::IfGoto(self.symbol(tokens[1])?),
            Kind::Function   => Instruction::Function(self.symbol(tokens[1])?, self.number(tokens[2], MAX_CONSTANT)?),
            Kind::Call       => Instruction::Call(self.symbol(tokens[1])?, self.number(tokens[2], MAX_CALL_ARGS)?),
            Kind::Return     => Instruction::Return,
        };

        Ok(instruction)
    }

    /// Plain decimal digits only, at most `max`.
    fn number(&self, token: &str, max: u16) -> Result<u16> {
        let digits = token.bytes().all(|b| b.is_ascii_digit());
        match token.parse::<u16>() {
            Ok(value) if digits && value <= max => Ok(value),
            _ => Err(self.malformed(format!(
                "`{}` is not a number in 0..={}",
                token, max
            ))),
        }
    }

    fn symbol(&self, token: &str) -> Result<String> {
        if self.symbol.is_match(token) {
            Ok(token.to_owned())
        } else {
            Err(self.malformed(format!("`{}` is not a valid symbol", token)))
        }
    }

    fn malformed(&self, reason: String) -> TranslateError {
        TranslateError::MalformedInstruction { line: self.line, reason }
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = Result<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e.into())),
            };

            let text = strip_comment(&raw);
            if text.is_empty() {
                continue;
            }

            let statement = self.parse(text).map(|instruction| Statement {
                line: self.line,
                text: text.to_owned(),
                instruction,
            });
            if let Err(e) = &statement {
                debug!("rejected line {}: `{}`: {}", self.line, text, e);
            }
            return Some(statement);
        }
    }
}

/// Whether `name` can be used as a Hack symbol.
pub fn is_symbol(name: &str) -> bool {
    symbol_regex().is_match(name)
}

fn symbol_regex() -> Regex {
    Regex::new(SYMBOL_PATTERN).expect("symbol pattern is a valid regex")
}

/// Cuts the line at the first comment marker and trims it.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(start) => &line[..start],
        None => line,
    }
    .trim()
}
