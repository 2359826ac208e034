//! Parser for condition expressions.
//!
//! Grammar:
//!
//! ```text
//! expr     := call | variable | string | boolean
//! call     := name "(" [expr ("," expr)*] ")"
//! variable := "$" name
//! string   := '"' chars '"' | "'" chars "'"
//! boolean  := "true" | "false"
//! name     := [A-Za-z0-9_-]+
//! ```

use super::{Condition, Value};

/// Maximum nesting of function calls.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Syntax error in a condition expression.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConditionParseError {
    /// Input ended before the expression was complete.
    #[error("unexpected end of condition expression")]
    UnexpectedEnd,
    /// A character that cannot start or continue the expression.
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// Byte offset in the source.
        position: usize,
    },
    /// Unknown function name.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    /// Function called with the wrong number of arguments.
    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        /// Function name.
        name: String,
        /// Expected argument count description.
        expected: &'static str,
        /// Actual argument count.
        found: usize,
    },
    /// Function calls nested deeper than [`MAX_NESTING_DEPTH`].
    #[error("condition nested deeper than {limit} calls at position {position}")]
    TooDeep {
        /// Maximum allowed nesting.
        limit: usize,
        /// Byte offset of the call that exceeded it.
        position: usize,
    },
    /// Trailing input after a complete expression.
    #[error("unexpected trailing input at position {0}")]
    TrailingInput(usize),
}

pub(super) fn parse(source: &str) -> Result<Condition, ConditionParseError> {
    let mut parser = Parser {
        source,
        pos: 0,
        depth: 0,
    };
    let condition = parser.expr()?;
    parser.skip_whitespace();
    if parser.pos < source.len() {
        return Err(ConditionParseError::TrailingInput(parser.pos));
    }
    Ok(condition)
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ConditionParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(found) => Err(ConditionParseError::UnexpectedChar {
                found,
                position: self.pos,
            }),
            None => Err(ConditionParseError::UnexpectedEnd),
        }
    }

    fn name(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    fn expr(&mut self) -> Result<Condition, ConditionParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ConditionParseError::UnexpectedEnd),
            Some('$') => {
                self.bump();
                let position = self.pos;
                let name = self.name();
                if name.is_empty() {
                    return Err(self.unexpected_at(position));
                }
                Ok(Condition::Variable(name.to_owned()))
            }
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                self.string(quote)
                    .map(|s| Condition::Literal(Value::Str(s)))
            }
            Some(c) if c.is_ascii_alphanumeric() => {
                let name = self.name().to_owned();
                match name.as_str() {
                    "true" => Ok(Condition::Literal(Value::Bool(true))),
                    "false" => Ok(Condition::Literal(Value::Bool(false))),
                    _ => self.call(name),
                }
            }
            Some(found) => Err(ConditionParseError::UnexpectedChar {
                found,
                position: self.pos,
            }),
        }
    }

    fn unexpected_at(&self, position: usize) -> ConditionParseError {
        match self.source[position..].chars().next() {
            Some(found) => ConditionParseError::UnexpectedChar { found, position },
            None => ConditionParseError::UnexpectedEnd,
        }
    }

    fn string(&mut self, quote: char) -> Result<String, ConditionParseError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(ConditionParseError::UnexpectedEnd),
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(ConditionParseError::UnexpectedEnd),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }

    fn call(&mut self, name: String) -> Result<Condition, ConditionParseError> {
        let position = self.pos - name.len();
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ConditionParseError::TooDeep {
                limit: MAX_NESTING_DEPTH,
                position,
            });
        }
        self.depth += 1;
        let result = self.call_args(name);
        self.depth -= 1;
        result
    }

    fn call_args(&mut self, name: String) -> Result<Condition, ConditionParseError> {
        self.expect('(')?;
        let mut args = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
        } else {
            loop {
                args.push(self.expr()?);
                self.skip_whitespace();
                match self.bump() {
                    Some(',') => {}
                    Some(')') => break,
                    Some(found) => {
                        return Err(ConditionParseError::UnexpectedChar {
                            found,
                            position: self.pos - found.len_utf8(),
                        });
                    }
                    None => return Err(ConditionParseError::UnexpectedEnd),
                }
            }
        }

        build_call(name, args)
    }
}

fn build_call(name: String, mut args: Vec<Condition>) -> Result<Condition, ConditionParseError> {
    let arity = |expected: &'static str, found: usize, name: String| ConditionParseError::Arity {
        name,
        expected,
        found,
    };

    match name.as_str() {
        "equals" | "not_equals" => {
            if args.len() != 2 {
                return Err(arity("2", args.len(), name.clone()));
            }
            let right = Box::new(args.pop().unwrap_or(Condition::Literal(Value::Null)));
            let left = Box::new(args.pop().unwrap_or(Condition::Literal(Value::Null)));
            if name == "equals" {
                Ok(Condition::Equals(left, right))
            } else {
                Ok(Condition::NotEquals(left, right))
            }
        }
        "and" | "or" => {
            if args.is_empty() {
                return Err(arity("at least 1", 0, name.clone()));
            }
            if name == "and" {
                Ok(Condition::And(args))
            } else {
                Ok(Condition::Or(args))
            }
        }
        "not" => match <[Condition; 1]>::try_from(args) {
            Ok([operand]) => Ok(Condition::Not(Box::new(operand))),
            Err(args) => Err(arity("1", args.len(), name.clone())),
        },
        _ => Err(ConditionParseError::UnknownFunction(name.clone())),
    }
}
