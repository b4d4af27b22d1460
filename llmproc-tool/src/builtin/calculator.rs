//! Arithmetic expression evaluation.

use serde::Deserialize;

use crate::registry::ToolRegistry;
use crate::tool::{Tool, ToolCtx};

/// Install the calculator into `registry`.
pub fn register(registry: &mut ToolRegistry) {
    registry.register(Calculator);
}

/// Evaluates arithmetic expressions.
pub struct Calculator;

/// Arguments for the calculator.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculatorArgs {
    /// The expression to evaluate, e.g. `"2 + 2 * (3 - 1)"`.
    pub expression: String,
}

/// Expression evaluation failures.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    /// Unexpected character or token.
    #[error("unexpected {0:?} at position {1}")]
    Unexpected(char, usize),
    /// The expression ended mid-term.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Input after a complete expression.
    #[error("trailing input at position {0}")]
    Trailing(usize),
}

impl Tool for Calculator {
    const NAME: &'static str = "calculator";
    type Args = CalculatorArgs;
    type Output = String;
    type Error = CalcError;

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports +, -, *, /, %, parentheses, and unary minus."
    }

    async fn call(&self, args: CalculatorArgs, _ctx: &ToolCtx) -> Result<String, CalcError> {
        let value = evaluate(&args.expression)?;
        Ok(format_number(value))
    }
}

/// Format results without a spurious `.0` on integral values.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Evaluate an expression string.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut parser = Parser { chars, pos: 0 };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(CalcError::Trailing(parser.pos));
    }
    Ok(value)
}

/// Recursive-descent parser over `expr := term (('+'|'-') term)*`,
/// `term := factor (('*'|'/'|'%') factor)*`, `factor := '-' factor | atom`.
struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                '+' => {
                    self.pos += 1;
                    value += self.term()?;
                }
                '-' => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                '*' => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                '/' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= divisor;
                }
                '%' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value %= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(c) => Err(CalcError::Unexpected(c, self.pos)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(CalcError::Unexpected(c, self.pos)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| CalcError::Unexpected(self.chars[start], start))
    }
}
