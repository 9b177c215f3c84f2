//! Arithmetic calculator for the `calc` tool.
//!
//! Only numbers, the four binary operators, unary minus and parentheses are
//! accepted. Integers stay integral until a division or an overflow turns
//! the value into a float.
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

use super::{ToolArgs, ToolHandler};
use crate::errors::{ToolError, ToolResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("Expresión no permitida: {0}")]
    NotAllowed(String),

    #[error("división por cero")]
    DivisionByZero,

    #[error("resultado no finito")]
    NotFinite,
}

/// A calculator value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    fn checked(self) -> Result<Number, CalcError> {
        match self {
            Number::Float(value) if !value.is_finite() => Err(CalcError::NotFinite),
            other => Ok(other),
        }
    }

    fn neg(self) -> Number {
        match self {
            Number::Int(value) => value
                .checked_neg()
                .map(Number::Int)
                .unwrap_or(Number::Float(-(value as f64))),
            Number::Float(value) => Number::Float(-value),
        }
    }

    fn add(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map(Number::Int)
                .unwrap_or(Number::Float(a as f64 + b as f64)),
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        }
    }

    fn sub(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_sub(b)
                .map(Number::Int)
                .unwrap_or(Number::Float(a as f64 - b as f64)),
            (a, b) => Number::Float(a.as_f64() - b.as_f64()),
        }
    }

    fn mul(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map(Number::Int)
                .unwrap_or(Number::Float(a as f64 * b as f64)),
            (a, b) => Number::Float(a.as_f64() * b.as_f64()),
        }
    }

    fn div(self, rhs: Number) -> Result<Number, CalcError> {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(CalcError::DivisionByZero);
        }
        Ok(Number::Float(self.as_f64() / divisor))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{}", value),
            // Debug keeps the fraction on whole floats, 4.0 rather than 4
            Number::Float(value) => write!(f, "{:?}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(Number),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let (number, next) = scan_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = next;
            }
            other => {
                return Err(CalcError::NotAllowed(format!(
                    "carácter inesperado '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

/// Scan a decimal literal starting at `start`, returning it and the index
/// just past it
fn scan_number(chars: &[char], start: usize) -> Result<(Number, usize), CalcError> {
    let mut end = start;
    let mut is_float = false;

    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end < chars.len() && chars[end] == '.' {
        is_float = true;
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < chars.len() && (chars[end] == 'e' || chars[end] == 'E') {
        let mut exp = end + 1;
        if exp < chars.len() && (chars[exp] == '+' || chars[exp] == '-') {
            exp += 1;
        }
        if exp < chars.len() && chars[exp].is_ascii_digit() {
            while exp < chars.len() && chars[exp].is_ascii_digit() {
                exp += 1;
            }
            is_float = true;
            end = exp;
        }
    }

    let literal: String = chars[start..end].iter().collect();
    if literal == "." {
        return Err(CalcError::NotAllowed("número inválido '.'".to_string()));
    }

    let number = if is_float {
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| CalcError::NotAllowed(format!("número inválido '{}'", literal)))?
    } else {
        match literal.parse::<i64>() {
            Ok(value) => Number::Int(value),
            // Literals past the integer range are kept as floats
            Err(_) => literal
                .parse::<f64>()
                .map(Number::Float)
                .map_err(|_| CalcError::NotAllowed(format!("número inválido '{}'", literal)))?,
        }
    };

    Ok((number, end))
}

/// Deepest nesting of parentheses and unary minus accepted
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::NotAllowed("expresión demasiado anidada".to_string()));
        }
        Ok(())
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = value.add(self.term()?).checked()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = value.sub(self.term()?).checked()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Number, CalcError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = value.mul(self.unary()?).checked()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    value = value.div(self.unary()?)?.checked()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := '-' unary | primary
    fn unary(&mut self) -> Result<Number, CalcError> {
        if self.peek() == Some(Token::Minus) {
            self.pos += 1;
            self.descend()?;
            let value = self.unary()?;
            self.depth -= 1;
            return Ok(value.neg());
        }
        self.primary()
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<Number, CalcError> {
        match self.next() {
            Some(Token::Number(number)) => Ok(number),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalcError::NotAllowed("falta ')'".to_string())),
                }
            }
            Some(_) => Err(CalcError::NotAllowed("operador inesperado".to_string())),
            None => Err(CalcError::NotAllowed("expresión incompleta".to_string())),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expr: &str) -> Result<Number, CalcError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(CalcError::NotAllowed("expresión vacía".to_string()));
    }

    let mut parser = Parser::new(tokens);
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(CalcError::NotAllowed("sobran elementos".to_string()));
    }
    value.checked()
}

/// The `calc` tool
#[derive(Debug, Clone, Copy, Default)]
pub struct CalcTool;

#[async_trait]
impl ToolHandler for CalcTool {
    async fn invoke(&self, args: ToolArgs) -> ToolResult<Value> {
        match args {
            ToolArgs::Calc(args) => {
                let result = evaluate(&args.expr).map_err(|e| ToolError::failed("calc", e))?;
                Ok(json!({ "result": result }))
            }
            other => Err(other.mismatch("calc")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::CalcArgs;

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(evaluate("2+2").unwrap(), Number::Int(4));
        assert_eq!(evaluate("12*(3+4)").unwrap(), Number::Int(84));
        assert_eq!(evaluate("10 - 2 * 3").unwrap(), Number::Int(4));
        assert_eq!(evaluate("-(3 - 5)").unwrap(), Number::Int(2));
        assert_eq!(evaluate("2--2").unwrap(), Number::Int(4));
    }

    #[test]
    fn test_division_yields_float() {
        assert_eq!(evaluate("7/2").unwrap(), Number::Float(3.5));
        assert_eq!(evaluate("8/4").unwrap(), Number::Float(2.0));
        assert_eq!(evaluate("1.5*2").unwrap(), Number::Float(3.0));
        assert_eq!(evaluate("1e3").unwrap(), Number::Float(1000.0));
        assert_eq!(evaluate(".5 + 1").unwrap(), Number::Float(1.5));
    }

    #[test]
    fn test_overflow_promotes_to_float() {
        let value = evaluate("9223372036854775807 + 1").unwrap();
        assert!(matches!(value, Number::Float(v) if v > 9.2e18));
        assert!(matches!(
            evaluate("99999999999999999999").unwrap(),
            Number::Float(_)
        ));
    }

    #[test]
    fn test_rejected_expressions() {
        assert_eq!(evaluate("1/0").unwrap_err(), CalcError::DivisionByZero);
        assert_eq!(evaluate("1/(2-2.0)").unwrap_err(), CalcError::DivisionByZero);
        for expr in ["", "2**3", "+2", "2 3", "(1+2", "1+2)", "abs(2)", "__import__('os')", "."] {
            assert!(
                matches!(evaluate(expr), Err(CalcError::NotAllowed(_))),
                "{:?} should be rejected",
                expr
            );
        }
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            evaluate(&parens).unwrap_err(),
            CalcError::NotAllowed("expresión demasiado anidada".to_string())
        );

        let minus = format!("{}1", "-".repeat(10_000));
        assert_eq!(
            evaluate(&minus).unwrap_err(),
            CalcError::NotAllowed("expresión demasiado anidada".to_string())
        );
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let parens = format!("{}2{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&parens).unwrap(), Number::Int(2));
        assert_eq!(evaluate(&format!("{}3", "-".repeat(100))).unwrap(), Number::Int(3));
        // Sibling groups do not add up
        let siblings = vec!["(1)"; 400].join("+");
        assert_eq!(evaluate(&siblings).unwrap(), Number::Int(400));
    }

    #[test]
    fn test_display_matches_result_kind() {
        assert_eq!(Number::Int(4).to_string(), "4");
        assert_eq!(Number::Float(4.0).to_string(), "4.0");
        assert_eq!(Number::Float(3.5).to_string(), "3.5");
    }

    #[tokio::test]
    async fn test_calc_tool_result_shape() {
        let result = CalcTool
            .invoke(ToolArgs::Calc(CalcArgs {
                expr: "2+2".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(result, json!({"result": 4}));
        assert_eq!(result.to_string(), r#"{"result":4}"#);
    }

    #[tokio::test]
    async fn test_calc_tool_failure() {
        let err = CalcTool
            .invoke(ToolArgs::Calc(CalcArgs {
                expr: "1/0".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "tool 'calc' failed: división por cero");
    }
}
