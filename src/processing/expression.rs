//! Arithmetic captcha evaluation.
//!
//! Recognized text is reduced to digits, `+ - * / ( )` and evaluated by a
//! small recursive descent parser. Nothing but arithmetic is ever executed.
//!
//! Grammar (Python precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/' | '//') factor)*
//! factor := ('+' | '-') factor | power
//! power  := atom ('**' factor)?
//! atom   := INT | '(' expr ')'
//! ```

use crate::error::{CaptchaError, Result};
use crate::models::Number;

/// Deepest allowed nesting of parentheses, unary signs and exponents
pub const MAX_NESTING: usize = 200;

/// Cut everything from the first `=` and drop characters outside the whitelist
pub fn sanitize(text: &str) -> String {
    let left = text.split('=').next().unwrap_or_default();
    left.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')'))
        .collect()
}

/// Sanitize and evaluate recognized text
pub fn evaluate(text: &str) -> Result<Number> {
    let expression = sanitize(text);
    if expression.is_empty() {
        return Err(CaptchaError::NoExpression(text.to_string()));
    }

    evaluate_sanitized(&expression).map_err(|reason| CaptchaError::Evaluation {
        expression,
        reason,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Int(i64),
    Plus,
    Minus,
    Star,
    Slash,
    FloorDiv,
    Pow,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let token = match c {
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                if literal.len() > 1 && literal.starts_with('0') && literal.chars().any(|d| d != '0') {
                    return Err(format!("leading zeros in integer literal {}", literal));
                }
                let value = literal
                    .parse::<i64>()
                    .map_err(|_| format!("integer literal {} is too large", literal))?;
                tokens.push(Token::Int(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if next == Some('*') => {
                i += 1;
                Token::Pow
            }
            '*' => Token::Star,
            '/' if next == Some('/') => {
                i += 1;
                Token::FloorDiv
            }
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => return Err(format!("unexpected character {:?}", other)),
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

fn evaluate_sanitized(expression: &str) -> std::result::Result<Number, String> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    if let Some(token) = parser.peek() {
        return Err(format!("unexpected {:?} at token {}", token, parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// Run `f` one nesting level deeper, refusing to recurse past the limit
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> std::result::Result<T, String>,
    ) -> std::result::Result<T, String> {
        if self.depth >= MAX_NESTING {
            return Err(format!("expression nested deeper than {} levels", MAX_NESTING));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> std::result::Result<Number, String> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { add(value, rhs)? } else { sub(value, rhs)? };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<Number, String> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = match op {
                Token::Star => mul(value, rhs)?,
                Token::Slash => div(value, rhs)?,
                _ => floor_div(value, rhs)?,
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> std::result::Result<Number, String> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::factor)
            }
            Some(Token::Minus) => {
                self.pos += 1;
                neg(self.nested(Self::factor)?)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> std::result::Result<Number, String> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            // Right associative: the exponent is itself a factor
            let exponent = self.nested(Self::factor)?;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> std::result::Result<Number, String> {
        match self.advance() {
            Some(Token::Int(v)) => Ok(Number::Int(v)),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("unbalanced parentheses".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected {:?}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn overflow() -> String {
    "integer overflow".to_string()
}

fn finite(value: f64) -> std::result::Result<Number, String> {
    if value.is_finite() {
        Ok(Number::Float(value))
    } else {
        Err("result out of range".to_string())
    }
}

fn add(a: Number, b: Number) -> std::result::Result<Number, String> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_add(y).map(Number::Int).ok_or_else(overflow),
        _ => finite(a.as_f64() + b.as_f64()),
    }
}

fn sub(a: Number, b: Number) -> std::result::Result<Number, String> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_sub(y).map(Number::Int).ok_or_else(overflow),
        _ => finite(a.as_f64() - b.as_f64()),
    }
}

fn mul(a: Number, b: Number) -> std::result::Result<Number, String> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_mul(y).map(Number::Int).ok_or_else(overflow),
        _ => finite(a.as_f64() * b.as_f64()),
    }
}

fn neg(a: Number) -> std::result::Result<Number, String> {
    match a {
        Number::Int(x) => x.checked_neg().map(Number::Int).ok_or_else(overflow),
        Number::Float(x) => Ok(Number::Float(-x)),
    }
}

/// True division; exact integer quotients stay integers
fn div(a: Number, b: Number) -> std::result::Result<Number, String> {
    if b.as_f64() == 0.0 {
        return Err("division by zero".to_string());
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) if x.checked_rem(y) == Some(0) => {
            x.checked_div(y).map(Number::Int).ok_or_else(overflow)
        }
        _ => finite(a.as_f64() / b.as_f64()),
    }
}

fn floor_div(a: Number, b: Number) -> std::result::Result<Number, String> {
    if b.as_f64() == 0.0 {
        return Err("integer division by zero".to_string());
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let q = x.checked_div(y).ok_or_else(overflow)?;
            if x % y != 0 && ((x < 0) != (y < 0)) {
                Ok(Number::Int(q - 1))
            } else {
                Ok(Number::Int(q))
            }
        }
        _ => finite((a.as_f64() / b.as_f64()).floor()),
    }
}

fn pow(base: Number, exponent: Number) -> std::result::Result<Number, String> {
    match (base, exponent) {
        (Number::Int(x), Number::Int(e)) if e >= 0 => {
            let e = u32::try_from(e).map_err(|_| overflow())?;
            x.checked_pow(e).map(Number::Int).ok_or_else(overflow)
        }
        _ => {
            if base.as_f64() == 0.0 && exponent.as_f64() < 0.0 {
                return Err("zero cannot be raised to a negative power".to_string());
            }
            finite(base.as_f64().powf(exponent.as_f64()))
        }
    }
}
