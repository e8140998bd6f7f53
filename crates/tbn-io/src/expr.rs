//! Safe arithmetic for parametrized concentrations.
//!
//! `.tbn` concentration fields may contain `{{expr}}` tokens whose
//! expressions are evaluated against a user-supplied variable map. The
//! grammar is deliberately tiny: decimal literals, variables, `+ - * /`,
//! right-associative `**`, unary minus, and parentheses. Nothing else.

use std::collections::HashMap;
use tbn_core::{TbnError, TbnResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> TbnResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if bytes.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Pow);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
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
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == '.') {
                    i += 1;
                }
                let text: String = bytes[start..i].iter().collect();
                let value: f64 = text
                    .parse()
                    .map_err(|_| TbnError::Parse(format!("bad number `{text}` in expression")))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_alphanumeric() || bytes[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(bytes[start..i].iter().collect()));
            }
            other => {
                return Err(TbnError::Parse(format!(
                    "unexpected character `{other}` in expression"
                )))
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    vars: &'a HashMap<String, f64>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn sum(&mut self) -> TbnResult<f64> {
        let mut acc = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.bump();
                    acc += self.term()?;
                }
                Token::Minus => {
                    self.bump();
                    acc -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> TbnResult<f64> {
        let mut acc = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.bump();
                    acc *= self.factor()?;
                }
                Token::Slash => {
                    self.bump();
                    acc /= self.factor()?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn factor(&mut self) -> TbnResult<f64> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.bump();
            return Ok(-self.factor()?);
        }
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Pow)) {
            self.bump();
            // Right associative; the exponent may itself be signed.
            let exponent = self.factor()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> TbnResult<f64> {
        match self.bump() {
            Some(Token::Number(v)) => Ok(*v),
            Some(Token::Ident(name)) => self.vars.get(name).copied().ok_or_else(|| {
                TbnError::Parse(format!("undefined variable `{name}` in expression"))
            }),
            Some(Token::LParen) => {
                let value = self.sum()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(TbnError::Parse("unbalanced parenthesis in expression".into())),
                }
            }
            other => Err(TbnError::Parse(format!(
                "unexpected token {other:?} in expression"
            ))),
        }
    }
}

/// Evaluate one expression against the variable map.
pub fn eval_expr(input: &str, vars: &HashMap<String, f64>) -> TbnResult<f64> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(TbnError::Parse("empty expression".into()));
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        vars,
    };
    let value = parser.sum()?;
    if parser.pos != tokens.len() {
        return Err(TbnError::Parse(format!(
            "trailing input in expression `{input}`"
        )));
    }
    Ok(value)
}

/// Replace every `{{expr}}` occurrence in `field` with its evaluated value.
pub fn substitute(field: &str, vars: &HashMap<String, f64>) -> TbnResult<String> {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| TbnError::Parse(format!("unterminated `{{{{` in `{field}`")))?;
        out.push_str(&rest[..start]);
        let value = eval_expr(&after[..end], vars)?;
        out.push_str(&format!("{value}"));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, f64> {
        HashMap::from([("x".to_string(), 20.0), ("y".to_string(), 10.0)])
    }

    #[test]
    fn test_literals_and_precedence() {
        let v = HashMap::new();
        assert_eq!(eval_expr("1 + 2 * 3", &v).unwrap(), 7.0);
        assert_eq!(eval_expr("(1 + 2) * 3", &v).unwrap(), 9.0);
        assert_eq!(eval_expr("8 / 2 / 2", &v).unwrap(), 2.0);
        assert_eq!(eval_expr("1.5 + .5", &v).unwrap(), 2.0);
    }

    #[test]
    fn test_power_right_associative() {
        let v = HashMap::new();
        assert_eq!(eval_expr("2 ** 3 ** 2", &v).unwrap(), 512.0);
        assert_eq!(eval_expr("2 ** -1", &v).unwrap(), 0.5);
        assert_eq!(eval_expr("-2 ** 2", &v).unwrap(), -4.0);
    }

    #[test]
    fn test_variables() {
        assert_eq!(eval_expr("x", &vars()).unwrap(), 20.0);
        assert_eq!(eval_expr("y + 5", &vars()).unwrap(), 15.0);
        assert!(eval_expr("z", &vars()).is_err());
    }

    #[test]
    fn test_rejects_junk() {
        let v = HashMap::new();
        assert!(eval_expr("1 ; 2", &v).is_err());
        assert!(eval_expr("1 +", &v).is_err());
        assert!(eval_expr("(1", &v).is_err());
        assert!(eval_expr("", &v).is_err());
    }

    #[test]
    fn test_substitute() {
        assert_eq!(substitute("{{x}}", &vars()).unwrap(), "20");
        assert_eq!(substitute("{{y+5}}", &vars()).unwrap(), "15");
        assert_eq!(substitute("plain", &vars()).unwrap(), "plain");
        assert!(substitute("{{x", &vars()).is_err());
    }
}
