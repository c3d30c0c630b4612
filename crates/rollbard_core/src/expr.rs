//! Safe arithmetic evaluator for the `r <expr>` command.
//!
//! Input is tokenized and parsed into a small syntax tree that can only hold
//! literals, unary operators and binary operators. Anything else (names,
//! calls, attribute access) is rejected while parsing, so evaluation never
//! sees it.
//!
//! Numeric rules follow the usual calculator expectations:
//! - integer operands stay integer, except `/` which always yields a float
//! - `//` floors toward negative infinity, `%` takes the sign of the divisor
//! - integer `**` with a non-negative integer exponent stays integer,
//!   everything else is computed in floating point
//! - integer overflow and non-finite results are reported as
//!   [`ExprError::NumberTooLarge`]

use std::fmt;

use logos::Logos;

use crate::error::ExprError;

const MAX_DEPTH: usize = 64;

/// A value produced by the evaluator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }
}

impl fmt::Display for Number {
    /// Integral floats are shown as integers (`4.0` prints as `4`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) if x == 0.0 => write!(f, "0"),
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.0}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

/// The only node kinds an expression can be built from
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Number),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Op(BinaryOp),
    LParen,
    RParen,
}

/// Parse and evaluate `input`.
pub fn evaluate(input: &str) -> Result<Number, ExprError> {
    let tree = parse(input)?;
    eval(&tree)
}

/// Parse `input` into an [`Expr`] without evaluating it.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::invalid(input, "empty expression"));
    }

    let mut parser = Parser {
        input,
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    if parser.pos != tokens.len() {
        return Err(ExprError::invalid(input, "unexpected trailing input"));
    }
    Ok(expr)
}

/// Raw lexemes. Digits and dots are taken as one run so malformed numbers
/// like `1.2.3` are reported as such instead of splitting into two literals.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Lexeme {
    #[regex(r"[0-9.]+")]
    Number,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("**")]
    Pow,

    #[token("*")]
    Star,

    #[token("//")]
    FloorDiv,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut lexer = Lexeme::lexer(input);
    let mut tokens = Vec::new();

    while let Some(lexeme) = lexer.next() {
        let token = match lexeme {
            Ok(Lexeme::Number) => Token::Number(number_literal(input, lexer.slice())?),
            Ok(Lexeme::Plus) => Token::Op(BinaryOp::Add),
            Ok(Lexeme::Minus) => Token::Op(BinaryOp::Sub),
            Ok(Lexeme::Pow) => Token::Op(BinaryOp::Pow),
            Ok(Lexeme::Star) => Token::Op(BinaryOp::Mul),
            Ok(Lexeme::FloorDiv) => Token::Op(BinaryOp::FloorDiv),
            Ok(Lexeme::Slash) => Token::Op(BinaryOp::Div),
            Ok(Lexeme::Percent) => Token::Op(BinaryOp::Mod),
            Ok(Lexeme::LParen) => Token::LParen,
            Ok(Lexeme::RParen) => Token::RParen,
            Err(()) => {
                return Err(ExprError::invalid(
                    input,
                    format!("unexpected character {:?}", lexer.slice()),
                ));
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn number_literal(input: &str, literal: &str) -> Result<Number, ExprError> {
    if literal.matches('.').count() > 1 || literal == "." {
        return Err(ExprError::invalid(
            input,
            format!("malformed number '{literal}'"),
        ));
    }

    if literal.contains('.') {
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| ExprError::invalid(input, format!("malformed number '{literal}'")))
    } else {
        // every char is an ASCII digit here, so the only failure is overflow
        literal
            .parse::<i64>()
            .map(Number::Int)
            .map_err(|_| ExprError::NumberTooLarge)
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn error(&self, reason: &str) -> ExprError {
        ExprError::invalid(self.input, reason)
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression is nested too deeply"));
        }
        Ok(())
    }

    // expression := term (("+" | "-") term)*
    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ (BinaryOp::Add | BinaryOp::Sub))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // term := factor (("*" | "/" | "//" | "%") factor)*
    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.factor()?;
        while let Some(Token::Op(
            op @ (BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod),
        )) = self.peek()
        {
            let op = *op;
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // factor := ("+" | "-") factor | power
    fn factor(&mut self) -> Result<Expr, ExprError> {
        let unary = match self.peek() {
            Some(Token::Op(BinaryOp::Add)) => Some(UnaryOp::Plus),
            Some(Token::Op(BinaryOp::Sub)) => Some(UnaryOp::Minus),
            _ => None,
        };

        match unary {
            Some(op) => {
                self.pos += 1;
                self.descend()?;
                let operand = self.factor()?;
                self.depth -= 1;
                Ok(Expr::Unary(op, Box::new(operand)))
            }
            None => self.power(),
        }
    }

    // power := atom ("**" factor)?
    // right-associative, and binds tighter than a unary sign on its left
    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if let Some(Token::Op(BinaryOp::Pow)) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let exponent = self.factor()?;
            self.depth -= 1;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    // atom := NUMBER | "(" expression ")"
    fn atom(&mut self) -> Result<Expr, ExprError> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(Expr::Literal(n))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.expression()?;
                self.depth -= 1;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(Token::RParen) => Err(self.error("unexpected ')'")),
            Some(Token::Op(_)) => Err(self.error("operator without a left operand")),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

/// Evaluate a parsed tree.
pub fn eval(expr: &Expr) -> Result<Number, ExprError> {
    match expr {
        Expr::Literal(n) => Ok(*n),
        Expr::Unary(op, operand) => {
            let value = eval(operand)?;
            match (op, value) {
                (UnaryOp::Plus, v) => Ok(v),
                (UnaryOp::Minus, Number::Int(i)) => {
                    i.checked_neg().map(Number::Int).ok_or(ExprError::NumberTooLarge)
                }
                (UnaryOp::Minus, Number::Float(f)) => Ok(Number::Float(-f)),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs)?;
            let rhs = eval(rhs)?;
            apply(*op, lhs, rhs)
        }
    }
}

fn apply(op: BinaryOp, lhs: Number, rhs: Number) -> Result<Number, ExprError> {
    if matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) && rhs.is_zero() {
        return Err(ExprError::DivisionByZero);
    }

    let result = match (op, lhs, rhs) {
        (BinaryOp::Div, a, b) => Number::Float(a.as_f64() / b.as_f64()),
        (BinaryOp::Pow, a, b) => return power(a, b),
        (op, Number::Int(a), Number::Int(b)) => Number::Int(int_op(op, a, b)?),
        (op, a, b) => Number::Float(float_op(op, a.as_f64(), b.as_f64())),
    };

    finite(result)
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<i64, ExprError> {
    let value = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::FloorDiv => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        BinaryOp::Mod => a.checked_rem(b).map(|r| {
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }),
        BinaryOp::Div | BinaryOp::Pow => unreachable!("handled before integer dispatch"),
    };
    value.ok_or(ExprError::NumberTooLarge)
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Div | BinaryOp::Pow => unreachable!("handled before float dispatch"),
    }
}

fn power(base: Number, exponent: Number) -> Result<Number, ExprError> {
    if base.is_zero() && exponent.as_f64() < 0.0 {
        return Err(ExprError::DivisionByZero);
    }

    if let (Number::Int(b), Number::Int(e)) = (base, exponent) {
        if e >= 0 {
            return int_pow(b, e).map(Number::Int);
        }
    }

    let value = base.as_f64().powf(exponent.as_f64());
    if value.is_nan() {
        return Err(ExprError::invalid(
            format!("{base} ** {exponent}"),
            "result is not a real number",
        ));
    }
    finite(Number::Float(value))
}

fn int_pow(base: i64, exponent: i64) -> Result<i64, ExprError> {
    match (base, u32::try_from(exponent)) {
        (_, Ok(e)) => base.checked_pow(e).ok_or(ExprError::NumberTooLarge),
        (0 | 1, Err(_)) => Ok(base),
        (-1, Err(_)) => Ok(if exponent % 2 == 0 { 1 } else { -1 }),
        (_, Err(_)) => Err(ExprError::NumberTooLarge),
    }
}

fn finite(n: Number) -> Result<Number, ExprError> {
    match n {
        Number::Float(f) if !f.is_finite() => Err(ExprError::NumberTooLarge),
        other => Ok(other),
    }
}
