//! Parser and evaluator for per-column filter expressions.
//!
//! These are the strings typed into the filter cell above a column:
//! - `Asia` (text column: contains, numeric column: equals)
//! - `> 50`, `<= 1990`, `!= 0`, `= Europe`
//! - `eq Asia`, `ge 70`, `contains Am`, `datestartswith 19`
//! - `> 40 && < 60`, `Asia || Europe`, `!(contains ia)`
//! - `'United States'` or bare multi-word operands: `contains New Zealand`

use crate::column::{ColumnType, ColumnValue};
use std::cmp::Ordering;

/// A parsed filter for a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Compare the cell against an operand
    Compare { op: FilterOp, operand: Operand },
    /// Logical AND of two expressions
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// Logical OR of two expressions
    Or(Box<FilterExpr>, Box<FilterExpr>),
    /// Logical NOT of an expression
    Not(Box<FilterExpr>),
}

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,             // = eq
    Ne,             // != ne
    Lt,             // < lt
    Le,             // <= le
    Gt,             // > gt
    Ge,             // >= ge
    Contains,       // contains
    DateStartsWith, // datestartswith
    /// No operator written: equals on numeric columns, contains on text
    Implicit,
}

/// Right-hand side of a comparison. Keeps the text as typed and, when it
/// reads as a number, the numeric value too.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub text: String,
    pub number: Option<f64>,
}

impl Operand {
    fn new(text: String) -> Self {
        let number = text.parse::<f64>().ok().filter(|n| n.is_finite());
        Operand { text, number }
    }

    /// A quoted operand is always text
    fn quoted(text: String) -> Self {
        Operand { text, number: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Op(FilterOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
    Eof,
}

/// Characters that end a bare word
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>' | '=' | '!' | '&' | '|' | '\'' | '"')
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            word.push(c);
            self.advance();
        }
        word
    }

    fn read_quoted(&mut self, quote: char) -> Result<Token, String> {
        self.advance(); // opening quote
        let mut s = String::new();

        while let Some(c) = self.advance() {
            if c == quote {
                return Ok(Token::Quoted(s));
            } else if c == '\\' {
                if let Some(escaped) = self.advance() {
                    s.push(escaped);
                }
            } else {
                s.push(c);
            }
        }

        Err("Unterminated string".to_string())
    }

    /// Consume `second` if it is next, returning whether it was there
    fn eat(&mut self, second: char) -> bool {
        if self.peek() == Some(second) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let c = match self.peek() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        match c {
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '=' => {
                self.advance();
                self.eat('=');
                Ok(Token::Op(FilterOp::Eq))
            }
            '!' => {
                self.advance();
                if self.eat('=') {
                    Ok(Token::Op(FilterOp::Ne))
                } else {
                    Ok(Token::Not)
                }
            }
            '<' => {
                self.advance();
                if self.eat('=') {
                    Ok(Token::Op(FilterOp::Le))
                } else {
                    Ok(Token::Op(FilterOp::Lt))
                }
            }
            '>' => {
                self.advance();
                if self.eat('=') {
                    Ok(Token::Op(FilterOp::Ge))
                } else {
                    Ok(Token::Op(FilterOp::Gt))
                }
            }
            '&' => {
                self.advance();
                if self.eat('&') {
                    Ok(Token::And)
                } else {
                    Err("Expected '&&'".to_string())
                }
            }
            '|' => {
                self.advance();
                if self.eat('|') {
                    Ok(Token::Or)
                } else {
                    Err("Expected '||'".to_string())
                }
            }
            '\'' | '"' => self.read_quoted(c),
            _ => {
                let word = self.read_word();
                Ok(match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "eq" => Token::Op(FilterOp::Eq),
                    "ne" => Token::Op(FilterOp::Ne),
                    "lt" => Token::Op(FilterOp::Lt),
                    "le" => Token::Op(FilterOp::Le),
                    "gt" => Token::Op(FilterOp::Gt),
                    "ge" => Token::Op(FilterOp::Ge),
                    "contains" => Token::Op(FilterOp::Contains),
                    "datestartswith" => Token::Op(FilterOp::DateStartsWith),
                    _ => Token::Word(word),
                })
            }
        }
    }
}

/// Deepest allowed nesting of `!` and parentheses
const MAX_NESTING: usize = 64;

struct Parser {
    lexer: Lexer,
    current: Token,
    /// Current `!` / parenthesis nesting
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, String> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<(), String> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn descend(&mut self) -> Result<(), String> {
        if self.depth >= MAX_NESTING {
            return Err("Filter nested too deeply".to_string());
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<FilterExpr, String> {
        let mut left = self.parse_and()?;

        while self.current == Token::Or {
            self.advance()?;
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, String> {
        let mut left = self.parse_not()?;

        while self.current == Token::And {
            self.advance()?;
            let right = self.parse_not()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<FilterExpr, String> {
        if self.current == Token::Not {
            self.advance()?;
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            Ok(FilterExpr::Not(Box::new(inner)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, String> {
        if self.current == Token::LParen {
            self.advance()?;
            self.descend()?;
            let expr = self.parse_or()?;
            if self.current != Token::RParen {
                return Err(format!("Expected ')', got {:?}", self.current));
            }
            self.advance()?;
            self.depth -= 1;
            return Ok(expr);
        }

        let op = match self.current {
            Token::Op(op) => {
                self.advance()?;
                op
            }
            _ => FilterOp::Implicit,
        };

        let operand = self.parse_operand()?;
        Ok(FilterExpr::Compare { op, operand })
    }

    /// A quoted string, or one or more bare words joined by single spaces
    fn parse_operand(&mut self) -> Result<Operand, String> {
        match &self.current {
            Token::Quoted(s) => {
                let operand = Operand::quoted(s.clone());
                self.advance()?;
                Ok(operand)
            }
            Token::Word(_) => {
                let mut words = Vec::new();
                while let Token::Word(w) = &self.current {
                    words.push(w.clone());
                    self.advance()?;
                }
                Ok(Operand::new(words.join(" ")))
            }
            other => Err(format!("Expected a value, got {:?}", other)),
        }
    }
}

/// Parse a filter cell's text.
pub fn parse_filter(input: &str) -> Result<FilterExpr, String> {
    if input.trim().is_empty() {
        return Err("Empty filter expression".to_string());
    }

    let mut parser = Parser::new(input)?;
    let expr = parser.parse_or()?;

    if parser.current != Token::Eof {
        return Err(format!("Unexpected token after expression: {:?}", parser.current));
    }

    Ok(expr)
}

impl FilterExpr {
    /// Evaluate against one cell of a column of type `column_type`.
    pub fn matches(&self, value: &ColumnValue, column_type: ColumnType) -> bool {
        match self {
            FilterExpr::Compare { op, operand } => compare(value, *op, operand, column_type),
            FilterExpr::And(l, r) => l.matches(value, column_type) && r.matches(value, column_type),
            FilterExpr::Or(l, r) => l.matches(value, column_type) || r.matches(value, column_type),
            FilterExpr::Not(inner) => !inner.matches(value, column_type),
        }
    }
}

fn compare(value: &ColumnValue, op: FilterOp, operand: &Operand, column_type: ColumnType) -> bool {
    // Comparisons against an empty cell never match
    if value.is_null() {
        return false;
    }

    let op = match op {
        FilterOp::Implicit if column_type.is_numeric() => FilterOp::Eq,
        FilterOp::Implicit => FilterOp::Contains,
        other => other,
    };

    match op {
        FilterOp::Contains => value.to_string().contains(&operand.text),
        FilterOp::DateStartsWith => value.to_string().starts_with(&operand.text),
        FilterOp::Eq => ordering(value, operand) == Some(Ordering::Equal),
        FilterOp::Ne => ordering(value, operand).map_or(true, |o| o != Ordering::Equal),
        FilterOp::Lt => ordering(value, operand) == Some(Ordering::Less),
        FilterOp::Le => matches!(ordering(value, operand), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Gt => ordering(value, operand) == Some(Ordering::Greater),
        FilterOp::Ge => matches!(ordering(value, operand), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Implicit => false,
    }
}

/// Numeric comparison when both sides are numbers, text comparison when the
/// cell is text, otherwise incomparable.
fn ordering(value: &ColumnValue, operand: &Operand) -> Option<Ordering> {
    match (value.as_f64(), operand.number) {
        (Some(v), Some(n)) => v.partial_cmp(&n),
        (Some(_), None) => None,
        (None, _) => match value {
            ColumnValue::String(s) => Some(s.as_str().cmp(operand.text.as_str())),
            ColumnValue::Bool(b) => Some(b.to_string().as_str().cmp(operand.text.to_ascii_lowercase().as_str())),
            _ => None,
        },
    }
}
