//! CQL text form of filter trees.
//!
//! Groups are written as `(a) AND (b)`, terms as `"property" OP value`.
//! [`read`] accepts that output plus the usual hand-written variations:
//! bare identifiers, `!=`, `NOT LIKE`, `IS NOT NULL`, any keyword casing.

use serde_json::{Number, Value};

use super::{unquote_property, Filter, FilterGroup, FilterTerm, GroupKind, Operator};
use crate::core::error::{CatalogError, Result};


pub fn write(filter: &Filter) -> String {
    match filter {
        Filter::Group(group) => write_group(group),
        Filter::Term(term) => write_term(term),
    }
}

fn write_group(group: &FilterGroup) -> String {
    match group.kind {
        GroupKind::Not => match group.filters.as_slice() {
            [only] => format!("NOT ({})", write(only)),
            filters => format!("NOT ({})", write_group(&FilterGroup {
                kind: GroupKind::And,
                filters: filters.to_vec(),
            })),
        },
        GroupKind::And if group.filters.is_empty() => "INCLUDE".to_string(),
        GroupKind::Or if group.filters.is_empty() => "EXCLUDE".to_string(),
        kind => group
            .filters
            .iter()
            .map(|f| format!("({})", write(f)))
            .collect::<Vec<_>>()
            .join(&format!(" {} ", kind)),
    }
}

fn write_term(term: &FilterTerm) -> String {
    let property = quote_property(&term.property);
    match term.op {
        Operator::IsNull => format!("{property} IS NULL"),
        Operator::Between => format!(
            "{property} BETWEEN {} AND {}",
            write_value(term.lower_boundary.as_ref().unwrap_or(&Value::Null)),
            write_value(term.upper_boundary.as_ref().unwrap_or(&Value::Null)),
        ),
        Operator::Before | Operator::After | Operator::During => {
            format!("{property} {} {}", term.op, value_text(&term.value))
        }
        op => format!("{property} {op} {}", write_value(&term.value)),
    }
}

fn quote_property(property: &str) -> String {
    format!("\"{}\"", unquote_property(property).replace('"', "\"\""))
}

fn write_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        other => quote_string(&other.to_string()),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}


pub fn read(input: &str) -> Result<Filter> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let filter = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(CatalogError::cql(
            format!("unexpected trailing {:?}", parser.tokens[parser.pos]),
            parser.pos,
        ));
    }
    Ok(filter)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// `"quoted"` attribute name.
    Property(String),
    /// `'quoted'` string literal.
    Text(String),
    Number(Number),
    /// Bare identifier, keyword or temporal literal.
    Word(String),
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Deepest `NOT`/parenthesis nesting accepted before the reader bails out.
const MAX_NESTING: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn parse_or(&mut self) -> Result<Filter> {
        let mut filters = vec![self.parse_and()?];
        while self.eat_keyword("OR") {
            filters.push(self.parse_and()?);
        }
        Ok(collapse(GroupKind::Or, filters))
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut filters = vec![self.parse_not()?];
        while self.eat_keyword("AND") {
            filters.push(self.parse_not()?);
        }
        Ok(collapse(GroupKind::And, filters))
    }

    fn parse_not(&mut self) -> Result<Filter> {
        if self.eat_keyword("NOT") {
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            Ok(Filter::not(inner))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Filter> {
        if self.eat(&Token::LParen) {
            self.descend()?;
            let inner = self.parse_or()?;
            self.expect(&Token::RParen)?;
            self.depth -= 1;
            return Ok(inner);
        }
        if self.eat_keyword("INCLUDE") {
            return Ok(Filter::and(Vec::new()));
        }
        if self.eat_keyword("EXCLUDE") {
            return Ok(Filter::or(Vec::new()));
        }
        self.parse_predicate()
    }

    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_predicate(&mut self) -> Result<Filter> {
        let property = self.expect_property()?;

        let comparison = match self.peek() {
            Some(Token::Eq) => Some(Operator::Eq),
            Some(Token::Ne) => Some(Operator::NotEq),
            Some(Token::Lt) => Some(Operator::Lt),
            Some(Token::Lte) => Some(Operator::Lte),
            Some(Token::Gt) => Some(Operator::Gt),
            Some(Token::Gte) => Some(Operator::Gte),
            _ => None,
        };
        if let Some(op) = comparison {
            self.pos += 1;
            let value = self.expect_value()?;
            return Ok(Filter::term(op, property, value));
        }

        let negated = self.eat_keyword("NOT");
        let filter = if self.eat_keyword("LIKE") {
            Filter::term(Operator::Like, property, self.expect_value()?)
        } else if self.eat_keyword("ILIKE") {
            Filter::term(Operator::ILike, property, self.expect_value()?)
        } else if self.eat_keyword("BETWEEN") {
            let lower = self.expect_value()?;
            self.expect_keyword("AND")?;
            let upper = self.expect_value()?;
            Filter::between(property, lower, upper)
        } else if !negated && self.eat_keyword("IS") {
            let is_not = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            let filter = Filter::is_null(property);
            return Ok(if is_not { Filter::not(filter) } else { filter });
        } else if !negated && self.eat_keyword("BEFORE") {
            Filter::term(Operator::Before, property, self.expect_temporal()?)
        } else if !negated && self.eat_keyword("AFTER") {
            Filter::term(Operator::After, property, self.expect_temporal()?)
        } else if !negated && self.eat_keyword("DURING") {
            Filter::term(Operator::During, property, self.expect_temporal()?)
        } else {
            return Err(self.error("expected comparison operator"));
        };

        Ok(if negated { Filter::not(filter) } else { filter })
    }

    fn expect_property(&mut self) -> Result<String> {
        match self.peek().cloned() {
            Some(Token::Property(name)) => {
                self.pos += 1;
                Ok(name)
            }
            Some(Token::Word(word)) if !is_keyword(&word) => {
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.error("expected property name")),
        }
    }

    fn expect_value(&mut self) -> Result<Value> {
        let value = match self.peek().cloned() {
            Some(Token::Text(s)) => Value::String(s),
            Some(Token::Number(n)) => Value::Number(n),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("TRUE") => Value::Bool(true),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("FALSE") => Value::Bool(false),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("NULL") => Value::Null,
            _ => return Err(self.error("expected literal value")),
        };
        self.pos += 1;
        Ok(value)
    }

    fn expect_temporal(&mut self) -> Result<Value> {
        match self.peek().cloned() {
            Some(Token::Word(w)) if !is_keyword(&w) => {
                self.pos += 1;
                Ok(Value::String(w))
            }
            Some(Token::Text(s)) => {
                self.pos += 1;
                Ok(Value::String(s))
            }
            _ => Err(self.error("expected temporal literal")),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {keyword}")))
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {token:?}")))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn error(&self, message: &str) -> CatalogError {
        match self.peek() {
            Some(token) => CatalogError::cql(format!("{message}, found {token:?}"), self.pos),
            None => CatalogError::cql(format!("{message}, found end of input"), self.pos),
        }
    }
}

fn collapse(kind: GroupKind, mut filters: Vec<Filter>) -> Filter {
    if filters.len() == 1 {
        filters.remove(0)
    } else {
        Filter::Group(FilterGroup { kind, filters })
    }
}

const KEYWORDS: [&str; 14] = [
    "AND", "OR", "NOT", "LIKE", "ILIKE", "BETWEEN", "IS", "NULL", "BEFORE", "AFTER", "DURING",
    "INCLUDE", "EXCLUDE", "TRUE",
];

fn is_keyword(word: &str) -> bool {
    word.eq_ignore_ascii_case("FALSE") || KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ':' | '+' | '/')
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let mut chars = input.chars().peekable();
    let mut tokens = Vec::new();

    while let Some(ch) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        match ch {
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(CatalogError::cql("unexpected '!'", tokens.len()));
                }
                tokens.push(Token::Ne);
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Lte);
                } else if chars.next_if_eq(&'>').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Gte);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '\'' | '"' => {
                chars.next();
                let mut buf = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == ch {
                        // Doubled quote is an escaped quote.
                        if chars.next_if_eq(&ch).is_some() {
                            buf.push(ch);
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    buf.push(c);
                }
                if !closed {
                    return Err(CatalogError::cql("unterminated quoted literal", tokens.len()));
                }
                tokens.push(if ch == '"' { Token::Property(buf) } else { Token::Text(buf) });
            }
            c if is_word_char(c) => {
                let mut buf = String::new();
                while let Some(c) = chars.next_if(|c| is_word_char(*c)) {
                    buf.push(c);
                }
                tokens.push(classify_word(buf));
            }
            other => {
                return Err(CatalogError::cql(format!("unexpected character {other}"), tokens.len()));
            }
        }
    }

    Ok(tokens)
}

fn classify_word(word: String) -> Token {
    let numeric_start = word
        .trim_start_matches('-')
        .starts_with(|c: char| c.is_ascii_digit());
    if numeric_start {
        if let Ok(i) = word.parse::<i64>() {
            return Token::Number(i.into());
        }
        if let Some(n) = word.parse::<f64>().ok().and_then(Number::from_f64) {
            return Token::Number(n);
        }
    }
    Token::Word(word)
}
