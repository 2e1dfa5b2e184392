// ABOUTME: Textual reader -- s-expression syntax to Cons-based Value, an external collaborator to the compiler
//
// Turns source text into `Value`s the compiler consumes, kept as a
// separate stage rather than folded into the compiler. Built with the
// same `nom` combinator style as other readers in this codebase family
// (`alt`, `many0`, comment-skipping), but targeting this crate's
// `Cons`-based `Value` and a `Package` for symbol interning rather than
// a flat `Value::Symbol(String)`.

use nom::{
    branch::alt,
    bytes::complete::{escaped, tag, take_while},
    character::complete::{char, digit1, multispace1, none_of, one_of},
    combinator::{not, opt, peek, recognize, value},
    multi::many0,
    IResult, Parser,
};
use std::rc::Rc;
use thiserror::Error;

use crate::cons;
use crate::symbol::Package;
use crate::value::Value;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReadError {
    #[error("parse error: {0}")]
    Syntax(String),
    #[error("unexpected trailing input: '{0}'")]
    TrailingInput(String),
    #[error("no expression to read")]
    Empty,
}

fn ws_and_comments(input: &str) -> IResult<&str, ()> {
    many0(alt((
        value((), multispace1),
        value((), comment),
    )))
    .map(|_| ())
    .parse(input)
}

fn comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = char(';')(input)?;
    let (input, _) = take_while(|c| c != '\n')(input)?;
    Ok((input, ()))
}

fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize((
        opt(char('-')),
        alt((
            recognize((digit1, opt((char('.'), opt(digit1))))),
            recognize((char('.'), digit1)),
        )),
    ))
    .parse(input)?;
    if text.contains('.') {
        let n: f64 = text.parse().map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)))?;
        Ok((rest, Value::Float(n)))
    } else {
        let n: i64 = text.parse().map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)))?;
        Ok((rest, Value::Int(n)))
    }
}

fn parse_bool(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Bool(true), tag("#t")),
        value(Value::Bool(false), tag("#f")),
    ))
    .parse(input)
}

const SYMBOL_LEAD_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ+-*/%<>=!?&";

fn symbol_rest(c: char) -> bool {
    c.is_alphanumeric() || "-_?!<>=+*/%&".contains(c)
}

fn parse_symbol(pkg: &Rc<Package>, input: &str) -> IResult<&str, Value> {
    let start = input;
    let (input, _) = one_of(SYMBOL_LEAD_CHARS)(input)?;
    let (input, _rest) = take_while::<_, _, nom::error::Error<_>>(symbol_rest)(input).unwrap_or((input, ""));
    let len = start.len() - input.len();
    let text = &start[..len];
    if text == "nil" {
        return Ok((input, Value::Nil));
    }
    Ok((input, Value::Symbol(pkg.intern(text))))
}

fn parse_string(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('"')(input)?;
    if let Ok((input, _)) = char::<_, nom::error::Error<_>>('"')(input) {
        return Ok((input, Value::str("")));
    }
    let (input, content) = escaped(none_of("\"\\"), '\\', one_of("\"\\nt"))(input)?;
    let (input, _) = char('"')(input)?;

    let mut result = String::new();
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    Ok((input, Value::str(result)))
}

fn parse_quote_like(pkg: &Rc<Package>, tag_ch: char, name: &str, input: &str) -> IResult<&str, Value> {
    let (input, _) = char(tag_ch)(input)?;
    let (input, expr) = parse_expr(pkg, input)?;
    Ok((input, cons::from_vec(vec![Value::Symbol(pkg.intern(name)), expr])))
}

fn parse_unquote(pkg: &Rc<Package>, input: &str) -> IResult<&str, Value> {
    let (input, _) = char(',')(input)?;
    if let Ok((input, _)) = char::<_, nom::error::Error<_>>('@')(input) {
        let (input, expr) = parse_expr(pkg, input)?;
        Ok((input, cons::from_vec(vec![Value::Symbol(pkg.intern("unquote-splicing")), expr])))
    } else {
        let (input, expr) = parse_expr(pkg, input)?;
        Ok((input, cons::from_vec(vec![Value::Symbol(pkg.intern("unquote")), expr])))
    }
}

fn parse_list(pkg: &Rc<Package>, input: &str) -> IResult<&str, Value> {
    let (input, _) = char('(')(input)?;
    let (mut remaining, _) = ws_and_comments(input)?;
    let mut items = Vec::new();
    let mut dotted_tail: Option<Value> = None;

    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<_>>(')')(remaining) {
            remaining = rest;
            break;
        }
        // Dotted-pair tail: `. expr)`.
        if let Ok((rest, _)) = dot_separator(remaining) {
            let (rest, tail_expr) = parse_expr(pkg, rest)?;
            let (rest, _) = ws_and_comments(rest)?;
            let (rest, _) = char(')')(rest)?;
            dotted_tail = Some(tail_expr);
            remaining = rest;
            break;
        }
        let (rest, expr) = parse_expr(pkg, remaining)?;
        items.push(expr);
        let (rest, _) = ws_and_comments(rest)?;
        remaining = rest;
    }

    let list = match dotted_tail {
        Some(tail) => cons::from_vec_dotted(items, tail),
        None => cons::from_vec(items),
    };
    Ok((remaining, list))
}

fn dot_separator(input: &str) -> IResult<&str, ()> {
    let (input, _) = char('.')(input)?;
    let (input, _) = not(peek(one_of::<_, _, nom::error::Error<_>>(
        "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ+-*/%<>=!?&",
    )))
    .parse(input)?;
    Ok((input, ()))
}

fn parse_expr(pkg: &Rc<Package>, input: &str) -> IResult<&str, Value> {
    let (input, _) = ws_and_comments(input)?;
    alt((
        |i| parse_quote_like(pkg, '\'', "quote", i),
        |i| parse_quote_like(pkg, '`', "quasiquote", i),
        |i| parse_unquote(pkg, i),
        |i| parse_list(pkg, i),
        parse_bool,
        parse_number,
        parse_string,
        |i| parse_symbol(pkg, i),
    ))
    .parse(input)
}

/// Reads exactly one top-level expression, erroring on trailing input.
pub fn read(pkg: &Rc<Package>, input: &str) -> Result<Value, ReadError> {
    let (rest, _) = ws_and_comments(input).map_err(|e| ReadError::Syntax(format!("{e:?}")))?;
    if rest.is_empty() {
        return Err(ReadError::Empty);
    }
    let (rest, value) = parse_expr(pkg, rest).map_err(|e| ReadError::Syntax(format!("{e:?}")))?;
    let (rest, _) = ws_and_comments(rest).map_err(|e| ReadError::Syntax(format!("{e:?}")))?;
    if !rest.is_empty() {
        return Err(ReadError::TrailingInput(rest.to_string()));
    }
    Ok(value)
}

/// Reads every top-level expression in `input` in order -- used to run a
/// whole script or stdlib file through one `read` call.
pub fn read_all(pkg: &Rc<Package>, input: &str) -> Result<Vec<Value>, ReadError> {
    let mut remaining = input;
    let mut out = Vec::new();
    loop {
        let (rest, _) = ws_and_comments(remaining).map_err(|e| ReadError::Syntax(format!("{e:?}")))?;
        if rest.is_empty() {
            break;
        }
        let (rest, value) = parse_expr(pkg, rest).map_err(|e| ReadError::Syntax(format!("{e:?}")))?;
        out.push(value);
        remaining = rest;
    }
    Ok(out)
}
