//! Stage one of parsing: text into unresolved `Raw*` structures.
//!
//! Value names, block labels and types are kept as borrowed text here.
//! Resolving them against an `IrContext` is the builder's job.

use derive_more::{Display, Error};
use winnow::ascii;
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

/// Parse error for the IR text format.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

// ============================================================================
// Raw structures
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct RawOperation<'a> {
    /// Source text of the whole operation, regions included.
    pub text: &'a str,
    pub results: Vec<&'a str>,
    pub dialect: &'a str,
    pub op_name: &'a str,
    /// `@name` right after `dialect.op`.
    pub sym_name: Option<String>,
    /// Function-style parameters: `(%x: type, ...)`.
    pub func_params: Vec<(&'a str, RawType<'a>)>,
    /// `-> type` of a function-style signature.
    pub return_type: Option<RawType<'a>>,
    pub operands: Vec<&'a str>,
    pub attributes: Vec<(&'a str, RawAttribute<'a>)>,
    pub result_types: Vec<RawType<'a>>,
    pub regions: Vec<RawRegion<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawRegion<'a> {
    pub blocks: Vec<RawBlock<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawBlock<'a> {
    pub label: &'a str,
    pub args: Vec<(&'a str, RawType<'a>)>,
    pub ops: Vec<RawOperation<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawType<'a> {
    pub dialect: &'a str,
    pub name: &'a str,
    pub params: Vec<RawType<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RawAttribute<'a> {
    Unit,
    Bool(bool),
    Int(u64),
    String(String),
    Symbol(String),
    Type(RawType<'a>),
    List(Vec<RawAttribute<'a>>),
}

// ============================================================================
// Lexical pieces
// ============================================================================

/// Skip whitespace and `//` line comments.
pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    loop {
        take_while(0.., |c: char| c.is_ascii_whitespace()).parse_next(input)?;
        if input.starts_with("//") {
            take_while(0.., |c: char| c != '\n').parse_next(input)?;
        } else {
            return Ok(());
        }
    }
}

fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn name_chars<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

/// `%name` or `%0`
pub(crate) fn value_ref<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded('%', name_chars).parse_next(input)
}

/// `^bb0` or `^name`
pub(crate) fn block_label<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded('^', name_chars).parse_next(input)
}

/// `@name` or `@"quoted name"`
pub(crate) fn symbol_ref(input: &mut &str) -> ModalResult<String> {
    '@'.parse_next(input)?;
    if input.starts_with('"') {
        string_lit.parse_next(input)
    } else {
        name_chars.map(str::to_owned).parse_next(input)
    }
}

fn qualified_name<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    (ident, '.', ident).map(|(d, _, n)| (d, n)).parse_next(input)
}

/// Decimal integer, negative values stored as two's complement bits.
pub(crate) fn integer_lit(input: &mut &str) -> ModalResult<u64> {
    let negative = opt('-').parse_next(input)?.is_some();
    let magnitude: u64 = ascii::dec_uint(input)?;
    if !negative {
        return Ok(magnitude);
    }
    let min_magnitude = i64::MAX as u64 + 1;
    let signed = match magnitude {
        m if m == min_magnitude => i64::MIN,
        m if m < min_magnitude => -(m as i64),
        _ => return Err(ErrMode::Backtrack(ContextError::new())),
    };
    Ok(u64::from_ne_bytes(signed.to_ne_bytes()))
}

pub(crate) fn string_lit(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut out = String::new();
    loop {
        match any.parse_next(input)? {
            '"' => return Ok(out),
            '\\' => match any.parse_next(input)? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                c @ ('"' | '\\') => out.push(c),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }
}

// ============================================================================
// Types and attributes
// ============================================================================

/// `dialect.name` or `dialect.name(param, ...)`
pub(crate) fn raw_type<'a>(input: &mut &'a str) -> ModalResult<RawType<'a>> {
    let (dialect, name) = qualified_name.parse_next(input)?;
    let params = opt(delimited(
        ('(', ws),
        separated(0.., (ws, raw_type, ws).map(|(_, t, _)| t), ','),
        (ws, ')'),
    ))
    .parse_next(input)?
    .unwrap_or_default();
    Ok(RawType {
        dialect,
        name,
        params,
    })
}

pub(crate) fn raw_attr_value<'a>(input: &mut &'a str) -> ModalResult<RawAttribute<'a>> {
    alt((
        "true".value(RawAttribute::Bool(true)),
        "false".value(RawAttribute::Bool(false)),
        "unit".value(RawAttribute::Unit),
        string_lit.map(RawAttribute::String),
        symbol_ref.map(RawAttribute::Symbol),
        delimited(
            ('[', ws),
            separated(0.., (ws, raw_attr_value, ws).map(|(_, a, _)| a), ','),
            (ws, ']'),
        )
        .map(RawAttribute::List),
        integer_lit.map(RawAttribute::Int),
        raw_type.map(RawAttribute::Type),
    ))
    .parse_next(input)
}

/// `{key = value, ...}`
fn raw_attr_dict<'a>(input: &mut &'a str) -> ModalResult<Vec<(&'a str, RawAttribute<'a>)>> {
    delimited(
        ('{', ws),
        separated(
            1..,
            (ws, ident, ws, '=', ws, raw_attr_value, ws).map(|(_, k, _, _, _, v, _)| (k, v)),
            ',',
        ),
        (ws, '}'),
    )
    .parse_next(input)
}

// ============================================================================
// Operations, blocks, regions
// ============================================================================

fn value_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    separated(1.., (ws, value_ref, ws).map(|(_, v, _)| v), ',').parse_next(input)
}

fn result_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    let results = value_list.parse_next(input)?;
    '='.parse_next(input)?;
    Ok(results)
}

/// `(%x: type, ...)`, also used for block arguments.
fn typed_params<'a>(input: &mut &'a str) -> ModalResult<Vec<(&'a str, RawType<'a>)>> {
    delimited(
        ('(', ws),
        separated(
            0..,
            (ws, value_ref, ws, ':', ws, raw_type, ws).map(|(_, name, _, _, _, ty, _)| (name, ty)),
            ',',
        ),
        (ws, ')'),
    )
    .parse_next(input)
}

fn type_annotation<'a>(input: &mut &'a str) -> ModalResult<Vec<RawType<'a>>> {
    preceded(
        (ws, ':', ws),
        separated(1.., (ws, raw_type, ws).map(|(_, t, _)| t), ','),
    )
    .parse_next(input)
}

/// One operation.
///
/// ```text
/// [results =] dialect.op [@sym] [(%p: type, ...) [-> type] | operands]
///   [{attrs}] [: types] [{region}]*
/// ```
pub(crate) fn raw_operation<'a>(input: &mut &'a str) -> ModalResult<RawOperation<'a>> {
    ws.parse_next(input)?;
    let start = *input;
    let results = opt(result_list).parse_next(input)?.unwrap_or_default();
    ws.parse_next(input)?;
    let (dialect, op_name) = qualified_name.parse_next(input)?;
    let sym_name = opt(preceded(ws, symbol_ref)).parse_next(input)?;

    ws.parse_next(input)?;
    let mut func_params = Vec::new();
    let mut return_type = None;
    let mut operands = Vec::new();
    if input.starts_with('(') {
        func_params = typed_params.parse_next(input)?;
        return_type = opt(preceded((ws, "->", ws), raw_type)).parse_next(input)?;
    } else if input.starts_with('%') {
        operands = value_list.parse_next(input)?;
    }

    let attributes = opt(preceded(ws, raw_attr_dict))
        .parse_next(input)?
        .unwrap_or_default();
    let result_types = opt(type_annotation).parse_next(input)?.unwrap_or_default();

    let mut regions = Vec::new();
    loop {
        ws.parse_next(input)?;
        if !input.starts_with('{') {
            break;
        }
        regions.push(raw_region.parse_next(input)?);
    }

    Ok(RawOperation {
        text: start[..start.len() - input.len()].trim_end(),
        results,
        dialect,
        op_name,
        sym_name,
        func_params,
        return_type,
        operands,
        attributes,
        result_types,
        regions,
    })
}

/// Operations up to the next block label or the closing brace.
fn block_ops<'a>(input: &mut &'a str) -> ModalResult<Vec<RawOperation<'a>>> {
    let mut ops = Vec::new();
    loop {
        ws.parse_next(input)?;
        if input.starts_with('^') || input.starts_with('}') || input.is_empty() {
            return Ok(ops);
        }
        ops.push(raw_operation.parse_next(input)?);
    }
}

/// `^label(args): ops...`
fn raw_block<'a>(input: &mut &'a str) -> ModalResult<RawBlock<'a>> {
    ws.parse_next(input)?;
    let label = block_label.parse_next(input)?;
    let args = opt(typed_params).parse_next(input)?.unwrap_or_default();
    (ws, ':').parse_next(input)?;
    let ops = block_ops.parse_next(input)?;
    Ok(RawBlock { label, args, ops })
}

/// `{ ^bb0: ... ^bb1: ... }` or `{ ops... }` for a single unlabeled block.
pub(crate) fn raw_region<'a>(input: &mut &'a str) -> ModalResult<RawRegion<'a>> {
    '{'.parse_next(input)?;
    ws.parse_next(input)?;

    let mut blocks = Vec::new();
    if input.starts_with('^') {
        loop {
            ws.parse_next(input)?;
            if input.starts_with('}') || input.is_empty() {
                break;
            }
            blocks.push(raw_block.parse_next(input)?);
        }
    } else {
        blocks.push(RawBlock {
            label: "bb0",
            args: Vec::new(),
            ops: block_ops.parse_next(input)?,
        });
    }

    (ws, '}').parse_next(input)?;
    Ok(RawRegion { blocks })
}
