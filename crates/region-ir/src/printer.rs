//! Text format printer.
//!
//! ```text
//! core.module @name {
//!   func.func @main(%0: core.i32) -> core.i32 {
//!     %1 = func.lambda : core.func(core.i32, core.i32) {
//!       ^bb0(%2: core.i32):
//!         func.return %2
//!     }
//!     %3 = func.call_indirect %1, %0 : core.i32
//!     func.return %3
//!   }
//! }
//! ```
//!
//! Values are numbered `%N` in the order they are first printed, block
//! labels `^bbN` likewise. Numbering restarts for every top-level operation
//! of a module. A value printed before its definition (a capture from
//! outside the printed operation) gets the next free number.

use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::context::IrContext;
use crate::dialect::OpKind;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::Attribute;

struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, usize>,
    block_labels: HashMap<BlockRef, usize>,
    next_value: usize,
    next_block: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            block_labels: HashMap::new(),
            next_value: 0,
            next_block: 0,
        }
    }

    fn value_name(&mut self, v: ValueRef) -> usize {
        let next = &mut self.next_value;
        *self.value_names.entry(v).or_insert_with(|| {
            let n = *next;
            *next += 1;
            n
        })
    }

    fn block_label(&mut self, b: BlockRef) -> usize {
        let next = &mut self.next_block;
        *self.block_labels.entry(b).or_insert_with(|| {
            let n = *next;
            *next += 1;
            n
        })
    }

    fn reset(&mut self) {
        self.value_names.clear();
        self.block_labels.clear();
        self.next_value = 0;
        self.next_block = 0;
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print a single operation (and everything nested in it).
pub fn print_op(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_operation(&mut state, &mut out, op, 0).expect("fmt::Write to String never fails");
    out
}

/// Print a `core.module`.
pub fn print_module(ctx: &IrContext, module: OpRef) -> String {
    print_op(ctx, module)
}

pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Types and attributes
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    let data = ctx.types.get(ty);
    write!(f, "{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('(')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char(')')?;
    }
    Ok(())
}

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(bits) => write!(f, "{}", i64::from_ne_bytes(bits.to_ne_bytes())),
        Attribute::String(s) => {
            f.write_char('"')?;
            write_escaped(f, s)?;
            f.write_char('"')
        }
        Attribute::Symbol(sym) => write_symbol(f, *sym),
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::List(items) => {
            f.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
    }
}

fn write_escaped(f: &mut impl Write, s: &str) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        if !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_') {
            write!(f, "@{s}")
        } else {
            f.write_str("@\"")?;
            write_escaped(f, s)?;
            f.write_char('"')
        }
    })
}

// ============================================================================
// Operations
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    match OpKind::classify(state.ctx, op) {
        OpKind::Module => print_module_op(state, f, op, indent),
        OpKind::Func => print_func_op(state, f, op, indent),
        _ => print_generic_op(state, f, op, indent),
    }
}

fn write_value_list(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    values: &[ValueRef],
) -> fmt::Result {
    for (i, &v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "%{}", state.value_name(v))?;
    }
    Ok(())
}

fn print_generic_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    write!(f, "{:indent$}", "")?;

    let results = ctx.op_results(op);
    if !results.is_empty() {
        write_value_list(state, f, results)?;
        f.write_str(" = ")?;
    }

    write!(f, "{}.{}", data.dialect, data.name)?;

    let operands = ctx.op_operands(op);
    if !operands.is_empty() {
        f.write_char(' ')?;
        write_value_list(state, f, operands)?;
    }

    if !data.attributes.is_empty() {
        f.write_str(" {")?;
        for (i, (key, val)) in data.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = ")?;
            write_attribute(ctx, f, val)?;
        }
        f.write_char('}')?;
    }

    let result_types = ctx.op_result_types(op);
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, ty)?;
        }
    }

    for &region in &data.regions {
        f.write_str(" {\n")?;
        print_region(state, f, region, indent, false)?;
        write!(f, "{:indent$}}}", "")?;
    }
    f.write_char('\n')
}

/// Print the blocks of `region` owned by an operation at `indent`.
///
/// The entry label is left out when the region has a single block whose
/// arguments are either absent or already shown (`args_in_signature`).
fn print_region(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
    args_in_signature: bool,
) -> fmt::Result {
    let ctx = state.ctx;
    let blocks = &ctx.region(region).blocks;
    let elide_label = blocks.len() == 1 && (args_in_signature || ctx.block_args(blocks[0]).is_empty());
    let op_indent = if elide_label { indent + 2 } else { indent + 4 };

    // Labels are handed out up front so they follow block order.
    if !elide_label {
        for &block in blocks {
            state.block_label(block);
        }
    }

    for (i, &block) in blocks.iter().enumerate() {
        if i > 0 {
            f.write_char('\n')?;
        }
        if !elide_label {
            let label = state.block_label(block);
            write!(f, "{:w$}^bb{label}", "", w = indent + 2)?;
            let args = ctx.block_args(block);
            let show_args = !args.is_empty() && !(i == 0 && args_in_signature);
            if show_args {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "%{}: ", state.value_name(arg))?;
                    write_type(ctx, f, ctx.value_ty(arg))?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }
        for &op in &ctx.block(block).ops {
            print_operation(state, f, op, op_indent)?;
        }
    }
    Ok(())
}

fn print_module_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    write!(f, "{:indent$}core.module", "")?;
    if let Some(Attribute::Symbol(name)) = data.attributes.get(&Symbol::new("sym_name")) {
        f.write_char(' ')?;
        write_symbol(f, *name)?;
    }
    f.write_str(" {\n")?;
    if let Some(&body) = data.regions.first() {
        for &block in &ctx.region(body).blocks {
            for &child in &ctx.block(block).ops {
                state.reset();
                print_operation(state, f, child, indent + 2)?;
            }
        }
    }
    writeln!(f, "{:indent$}}}", "")
}

/// `func.func @name(%0: ty, ...) -> ret { ... }`
///
/// The entry block's arguments are shown as the parameter list.
fn print_func_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    write!(f, "{:indent$}func.func", "")?;
    if let Some(Attribute::Symbol(name)) = data.attributes.get(&Symbol::new("sym_name")) {
        f.write_char(' ')?;
        write_symbol(f, *name)?;
    }

    let Some(&body) = data.regions.first() else {
        return f.write_char('\n');
    };

    f.write_char('(')?;
    if let Some(&entry) = ctx.region(body).blocks.first() {
        for (i, &arg) in ctx.block_args(entry).iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "%{}: ", state.value_name(arg))?;
            write_type(ctx, f, ctx.value_ty(arg))?;
        }
    }
    f.write_char(')')?;

    let signature = match data.attributes.get(&Symbol::new("type")) {
        Some(Attribute::Type(fn_ty)) => crate::dialect::core::fn_signature(ctx, *fn_ty),
        _ => None,
    };
    if let Some((ret, _)) = signature {
        f.write_str(" -> ")?;
        write_type(ctx, f, ret)?;
    }

    f.write_str(" {\n")?;
    print_region(state, f, body, indent, true)?;
    writeln!(f, "{:indent$}}}", "")
}
