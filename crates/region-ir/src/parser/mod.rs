//! Text format parser.
//!
//! Parses the format produced by [`crate::printer`] back into an
//! [`IrContext`].
//!
//! # Two-stage parsing
//!
//! 1. **Raw parse**: winnow combinators in [`raw`] turn text into `Raw*`
//!    structures that still refer to values and types by name.
//! 2. **IR build**: `IrBuilder` resolves names and creates operations,
//!    blocks and regions.
//!
//! Value names are scoped by region: a region sees the names of every
//! enclosing region, and its own names disappear once it is closed.

pub(crate) mod raw;

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use winnow::prelude::*;
use winnow::stream::Offset;

use crate::context::{BlockArgData, BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::location::{Location, Span};
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeData};
pub use raw::ParseError;
use raw::{RawAttribute, RawOperation, RawRegion, RawType};

type Scope = HashMap<String, ValueRef>;

struct IrBuilder<'a, 's> {
    ctx: &'a mut IrContext,
    source: &'s str,
    values: Scope,
}

impl<'a, 's> IrBuilder<'a, 's> {
    fn new(ctx: &'a mut IrContext, source: &'s str) -> Self {
        Self {
            ctx,
            source,
            values: HashMap::new(),
        }
    }

    /// Location of `raw` within the parsed source.
    fn locate(&self, raw: &RawOperation<'_>) -> Location {
        let start = raw.text.offset_from(&self.source);
        Location::new(Span::new(start, start + raw.text.len()))
    }

    fn error(location: Location, message: String) -> ParseError {
        ParseError {
            message,
            offset: location.offset(),
        }
    }

    fn build_type(&mut self, raw: &RawType<'_>) -> TypeRef {
        let params: SmallVec<[TypeRef; 4]> = raw.params.iter().map(|p| self.build_type(p)).collect();
        self.ctx.types.intern(TypeData::new(
            Symbol::from_dynamic(raw.dialect),
            Symbol::from_dynamic(raw.name),
            params,
        ))
    }

    fn build_attribute(&mut self, raw: &RawAttribute<'_>) -> Attribute {
        match raw {
            RawAttribute::Unit => Attribute::Unit,
            RawAttribute::Bool(b) => Attribute::Bool(*b),
            RawAttribute::Int(bits) => Attribute::IntBits(*bits),
            RawAttribute::String(s) => Attribute::String(s.clone()),
            RawAttribute::Symbol(s) => Attribute::Symbol(Symbol::from_dynamic(s)),
            RawAttribute::Type(t) => Attribute::Type(self.build_type(t)),
            RawAttribute::List(items) => {
                Attribute::List(items.iter().map(|a| self.build_attribute(a)).collect())
            }
        }
    }

    fn define(&mut self, location: Location, name: &str, value: ValueRef) -> Result<(), ParseError> {
        if self.values.insert(name.to_owned(), value).is_some() {
            return Err(Self::error(location, format!("redefinition of '%{name}'")));
        }
        Ok(())
    }

    /// Build a region owned by the operation at `location`. `entry_params`
    /// become the entry block's arguments when the region belongs to a
    /// function-style signature.
    fn build_region(
        &mut self,
        location: Location,
        raw: &RawRegion<'_>,
        entry_params: &[(&str, RawType<'_>)],
    ) -> Result<RegionRef, ParseError> {
        let saved = self.values.clone();
        let region = self.build_region_in_scope(location, raw, entry_params);
        self.values = saved;
        region
    }

    fn build_region_in_scope(
        &mut self,
        location: Location,
        raw: &RawRegion<'_>,
        entry_params: &[(&str, RawType<'_>)],
    ) -> Result<RegionRef, ParseError> {
        let mut labels = HashSet::new();
        let mut blocks: SmallVec<[BlockRef; 4]> = SmallVec::new();

        // All blocks first, so their arguments are in scope for every op.
        for (i, raw_block) in raw.blocks.iter().enumerate() {
            if !labels.insert(raw_block.label) {
                return Err(Self::error(
                    location,
                    format!("duplicate block label '^{}'", raw_block.label),
                ));
            }
            let args = if i == 0 && !entry_params.is_empty() {
                if !raw_block.args.is_empty() {
                    return Err(Self::error(
                        location,
                        format!(
                            "entry block '^{}' repeats the function parameters",
                            raw_block.label
                        ),
                    ));
                }
                entry_params
            } else {
                &raw_block.args[..]
            };

            let arg_data: Vec<BlockArgData> = args
                .iter()
                .map(|(_, ty)| BlockArgData {
                    ty: self.build_type(ty),
                })
                .collect();
            let block = self.ctx.create_block(BlockData {
                location,
                args: arg_data,
                ops: SmallVec::new(),
                parent_region: None,
            });
            for (j, (name, _)) in args.iter().enumerate() {
                let value = self.ctx.block_arg(block, j as u32);
                self.define(location, name, value)?;
            }
            blocks.push(block);
        }

        for (raw_block, &block) in raw.blocks.iter().zip(&blocks) {
            for raw_op in &raw_block.ops {
                let op = self.build_operation(raw_op)?;
                self.ctx.push_op(block, op);
            }
        }

        Ok(self.ctx.create_region(RegionData {
            location,
            blocks,
            parent_op: None,
        }))
    }

    fn build_operation(&mut self, raw: &RawOperation<'_>) -> Result<OpRef, ParseError> {
        let location = self.locate(raw);
        let full_name = format!("{}.{}", raw.dialect, raw.op_name);

        let operands: Vec<ValueRef> = raw
            .operands
            .iter()
            .map(|name| {
                self.values.get(*name).copied().ok_or_else(|| {
                    Self::error(
                        location,
                        format!("undefined value '%{name}' in '{full_name}'"),
                    )
                })
            })
            .collect::<Result<_, _>>()?;

        // Operand 0 is the callee; without it the call has nothing to invoke.
        if full_name == "func.call_indirect" && operands.is_empty() {
            return Err(Self::error(
                location,
                "'func.call_indirect' needs a callee operand".to_owned(),
            ));
        }

        let result_types: Vec<TypeRef> = raw.result_types.iter().map(|t| self.build_type(t)).collect();
        if !raw.results.is_empty() && raw.results.len() != result_types.len() {
            return Err(Self::error(
                location,
                format!(
                    "'{full_name}' names {} result(s) but declares {} type(s)",
                    raw.results.len(),
                    result_types.len()
                ),
            ));
        }

        let mut builder = OperationDataBuilder::new(
            location,
            Symbol::from_dynamic(raw.dialect),
            Symbol::from_dynamic(raw.op_name),
        )
        .operands(operands)
        .results(result_types);

        for (key, value) in &raw.attributes {
            let attr = self.build_attribute(value);
            builder = builder.attr(Symbol::from_dynamic(key), attr);
        }
        if let Some(name) = &raw.sym_name {
            builder = builder.attr(
                Symbol::new("sym_name"),
                Attribute::Symbol(Symbol::from_dynamic(name)),
            );
        }

        // A function-style signature becomes the `core.func(ret, params...)` type.
        let has_signature = raw.return_type.is_some() || !raw.func_params.is_empty();
        if has_signature {
            let ret = match &raw.return_type {
                Some(t) => self.build_type(t),
                None => self
                    .ctx
                    .types
                    .intern(TypeData::new(Symbol::new("core"), Symbol::new("nil"), [])),
            };
            let params: Vec<TypeRef> = raw.func_params.iter().map(|(_, t)| self.build_type(t)).collect();
            let fn_ty = self.ctx.types.intern(TypeData::new(
                Symbol::new("core"),
                Symbol::new("func"),
                std::iter::once(ret).chain(params),
            ));
            builder = builder.attr(Symbol::new("type"), Attribute::Type(fn_ty));
        }

        for (i, region) in raw.regions.iter().enumerate() {
            let entry_params = if i == 0 { &raw.func_params[..] } else { &[] };
            let region = self.build_region(location, region, entry_params)?;
            builder = builder.region(region);
        }

        let data = builder.build(self.ctx);
        let op = self.ctx.create_op(data);

        for (i, name) in raw.results.iter().enumerate() {
            let value = self.ctx.op_result(op, i as u32);
            self.define(location, name, value)?;
        }
        Ok(op)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse one top-level operation (normally a `core.module`) into `ctx`.
pub fn parse_module(ctx: &mut IrContext, input: &str) -> Result<OpRef, ParseError> {
    let mut remaining = input;
    let syntax_error = |remaining: &str, message: String| ParseError {
        message,
        offset: remaining.offset_from(&input),
    };
    let raw_op = raw::raw_operation
        .parse_next(&mut remaining)
        .map_err(|e| syntax_error(remaining, format!("syntax error: {e}")))?;

    raw::ws
        .parse_next(&mut remaining)
        .map_err(|e| syntax_error(remaining, format!("syntax error: {e}")))?;
    if !remaining.is_empty() {
        return Err(syntax_error(
            remaining,
            "trailing input after top-level operation".to_owned(),
        ));
    }

    IrBuilder::new(ctx, input).build_operation(&raw_op)
}

/// Parse a `core.module` into a fresh context, panicking on failure.
///
/// Test fixture helper.
pub fn parse_test_module(input: &str) -> (IrContext, OpRef) {
    let mut ctx = IrContext::new();
    let op = parse_module(&mut ctx, input).unwrap_or_else(|e| {
        panic!("failed to parse test IR: {e}\n\nInput:\n{input}");
    });
    assert!(
        ctx.op_full_name(op) == "core.module",
        "parsed operation is `{}`, not a core.module\n\nInput:\n{input}",
        ctx.op_full_name(op)
    );
    (ctx, op)
}
