//! The core dialect: modules and builtin types.

use super::{ConversionError, dialect_op, expect_regions};
use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::location::Location;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef};
use crate::symbol::Symbol;
use crate::symbols;
use crate::types::{Attribute, TypeData};

symbols! {
    DIALECT_NAME => "core",
    MODULE => "module",
    ATTR_SYM_NAME => "sym_name",
    I32 => "i32",
    I1 => "i1",
    FUNC => "func",
}

dialect_op! {
    /// Top-level container. Its single body block holds `func.func`s.
    Module = "core"."module", check = check_module
}

fn check_module(ctx: &IrContext, op: OpRef) -> Result<(), ConversionError> {
    expect_regions(ctx, op, "core.module", 1)
}

impl Module {
    pub fn name(&self, ctx: &IrContext) -> Option<Symbol> {
        match ctx.op(self.0).attributes.get(&ATTR_SYM_NAME()) {
            Some(Attribute::Symbol(name)) => Some(*name),
            _ => None,
        }
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn first_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }

    /// Top-level operations of the module's first block.
    pub fn ops<'a>(&self, ctx: &'a IrContext) -> &'a [OpRef] {
        match self.first_block(ctx) {
            Some(block) => &ctx.block(block).ops,
            None => &[],
        }
    }
}

/// Build a detached, empty `core.module` with one body block.
pub fn module(ctx: &mut IrContext, location: Location, name: Symbol) -> Module {
    let block = ctx.create_block(BlockData {
        location,
        args: Vec::new(),
        ops: Default::default(),
        parent_region: None,
    });
    let body = ctx.create_region(RegionData {
        location,
        blocks: smallvec::smallvec![block],
        parent_op: None,
    });
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), MODULE())
        .attr(ATTR_SYM_NAME(), Attribute::Symbol(name))
        .region(body)
        .build(ctx);
    Module(ctx.create_op(data))
}

pub fn i32_type(ctx: &mut IrContext) -> TypeRef {
    ctx.types.intern(TypeData::new(DIALECT_NAME(), I32(), []))
}

pub fn i1_type(ctx: &mut IrContext) -> TypeRef {
    ctx.types.intern(TypeData::new(DIALECT_NAME(), I1(), []))
}

/// `core.func(ret, params...)`.
pub fn fn_type(
    ctx: &mut IrContext,
    ret: TypeRef,
    params: impl IntoIterator<Item = TypeRef>,
) -> TypeRef {
    ctx.types.intern(TypeData::new(
        DIALECT_NAME(),
        FUNC(),
        std::iter::once(ret).chain(params),
    ))
}

/// Split a `core.func` type into its return type and parameter types.
pub fn fn_signature(ctx: &IrContext, ty: TypeRef) -> Option<(TypeRef, &[TypeRef])> {
    if !ctx.types.is(ty, DIALECT_NAME(), FUNC()) {
        return None;
    }
    let (ret, params) = ctx.types.get(ty).params.split_first()?;
    Some((*ret, params))
}
