//! The func dialect: functions, callables, calls and returns.
//!
//! - `func.func` is a named top-level function owning one body region.
//!   Its `type` attribute is a `core.func(ret, params...)` type.
//! - `func.lambda` is a callable definition. It owns one body region and
//!   produces a single value of function type, the callable itself.
//! - `func.call_indirect %callee, %args...` calls whatever value is in
//!   operand 0. These are the calls the inliner substitutes.
//! - `func.call %args... {callee = @sym}` calls a function by symbol.
//! - `func.return %values...` terminates a body.

use super::{ConversionError, DialectOp, dialect_op, expect_regions, expect_results};
use crate::context::{IrContext, OperationDataBuilder};
use crate::location::Location;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::symbols;
use crate::types::Attribute;

symbols! {
    DIALECT_NAME => "func",
    FUNC => "func",
    LAMBDA => "lambda",
    CALL => "call",
    CALL_INDIRECT => "call_indirect",
    RETURN => "return",
    ATTR_SYM_NAME => "sym_name",
    ATTR_TYPE => "type",
    ATTR_CALLEE => "callee",
}

// ============================================================================
// func.func
// ============================================================================

dialect_op! {
    /// A named function with one body region.
    Func = "func"."func", check = check_func
}

fn check_func(ctx: &IrContext, op: OpRef) -> Result<(), ConversionError> {
    expect_regions(ctx, op, "func.func", 1)?;
    match ctx.op(op).attributes.get(&ATTR_SYM_NAME()) {
        Some(Attribute::Symbol(_)) => Ok(()),
        Some(_) => Err(ConversionError::WrongAttributeType {
            op: "func.func",
            key: "sym_name",
        }),
        None => Err(ConversionError::MissingAttribute {
            op: "func.func",
            key: "sym_name",
        }),
    }
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> Symbol {
        match ctx.op(self.0).attributes.get(&ATTR_SYM_NAME()) {
            Some(Attribute::Symbol(name)) => *name,
            _ => unreachable!("checked by Func::from_op"),
        }
    }

    /// The `core.func(ret, params...)` signature, if recorded.
    pub fn ty(&self, ctx: &IrContext) -> Option<TypeRef> {
        match ctx.op(self.0).attributes.get(&ATTR_TYPE()) {
            Some(Attribute::Type(ty)) => Some(*ty),
            _ => None,
        }
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn entry_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }
}

/// Build a detached `func.func` owning `body`.
pub fn func(
    ctx: &mut IrContext,
    location: Location,
    name: Symbol,
    ty: TypeRef,
    body: RegionRef,
) -> Func {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), FUNC())
        .attr(ATTR_SYM_NAME(), Attribute::Symbol(name))
        .attr(ATTR_TYPE(), Attribute::Type(ty))
        .region(body)
        .build(ctx);
    Func(ctx.create_op(data))
}

// ============================================================================
// func.lambda
// ============================================================================

dialect_op! {
    /// A callable definition whose result is the callable value.
    Lambda = "func"."lambda", check = check_lambda
}

fn check_lambda(ctx: &IrContext, op: OpRef) -> Result<(), ConversionError> {
    expect_regions(ctx, op, "func.lambda", 1)?;
    expect_results(ctx, op, "func.lambda", 1)
}

impl Lambda {
    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    /// The callable value that calls refer to.
    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn entry_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }
}

/// Build a detached `func.lambda` of function type `ty` owning `body`.
pub fn lambda(ctx: &mut IrContext, location: Location, ty: TypeRef, body: RegionRef) -> Lambda {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), LAMBDA())
        .result(ty)
        .region(body)
        .build(ctx);
    Lambda(ctx.create_op(data))
}

// ============================================================================
// func.call_indirect
// ============================================================================

dialect_op! {
    /// A call through a callable value.
    CallIndirect = "func"."call_indirect", check = check_call_indirect
}

fn check_call_indirect(ctx: &IrContext, op: OpRef) -> Result<(), ConversionError> {
    let actual = ctx.op_operands(op).len();
    if actual == 0 {
        return Err(ConversionError::MissingOperand {
            op: "func.call_indirect",
            min: 1,
            actual,
        });
    }
    Ok(())
}

impl CallIndirect {
    pub fn callee(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        &ctx.op_operands(self.0)[1..]
    }

    pub fn results<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_results(self.0)
    }
}

/// Build a detached `func.call_indirect`.
pub fn call_indirect(
    ctx: &mut IrContext,
    location: Location,
    callee: ValueRef,
    args: impl IntoIterator<Item = ValueRef>,
    result_types: impl IntoIterator<Item = TypeRef>,
) -> CallIndirect {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), CALL_INDIRECT())
        .operand(callee)
        .operands(args)
        .results(result_types)
        .build(ctx);
    CallIndirect(ctx.create_op(data))
}

// ============================================================================
// func.call
// ============================================================================

dialect_op! {
    /// A direct call by symbol.
    Call = "func"."call"
}

impl Call {
    pub fn callee(&self, ctx: &IrContext) -> Option<Symbol> {
        match ctx.op(self.0).attributes.get(&ATTR_CALLEE()) {
            Some(Attribute::Symbol(sym)) => Some(*sym),
            _ => None,
        }
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

/// Build a detached `func.call` to `callee`.
pub fn call(
    ctx: &mut IrContext,
    location: Location,
    callee: Symbol,
    args: impl IntoIterator<Item = ValueRef>,
    result_types: impl IntoIterator<Item = TypeRef>,
) -> Call {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), CALL())
        .operands(args)
        .results(result_types)
        .attr(ATTR_CALLEE(), Attribute::Symbol(callee))
        .build(ctx);
    Call(ctx.create_op(data))
}

// ============================================================================
// func.return
// ============================================================================

dialect_op! {
    /// Body terminator; its operands are the body's outputs.
    Return = "func"."return"
}

impl Return {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

/// Build a detached `func.return`.
pub fn r#return(
    ctx: &mut IrContext,
    location: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Return {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), RETURN())
        .operands(values)
        .build(ctx);
    Return(ctx.create_op(data))
}

/// The `func.return` ending `block`, if its last operation is one.
pub fn terminator(ctx: &IrContext, block: BlockRef) -> Option<Return> {
    let last = *ctx.block(block).ops.last()?;
    Return::from_op(ctx, last).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockArgData, BlockData, RegionData};
    use crate::dialect::{arith, core};
    use smallvec::smallvec;

    fn loc() -> Location {
        Location::default()
    }

    /// `func.lambda` computing `a + b` over i32.
    fn add_lambda(ctx: &mut IrContext) -> Lambda {
        let i32_ty = core::i32_type(ctx);
        let fn_ty = core::fn_type(ctx, i32_ty, [i32_ty, i32_ty]);
        let block = ctx.create_block(BlockData {
            location: loc(),
            args: vec![BlockArgData { ty: i32_ty }, BlockArgData { ty: i32_ty }],
            ops: smallvec![],
            parent_region: None,
        });
        let a = ctx.block_arg(block, 0);
        let b = ctx.block_arg(block, 1);
        let sum = arith::add(ctx, loc(), a, b, i32_ty);
        ctx.push_op(block, sum.op_ref());
        let sum_v = sum.result(ctx);
        let ret = r#return(ctx, loc(), [sum_v]);
        ctx.push_op(block, ret.op_ref());
        let body = ctx.create_region(RegionData {
            location: loc(),
            blocks: smallvec![block],
            parent_op: None,
        });
        lambda(ctx, loc(), fn_ty, body)
    }

    #[test]
    fn lambda_exposes_body_and_callable() {
        let mut ctx = IrContext::new();
        let l = add_lambda(&mut ctx);

        let again = Lambda::from_op(&ctx, l.op_ref()).expect("should match func.lambda");
        assert_eq!(again, l);

        let entry = l.entry_block(&ctx).expect("body has a block");
        assert_eq!(ctx.block_args(entry).len(), 2);
        let ret = terminator(&ctx, entry).expect("body ends in func.return");
        assert_eq!(ret.values(&ctx).len(), 1);
        assert_eq!(ctx.region(l.body(&ctx)).parent_op, Some(l.op_ref()));
        assert!(!ctx.has_uses(l.result(&ctx)));
    }

    #[test]
    fn call_indirect_splits_callee_and_args() {
        let mut ctx = IrContext::new();
        let l = add_lambda(&mut ctx);
        let i32_ty = core::i32_type(&mut ctx);
        let x = arith::r#const(&mut ctx, loc(), i32_ty, 1).result(&ctx);
        let y = arith::r#const(&mut ctx, loc(), i32_ty, 2).result(&ctx);

        let callee = l.result(&ctx);
        let call = call_indirect(&mut ctx, loc(), callee, [x, y], [i32_ty]);

        assert_eq!(call.callee(&ctx), callee);
        assert_eq!(call.args(&ctx), &[x, y]);
        assert_eq!(call.results(&ctx).len(), 1);
        assert!(ctx.has_one_use(callee));
    }

    #[test]
    fn call_indirect_without_callee_is_rejected() {
        let mut ctx = IrContext::new();
        let data = OperationDataBuilder::new(loc(), DIALECT_NAME(), CALL_INDIRECT()).build(&mut ctx);
        let op = ctx.create_op(data);
        assert_eq!(
            CallIndirect::from_op(&ctx, op),
            Err(ConversionError::MissingOperand {
                op: "func.call_indirect",
                min: 1,
                actual: 0,
            })
        );
    }

    #[test]
    fn func_requires_symbol_name() {
        let mut ctx = IrContext::new();
        let region = ctx.create_region(RegionData {
            location: loc(),
            blocks: smallvec![],
            parent_op: None,
        });
        let data = OperationDataBuilder::new(loc(), DIALECT_NAME(), FUNC())
            .region(region)
            .build(&mut ctx);
        let op = ctx.create_op(data);
        assert_eq!(
            Func::from_op(&ctx, op),
            Err(ConversionError::MissingAttribute {
                op: "func.func",
                key: "sym_name",
            })
        );
    }

    #[test]
    fn direct_call_records_callee_symbol() {
        let mut ctx = IrContext::new();
        let i32_ty = core::i32_type(&mut ctx);
        let x = arith::r#const(&mut ctx, loc(), i32_ty, 7).result(&ctx);
        let c = call(&mut ctx, loc(), Symbol::new("helper"), [x], [i32_ty]);
        assert_eq!(c.callee(&ctx), Some(Symbol::new("helper")));
        assert_eq!(c.args(&ctx), &[x]);
    }
}
