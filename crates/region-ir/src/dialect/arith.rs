//! The arith dialect: integer constants and binary arithmetic.
//!
//! Enough to give callable bodies something to compute in tests.

use super::dialect_op;
use crate::context::{IrContext, OperationDataBuilder};
use crate::location::Location;
use crate::refs::{TypeRef, ValueRef};
use crate::symbols;
use crate::types::Attribute;

symbols! {
    DIALECT_NAME => "arith",
    CONST => "const",
    ADD => "add",
    SUB => "sub",
    MUL => "mul",
    ATTR_VALUE => "value",
}

dialect_op! {
    Const = "arith"."const"
}

impl Const {
    pub fn value(&self, ctx: &IrContext) -> Option<i64> {
        match ctx.op(self.0).attributes.get(&ATTR_VALUE()) {
            Some(Attribute::IntBits(bits)) => Some(i64::from_ne_bytes(bits.to_ne_bytes())),
            _ => None,
        }
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

pub fn r#const(ctx: &mut IrContext, location: Location, ty: TypeRef, value: i64) -> Const {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), CONST())
        .attr(ATTR_VALUE(), Attribute::from(value))
        .result(ty)
        .build(ctx);
    Const(ctx.create_op(data))
}

macro_rules! binary_op {
    ($wrapper:ident, $builder:ident, $name:literal, $sym:ident) => {
        dialect_op! {
            $wrapper = "arith".$name
        }

        impl $wrapper {
            pub fn lhs(&self, ctx: &IrContext) -> ValueRef {
                ctx.op_operands(self.0)[0]
            }

            pub fn rhs(&self, ctx: &IrContext) -> ValueRef {
                ctx.op_operands(self.0)[1]
            }

            pub fn result(&self, ctx: &IrContext) -> ValueRef {
                ctx.op_result(self.0, 0)
            }
        }

        pub fn $builder(
            ctx: &mut IrContext,
            location: Location,
            lhs: ValueRef,
            rhs: ValueRef,
            ty: TypeRef,
        ) -> $wrapper {
            let data = OperationDataBuilder::new(location, DIALECT_NAME(), $sym())
                .operand(lhs)
                .operand(rhs)
                .result(ty)
                .build(ctx);
            $wrapper(ctx.create_op(data))
        }
    };
}

binary_op!(Add, add, "add", ADD);
binary_op!(Sub, sub, "sub", SUB);
binary_op!(Mul, mul, "mul", MUL);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectOp, core};

    #[test]
    fn const_keeps_negative_values() {
        let mut ctx = IrContext::new();
        let loc = Location::default();
        let i32_ty = core::i32_type(&mut ctx);
        let c = r#const(&mut ctx, loc, i32_ty, -5);
        assert_eq!(c.value(&ctx), Some(-5));
        assert_eq!(ctx.value_ty(c.result(&ctx)), i32_ty);
    }

    #[test]
    fn binary_ops_keep_operand_order() {
        let mut ctx = IrContext::new();
        let loc = Location::default();
        let i32_ty = core::i32_type(&mut ctx);
        let a = r#const(&mut ctx, loc, i32_ty, 1).result(&ctx);
        let b = r#const(&mut ctx, loc, i32_ty, 2).result(&ctx);

        let diff = sub(&mut ctx, loc, b, a, i32_ty);
        assert_eq!(diff.lhs(&ctx), b);
        assert_eq!(diff.rhs(&ctx), a);
        assert!(Sub::from_op(&ctx, diff.op_ref()).is_ok());
        assert!(Add::from_op(&ctx, diff.op_ref()).is_err());
        let product = mul(&mut ctx, loc, a, b, i32_ty);
        assert!(Mul::matches(&ctx, product.op_ref()));
    }
}
