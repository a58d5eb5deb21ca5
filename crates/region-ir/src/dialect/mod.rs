//! Typed views over operations.
//!
//! Every operation kind the inliner cares about has a wrapper type: a
//! `Copy` handle around an [`OpRef`] that has been checked to carry the
//! right `dialect.name`. Wrappers are obtained with [`DialectOp::from_op`]
//! and expose accessors for operands, attributes and regions.

use derive_more::{Display, Error};

use crate::context::IrContext;
use crate::refs::OpRef;
use crate::symbol::Symbol;

pub mod arith;
pub mod core;
pub mod func;

/// Trait for typed operation wrappers.
pub trait DialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError>;
    fn op_ref(&self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == Symbol::new(Self::DIALECT_NAME) && data.name == Symbol::new(Self::OP_NAME)
    }
}

/// Failure to view an operation through a typed wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConversionError {
    #[display("expected `{expected}`, found `{actual}`")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    #[display("`{op}` is missing attribute `{key}`")]
    MissingAttribute {
        op: &'static str,
        key: &'static str,
    },
    #[display("`{op}` attribute `{key}` has the wrong kind")]
    WrongAttributeType {
        op: &'static str,
        key: &'static str,
    },
    #[display("`{op}` expects {expected} region(s), found {actual}")]
    WrongRegionCount {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("`{op}` expects {expected} result(s), found {actual}")]
    WrongResultCount {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("`{op}` expects at least {min} operand(s), found {actual}")]
    MissingOperand {
        op: &'static str,
        min: usize,
        actual: usize,
    },
}

/// Closed classification of the operation kinds the inliner distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Module,
    Func,
    Lambda,
    CallIndirect,
    Call,
    Return,
    Other,
}

impl OpKind {
    pub fn classify(ctx: &IrContext, op: OpRef) -> Self {
        let data = ctx.op(op);
        data.dialect.with_str(|dialect| {
            data.name.with_str(|name| match (dialect, name) {
                ("core", "module") => OpKind::Module,
                ("func", "func") => OpKind::Func,
                ("func", "lambda") => OpKind::Lambda,
                ("func", "call_indirect") => OpKind::CallIndirect,
                ("func", "call") => OpKind::Call,
                ("func", "return") => OpKind::Return,
                _ => OpKind::Other,
            })
        })
    }

    /// Whether this kind can be the target of an inlined call.
    pub fn is_callable_definition(self) -> bool {
        matches!(self, OpKind::Lambda)
    }
}

/// Declare a wrapper struct and its `DialectOp` impl.
///
/// The generated `from_op` checks the kind tag, then runs the optional
/// `check` function for structural requirements.
macro_rules! dialect_op {
    ($(#[$meta:meta])* $name:ident = $dialect:literal . $op:literal $(, check = $check:path)?) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name($crate::refs::OpRef);

        impl $crate::dialect::DialectOp for $name {
            const DIALECT_NAME: &'static str = $dialect;
            const OP_NAME: &'static str = $op;

            fn from_op(
                ctx: &$crate::context::IrContext,
                op: $crate::refs::OpRef,
            ) -> Result<Self, $crate::dialect::ConversionError> {
                if !<Self as $crate::dialect::DialectOp>::matches(ctx, op) {
                    return Err($crate::dialect::ConversionError::WrongOperation {
                        expected: concat!($dialect, ".", $op),
                        actual: ctx.op_full_name(op),
                    });
                }
                $($check(ctx, op)?;)?
                Ok(Self(op))
            }

            fn op_ref(&self) -> $crate::refs::OpRef {
                self.0
            }
        }
    };
}
pub(crate) use dialect_op;

/// Check that `op` owns exactly `expected` regions.
pub(crate) fn expect_regions(
    ctx: &IrContext,
    op: OpRef,
    name: &'static str,
    expected: usize,
) -> Result<(), ConversionError> {
    let actual = ctx.op(op).regions.len();
    if actual == expected {
        Ok(())
    } else {
        Err(ConversionError::WrongRegionCount {
            op: name,
            expected,
            actual,
        })
    }
}

/// Check that `op` produces exactly `expected` results.
pub(crate) fn expect_results(
    ctx: &IrContext,
    op: OpRef,
    name: &'static str,
    expected: usize,
) -> Result<(), ConversionError> {
    let actual = ctx.op_results(op).len();
    if actual == expected {
        Ok(())
    } else {
        Err(ConversionError::WrongResultCount {
            op: name,
            expected,
            actual,
        })
    }
}
