//! Arena-based mutable region IR.
//!
//! Operations, values, blocks and regions live in `cranelift-entity`
//! arenas owned by [`IrContext`]. Every value carries a use-chain, which
//! makes use-count queries, RAUW and safe erasure cheap. This is the
//! program representation the inliner in the root crate mutates.

pub mod clone;
pub mod context;
pub mod dialect;
pub mod location;
pub mod parser;
pub mod printer;
pub mod refs;
pub mod symbol;
pub mod types;
pub mod validation;
pub mod walk;

pub use clone::{IrMapping, clone_op, clone_region};
pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
    ValueData,
};
pub use dialect::{ConversionError, DialectOp, OpKind};
pub use location::{Location, Span};
pub use refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use symbol::Symbol;
pub use types::{Attribute, TypeData, TypeInterner};
pub use walk::WalkAction;

// Re-export smallvec for downstream crates building operand lists
pub use smallvec;
