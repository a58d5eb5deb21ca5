//! Call-site inlining for the region IR.
//!
//! The pass replaces each `func.call_indirect` whose callee is a
//! `func.lambda` result with the lambda's body, then erases the call and
//! any lambda left unused. See [`inliner`] for the details.
//!
//! ```
//! use region_ir::parser::parse_test_module;
//! use region_ir::validation::validate_module;
//! use region_inliner::inline_module;
//!
//! let (mut ctx, module) = parse_test_module(
//!     r#"core.module @m {
//!   func.func @f(%x: core.i32) -> core.i32 {
//!     %l = func.lambda : core.func(core.i32, core.i32) {
//!       ^bb0(%a: core.i32):
//!         %s = arith.mul %a, %a : core.i32
//!         func.return %s
//!     }
//!     %r = func.call_indirect %l, %x : core.i32
//!     func.return %r
//!   }
//! }"#,
//! );
//! let result = inline_module(&mut ctx, module);
//! assert_eq!(result.inlined, 1);
//! assert_eq!(result.erased_definitions, 1);
//! assert!(validate_module(&ctx, module).is_ok());
//! ```

pub mod cleanup;
pub mod collect;
pub mod error;
pub mod inliner;

pub use collect::{CallSites, collect_call_sites, collect_op_call_sites};
pub use error::InlineError;
pub use inliner::{
    CallOutcome, InlineMode, InlineResult, inline_call, inline_function, inline_module,
    inline_region, resolve_callee,
};
