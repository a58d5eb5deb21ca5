//! Structural checks for a module after mutation.
//!
//! 1. **Scope validation**: every operand must name a value that is defined
//!    before its use, either earlier in an enclosing block or as an argument
//!    of an enclosing block, and whose defining operation is still live.
//! 2. **Use-chain consistency**: the use-chains stored in `IrContext` must
//!    match the operand lists exactly, in both directions.
//! 3. **Ownership**: parent links of operations, blocks and regions must
//!    agree with the lists that contain them.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::ops::ControlFlow;

use derive_more::Display;

use crate::context::IrContext;
use crate::refs::{BlockRef, OpRef, RegionRef, ValueDef, ValueRef};
use crate::types::Attribute;
use crate::walk;

// ============================================================================
// Error types
// ============================================================================

/// An operand that does not resolve to a live, in-scope value.
#[derive(Debug, Clone, Display)]
#[display("in @{function}: operand #{operand_index} of {consumer} references {value}")]
pub struct StaleValueError {
    /// Name of the enclosing `func.func`, or `<module>`.
    pub function: String,
    /// Full name of the consuming operation, e.g. `arith.add`.
    pub consumer: String,
    pub operand_index: usize,
    /// Human-readable description of the offending value.
    pub value: String,
}

#[derive(Debug, Clone, Display)]
#[display("{message}")]
pub struct UseChainError {
    pub message: String,
}

#[derive(Debug, Clone, Display)]
#[display("{message}")]
pub struct OwnershipError {
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub stale_errors: Vec<StaleValueError>,
    pub use_chain_errors: Vec<UseChainError>,
    pub ownership_errors: Vec<OwnershipError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.stale_errors.is_empty()
            && self.use_chain_errors.is_empty()
            && self.ownership_errors.is_empty()
    }

    fn merge(mut self, other: ValidationResult) -> Self {
        self.stale_errors.extend(other.stale_errors);
        self.use_chain_errors.extend(other.use_chain_errors);
        self.ownership_errors.extend(other.ownership_errors);
        self
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("validation passed");
        }
        fn section<E: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            what: &str,
            errors: &[E],
        ) -> fmt::Result {
            if errors.is_empty() {
                return Ok(());
            }
            writeln!(f, "{} {what}:", errors.len())?;
            for err in errors {
                writeln!(f, "  - {err}")?;
            }
            Ok(())
        }
        section(f, "stale value(s)", &self.stale_errors)?;
        section(f, "use-chain error(s)", &self.use_chain_errors)?;
        section(f, "ownership error(s)", &self.ownership_errors)
    }
}

// ============================================================================
// Scope validation
// ============================================================================

fn describe_value(ctx: &IrContext, v: ValueRef) -> String {
    match ctx.value_def(v) {
        ValueDef::OpResult(op, idx) => {
            let state = if ctx.is_op_live(op) { "" } else { "erased " };
            format!("result #{idx} of {state}{}", ctx.op_full_name(op))
        }
        ValueDef::BlockArg(block, idx) => format!("block arg #{idx} of {block}"),
    }
}

fn function_name(ctx: &IrContext, op: OpRef) -> Option<String> {
    let data = ctx.op(op);
    if data.dialect != "func" || data.name != "func" {
        return None;
    }
    match data.attributes.get(&crate::Symbol::new("sym_name")) {
        Some(Attribute::Symbol(s)) => Some(s.to_string()),
        _ => Some("<unnamed>".to_owned()),
    }
}

struct ScopeChecker<'a> {
    ctx: &'a IrContext,
    /// Values visible at the current point, innermost scope last.
    scopes: Vec<HashSet<ValueRef>>,
    function: String,
    errors: Vec<StaleValueError>,
}

impl ScopeChecker<'_> {
    fn visible(&self, v: ValueRef) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(&v))
    }

    fn define(&mut self, v: ValueRef) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(v);
        }
    }

    fn check_region(&mut self, region: RegionRef) {
        let ctx = self.ctx;
        self.scopes.push(HashSet::new());
        for &block in &ctx.region(region).blocks {
            self.check_block(block);
        }
        self.scopes.pop();
    }

    fn check_block(&mut self, block: BlockRef) {
        let ctx = self.ctx;
        for &arg in ctx.block_args(block) {
            self.define(arg);
        }
        for &op in &ctx.block(block).ops {
            self.check_op(op);
        }
    }

    fn check_op(&mut self, op: OpRef) {
        let ctx = self.ctx;
        for (i, &operand) in ctx.op_operands(op).iter().enumerate() {
            let live = ctx.defining_op(operand).is_none_or(|def| ctx.is_op_live(def));
            if !live || !self.visible(operand) {
                self.errors.push(StaleValueError {
                    function: self.function.clone(),
                    consumer: ctx.op_full_name(op),
                    operand_index: i,
                    value: describe_value(ctx, operand),
                });
            }
        }

        let entered = function_name(ctx, op);
        let outer = entered
            .map(|name| std::mem::replace(&mut self.function, name));
        for &region in &ctx.op(op).regions {
            self.check_region(region);
        }
        if let Some(outer) = outer {
            self.function = outer;
        }

        for &result in ctx.op_results(op) {
            self.define(result);
        }
    }
}

/// Check that every operand in `root` (usually a `core.module`) resolves to
/// a live value defined before it in an enclosing scope.
pub fn validate_value_integrity(ctx: &IrContext, root: OpRef) -> ValidationResult {
    let mut checker = ScopeChecker {
        ctx,
        scopes: Vec::new(),
        function: "<module>".to_owned(),
        errors: Vec::new(),
    };
    for &region in &ctx.op(root).regions {
        checker.check_region(region);
    }
    ValidationResult {
        stale_errors: checker.errors,
        ..Default::default()
    }
}

// ============================================================================
// Use-chain consistency
// ============================================================================

/// Check that use-chains and operand lists agree for everything under `root`.
pub fn validate_use_chains(ctx: &IrContext, root: OpRef) -> ValidationResult {
    let mut errors = Vec::new();
    let mut actual_uses: HashSet<(ValueRef, OpRef, u32)> = HashSet::new();
    let mut defined: Vec<ValueRef> = Vec::new();

    for &region in &ctx.op(root).regions {
        let ControlFlow::Continue(()) =
            walk::walk_region::<Infallible>(ctx, region, &mut |op| {
                for (idx, &operand) in ctx.op_operands(op).iter().enumerate() {
                    actual_uses.insert((operand, op, idx as u32));
                }
                defined.extend_from_slice(ctx.op_results(op));
                for &inner in &ctx.op(op).regions {
                    for &block in &ctx.region(inner).blocks {
                        defined.extend_from_slice(ctx.block_args(block));
                    }
                }
                ControlFlow::Continue(walk::WalkAction::Advance)
            });
        for &block in &ctx.region(region).blocks {
            defined.extend_from_slice(ctx.block_args(block));
        }
    }

    for &(val, op, idx) in &actual_uses {
        let recorded = ctx
            .uses(val)
            .iter()
            .any(|u| u.user == op && u.operand_index == idx);
        if !recorded {
            errors.push(UseChainError {
                message: format!(
                    "operand #{idx} of {} ({op}) reads {val} but the use-chain has no entry",
                    ctx.op_full_name(op),
                ),
            });
        }
    }

    for &val in &defined {
        for u in ctx.uses(val) {
            if !actual_uses.contains(&(val, u.user, u.operand_index)) {
                let state = if ctx.is_op_live(u.user) {
                    "detached or mismatched"
                } else {
                    "erased"
                };
                errors.push(UseChainError {
                    message: format!(
                        "use-chain of {val} lists operand #{} of {state} {} ({})",
                        u.operand_index,
                        ctx.op_full_name(u.user),
                        u.user,
                    ),
                });
            }
        }
    }

    ValidationResult {
        use_chain_errors: errors,
        ..Default::default()
    }
}

// ============================================================================
// Ownership
// ============================================================================

/// Check parent links and liveness of everything reachable from `root`.
pub fn validate_ownership(ctx: &IrContext, root: OpRef) -> ValidationResult {
    fn check_op(ctx: &IrContext, op: OpRef, errors: &mut Vec<OwnershipError>) {
        if !ctx.is_op_live(op) {
            errors.push(OwnershipError {
                message: format!("erased {} ({op}) is still attached", ctx.op_full_name(op)),
            });
        }
        for &region in &ctx.op(op).regions {
            if ctx.region(region).parent_op != Some(op) {
                errors.push(OwnershipError {
                    message: format!("{region} is listed by {op} but not owned by it"),
                });
            }
            for &block in &ctx.region(region).blocks {
                if ctx.block(block).parent_region != Some(region) {
                    errors.push(OwnershipError {
                        message: format!("{block} is listed by {region} but not owned by it"),
                    });
                }
                for &child in &ctx.block(block).ops {
                    if ctx.op(child).parent_block != Some(block) {
                        errors.push(OwnershipError {
                            message: format!("{child} is listed by {block} but not owned by it"),
                        });
                    }
                    check_op(ctx, child, errors);
                }
            }
        }
    }

    let mut errors = Vec::new();
    check_op(ctx, root, &mut errors);
    ValidationResult {
        ownership_errors: errors,
        ..Default::default()
    }
}

/// Run every check on `module`.
pub fn validate_module(ctx: &IrContext, module: OpRef) -> ValidationResult {
    validate_value_integrity(ctx, module)
        .merge(validate_use_chains(ctx, module))
        .merge(validate_ownership(ctx, module))
}

/// Validate under `debug_assertions`, panicking with every error found.
pub fn debug_assert_valid(ctx: &IrContext, module: OpRef, pass_name: &str) {
    if !cfg!(debug_assertions) {
        return;
    }
    let result = validate_module(ctx, module);
    if !result.is_ok() {
        panic!("validation failed after `{pass_name}`:\n{result}");
    }
}
