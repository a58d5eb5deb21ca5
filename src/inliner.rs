//! The inliner engine.
//!
//! [`inline_function`] collects every `func.call_indirect` in a function up
//! front, then visits the calls in order. A call whose callee operand is the
//! result of a `func.lambda` has the lambda's body spliced in front of it:
//! cloned while other uses of the lambda remain, moved when this call is the
//! last one. The call's results are rewired to the values the body returns,
//! the call is erased, and a lambda left without uses is erased as well.
//!
//! Calls through any other value are skipped. Calls that cannot be inlined
//! for structural reasons are reported and left untouched. Neither stops
//! the pass.

use smallvec::SmallVec;

use region_ir::dialect::func::{self, CallIndirect, Lambda};
use region_ir::{BlockRef, DialectOp, IrContext, IrMapping, OpRef, RegionRef, ValueRef, clone_op};

use crate::cleanup;
use crate::collect::collect_op_call_sites;
use crate::error::InlineError;

/// How a callee body reaches the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineMode {
    /// Deep-copy the body; the callee stays intact.
    Clone,
    /// Relocate the body's operations; the callee is left with an empty block.
    Move,
}

/// What happened to a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Inlined {
        mode: InlineMode,
        /// Whether the callee definition was erased afterwards.
        erased_definition: bool,
    },
    /// The callee is not a `func.lambda` result.
    Skipped,
    Failed(InlineError),
}

/// Result of running the inliner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineResult {
    /// Calls replaced by their callee's body.
    pub inlined: usize,
    /// Calls whose callee could not be resolved to a definition.
    pub skipped: usize,
    /// Calls with a resolved callee that could not be inlined.
    pub failed: usize,
    /// Callee definitions erased after their last call was inlined.
    pub erased_definitions: usize,
}

impl InlineResult {
    fn record(&mut self, outcome: &CallOutcome) {
        match outcome {
            CallOutcome::Inlined {
                erased_definition, ..
            } => {
                self.inlined += 1;
                if *erased_definition {
                    self.erased_definitions += 1;
                }
            }
            CallOutcome::Skipped => self.skipped += 1,
            CallOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl std::ops::AddAssign for InlineResult {
    fn add_assign(&mut self, rhs: Self) {
        self.inlined += rhs.inlined;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
        self.erased_definitions += rhs.erased_definitions;
    }
}

/// Inline every resolvable indirect call in the regions of `func`.
pub fn inline_function(ctx: &mut IrContext, func: OpRef) -> InlineResult {
    let sites = collect_op_call_sites(ctx, func);
    tracing::debug!(
        "inline_function: {} call site(s) in {}",
        sites.len(),
        describe(ctx, func)
    );

    let mut result = InlineResult::default();
    for call in sites {
        let outcome = inline_call(ctx, call);
        result.record(&outcome);
    }
    tracing::debug!(
        "inline_function: inlined {}, skipped {}, failed {}, erased {} definition(s)",
        result.inlined,
        result.skipped,
        result.failed,
        result.erased_definitions
    );
    result
}

/// Run [`inline_function`] on every `func.func` directly inside `module`.
pub fn inline_module(ctx: &mut IrContext, module: OpRef) -> InlineResult {
    let funcs: Vec<OpRef> = ctx
        .op(module)
        .regions
        .iter()
        .flat_map(|&region| ctx.region(region).blocks.iter())
        .flat_map(|&block| ctx.block(block).ops.iter().copied())
        .filter(|&op| func::Func::matches(ctx, op))
        .collect();

    let mut total = InlineResult::default();
    for func in funcs {
        total += inline_function(ctx, func);
    }
    total
}

/// Resolve, inline and clean up after a single call.
pub fn inline_call(ctx: &mut IrContext, call: CallIndirect) -> CallOutcome {
    if let Err(err) = check_live(ctx, call) {
        tracing::warn!("inline: {}: {err}", call.op_ref());
        return CallOutcome::Failed(err);
    }

    let Some(lambda) = resolve_callee(ctx, call) else {
        tracing::trace!(
            "inline: skipping {}: callee {} is not a func.lambda result",
            call.op_ref(),
            call.callee(ctx)
        );
        return CallOutcome::Skipped;
    };

    let mode = if ctx.use_count(lambda.result(ctx)) > 1 {
        InlineMode::Clone
    } else {
        InlineMode::Move
    };

    let body = lambda.body(ctx);
    if let Err(err) = inline_region(ctx, body, call, mode) {
        tracing::warn!(
            "inline: cannot inline {} into {}: {err}",
            lambda.op_ref(),
            call.op_ref()
        );
        return CallOutcome::Failed(err);
    }

    cleanup::erase_call(ctx, call);
    let erased_definition = cleanup::erase_if_dead(ctx, lambda);
    tracing::debug!(
        "inline: {mode:?} {} into {}{}",
        lambda.op_ref(),
        call.op_ref(),
        if erased_definition {
            ", definition erased"
        } else {
            ""
        }
    );
    CallOutcome::Inlined {
        mode,
        erased_definition,
    }
}

/// The `func.lambda` defining the call's callee operand, if any.
pub fn resolve_callee(ctx: &IrContext, call: CallIndirect) -> Option<Lambda> {
    let def = ctx.defining_op(call.callee(ctx))?;
    Lambda::from_op(ctx, def).ok()
}

/// Splice the single block of `callee` in front of `call`.
///
/// The block's arguments take the call's arguments, positionally. Afterwards
/// every use of a call result reads the matching `func.return` operand, and
/// the spliced `func.return` is gone. The call itself stays in place with no
/// remaining uses.
///
/// All checks run before anything is modified; on error the IR is unchanged.
pub fn inline_region(
    ctx: &mut IrContext,
    callee: RegionRef,
    call: CallIndirect,
    mode: InlineMode,
) -> Result<(), InlineError> {
    let (caller_block, entry) = check_inlinable(ctx, callee, call)?;
    let call_op = call.op_ref();

    let formals: SmallVec<[ValueRef; 4]> = ctx.block_args(entry).into();
    let actuals: SmallVec<[ValueRef; 4]> = call.args(ctx).into();

    let spliced: SmallVec<[OpRef; 4]> = match mode {
        InlineMode::Clone => {
            let mut mapping = IrMapping::new();
            for (&formal, &actual) in formals.iter().zip(&actuals) {
                mapping.map_value(formal, actual);
            }
            let body: SmallVec<[OpRef; 8]> = ctx.block(entry).ops.iter().copied().collect();
            body.into_iter()
                .map(|op| {
                    let cloned = clone_op(ctx, op, &mut mapping);
                    ctx.insert_op_before(caller_block, call_op, cloned);
                    cloned
                })
                .collect()
        }
        InlineMode::Move => {
            for (&formal, &actual) in formals.iter().zip(&actuals) {
                ctx.replace_all_uses(formal, actual);
            }
            ctx.move_ops_before(entry, call_op)
        }
    };

    let terminator = *spliced
        .last()
        .expect("inline_region: checked body is missing its terminator");
    let returned: SmallVec<[ValueRef; 4]> = ctx.op_operands(terminator).into();
    let results: SmallVec<[ValueRef; 4]> = call.results(ctx).into();
    for (&result, &value) in results.iter().zip(&returned) {
        ctx.replace_all_uses(result, value);
    }
    ctx.erase_op(terminator);
    Ok(())
}

fn check_live(ctx: &IrContext, call: CallIndirect) -> Result<BlockRef, InlineError> {
    let op = call.op_ref();
    if !ctx.is_op_live(op) {
        return Err(InlineError::StaleCall);
    }
    ctx.op(op).parent_block.ok_or(InlineError::StaleCall)
}

/// Returns the block holding the call and the callee's entry block.
fn check_inlinable(
    ctx: &IrContext,
    callee: RegionRef,
    call: CallIndirect,
) -> Result<(BlockRef, BlockRef), InlineError> {
    let caller_block = check_live(ctx, call)?;
    if ctx.is_nested_in_region(call.op_ref(), callee) {
        return Err(InlineError::RecursiveCall);
    }

    let entry = match ctx.region(callee).blocks.as_slice() {
        [] => return Err(InlineError::EmptyBody),
        [entry] => *entry,
        blocks => {
            return Err(InlineError::MultiBlockBody {
                blocks: blocks.len(),
            });
        }
    };
    let terminator = func::terminator(ctx, entry).ok_or(InlineError::MissingTerminator)?;

    let expected = ctx.block_args(entry).len();
    let actual = call.args(ctx).len();
    if expected != actual {
        return Err(InlineError::ArityMismatch { expected, actual });
    }

    let returned = terminator.values(ctx).len();
    let results = call.results(ctx).len();
    if returned != results {
        return Err(InlineError::ResultCountMismatch { returned, results });
    }
    Ok((caller_block, entry))
}

fn describe(ctx: &IrContext, op: OpRef) -> String {
    match func::Func::from_op(ctx, op) {
        Ok(f) => format!("@{}", f.sym_name(ctx)),
        Err(_) => ctx.op_full_name(op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use region_ir::parser::parse_test_module;
    use region_ir::printer::print_module;
    use region_ir::validation::validate_module;

    fn func_body_ops(ctx: &IrContext, module: OpRef) -> Vec<OpRef> {
        let body = ctx.op(module).regions[0];
        let func = ctx.block(ctx.region(body).blocks[0]).ops[0];
        ctx.block(ctx.region(ctx.op(func).regions[0]).blocks[0])
            .ops
            .to_vec()
    }

    const TWO_CALLS: &str = r#"core.module @m {
  func.func @f(%x: core.i32, %y: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32, core.i32) {
      ^bb0(%a: core.i32, %b: core.i32):
        %s = arith.sub %a, %b : core.i32
        func.return %s
    }
    %r = func.call_indirect %l, %x, %y : core.i32
    %t = func.call_indirect %l, %r, %x : core.i32
    func.return %t
  }
}"#;

    #[test]
    fn inline_region_clone_keeps_the_callee() {
        let (mut ctx, module) = parse_test_module(TWO_CALLS);
        let ops = func_body_ops(&ctx, module);
        let lambda = Lambda::from_op(&ctx, ops[0]).expect("lambda");
        let call = CallIndirect::from_op(&ctx, ops[1]).expect("call");

        let body = lambda.body(&ctx);
        inline_region(&mut ctx, body, call, InlineMode::Clone).expect("inline");
        assert!(!ctx.has_uses(ctx.op_result(call.op_ref(), 0)));
        cleanup::erase_call(&mut ctx, call);

        assert!(validate_module(&ctx, module).is_ok());
        assert_snapshot!(print_module(&ctx, module), @r"
        core.module @m {
          func.func @f(%0: core.i32, %1: core.i32) -> core.i32 {
            %2 = func.lambda : core.func(core.i32, core.i32, core.i32) {
              ^bb0(%3: core.i32, %4: core.i32):
                %5 = arith.sub %3, %4 : core.i32
                func.return %5
            }
            %6 = arith.sub %0, %1 : core.i32
            %7 = func.call_indirect %2, %6, %0 : core.i32
            func.return %7
          }
        }
        ");
    }

    #[test]
    fn inline_region_move_empties_the_callee() {
        let (mut ctx, module) = parse_test_module(TWO_CALLS);
        let ops = func_body_ops(&ctx, module);
        let lambda = Lambda::from_op(&ctx, ops[0]).expect("lambda");
        let second = CallIndirect::from_op(&ctx, ops[2]).expect("call");
        let entry = lambda.entry_block(&ctx).expect("entry");

        let body = lambda.body(&ctx);
        inline_region(&mut ctx, body, second, InlineMode::Move).expect("inline");
        assert!(ctx.block(entry).ops.is_empty());
        assert!(ctx.block_args(entry).iter().all(|&arg| !ctx.has_uses(arg)));
        cleanup::erase_call(&mut ctx, second);
        assert!(validate_module(&ctx, module).is_ok());
    }

    #[test]
    fn failed_checks_leave_the_call_untouched() {
        let (mut ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32, core.i32) {
      ^bb0(%a: core.i32, %b: core.i32):
        func.return %a
    }
    %r = func.call_indirect %l, %x : core.i32
    func.return %r
  }
}"#,
        );
        let before = print_module(&ctx, module);
        let ops = func_body_ops(&ctx, module);
        let call = CallIndirect::from_op(&ctx, ops[1]).expect("call");

        assert_eq!(
            inline_call(&mut ctx, call),
            CallOutcome::Failed(InlineError::ArityMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(print_module(&ctx, module), before);
    }

    #[test]
    fn result_count_must_match() {
        let (mut ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32) {
      ^bb0(%a: core.i32):
        func.return %a, %a
    }
    %r = func.call_indirect %l, %x : core.i32
    func.return %r
  }
}"#,
        );
        let ops = func_body_ops(&ctx, module);
        let call = CallIndirect::from_op(&ctx, ops[1]).expect("call");
        assert_eq!(
            inline_call(&mut ctx, call),
            CallOutcome::Failed(InlineError::ResultCountMismatch {
                returned: 2,
                results: 1
            })
        );
    }

    #[test]
    fn missing_terminator_is_reported() {
        let (mut ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32) {
      ^bb0(%a: core.i32):
        %s = arith.add %a, %a : core.i32
    }
    %r = func.call_indirect %l, %x : core.i32
    func.return %r
  }
}"#,
        );
        let ops = func_body_ops(&ctx, module);
        let call = CallIndirect::from_op(&ctx, ops[1]).expect("call");
        assert_eq!(
            inline_call(&mut ctx, call),
            CallOutcome::Failed(InlineError::MissingTerminator)
        );
    }

    #[test]
    fn multi_block_body_is_reported() {
        let (mut ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32) {
      ^bb0(%a: core.i32):
        func.return %a

      ^bb1(%b: core.i32):
        func.return %b
    }
    %r = func.call_indirect %l, %x : core.i32
    func.return %r
  }
}"#,
        );
        let ops = func_body_ops(&ctx, module);
        let call = CallIndirect::from_op(&ctx, ops[1]).expect("call");
        assert_eq!(
            inline_call(&mut ctx, call),
            CallOutcome::Failed(InlineError::MultiBlockBody { blocks: 2 })
        );
    }

    #[test]
    fn erased_call_is_stale() {
        let (mut ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32, %g: core.func(core.i32, core.i32)) -> core.i32 {
    %r = func.call_indirect %g, %x : core.i32
    func.return %x
  }
}"#,
        );
        let ops = func_body_ops(&ctx, module);
        let call = CallIndirect::from_op(&ctx, ops[0]).expect("call");
        ctx.erase_op(call.op_ref());
        assert_eq!(
            inline_call(&mut ctx, call),
            CallOutcome::Failed(InlineError::StaleCall)
        );
    }

    #[test]
    fn call_inside_its_own_callee_is_recursive() {
        let (mut ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32) {
      ^bb0(%a: core.i32):
        %s = arith.add %a, %a : core.i32
        func.return %s
    }
    func.return %x
  }
}"#,
        );
        let ops = func_body_ops(&ctx, module);
        let lambda = Lambda::from_op(&ctx, ops[0]).expect("lambda");
        let entry = lambda.entry_block(&ctx).expect("entry");
        let ret = ctx.block(entry).ops[1];
        let a = ctx.block_arg(entry, 0);
        let ty = ctx.value_ty(a);
        let loc = ctx.op(ret).location;

        // Build a call to the lambda from inside its own body.
        let callee = lambda.result(&ctx);
        let call = func::call_indirect(&mut ctx, loc, callee, [a], [ty]);
        ctx.insert_op_before(entry, ret, call.op_ref());

        let body = lambda.body(&ctx);
        assert_eq!(
            inline_region(&mut ctx, body, call, InlineMode::Clone),
            Err(InlineError::RecursiveCall)
        );
    }

    #[test]
    fn results_add_up() {
        let mut total = InlineResult {
            inlined: 1,
            skipped: 2,
            failed: 0,
            erased_definitions: 1,
        };
        total += InlineResult {
            inlined: 2,
            skipped: 0,
            failed: 1,
            erased_definitions: 0,
        };
        assert_eq!(
            total,
            InlineResult {
                inlined: 3,
                skipped: 2,
                failed: 1,
                erased_definitions: 1,
            }
        );
    }
}
