//! Erasure of operations made dead by inlining.

use region_ir::dialect::func::{CallIndirect, Lambda};
use region_ir::{DialectOp, IrContext};

/// Erase an inlined call.
///
/// # Panics
///
/// Panics if a result of the call is still used. Inlining rewires every
/// result before the call is erased.
pub fn erase_call(ctx: &mut IrContext, call: CallIndirect) {
    ctx.erase_op(call.op_ref());
}

/// Erase `def` together with its body if nothing uses its callable anymore.
///
/// Returns whether the definition was erased.
pub fn erase_if_dead(ctx: &mut IrContext, def: Lambda) -> bool {
    if !ctx.is_op_live(def.op_ref()) || ctx.has_uses(def.result(ctx)) {
        return false;
    }
    ctx.erase_op(def.op_ref());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_ir::parser::parse_test_module;
    use region_ir::validation::validate_module;

    const SRC: &str = r#"core.module @m {
  func.func @f(%x: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32) {
      ^bb0(%a: core.i32):
        %s = arith.add %a, %a : core.i32
        func.return %s
    }
    %r = func.call_indirect %l, %x : core.i32
    func.return %x
  }
}"#;

    fn find(ctx: &IrContext, module: region_ir::OpRef) -> (Lambda, CallIndirect) {
        let body = ctx.op(module).regions[0];
        let func = ctx.block(ctx.region(body).blocks[0]).ops[0];
        let ops = &ctx.block(ctx.region(ctx.op(func).regions[0]).blocks[0]).ops;
        let lambda = Lambda::from_op(ctx, ops[0]).expect("lambda");
        let call = CallIndirect::from_op(ctx, ops[1]).expect("call");
        (lambda, call)
    }

    #[test]
    fn live_definition_is_kept() {
        let (mut ctx, module) = parse_test_module(SRC);
        let (lambda, _) = find(&ctx, module);
        assert!(!erase_if_dead(&mut ctx, lambda));
        assert!(ctx.is_op_live(lambda.op_ref()));
    }

    #[test]
    fn dead_definition_is_erased_with_its_body() {
        let (mut ctx, module) = parse_test_module(SRC);
        let (lambda, call) = find(&ctx, module);
        let body_ops = ctx.block(lambda.entry_block(&ctx).expect("entry")).ops.to_vec();

        erase_call(&mut ctx, call);
        assert!(!ctx.is_op_live(call.op_ref()));
        assert!(erase_if_dead(&mut ctx, lambda));
        assert!(body_ops.iter().all(|&op| !ctx.is_op_live(op)));
        // A second attempt sees the erased definition and does nothing.
        assert!(!erase_if_dead(&mut ctx, lambda));
        assert!(validate_module(&ctx, module).is_ok());
    }

    #[test]
    #[should_panic(expected = "still has 1 use(s)")]
    fn erasing_a_used_call_panics() {
        let (mut ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32, %g: core.func(core.i32, core.i32)) -> core.i32 {
    %r = func.call_indirect %g, %x : core.i32
    func.return %r
  }
}"#,
        );
        let body = ctx.op(module).regions[0];
        let func = ctx.block(ctx.region(body).blocks[0]).ops[0];
        let call_op = ctx.block(ctx.region(ctx.op(func).regions[0]).blocks[0]).ops[0];
        let call = CallIndirect::from_op(&ctx, call_op).expect("call");
        erase_call(&mut ctx, call);
    }
}
