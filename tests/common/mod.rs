//! Shared helpers for the inliner integration tests.

use region_inliner::{InlineResult, inline_module};
use region_ir::parser::parse_test_module;
use region_ir::printer::print_module;
use region_ir::validation::{debug_assert_valid, validate_module};
use region_ir::walk::collect_ops;
use region_ir::{IrContext, OpRef};

/// Parse `src`, run the inliner over the whole module and check the result
/// is still well formed.
#[allow(dead_code)]
pub fn inline_source(src: &str) -> (IrContext, OpRef, InlineResult) {
    let (mut ctx, module) = parse_test_module(src);
    let result = inline_module(&mut ctx, module);
    debug_assert_valid(&ctx, module, "inline_module");
    let validation = validate_module(&ctx, module);
    assert!(validation.is_ok(), "{validation}\n{}", print_module(&ctx, module));
    (ctx, module, result)
}

/// Live operations named `full_name` anywhere in `module`.
#[allow(dead_code)]
pub fn ops_named(ctx: &IrContext, module: OpRef, full_name: &str) -> Vec<OpRef> {
    ctx.op(module)
        .regions
        .iter()
        .flat_map(|&region| collect_ops(ctx, region))
        .filter(|&op| ctx.op_full_name(op) == full_name)
        .collect()
}

/// The operations of the entry block of the `index`-th function in `module`.
#[allow(dead_code)]
pub fn func_body(ctx: &IrContext, module: OpRef, index: usize) -> Vec<OpRef> {
    let body = ctx.op(module).regions[0];
    let func = ctx.block(ctx.region(body).blocks[0]).ops[index];
    ctx.block(ctx.region(ctx.op(func).regions[0]).blocks[0])
        .ops
        .to_vec()
}
