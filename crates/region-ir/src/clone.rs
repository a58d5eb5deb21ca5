//! Deep copies of operations and regions.
//!
//! Cloning allocates fresh values, blocks and regions. Every operand is
//! looked up in an [`IrMapping`]; values without an entry (for example
//! values captured from an enclosing scope) are reused as-is.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::refs::{BlockRef, OpRef, RegionRef, ValueRef};

/// Old-to-new value correspondence built up while cloning.
#[derive(Debug, Default, Clone)]
pub struct IrMapping {
    values: HashMap<ValueRef, ValueRef>,
}

impl IrMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_value(&mut self, from: ValueRef, to: ValueRef) {
        self.values.insert(from, to);
    }

    /// The value `v` maps to, or `v` itself when it has no entry.
    pub fn lookup_value(&self, v: ValueRef) -> ValueRef {
        self.values.get(&v).copied().unwrap_or(v)
    }
}

/// Clone `op` and everything nested inside it.
///
/// The clone is detached. Its operands are remapped through `mapping`, and
/// its results (and every nested value) are recorded in `mapping`.
pub fn clone_op(ctx: &mut IrContext, op: OpRef, mapping: &mut IrMapping) -> OpRef {
    let (location, dialect, name) = {
        let data = ctx.op(op);
        (data.location, data.dialect, data.name)
    };
    let attributes = ctx.op(op).attributes.clone();
    let operands: SmallVec<[ValueRef; 8]> = ctx
        .op_operands(op)
        .iter()
        .map(|&v| mapping.lookup_value(v))
        .collect();
    let result_types: SmallVec<[_; 4]> = ctx.op_result_types(op).into();
    let old_regions: SmallVec<[RegionRef; 4]> = ctx.op(op).regions.clone();

    let mut builder = OperationDataBuilder::new(location, dialect, name)
        .operands(operands)
        .results(result_types)
        .attrs(attributes);
    for region in old_regions {
        builder = builder.region(clone_region(ctx, region, mapping));
    }
    let data = builder.build(ctx);
    let new_op = ctx.create_op(data);

    let old_results: SmallVec<[ValueRef; 4]> = ctx.op_results(op).into();
    for (idx, old) in old_results.into_iter().enumerate() {
        mapping.map_value(old, ctx.op_result(new_op, idx as u32));
    }
    new_op
}

/// Clone a region with all of its blocks. The returned region is unowned.
///
/// All blocks are created before any operation is cloned, so every block
/// argument is mapped by the time its users are visited.
pub fn clone_region(ctx: &mut IrContext, region: RegionRef, mapping: &mut IrMapping) -> RegionRef {
    let location = ctx.region(region).location;
    let old_blocks: SmallVec<[BlockRef; 4]> = ctx.region(region).blocks.clone();

    let mut new_blocks: SmallVec<[BlockRef; 4]> = SmallVec::with_capacity(old_blocks.len());
    for &old in &old_blocks {
        let block_location = ctx.block(old).location;
        let args = ctx.block(old).args.clone();
        let new_block = ctx.create_block(BlockData {
            location: block_location,
            args,
            ops: SmallVec::new(),
            parent_region: None,
        });
        let old_args: SmallVec<[ValueRef; 4]> = ctx.block_args(old).into();
        for (idx, old_arg) in old_args.into_iter().enumerate() {
            mapping.map_value(old_arg, ctx.block_arg(new_block, idx as u32));
        }
        new_blocks.push(new_block);
    }

    for (&old, &new) in old_blocks.iter().zip(&new_blocks) {
        let ops: SmallVec<[OpRef; 8]> = ctx.block(old).ops.iter().copied().collect();
        for op in ops {
            let cloned = clone_op(ctx, op, mapping);
            ctx.push_op(new, cloned);
        }
    }

    ctx.create_region(RegionData {
        location,
        blocks: new_blocks,
        parent_op: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_test_module;
    use crate::printer::print_op;
    use crate::validation::validate_module;
    use crate::walk::collect_ops;
    use insta::assert_snapshot;

    const LAMBDA_SRC: &str = r#"core.module @m {
  func.func @host(%k: core.i32) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32) {
      ^bb0(%a: core.i32):
        %s = arith.add %a, %k : core.i32
        func.return %s
    }
    %r = func.call_indirect %l, %k : core.i32
    func.return %r
  }
}"#;

    fn find_op(ctx: &IrContext, module: OpRef, full_name: &str) -> OpRef {
        collect_ops(ctx, ctx.op(module).regions[0])
            .into_iter()
            .find(|&op| ctx.op_full_name(op) == full_name)
            .unwrap_or_else(|| panic!("no `{full_name}` op in module"))
    }

    #[test]
    fn clone_region_allocates_fresh_entities() {
        let (mut ctx, module) = parse_test_module(LAMBDA_SRC);
        let lambda = find_op(&ctx, module, "func.lambda");
        let body = ctx.op(lambda).regions[0];
        let old_block = ctx.region(body).blocks[0];
        let old_add = ctx.block(old_block).ops[0];

        let mut mapping = IrMapping::new();
        let copy = clone_region(&mut ctx, body, &mut mapping);

        assert_ne!(copy, body);
        let new_block = ctx.region(copy).blocks[0];
        assert_ne!(new_block, old_block);
        let new_add = ctx.block(new_block).ops[0];
        assert_ne!(new_add, old_add);
        assert_eq!(ctx.op_full_name(new_add), "arith.add");

        // The cloned add reads the cloned block argument and keeps the capture.
        let new_arg = ctx.block_arg(new_block, 0);
        let captured = ctx.op_operands(old_add)[1];
        assert_eq!(ctx.op_operands(new_add), &[new_arg, captured]);
        assert_eq!(ctx.use_count(captured), 3);
        assert_eq!(ctx.region(copy).parent_op, None);
    }

    #[test]
    fn clone_op_copies_nested_regions() {
        let (mut ctx, module) = parse_test_module(LAMBDA_SRC);
        let lambda = find_op(&ctx, module, "func.lambda");
        let block = ctx.op(lambda).parent_block.expect("lambda is attached");
        let call = find_op(&ctx, module, "func.call_indirect");

        let mut mapping = IrMapping::new();
        let copy = clone_op(&mut ctx, lambda, &mut mapping);
        ctx.insert_op_before(block, call, copy);

        assert_eq!(
            mapping.lookup_value(ctx.op_result(lambda, 0)),
            ctx.op_result(copy, 0)
        );
        assert!(validate_module(&ctx, module).is_ok());
        assert_snapshot!(print_op(&ctx, copy), @r"
        %0 = func.lambda : core.func(core.i32, core.i32) {
          ^bb0(%1: core.i32):
            %2 = arith.add %1, %3 : core.i32
            func.return %2
        }
        ");
    }

    #[test]
    fn unmapped_values_pass_through() {
        let (ctx, module) = parse_test_module(LAMBDA_SRC);
        let call = find_op(&ctx, module, "func.call_indirect");
        let v = ctx.op_result(call, 0);
        let mapping = IrMapping::new();
        assert_eq!(mapping.lookup_value(v), v);
    }
}
