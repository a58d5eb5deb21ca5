//! Call-site collection.
//!
//! Inlining mutates the very blocks it walks, so candidate calls are
//! gathered into an immutable [`CallSites`] snapshot first. Collection only
//! needs `&IrContext`; the mutation phase needs `&mut IrContext`, which keeps
//! the two phases apart.

use std::convert::Infallible;
use std::ops::ControlFlow;

use region_ir::dialect::func::CallIndirect;
use region_ir::walk::{WalkAction, walk_typed};
use region_ir::{IrContext, OpRef, RegionRef};

/// Indirect calls in encounter order: an operation before the operations
/// nested in its regions, siblings in block order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSites {
    calls: Vec<CallIndirect>,
}

impl CallSites {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CallIndirect> + '_ {
        self.calls.iter().copied()
    }

    pub fn as_slice(&self) -> &[CallIndirect] {
        &self.calls
    }

    fn collect_region(&mut self, ctx: &IrContext, region: RegionRef) {
        let ControlFlow::Continue(()) =
            walk_typed::<CallIndirect, Infallible>(ctx, region, &mut |call| {
                self.calls.push(call);
                ControlFlow::Continue(WalkAction::Advance)
            });
    }
}

impl IntoIterator for CallSites {
    type Item = CallIndirect;
    type IntoIter = std::vec::IntoIter<CallIndirect>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.into_iter()
    }
}

/// Every `func.call_indirect` inside `region`, at any depth.
pub fn collect_call_sites(ctx: &IrContext, region: RegionRef) -> CallSites {
    let mut sites = CallSites::default();
    sites.collect_region(ctx, region);
    sites
}

/// Every `func.call_indirect` inside the regions of `op`.
///
/// `op` itself is not reported even if it is a call.
pub fn collect_op_call_sites(ctx: &IrContext, op: OpRef) -> CallSites {
    let mut sites = CallSites::default();
    for &region in &ctx.op(op).regions {
        sites.collect_region(ctx, region);
    }
    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_ir::DialectOp;
    use region_ir::parser::parse_test_module;

    const SRC: &str = r#"core.module @m {
  func.func @f(%x: core.i32, %g: core.func(core.i32, core.i32)) -> core.i32 {
    %l = func.lambda : core.func(core.i32, core.i32) {
      ^bb0(%a: core.i32):
        %i = func.lambda : core.func(core.i32, core.i32) {
          ^bb0(%b: core.i32):
            func.return %b
        }
        %j = func.call_indirect %i, %a : core.i32
        func.return %j
    }
    %r = func.call_indirect %l, %x : core.i32
    %s = func.call_indirect %g, %r : core.i32
    %t = func.call %s {callee = @f} : core.i32
    func.return %t
  }
}"#;

    #[test]
    fn collects_nested_calls_in_encounter_order() {
        let (ctx, module) = parse_test_module(SRC);
        let sites = collect_op_call_sites(&ctx, module);
        assert_eq!(sites.len(), 3);

        let callees: Vec<String> = sites
            .iter()
            .map(|call| match ctx.defining_op(call.callee(&ctx)) {
                Some(def) => ctx.op_full_name(def),
                None => "block arg".to_owned(),
            })
            .collect();
        assert_eq!(callees, ["func.lambda", "func.lambda", "block arg"]);

        // The nested call comes before the outer call that reaches it.
        let first = sites.as_slice()[0].op_ref();
        let second = sites.as_slice()[1].op_ref();
        assert!(ctx.parent_op(first).is_some_and(|p| ctx.op_full_name(p) == "func.lambda"));
        assert!(ctx.parent_op(second).is_some_and(|p| ctx.op_full_name(p) == "func.func"));
    }

    #[test]
    fn direct_calls_are_not_collected() {
        let (ctx, module) = parse_test_module(
            r#"core.module @m {
  func.func @f(%x: core.i32) -> core.i32 {
    %t = func.call %x {callee = @f} : core.i32
    func.return %t
  }
}"#,
        );
        assert!(collect_op_call_sites(&ctx, module).is_empty());
    }

    #[test]
    fn region_collection_stays_inside_the_region() {
        let (ctx, module) = parse_test_module(SRC);
        let body = ctx.op(module).regions[0];
        let func = ctx.block(ctx.region(body).blocks[0]).ops[0];
        let lambda = ctx.block(ctx.region(ctx.op(func).regions[0]).blocks[0]).ops[0];

        let inner = collect_call_sites(&ctx, ctx.op(lambda).regions[0]);
        assert_eq!(inner.len(), 1);
        assert_eq!(inner.into_iter().count(), 1);
    }
}
