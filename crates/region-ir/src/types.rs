//! Operation attributes and interned types.

use std::collections::HashMap;

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::refs::TypeRef;
use crate::symbol::Symbol;

/// Constant data attached to an operation under a symbol key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Unit,
    Bool(bool),
    /// Signless integer bits; `arith.const` reads them back as `i64`.
    IntBits(u64),
    String(String),
    Symbol(Symbol),
    Type(TypeRef),
    List(Vec<Attribute>),
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::IntBits(u64::from_ne_bytes(value.to_ne_bytes()))
    }
}

/// A type `dialect.name(params...)`, e.g. `core.func(core.i32, core.i32)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub dialect: Symbol,
    pub name: Symbol,
    pub params: SmallVec<[TypeRef; 4]>,
}

impl TypeData {
    pub fn new(dialect: Symbol, name: Symbol, params: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            dialect,
            name,
            params: params.into_iter().collect(),
        }
    }
}

/// Hash-consing store for types: equal `TypeData` share one `TypeRef`,
/// so types compare by ref.
#[derive(Default)]
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    refs: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&ty) = self.refs.get(&data) {
            return ty;
        }
        let ty = self.types.push(data.clone());
        self.refs.insert(data, ty);
        ty
    }

    pub fn get(&self, ty: TypeRef) -> &TypeData {
        &self.types[ty]
    }

    /// Whether `ty` is `dialect.name`, whatever its params.
    pub fn is(&self, ty: TypeRef, dialect: Symbol, name: Symbol) -> bool {
        let data = &self.types[ty];
        (data.dialect, data.name) == (dialect, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(types: &mut TypeInterner, name: &'static str) -> TypeRef {
        types.intern(TypeData::new(Symbol::new("core"), Symbol::new(name), []))
    }

    #[test]
    fn equal_types_share_a_ref() {
        let mut types = TypeInterner::new();
        let a = scalar(&mut types, "i32");
        let b = scalar(&mut types, "i32");
        assert_eq!(a, b);
        assert_ne!(a, scalar(&mut types, "i1"));
    }

    #[test]
    fn param_order_distinguishes_function_types() {
        let mut types = TypeInterner::new();
        let i32_ty = scalar(&mut types, "i32");
        let i1_ty = scalar(&mut types, "i1");
        let func = |types: &mut TypeInterner, params: [TypeRef; 2]| {
            types.intern(TypeData::new(Symbol::new("core"), Symbol::new("func"), params))
        };

        let a = func(&mut types, [i32_ty, i1_ty]);
        let b = func(&mut types, [i1_ty, i32_ty]);
        assert_ne!(a, b);
        assert!(types.is(a, Symbol::new("core"), Symbol::new("func")));
        assert!(!types.is(i32_ty, Symbol::new("core"), Symbol::new("func")));
        assert_eq!(types.get(a).params.as_slice(), &[i32_ty, i1_ty]);
    }

    #[test]
    fn negative_int_attribute_keeps_bits() {
        assert_eq!(Attribute::from(-1i64), Attribute::IntBits(u64::MAX));
    }
}
