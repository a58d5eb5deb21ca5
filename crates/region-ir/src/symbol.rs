//! Interned names for dialects, operations, attributes and symbols.

use std::fmt;
use std::sync::LazyLock;

use lasso::{Rodeo, Spur};
use parking_lot::RwLock;

static NAMES: LazyLock<RwLock<Rodeo>> = LazyLock::new(|| RwLock::new(Rodeo::default()));

/// An interned name. Two symbols are equal exactly when their text is.
///
/// Symbols live for the whole process; interning the same text twice
/// returns the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    pub fn new(text: &'static str) -> Self {
        Self::lookup(text).unwrap_or_else(|| Symbol(NAMES.write().get_or_intern_static(text)))
    }

    /// Intern text that is not `'static`, such as names read by the parser.
    pub fn from_dynamic(text: &str) -> Self {
        Self::lookup(text).unwrap_or_else(|| Symbol(NAMES.write().get_or_intern(text)))
    }

    fn lookup(text: &str) -> Option<Self> {
        NAMES.read_recursive().get(text).map(Symbol)
    }

    /// Run `f` on the symbol's text.
    ///
    /// The lock is taken with `read_recursive`, so `f` may itself compare
    /// or print symbols.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(NAMES.read_recursive().resolve(&self.0))
    }
}

impl From<&'static str> for Symbol {
    fn from(text: &'static str) -> Self {
        Symbol::new(text)
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.with_str(|s| s == other)
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}

/// Define functions returning fixed symbols, one per name.
///
/// ```
/// use region_ir::symbols;
///
/// symbols! {
///     ATTR_NAME => "name",
///     ATTR_TYPE => "type",
/// }
///
/// assert_eq!(ATTR_NAME(), "name");
/// ```
#[macro_export]
macro_rules! symbols {
    ($($(#[$attr:meta])* $name:ident => $text:literal),* $(,)?) => {
        $(
            $(#[$attr])*
            #[allow(non_snake_case)]
            #[inline]
            pub fn $name() -> $crate::Symbol {
                $crate::Symbol::new($text)
            }
        )*
    };
}
