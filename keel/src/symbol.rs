use std::fmt;

use once_cell::sync::Lazy;

static INTERNER: Lazy<lasso::ThreadedRodeo> = Lazy::new(lasso::ThreadedRodeo::new);

/// An interned string.
///
/// Symbols are cheap to copy and compare, and resolve back to `&str` through
/// a process-wide interner.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(lasso::Spur);

impl Symbol {
    pub fn intern(sym: impl AsRef<str>) -> Self {
        Self(INTERNER.get_or_intern(sym))
    }

    pub fn intern_static(sym: &'static str) -> Self {
        Self(INTERNER.get_or_intern_static(sym))
    }

    pub fn resolve<'a>(&'a self) -> &'a str {
        let symbol = INTERNER.resolve(&self.0);

        // SAFETY: The lifetime is a bit of a lie: it is really tied to the
        // lifetime of `INTERNER`. But `INTERNER` is never dropped (since it is
        // static), so it is safe to truncate the lifetime to the shorter
        // lifetime of `'a`.
        // See also: https://github.com/rust-lang/rust/blob/e4dd9edb76a34ecbca539967f9662b8c0cc9c7fb/compiler/rustc_span/src/symbol.rs#L1845
        unsafe { std::mem::transmute::<&str, &'a str>(symbol) }
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.resolve()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolve())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = Symbol::intern("Point");
        let b = Symbol::intern(String::from("Point"));
        assert_eq!(a, b);
        assert_eq!(a.resolve(), "Point");
    }
}
