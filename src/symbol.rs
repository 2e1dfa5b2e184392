// ABOUTME: Interned symbols and the packages that own them

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// A name interned into a home package.
///
/// Two calls to `Package::intern` with the same name on the same package
/// return the same `Rc<Symbol>` — identity is the only thing that matters
/// for equality, since the package guarantees there is ever only one.
pub struct Symbol {
    pub name: String,
    package: Weak<Package>,
}

impl Symbol {
    /// The package this symbol was interned into, if it still exists.
    pub fn home(&self) -> Option<Rc<Package>> {
        self.package.upgrade()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A compiled macro: name, formal parameters, and a compiled closure body.
///
/// Stored in the home package's macro table (§4.1's `defmacro`, §4.3's
/// expansion both go through here).
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: Rc<Symbol>,
    pub closure: Rc<crate::closure::Closure>,
}

/// A namespace: interned symbols, their global value slots, and macros.
///
/// Packages are process-wide state owned by the `Context` for as long as
/// it lives; there is no internal locking.
#[derive(Debug)]
pub struct Package {
    pub name: String,
    symbols: RefCell<HashMap<String, Rc<Symbol>>>,
    globals: RefCell<HashMap<String, Value>>,
    macros: RefCell<HashMap<String, Macro>>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Package {
            name: name.into(),
            symbols: RefCell::new(HashMap::new()),
            globals: RefCell::new(HashMap::new()),
            macros: RefCell::new(HashMap::new()),
        })
    }

    /// Interns `name`, returning the existing symbol if already interned.
    pub fn intern(self: &Rc<Self>, name: &str) -> Rc<Symbol> {
        if let Some(sym) = self.symbols.borrow().get(name) {
            return sym.clone();
        }
        let sym = Rc::new(Symbol {
            name: name.to_string(),
            package: Rc::downgrade(self),
        });
        self.symbols.borrow_mut().insert(name.to_string(), sym.clone());
        sym
    }

    /// Looks up an already-interned symbol without creating one.
    pub fn find(&self, name: &str) -> Option<Rc<Symbol>> {
        self.symbols.borrow().get(name).cloned()
    }

    pub fn get_value(&self, sym: &Symbol) -> Option<Value> {
        self.globals.borrow().get(&sym.name).cloned()
    }

    pub fn set_value(&self, sym: &Symbol, value: Value) {
        self.globals.borrow_mut().insert(sym.name.clone(), value);
    }

    pub fn has_macro(&self, sym: &Symbol) -> bool {
        self.macros.borrow().contains_key(&sym.name)
    }

    pub fn get_macro(&self, sym: &Symbol) -> Option<Macro> {
        self.macros.borrow().get(&sym.name).cloned()
    }

    pub fn set_macro(&self, sym: &Symbol, m: Macro) {
        self.macros.borrow_mut().insert(sym.name.clone(), m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_identity_stable() {
        let pkg = Package::new("test");
        let a = pkg.intern("foo");
        let b = pkg.intern("foo");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_names_are_distinct_symbols() {
        let pkg = Package::new("test");
        let a = pkg.intern("foo");
        let b = pkg.intern("bar");
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn global_value_roundtrip() {
        let pkg = Package::new("test");
        let sym = pkg.intern("x");
        assert!(pkg.get_value(&sym).is_none());
        pkg.set_value(&sym, Value::Int(42));
        assert!(matches!(pkg.get_value(&sym), Some(Value::Int(42))));
    }

    #[test]
    fn macro_table_roundtrip() {
        let pkg = Package::new("test");
        let sym = pkg.intern("unless");
        assert!(!pkg.has_macro(&sym));
    }

    #[test]
    fn symbol_home_upgrades_while_package_alive() {
        let pkg = Package::new("test");
        let sym = pkg.intern("x");
        assert!(sym.home().is_some());
    }
}
