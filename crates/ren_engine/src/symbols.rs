//! Symbol interning for words.

use rustc_hash::FxHashMap;

/// Interned spelling. Word cells store the raw `u32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub u32);

/// Case-sensitive interner. Spellings are never removed.
#[derive(Default)]
pub struct SymbolTable {
    ids: FxHashMap<Box<str>, Symbol>,
    spellings: Vec<Box<str>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn intern(&mut self, spelling: &str) -> Symbol {
        if let Some(&sym) = self.ids.get(spelling) {
            return sym;
        }
        let id = u32::try_from(self.spellings.len()).unwrap_or(u32::MAX);
        let sym = Symbol(id);
        self.spellings.push(spelling.into());
        self.ids.insert(spelling.into(), sym);
        sym
    }

    /// Look up without interning.
    pub fn find(&self, spelling: &str) -> Option<Symbol> {
        self.ids.get(spelling).copied()
    }

    pub fn spelling(&self, sym: Symbol) -> &str {
        usize::try_from(sym.0)
            .ok()
            .and_then(|i| self.spellings.get(i))
            .map_or("?", |s| s)
    }

    pub fn len(&self) -> usize {
        self.spellings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spellings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.intern("append");
        let b = table.intern("append");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.spelling(a), "append");
    }

    #[test]
    fn case_is_significant() {
        let mut table = SymbolTable::new();
        assert_ne!(table.intern("x"), table.intern("X"));
        assert_eq!(table.find("y"), None);
    }
}
