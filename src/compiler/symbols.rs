//! First-use variable allocation.

use std::collections::HashMap;

/// Maps variable names to dense machine addresses, assigned in
/// first-reference order starting at 0. Milan has no declarations; the
/// first read or write of a name allocates its cell. Names arrive already
/// case-folded by the lexer.
#[derive(Debug)]
pub struct SymbolTable {
    addresses: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            addresses: HashMap::new(),
        }
    }

    /// The address for `name`, allocating the next free cell on first use.
    pub fn address(&mut self, name: &str) -> usize {
        let next = self.addresses.len();
        *self.addresses.entry(name.to_owned()).or_insert(next)
    }

    /// Number of distinct variables allocated so far.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }
}
