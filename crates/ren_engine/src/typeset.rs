//! Sets of kinds accepted by a parameter.

use std::fmt;

use ren_cell::Kind;

/// Bitset over [`Kind`] discriminants.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSet(u64);

impl TypeSet {
    pub const EMPTY: TypeSet = TypeSet(0);

    pub fn of(kinds: &[Kind]) -> TypeSet {
        kinds.iter().fold(TypeSet::EMPTY, |set, &k| set.with(k))
    }

    /// Every kind except void.
    pub fn any_value() -> TypeSet {
        TypeSet::of(&Kind::ALL).without(Kind::Void)
    }

    /// Every kind including void (unconstrained slot).
    pub fn anything() -> TypeSet {
        TypeSet::of(&Kind::ALL)
    }

    #[must_use]
    pub fn with(self, kind: Kind) -> TypeSet {
        TypeSet(self.0 | (1u64 << (kind as u8)))
    }

    #[must_use]
    pub fn without(self, kind: Kind) -> TypeSet {
        TypeSet(self.0 & !(1u64 << (kind as u8)))
    }

    #[must_use]
    pub fn union(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 | other.0)
    }

    pub fn contains(self, kind: Kind) -> bool {
        self.0 & (1u64 << (kind as u8)) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Resolve a datatype or typeset name from a spec block.
    pub fn from_name(name: &str) -> Option<TypeSet> {
        if let Some(kind) = Kind::from_name(name) {
            return Some(TypeSet::of(&[kind]));
        }
        let set = match name {
            "any-value!" => TypeSet::any_value(),
            "any-series!" => TypeSet::of(&[Kind::Text, Kind::Block, Kind::Group, Kind::Path]),
            "any-array!" => TypeSet::of(&[Kind::Block, Kind::Group, Kind::Path]),
            "any-word!" => TypeSet::of(&[
                Kind::Word,
                Kind::SetWord,
                Kind::GetWord,
                Kind::LitWord,
                Kind::Refinement,
            ]),
            "any-number!" => TypeSet::of(&[Kind::Integer, Kind::Decimal]),
            "any-context!" => TypeSet::of(&[Kind::Object, Kind::Error]),
            _ => return None,
        };
        Some(set)
    }

    pub fn kinds(self) -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl fmt::Debug for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds().map(Kind::name)).finish()
    }
}
