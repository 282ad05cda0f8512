//! Runtime type tags.

use std::fmt;

/// Runtime type of a cell.
///
/// The discriminant is the byte stored in the cell header, so the order of
/// variants is part of the ABI.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Absence of a value (result of an evaluation that produced nothing).
    Void = 0,
    Blank,
    Logic,
    Integer,
    Decimal,
    Char,
    Datatype,
    Word,
    SetWord,
    GetWord,
    LitWord,
    Refinement,
    Text,
    Block,
    Group,
    Path,
    Object,
    Action,
    Error,
}

impl Kind {
    /// Every kind, in discriminant order.
    pub const ALL: [Kind; 19] = [
        Kind::Void,
        Kind::Blank,
        Kind::Logic,
        Kind::Integer,
        Kind::Decimal,
        Kind::Char,
        Kind::Datatype,
        Kind::Word,
        Kind::SetWord,
        Kind::GetWord,
        Kind::LitWord,
        Kind::Refinement,
        Kind::Text,
        Kind::Block,
        Kind::Group,
        Kind::Path,
        Kind::Object,
        Kind::Action,
        Kind::Error,
    ];

    /// Decode a header byte.
    pub fn from_u8(tag: u8) -> Option<Kind> {
        Kind::ALL.get(usize::from(tag)).copied()
    }

    /// The datatype name as written in source (`integer!`, `text!`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Kind::Void => "void!",
            Kind::Blank => "blank!",
            Kind::Logic => "logic!",
            Kind::Integer => "integer!",
            Kind::Decimal => "decimal!",
            Kind::Char => "char!",
            Kind::Datatype => "datatype!",
            Kind::Word => "word!",
            Kind::SetWord => "set-word!",
            Kind::GetWord => "get-word!",
            Kind::LitWord => "lit-word!",
            Kind::Refinement => "refinement!",
            Kind::Text => "text!",
            Kind::Block => "block!",
            Kind::Group => "group!",
            Kind::Path => "path!",
            Kind::Object => "object!",
            Kind::Action => "action!",
            Kind::Error => "error!",
        }
    }

    /// Look up a kind by its datatype name.
    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Whether cells of this kind reference collected storage.
    ///
    /// Hosts must root such cells for as long as they hold them.
    pub fn is_series(self) -> bool {
        matches!(
            self,
            Kind::Text
                | Kind::Block
                | Kind::Group
                | Kind::Path
                | Kind::Object
                | Kind::Action
                | Kind::Error
        )
    }

    /// Arrays hold a sequence of cells (block, group, path).
    pub fn is_array(self) -> bool {
        matches!(self, Kind::Block | Kind::Group | Kind::Path)
    }

    pub fn is_word(self) -> bool {
        matches!(
            self,
            Kind::Word | Kind::SetWord | Kind::GetWord | Kind::LitWord | Kind::Refinement
        )
    }

    pub fn is_number(self) -> bool {
        matches!(self, Kind::Integer | Kind::Decimal)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
