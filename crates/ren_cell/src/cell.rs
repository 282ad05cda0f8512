//! The fixed-size cell.
//!
//! Layout (24 bytes, `#[repr(C)]`):
//!
//! ```text
//! +------+-------+----------+-------+-----------+-----------+
//! | kind | flags | reserved | extra | payload   | binding   |
//! | u8   | u8    | u16      | u32   | u64       | u64       |
//! +------+-------+----------+-------+-----------+-----------+
//! ```
//!
//! - scalars: `payload` holds the bits (integer, decimal, logic, char, kind)
//! - words: `payload` is the symbol id, `binding` the packed context id
//! - series: `payload` is the packed object id, `extra` the position

use std::fmt;

use crate::kind::Kind;

/// Size of a cell in bytes. Part of the ABI.
pub const CELL_SIZE: usize = 24;

const _: () = assert!(std::mem::size_of::<Cell>() == CELL_SIZE);

/// Flag: a line break preceded this value in source (preserved when molding).
const FLAG_NEWLINE_BEFORE: u8 = 0b0000_0001;

/// Generational reference into the engine's heap.
///
/// Generations start at 1, so a packed id is never zero and zero can mean
/// "no object" in the binding slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub index: u32,
    pub generation: u32,
}

impl ObjectId {
    #[inline]
    pub fn pack(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Unpack a payload; `None` for zero or a zero generation.
    #[inline]
    pub fn unpack(bits: u64) -> Option<ObjectId> {
        let generation = u32::try_from(bits >> 32).ok()?;
        if generation == 0 {
            return None;
        }
        let index = u32::try_from(bits & u64::from(u32::MAX)).ok()?;
        Some(ObjectId { index, generation })
    }
}

/// One interpreter value.
#[repr(C)]
#[derive(Clone, Copy, PartialEq)]
pub struct Cell {
    kind: u8,
    flags: u8,
    reserved: u16,
    extra: u32,
    payload: u64,
    binding: u64,
}

impl Cell {
    /// The "no value" cell.
    pub const VOID: Cell = Cell {
        kind: Kind::Void as u8,
        flags: 0,
        reserved: 0,
        extra: 0,
        payload: 0,
        binding: 0,
    };

    #[inline]
    const fn with(kind: Kind, payload: u64) -> Cell {
        Cell {
            kind: kind as u8,
            flags: 0,
            reserved: 0,
            extra: 0,
            payload,
            binding: 0,
        }
    }

    #[inline]
    pub const fn void() -> Cell {
        Cell::VOID
    }

    #[inline]
    pub const fn blank() -> Cell {
        Cell::with(Kind::Blank, 0)
    }

    #[inline]
    pub fn logic(flag: bool) -> Cell {
        Cell::with(Kind::Logic, u64::from(flag))
    }

    #[inline]
    pub fn integer(n: i64) -> Cell {
        Cell::with(Kind::Integer, u64::from_ne_bytes(n.to_ne_bytes()))
    }

    #[inline]
    pub fn decimal(d: f64) -> Cell {
        Cell::with(Kind::Decimal, d.to_bits())
    }

    #[inline]
    pub fn char(c: char) -> Cell {
        Cell::with(Kind::Char, u64::from(u32::from(c)))
    }

    #[inline]
    pub fn datatype(kind: Kind) -> Cell {
        Cell::with(Kind::Datatype, u64::from(kind as u8))
    }

    /// A word-class cell (`word`, `word:`, `:word`, `'word`, `/word`), unbound.
    #[inline]
    pub fn word(kind: Kind, symbol: u32) -> Cell {
        debug_assert!(kind.is_word(), "word cell with non-word kind {kind}");
        Cell::with(kind, u64::from(symbol))
    }

    /// A series-class cell referencing `id` at position `index`.
    #[inline]
    pub fn series(kind: Kind, id: ObjectId, index: u32) -> Cell {
        debug_assert!(kind.is_series(), "series cell with non-series kind {kind}");
        let mut cell = Cell::with(kind, id.pack());
        cell.extra = index;
        cell
    }

    /// Runtime type. Unknown tags read as `Void`.
    #[inline]
    pub fn kind(&self) -> Kind {
        Kind::from_u8(self.kind).unwrap_or(Kind::Void)
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.kind() == Kind::Void
    }

    pub fn as_logic(&self) -> Option<bool> {
        (self.kind() == Kind::Logic).then_some(self.payload != 0)
    }

    pub fn as_integer(&self) -> Option<i64> {
        (self.kind() == Kind::Integer).then(|| i64::from_ne_bytes(self.payload.to_ne_bytes()))
    }

    pub fn as_decimal(&self) -> Option<f64> {
        (self.kind() == Kind::Decimal).then(|| f64::from_bits(self.payload))
    }

    pub fn as_char(&self) -> Option<char> {
        if self.kind() != Kind::Char {
            return None;
        }
        u32::try_from(self.payload).ok().and_then(char::from_u32)
    }

    pub fn as_datatype(&self) -> Option<Kind> {
        if self.kind() != Kind::Datatype {
            return None;
        }
        u8::try_from(self.payload).ok().and_then(Kind::from_u8)
    }

    /// Symbol id of a word-class cell.
    pub fn symbol(&self) -> Option<u32> {
        if !self.kind().is_word() {
            return None;
        }
        u32::try_from(self.payload).ok()
    }

    /// Object id of a series-class cell.
    pub fn object_id(&self) -> Option<ObjectId> {
        if !self.kind().is_series() {
            return None;
        }
        ObjectId::unpack(self.payload)
    }

    /// Position of a series-class cell.
    #[inline]
    pub fn index(&self) -> u32 {
        self.extra
    }

    #[must_use]
    pub fn with_index(mut self, index: u32) -> Cell {
        self.extra = index;
        self
    }

    /// Context a word is bound to, if any.
    pub fn binding(&self) -> Option<ObjectId> {
        ObjectId::unpack(self.binding)
    }

    /// Heap object a host root on this cell pins: a series' storage, or the
    /// context a bound word refers to.
    pub fn root_target(&self) -> Option<ObjectId> {
        if self.kind().is_word() {
            self.binding()
        } else {
            self.object_id()
        }
    }

    #[must_use]
    pub fn with_binding(mut self, context: Option<ObjectId>) -> Cell {
        self.binding = context.map_or(0, ObjectId::pack);
        self
    }

    /// Reinterpret a word as another word class, keeping symbol and binding.
    #[must_use]
    pub fn with_kind(mut self, kind: Kind) -> Cell {
        debug_assert!(
            self.kind().is_word() == kind.is_word() && self.kind().is_array() == kind.is_array(),
            "kind change from {} to {kind} changes payload class",
            self.kind()
        );
        self.kind = kind as u8;
        self
    }

    #[inline]
    pub fn newline_before(&self) -> bool {
        self.flags & FLAG_NEWLINE_BEFORE != 0
    }

    #[must_use]
    pub fn with_newline_before(mut self, on: bool) -> Cell {
        if on {
            self.flags |= FLAG_NEWLINE_BEFORE;
        } else {
            self.flags &= !FLAG_NEWLINE_BEFORE;
        }
        self
    }

    /// Conditional truth: everything except void, blank and `false`.
    pub fn is_truthy(&self) -> bool {
        match self.kind() {
            Kind::Void | Kind::Blank => false,
            Kind::Logic => self.payload != 0,
            _ => true,
        }
    }

    /// Whether two cells denote the same value instance (same bits, ignoring
    /// source formatting flags).
    pub fn same_as(&self, other: &Cell) -> bool {
        self.kind == other.kind
            && self.extra == other.extra
            && self.payload == other.payload
            && self.binding == other.binding
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::VOID
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match kind {
            Kind::Integer => write!(f, "Cell(integer! {})", self.as_integer().unwrap_or_default()),
            Kind::Decimal => write!(f, "Cell(decimal! {})", self.as_decimal().unwrap_or_default()),
            Kind::Logic => write!(f, "Cell(logic! {})", self.payload != 0),
            _ if kind.is_word() => write!(f, "Cell({kind} #{})", self.payload),
            _ if kind.is_series() => match self.object_id() {
                Some(id) => write!(f, "Cell({kind} @{}.{} +{})", id.index, id.generation, self.extra),
                None => write!(f, "Cell({kind} <dangling>)"),
            },
            _ => write!(f, "Cell({kind} {:#x})", self.payload),
        }
    }
}
