use pretty_assertions::assert_eq;

use super::*;

#[test]
fn scalar_cells_round_trip_payload() {
    assert_eq!(Cell::integer(-42).as_integer(), Some(-42));
    assert_eq!(Cell::integer(i64::MIN).as_integer(), Some(i64::MIN));
    assert_eq!(Cell::decimal(2.5).as_decimal(), Some(2.5));
    assert_eq!(Cell::logic(true).as_logic(), Some(true));
    assert_eq!(Cell::char('λ').as_char(), Some('λ'));
    assert_eq!(Cell::datatype(Kind::Text).as_datatype(), Some(Kind::Text));
}

#[test]
fn accessors_reject_other_kinds() {
    let n = Cell::integer(1);
    assert_eq!(n.as_decimal(), None);
    assert_eq!(n.as_logic(), None);
    assert_eq!(n.symbol(), None);
    assert_eq!(n.object_id(), None);
}

#[test]
fn object_id_packing_never_zero() {
    let id = ObjectId {
        index: 0,
        generation: 1,
    };
    assert_ne!(id.pack(), 0);
    assert_eq!(ObjectId::unpack(id.pack()), Some(id));
    assert_eq!(ObjectId::unpack(0), None);
}

#[test]
fn series_cell_carries_id_and_index() {
    let id = ObjectId {
        index: 7,
        generation: 3,
    };
    let cell = Cell::series(Kind::Block, id, 2);
    assert_eq!(cell.kind(), Kind::Block);
    assert_eq!(cell.object_id(), Some(id));
    assert_eq!(cell.index(), 2);
    assert_eq!(cell.with_index(0).index(), 0);
}

#[test]
fn word_binding_and_kind_change() {
    let ctx = ObjectId {
        index: 1,
        generation: 1,
    };
    let word = Cell::word(Kind::LitWord, 9).with_binding(Some(ctx));
    let plain = word.with_kind(Kind::Word);
    assert_eq!(plain.kind(), Kind::Word);
    assert_eq!(plain.symbol(), Some(9));
    assert_eq!(plain.binding(), Some(ctx));
    assert_eq!(plain.with_binding(None).binding(), None);
}

#[test]
fn truthiness() {
    assert!(!Cell::VOID.is_truthy());
    assert!(!Cell::blank().is_truthy());
    assert!(!Cell::logic(false).is_truthy());
    assert!(Cell::logic(true).is_truthy());
    assert!(Cell::integer(0).is_truthy());
}

#[test]
fn newline_flag_does_not_affect_identity() {
    let a = Cell::integer(5);
    let b = a.with_newline_before(true);
    assert!(b.newline_before());
    assert!(a.same_as(&b));
    assert_ne!(a, b);
}

#[test]
fn kind_names_round_trip() {
    for kind in Kind::ALL {
        assert_eq!(Kind::from_name(kind.name()), Some(kind));
        assert_eq!(Kind::from_u8(kind as u8), Some(kind));
    }
    assert_eq!(Kind::from_u8(200), None);
}

#[test]
fn series_classification() {
    assert!(Kind::Text.is_series());
    assert!(Kind::Action.is_series());
    assert!(!Kind::Integer.is_series());
    assert!(!Kind::Word.is_series());
    assert!(Kind::Path.is_array());
    assert!(!Kind::Text.is_array());
}

#[test]
fn raw_loadable_source_marker() {
    let text = String::from("1 2");
    assert!(RawLoadable::source(&text).is_source());
    assert!(!RawLoadable::value(Cell::integer(1)).is_source());
}

#[test]
fn root_target_follows_series_storage_or_word_binding() {
    let ctx = ObjectId {
        index: 4,
        generation: 2,
    };
    assert_eq!(Cell::word(Kind::Word, 3).with_binding(Some(ctx)).root_target(), Some(ctx));
    assert_eq!(Cell::word(Kind::SetWord, 3).root_target(), None);
    assert_eq!(Cell::series(Kind::Text, ctx, 0).root_target(), Some(ctx));
    assert_eq!(Cell::integer(5).root_target(), None);
}
