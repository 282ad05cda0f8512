//! Loading source and aggregating loadables.

use std::borrow::Cow;

use ren_cell::{Cell, Kind, ObjectId};

use crate::engine::Engine;
use crate::errors::{self, ErrorData};
use crate::scan::{self, Item, Token};

/// One element handed to an evaluation: a value or source to scan.
#[derive(Clone, Debug)]
pub enum Loadable<'a> {
    Value(Cell),
    Source(Cow<'a, str>),
}

impl Engine {
    /// Scan `source` into cells, binding new words into `context` if given.
    pub fn load(&self, source: &str, context: Option<ObjectId>) -> Result<Vec<Cell>, ErrorData> {
        let items = scan::scan(source).map_err(|e| errors::scan_error(e.line, &e.message))?;
        Ok(self.materialize(&items, context))
    }

    fn materialize(&self, items: &[Item], context: Option<ObjectId>) -> Vec<Cell> {
        items
            .iter()
            .map(|item| {
                self.item_cell(&item.token, context, true)
                    .with_newline_before(item.newline_before)
            })
            .collect()
    }

    fn item_cell(&self, token: &Token, context: Option<ObjectId>, bind: bool) -> Cell {
        match token {
            Token::Blank => Cell::blank(),
            Token::Void => Cell::VOID,
            Token::Logic(flag) => Cell::logic(*flag),
            Token::Integer(n) => Cell::integer(*n),
            Token::Decimal(d) => Cell::decimal(*d),
            Token::Char(c) => Cell::char(*c),
            Token::Datatype(kind) => Cell::datatype(*kind),
            Token::Text(text) => self.make_text(text.as_str()),
            Token::Word(kind, spelling) => {
                let sym = self.intern(spelling);
                let binding = match context {
                    Some(ctx) if bind => self.bind_loaded(*kind, sym, ctx),
                    _ => None,
                };
                Cell::word(*kind, sym.0).with_binding(binding)
            }
            Token::Block(items) => self.make_array(Kind::Block, self.materialize(items, context)),
            Token::Group(items) => self.make_array(Kind::Group, self.materialize(items, context)),
            Token::Path(items) => {
                // Only the head of a path is looked up; the rest are selectors.
                let cells = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.item_cell(&item.token, context, i == 0))
                    .collect();
                self.make_array(Kind::Path, cells)
            }
        }
    }

    /// Concatenate loadables left to right. Values are spliced as-is;
    /// sources are scanned and their items spliced without nesting.
    pub fn aggregate(
        &self,
        loadables: &[Loadable<'_>],
        context: Option<ObjectId>,
    ) -> Result<Vec<Cell>, ErrorData> {
        let mut cells = Vec::with_capacity(loadables.len());
        for loadable in loadables {
            match loadable {
                Loadable::Value(cell) => cells.push(*cell),
                Loadable::Source(text) => cells.extend(self.load(text, context)?),
            }
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ren_cell::{Cell, EngineHandle, Kind};

    use super::Loadable;
    use crate::config::EngineConfig;
    use crate::engine::Engine;

    fn engine() -> Engine {
        Engine::new(EngineHandle(1), EngineConfig::new())
    }

    #[test]
    fn sources_splice_in_order_around_values() {
        let engine = engine();
        let loadables = [
            Loadable::Source("1 2".into()),
            Loadable::Value(Cell::integer(3)),
            Loadable::Source("".into()),
            Loadable::Source("  4 ".into()),
        ];
        let cells = engine
            .aggregate(&loadables, Some(engine.user))
            .unwrap_or_else(|e| panic!("{e:?}"));
        let ints: Vec<_> = cells.iter().filter_map(Cell::as_integer).collect();
        assert_eq!(ints, vec![1, 2, 3, 4]);
    }

    #[test]
    fn malformed_fragment_fails_the_whole_aggregate() {
        let engine = engine();
        let loadables = [Loadable::Source("1".into()), Loadable::Source("[2".into())];
        let err = engine.aggregate(&loadables, None).err();
        assert_eq!(err.map(|e| e.id), Some("scan"));
    }

    #[test]
    fn prebuilt_values_keep_their_binding() {
        let engine = engine();
        let sym = engine.intern("kept");
        let word = Cell::word(Kind::Word, sym.0);
        let cells = engine
            .aggregate(&[Loadable::Value(word)], Some(engine.user))
            .unwrap_or_else(|e| panic!("{e:?}"));
        assert_eq!(cells[0].binding(), None);
    }

    #[test]
    fn path_tails_stay_unbound() {
        let engine = engine();
        let cells = engine
            .load("copy/deep", Some(engine.user))
            .unwrap_or_else(|e| panic!("{e:?}"));
        let parts = engine.array_cells(cells[0]);
        assert_eq!(parts[0].binding(), Some(engine.lib));
        assert_eq!(parts[1].binding(), None);
    }
}
