//! Function-spec dialect.
//!
//! ```text
//! {Adds five}                      ; action doc
//! value [integer! decimal!] {doc}  ; normal param, typeset, param doc
//! 'name                            ; quoted param
//! /only {doc}                      ; refinement; following params belong to it
//! return: [integer!]               ; ignored
//! ```

use ren_cell::{Cell, Kind};

use crate::engine::Engine;
use crate::errors::{self, ErrorData};
use crate::heap::{Param, ParamClass};
use crate::symbols::Symbol;
use crate::typeset::TypeSet;

#[derive(Debug, Default)]
pub struct ParsedSpec {
    pub doc: Option<String>,
    pub params: Vec<Param>,
}

impl Engine {
    pub(crate) fn parse_spec(&self, cells: &[Cell]) -> Result<ParsedSpec, ErrorData> {
        let mut spec = ParsedSpec::default();
        let mut skip_block = false;
        for &cell in cells {
            match cell.kind() {
                Kind::Text => {
                    let text = self.text_of(cell);
                    match spec.params.last_mut() {
                        Some(param) => param.doc = Some(text),
                        None => spec.doc = Some(text),
                    }
                }
                Kind::Word | Kind::LitWord | Kind::GetWord | Kind::Refinement => {
                    let Some(sym) = cell.symbol().map(Symbol) else {
                        return Err(errors::bad_spec("word without symbol"));
                    };
                    if spec.params.iter().any(|p| p.symbol == sym) {
                        let name = self.spelling(sym);
                        return Err(errors::bad_spec(&format!("duplicate parameter {name}")));
                    }
                    let (class, types) = match cell.kind() {
                        Kind::Refinement => (
                            ParamClass::Refinement,
                            TypeSet::of(&[Kind::Logic, Kind::Blank]),
                        ),
                        Kind::Word => (ParamClass::Normal, TypeSet::any_value()),
                        _ => (ParamClass::Quoted, TypeSet::any_value()),
                    };
                    spec.params.push(Param {
                        symbol: sym,
                        class,
                        types,
                        doc: None,
                    });
                    skip_block = false;
                }
                Kind::SetWord => skip_block = true,
                Kind::Block if skip_block => skip_block = false,
                Kind::Block => {
                    let types = self.typeset_of(cell)?;
                    match spec.params.last_mut() {
                        Some(param) if param.class != ParamClass::Refinement => {
                            param.types = types;
                        }
                        _ => return Err(errors::bad_spec("type block without a parameter")),
                    }
                }
                other => return Err(errors::bad_spec(&format!("unexpected {other}"))),
            }
        }
        Ok(spec)
    }

    fn typeset_of(&self, block: Cell) -> Result<TypeSet, ErrorData> {
        let mut types = TypeSet::EMPTY;
        for cell in self.array_cells(block) {
            let name = match cell.kind() {
                Kind::Word => self.word_spelling(cell),
                Kind::Datatype => cell.as_datatype().unwrap_or(Kind::Void).name().to_string(),
                other => return Err(errors::bad_spec(&format!("{other} in type block"))),
            };
            match TypeSet::from_name(&name) {
                Some(set) => types = types.union(set),
                None => return Err(errors::bad_spec(&format!("unknown type {name}"))),
            }
        }
        Ok(types)
    }

    /// Parse spec source text (natives and host extensions).
    pub(crate) fn parse_spec_text(&self, source: &str) -> Result<ParsedSpec, ErrorData> {
        let cells = self.load(source, None)?;
        self.parse_spec(&cells)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ren_cell::{EngineHandle, Kind};

    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::heap::ParamClass;
    use crate::typeset::TypeSet;

    fn engine() -> Engine {
        Engine::new(EngineHandle(1), EngineConfig::new())
    }

    #[test]
    fn params_types_and_docs() {
        let engine = engine();
        let spec = engine
            .parse_spec_text("{Adds five} value [integer! decimal!] {the number} /twice")
            .unwrap_or_else(|e| panic!("{e:?}"));
        assert_eq!(spec.doc.as_deref(), Some("Adds five"));
        assert_eq!(spec.params.len(), 2);
        let value = &spec.params[0];
        assert_eq!(engine.spelling(value.symbol), "value");
        assert_eq!(value.class, ParamClass::Normal);
        assert_eq!(value.types, TypeSet::of(&[Kind::Integer, Kind::Decimal]));
        assert_eq!(value.doc.as_deref(), Some("the number"));
        assert_eq!(spec.params[1].class, ParamClass::Refinement);
    }

    #[test]
    fn return_annotation_is_ignored() {
        let engine = engine();
        let spec = engine
            .parse_spec_text("return: [integer!] 'name")
            .unwrap_or_else(|e| panic!("{e:?}"));
        assert_eq!(spec.params.len(), 1);
        assert_eq!(spec.params[0].class, ParamClass::Quoted);
    }

    #[test]
    fn malformed_specs_are_rejected() {
        let engine = engine();
        assert!(engine.parse_spec_text("[integer!]").is_err());
        assert!(engine.parse_spec_text("x [bogus!]").is_err());
        assert!(engine.parse_spec_text("x x").is_err());
        assert!(engine.parse_spec_text("42").is_err());
        assert!(engine.parse_spec_text("x [").is_err());
    }
}
