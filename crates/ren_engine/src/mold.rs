//! FORM and MOLD.
//!
//! MOLD writes source that scans back to an equal value (for every kind with
//! a lexical form). FORM writes the human-readable text: strings without
//! quotes, blocks without brackets, logic as `true`/`false`.

use ren_cell::{Cell, Kind, ObjectId};

use crate::engine::Engine;
use crate::heap::{Heap, ParamClass};
use crate::symbols::{Symbol, SymbolTable};

impl Engine {
    pub fn mold(&self, cell: Cell) -> String {
        self.render(cell, true)
    }

    pub fn form(&self, cell: Cell) -> String {
        self.render(cell, false)
    }

    pub fn render(&self, cell: Cell, mold: bool) -> String {
        let heap = self.heap.borrow();
        let symbols = self.symbols.borrow();
        let mut molder = Molder {
            heap: &heap,
            symbols: &symbols,
            out: String::new(),
            stack: Vec::new(),
        };
        molder.value(cell, mold);
        molder.out
    }
}

struct Molder<'a> {
    heap: &'a Heap,
    symbols: &'a SymbolTable,
    out: String,
    /// Series being written, for cycle detection.
    stack: Vec<ObjectId>,
}

impl Molder<'_> {
    fn spelling(&self, cell: Cell) -> &str {
        cell.symbol()
            .map_or("?", |sym| self.symbols.spelling(Symbol(sym)))
    }

    fn value(&mut self, cell: Cell, mold: bool) {
        match cell.kind() {
            Kind::Void => {
                if mold {
                    self.out.push_str("#[void]");
                }
            }
            Kind::Blank => self.out.push('_'),
            Kind::Logic => {
                let flag = cell.as_logic().unwrap_or_default();
                self.out.push_str(match (mold, flag) {
                    (true, true) => "#[true]",
                    (true, false) => "#[false]",
                    (false, true) => "true",
                    (false, false) => "false",
                });
            }
            Kind::Integer => {
                self.out
                    .push_str(&cell.as_integer().unwrap_or_default().to_string());
            }
            Kind::Decimal => {
                self.out
                    .push_str(&format!("{:?}", cell.as_decimal().unwrap_or_default()));
            }
            Kind::Char => {
                let c = cell.as_char().unwrap_or_default();
                if mold {
                    self.out.push_str("#\"");
                    escape_into(&mut self.out, c);
                    self.out.push('"');
                } else {
                    self.out.push(c);
                }
            }
            Kind::Datatype => {
                let kind = cell.as_datatype().unwrap_or(Kind::Void);
                if mold {
                    self.out.push_str("#[datatype! ");
                    self.out.push_str(kind.name());
                    self.out.push(']');
                } else {
                    self.out.push_str(kind.name());
                }
            }
            Kind::Word | Kind::SetWord | Kind::GetWord | Kind::LitWord | Kind::Refinement => {
                self.word(cell, mold);
            }
            Kind::Text => self.text(cell, mold),
            Kind::Block | Kind::Group | Kind::Path => self.array(cell, mold),
            Kind::Object => self.object(cell, mold),
            Kind::Action => self.action(cell),
            Kind::Error => self.error(cell, mold),
        }
    }

    fn word(&mut self, cell: Cell, mold: bool) {
        let spelling = self.spelling(cell).to_string();
        if !mold {
            self.out.push_str(&spelling);
            return;
        }
        match cell.kind() {
            Kind::SetWord => {
                self.out.push_str(&spelling);
                self.out.push(':');
            }
            Kind::GetWord => {
                self.out.push(':');
                self.out.push_str(&spelling);
            }
            Kind::LitWord => {
                self.out.push('\'');
                self.out.push_str(&spelling);
            }
            Kind::Refinement => {
                self.out.push('/');
                self.out.push_str(&spelling);
            }
            _ => self.out.push_str(&spelling),
        }
    }

    fn text(&mut self, cell: Cell, mold: bool) {
        let heap = self.heap;
        let Some(text) = cell.object_id().and_then(|id| heap.text(id)) else {
            self.out.push_str("#[stale]");
            return;
        };
        let chars = text.chars().skip(cell.index() as usize);
        if mold {
            self.out.push('"');
            for c in chars {
                escape_into(&mut self.out, c);
            }
            self.out.push('"');
        } else {
            self.out.extend(chars);
        }
    }

    fn array(&mut self, cell: Cell, mold: bool) {
        let kind = cell.kind();
        let (open, close, separator) = match kind {
            Kind::Group => ("(", ")", " "),
            Kind::Path => ("", "", "/"),
            _ => ("[", "]", " "),
        };
        let Some(id) = cell.object_id() else {
            self.out.push_str("#[stale]");
            return;
        };
        if self.stack.contains(&id) {
            self.out.push_str(open);
            self.out.push_str("...");
            self.out.push_str(close);
            return;
        }
        let heap = self.heap;
        let Some(cells) = heap.array(id) else {
            self.out.push_str("#[stale]");
            return;
        };
        self.stack.push(id);
        if mold {
            self.out.push_str(open);
        }
        let start = cell.index() as usize;
        for (i, element) in cells.iter().skip(start).enumerate() {
            if i > 0 {
                if mold && kind != Kind::Path && element.newline_before() {
                    self.out.push('\n');
                } else {
                    self.out.push_str(separator);
                }
            }
            self.value(*element, mold);
        }
        if mold {
            self.out.push_str(close);
        }
        self.stack.pop();
    }

    fn object(&mut self, cell: Cell, mold: bool) {
        let Some(id) = cell.object_id() else {
            self.out.push_str("#[stale]");
            return;
        };
        if self.stack.contains(&id) {
            self.out.push_str("make object! [...]");
            return;
        }
        let (heap, symbols) = (self.heap, self.symbols);
        let Some(ctx) = heap.context(id) else {
            self.out.push_str("#[stale]");
            return;
        };
        self.stack.push(id);
        if mold {
            self.out.push_str("make object! [");
        }
        for (i, (key, var)) in ctx.keys().iter().zip(ctx.vars()).enumerate() {
            if i > 0 {
                self.out.push_str(if mold { " " } else { "\n" });
            }
            self.out.push_str(symbols.spelling(*key));
            self.out.push_str(": ");
            self.value(*var, true);
        }
        if mold {
            self.out.push(']');
        }
        self.stack.pop();
    }

    fn action(&mut self, cell: Cell) {
        let (heap, symbols) = (self.heap, self.symbols);
        let Some(action) = cell.object_id().and_then(|id| heap.action(id)) else {
            self.out.push_str("#[stale]");
            return;
        };
        self.out.push_str("make action! [[");
        for (i, param) in action.params.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            match param.class {
                ParamClass::Normal => {}
                ParamClass::Quoted => self.out.push('\''),
                ParamClass::Refinement => self.out.push('/'),
            }
            self.out.push_str(symbols.spelling(param.symbol));
        }
        self.out.push_str("] ...]");
    }

    fn error(&mut self, cell: Cell, mold: bool) {
        let heap = self.heap;
        let Some(error) = cell.object_id().and_then(|id| heap.error(id)) else {
            self.out.push_str("#[stale]");
            return;
        };
        if !mold {
            self.out.push_str(&error.message);
            return;
        }
        self.out.push_str("make error! \"");
        for c in error.message.chars() {
            escape_into(&mut self.out, c);
        }
        self.out.push('"');
    }
}

fn escape_into(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("^\""),
        '^' => out.push_str("^^"),
        '\n' => out.push_str("^/"),
        '\t' => out.push_str("^-"),
        _ => out.push(c),
    }
}
