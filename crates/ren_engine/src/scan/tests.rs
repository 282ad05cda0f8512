use pretty_assertions::assert_eq;
use ren_cell::Kind;

use super::{scan, Item, ScanError, Token};

fn tokens(source: &str) -> Vec<Token> {
    match scan(source) {
        Ok(items) => items.into_iter().map(|item| item.token).collect(),
        Err(err) => panic!("scan of {source:?} failed: {err:?}"),
    }
}

fn word(kind: Kind, spelling: &str) -> Token {
    Token::Word(kind, spelling.to_string())
}

fn bare(tokens: Vec<Token>) -> Vec<Item> {
    tokens
        .into_iter()
        .map(|token| Item {
            token,
            newline_before: false,
        })
        .collect()
}

#[test]
fn numbers() {
    assert_eq!(
        tokens("1 -2 +3 1.5 -0.25 2e3"),
        vec![
            Token::Integer(1),
            Token::Integer(-2),
            Token::Integer(3),
            Token::Decimal(1.5),
            Token::Decimal(-0.25),
            Token::Decimal(2000.0),
        ]
    );
}

#[test]
fn lone_signs_are_words() {
    assert_eq!(
        tokens("1 - 2 + x"),
        vec![
            Token::Integer(1),
            word(Kind::Word, "-"),
            Token::Integer(2),
            word(Kind::Word, "+"),
            word(Kind::Word, "x"),
        ]
    );
}

#[test]
fn word_classes() {
    assert_eq!(
        tokens("x x: :x 'x /x / <>"),
        vec![
            word(Kind::Word, "x"),
            word(Kind::SetWord, "x"),
            word(Kind::GetWord, "x"),
            word(Kind::LitWord, "x"),
            word(Kind::Refinement, "x"),
            word(Kind::Word, "/"),
            word(Kind::Word, "<>"),
        ]
    );
}

#[test]
fn words_are_case_sensitive() {
    assert_eq!(
        tokens("Foo foo"),
        vec![word(Kind::Word, "Foo"), word(Kind::Word, "foo")]
    );
}

#[test]
fn text_forms() {
    assert_eq!(
        tokens(r#""a ^"b^" ^/" {x {y} ^}}"#),
        vec![
            Token::Text("a \"b\" \n".to_string()),
            Token::Text("x {y} }".to_string()),
        ]
    );
}

#[test]
fn chars_and_construction_syntax() {
    assert_eq!(
        tokens(r##"#"a" #"^/" #[true] #[false] #[none] #[void] _"##),
        vec![
            Token::Char('a'),
            Token::Char('\n'),
            Token::Logic(true),
            Token::Logic(false),
            Token::Blank,
            Token::Void,
            Token::Blank,
        ]
    );
}

#[test]
fn datatype_construction_syntax() {
    assert_eq!(
        tokens("#[datatype! block!] #[datatype!  logic! ]"),
        vec![Token::Datatype(Kind::Block), Token::Datatype(Kind::Logic)]
    );
    assert!(scan("#[datatype! thing!]").is_err());
}

#[test]
fn nested_series_and_paths() {
    assert_eq!(
        tokens("[a (1 2)] copy/deep b/1"),
        vec![
            Token::Block(bare(vec![
                word(Kind::Word, "a"),
                Token::Group(bare(vec![Token::Integer(1), Token::Integer(2)])),
            ])),
            Token::Path(bare(vec![word(Kind::Word, "copy"), word(Kind::Word, "deep")])),
            Token::Path(bare(vec![word(Kind::Word, "b"), Token::Integer(1)])),
        ]
    );
}

#[test]
fn comments_and_newlines() {
    let items = match scan("a ; note\nb") {
        Ok(items) => items,
        Err(err) => panic!("{err:?}"),
    };
    assert_eq!(items.len(), 2);
    assert!(!items[0].newline_before);
    assert!(items[1].newline_before);
}

#[test]
fn empty_source_scans_to_nothing() {
    assert_eq!(tokens(""), Vec::new());
    assert_eq!(tokens("  \n ; only a comment"), Vec::new());
}

#[test]
fn errors_carry_line_numbers() {
    assert_eq!(
        scan("a\nb\n[c"),
        Err(ScanError {
            line: 3,
            message: "missing ]".to_string(),
        })
    );
    assert!(scan("a ]").is_err());
    assert!(scan("\"open").is_err());
    assert!(scan("1abc").is_err());
    assert!(scan("#[bogus]").is_err());
}
