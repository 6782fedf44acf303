use crate::grammar::ByteSet;
use crate::{CompileError, GrammarBuilder, Parser};
use std::rc::Rc;

#[test]
fn byteset_ops_test() {
    let digits = ByteSet::range(b'0', b'9');
    assert!(digits.contains(b'0'));
    assert!(digits.contains(b'9'));
    assert!(!digits.contains(b'a'));
    assert_eq!(digits.len(), 10);

    let mut merged = digits;
    let grew = merged.union_with(&ByteSet::single(b'x'));
    assert!(grew);
    assert!(!merged.union_with(&ByteSet::single(b'x')));
    assert!(merged.contains(b'x'));

    assert!(digits.intersects(&ByteSet::range(b'5', b'z')));
    assert!(!digits.intersects(&ByteSet::range(b'a', b'z')));
    assert_eq!(format!("{}", digits), "['0'-'9']");
}

#[test]
fn byteset_class_test() {
    let hex = ByteSet::class("0-9a-fA-F").unwrap();
    assert_eq!(hex.len(), 22);
    assert!(hex.contains(b'b'));
    assert!(!hex.contains(b'g'));

    let not_quote = ByteSet::class("^\"").unwrap();
    assert!(!not_quote.contains(b'"'));
    assert!(not_quote.contains(b'a'));
    assert_eq!(not_quote.len(), 255);

    ByteSet::class("z-a").expect_err("An inverted range should not build.");
}

#[test]
fn bind_once_test() {
    let mut g = GrammarBuilder::new();
    let placeholder = g.indirect();
    let target = g.token("x");
    g.bind(placeholder, target).unwrap();
    g.bind(placeholder, target)
        .expect_err("A second binding should be refused.");

    let token = g.token("y");
    g.bind(token, target)
        .expect_err("Only indirect nodes accept a binding.");
}

#[test]
fn unbound_indirect_test() {
    let mut g = GrammarBuilder::new();
    let placeholder = g.indirect();
    let token = g.token("x");
    let word = g.sequence(vec![token, placeholder]);
    match Parser::new(g, word) {
        Err(CompileError::UnboundIndirect { node }) => assert_eq!(node, placeholder),
        other => panic!("Expected UnboundIndirect, got {:?}.", other.err()),
    }
}

#[test]
fn labels_and_names_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let digits = g.many1(digit);
    let digits = g.label(digits, "digits");
    let parser = Parser::new(g, digits).unwrap();

    let grammar = parser.grammar_graph();
    assert_eq!(grammar.label(digits), Some("digits"));
    assert_eq!(grammar.name(digits), "digits");
    assert!(grammar.name(digit).starts_with("charset"));
}

#[test]
fn user_data_test() {
    let mut g = GrammarBuilder::new();
    let token = g.token("let");
    g.set_user_data(token, Rc::new(42_u32));
    let parser = Parser::new(g, token).unwrap();

    let data = parser
        .grammar_graph()
        .user_data(token)
        .expect("User data should be kept.");
    assert_eq!(data.downcast_ref::<u32>(), Some(&42));
}

#[test]
fn empty_token_panics_test() {
    let result = std::panic::catch_unwind(|| {
        let mut g = GrammarBuilder::new();
        g.token("")
    });
    result.expect_err("An empty literal should be refused.");
}
