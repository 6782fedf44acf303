use crate::{BackendId, CompileError, CompileOptions, GrammarBuilder, Parser};

#[test]
fn stable_indices_test() {
    assert_eq!(BackendId::Packrat.index(), 0);
    assert_eq!(BackendId::Regular.index(), 1);
    assert_eq!(BackendId::Llk.index(), 2);
    assert_eq!(BackendId::Lalr.index(), 3);
    assert_eq!(BackendId::Glr.index(), 4);

    for index in 0..5 {
        let id = BackendId::from_index(index).unwrap();
        assert_eq!(id.index(), index);
    }
    assert!(BackendId::from_index(5).is_none());
}

#[test]
fn default_backend_test() {
    let mut g = GrammarBuilder::new();
    let token = g.token("x");
    let parser = Parser::new(g, token).unwrap();
    assert_eq!(parser.backend(), BackendId::Packrat);
}

fn end_parser() -> Parser {
    let mut g = GrammarBuilder::new();
    let end = g.end();
    Parser::new(g, end).unwrap()
}

#[test]
fn end_grammar_all_backends_test() {
    for id in [
        BackendId::Packrat,
        BackendId::Regular,
        BackendId::Llk,
        BackendId::Lalr,
        BackendId::Glr,
    ] {
        let mut parser = end_parser();
        parser.compile(id, CompileOptions::default()).unwrap();
        let tree = parser.parse(b"").unwrap();
        assert_eq!((tree.start, tree.end), (0, 0), "backend {}", id);
        parser
            .parse(b"x")
            .expect_err("End should fail on a non-empty buffer.");
    }
}

#[test]
fn regular_rejects_recursion_test() {
    let mut parser = crate::examples::arithmetic_parser();
    match parser.compile(BackendId::Regular, CompileOptions::default()) {
        Err(CompileError::NotRegular { .. }) => {}
        other => panic!("Expected NotRegular, got {:?}.", other.err()),
    }
}

#[test]
fn regular_parses_flat_grammar_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let digits = g.many1(digit);
    let unit = g.token("ms");
    let duration = g.sequence(vec![digits, unit]);
    let mut parser = Parser::new(g, duration).unwrap();
    parser
        .compile(BackendId::Regular, CompileOptions::default())
        .unwrap();
    let tree = parser.parse(b"250ms").unwrap();
    assert_eq!((tree.start, tree.end), (0, 5));
}

#[test]
fn compile_failure_leaves_parser_test() {
    let mut g = GrammarBuilder::new();
    let keyword = g.token("if");
    let letter = g.class("a-z").unwrap();
    let boundary = g.not_followed_by(letter);
    let statement = g.sequence(vec![keyword, boundary]);
    let mut parser = Parser::new(g, statement).unwrap();

    match parser.compile(BackendId::Lalr, CompileOptions::default()) {
        Err(CompileError::PegOnlyConstruct { .. }) => {}
        other => panic!("Expected PegOnlyConstruct, got {:?}.", other.err()),
    }

    // The failed compile left the parser uncompiled; packrat still runs.
    assert_eq!(parser.backend(), BackendId::Packrat);
    parser.parse(b"if").unwrap();
    parser.parse(b"ifx").expect_err("Boundary should reject a letter.");
}
