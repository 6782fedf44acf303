use crate::{BackendId, CompileError, CompileOptions, GrammarBuilder, ParseError, Parser};

fn options(lookahead: usize) -> CompileOptions {
    CompileOptions { lookahead }
}

#[test]
fn predictive_parse_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let digits = g.many(digit);
    let suffix = g.token("ab");
    let word = g.sequence(vec![digits, suffix]);
    let mut parser = Parser::new(g, word).unwrap();

    parser.compile(BackendId::Llk, options(1)).unwrap();
    assert_eq!(parser.backend(), BackendId::Llk);

    let tree = parser.parse(b"12ab").unwrap();
    assert_eq!((tree.start, tree.end), (0, 4));
    assert_eq!(tree.children().len(), 2);

    parser.parse(b"12a").expect_err("A truncated suffix should fail.");
}

#[test]
fn shared_prefix_conflict_test() {
    // choice(sequence(A, B), sequence(A, C)) with FIRST₁(A·B) == FIRST₁(A·C).
    let mut g = GrammarBuilder::new();
    let a = g.token("a");
    let b = g.token("b");
    let c = g.token("bc");
    let left = g.sequence(vec![a, b]);
    let right = g.sequence(vec![a, c]);
    let either = g.choice(vec![left, right]);
    let either = g.label(either, "either");
    let mut parser = Parser::new(g, either).unwrap();

    match parser.compile(BackendId::Llk, options(1)) {
        Err(CompileError::NotLlk { rule, k }) => {
            assert_eq!(rule, "either");
            assert_eq!(k, 1);
        }
        other => panic!("Expected NotLlk, got {:?}.", other.err()),
    }

    // The same grammar is fine bottom up.
    parser
        .compile(BackendId::Lalr, CompileOptions::default())
        .unwrap();
    parser.parse(b"ab").unwrap();
    parser.parse(b"abc").unwrap();
}

#[test]
fn deeper_lookahead_test() {
    let mut g = GrammarBuilder::new();
    let ab = g.token("ab");
    let ac = g.token("ac");
    let either = g.choice(vec![ab, ac]);
    let mut parser = Parser::new(g, either).unwrap();

    match parser.compile(BackendId::Llk, options(1)) {
        Err(CompileError::NotLlk { k: 1, .. }) => {}
        other => panic!("Expected NotLlk at k = 1, got {:?}.", other.err()),
    }

    parser.compile(BackendId::Llk, options(2)).unwrap();
    let tree = parser.parse(b"ac").unwrap();
    assert_eq!((tree.start, tree.end), (0, 2));
    parser.parse(b"ad").expect_err("No alternative starts with 'ad'.");
}

#[test]
fn whole_input_test() {
    let mut g = GrammarBuilder::new();
    let word = g.token("ab");
    let mut parser = Parser::new(g, word).unwrap();
    parser.compile(BackendId::Llk, options(1)).unwrap();

    parser.parse(b"ab").unwrap();
    // The predictive driver consumes the whole input, unlike packrat.
    match parser.parse(b"abx").unwrap_err() {
        ParseError::Failed { position, .. } => assert_eq!(position, 2),
        other => panic!("Expected a parse failure, got {:?}.", other),
    }
}

#[test]
fn nullable_branch_test() {
    let mut g = GrammarBuilder::new();
    let sign = g.token("-");
    let sign_opt = g.optional(sign);
    let digit = g.class("0-9").unwrap();
    let number = g.sequence(vec![sign_opt, digit]);
    let mut parser = Parser::new(g, number).unwrap();
    parser.compile(BackendId::Llk, options(1)).unwrap();

    parser.parse(b"-5").unwrap();
    parser.parse(b"5").unwrap();
    parser.parse(b"-").expect_err("A lone sign is not a number.");
}
