use crate::{
    Arena, BackendId, CompileOptions, GrammarBuilder, ParseError, Parser, TreeValue,
};

fn glr(mut parser: Parser) -> Parser {
    parser
        .compile(BackendId::Glr, CompileOptions::default())
        .unwrap();
    parser
}

#[test]
fn choice_forest_test() {
    let mut g = GrammarBuilder::new();
    let short = g.token("if");
    let long = g.token("ifx");
    let keyword = g.choice(vec![short, long]);
    let parser = glr(Parser::new(g, keyword).unwrap());

    // Both alternatives survive: one consuming two bytes, one consuming three.
    let forest = parser.parse_forest(b"ifx").unwrap();
    assert_eq!(forest.len(), 2);
    let mut literals: Vec<Vec<u8>> = forest
        .iter()
        .map(|tree| match &tree.value {
            TreeValue::Token(bytes) => bytes.clone(),
            other => panic!("Expected a token leaf, got {:?}.", other),
        })
        .collect();
    literals.sort();
    assert_eq!(literals, vec![b"if".to_vec(), b"ifx".to_vec()]);

    match parser.parse(b"ifx").unwrap_err() {
        ParseError::AmbiguousParse { count } => assert_eq!(count, 2),
        other => panic!("Expected an ambiguity error, got {:?}.", other),
    }
}

#[test]
fn prefix_soundness_test() {
    let mut g = GrammarBuilder::new();
    let word = g.token("ab");
    let parser = glr(Parser::new(g, word).unwrap());

    let forest = parser.parse_forest(b"abxyz").unwrap();
    assert_eq!(forest.len(), 1);
    // The surviving branch consumed a strict prefix of the input.
    assert_eq!((forest[0].start, forest[0].end), (0, 2));
}

#[test]
fn merged_ambiguity_test() {
    // expr : expr '+' expr | digit, anchored at the end of input. The two
    // associativities merge into one ambiguity node below the anchor.
    let mut g = GrammarBuilder::new();
    let expr = g.indirect();
    let digit = g.class("0-9").unwrap();
    let plus = g.token("+");
    let plus = g.ignore(plus);
    let sum = g.sequence(vec![expr, plus, expr]);
    let body = g.choice(vec![sum, digit]);
    g.bind(expr, body).unwrap();
    let end = g.end();
    let anchored = g.sequence(vec![expr, end]);
    let parser = glr(Parser::new(g, anchored).unwrap());

    let forest = parser.parse_forest(b"1+2+3").unwrap();
    assert_eq!(forest.len(), 1);
    let root = &forest[0];
    assert_eq!(root.children().len(), 1);
    let ambiguity = &root.children()[0];
    assert_eq!(ambiguity.children().len(), 2);
    let spans: Vec<(usize, usize)> = ambiguity
        .children()
        .iter()
        .map(|alternative| {
            (
                alternative.children()[0].end,
                alternative.children()[1].start,
            )
        })
        .collect();
    // One branch groups "1+2" on the left, the other "2+3" on the right.
    assert!(spans.contains(&(3, 4)));
    assert!(spans.contains(&(1, 2)));
}

#[test]
fn deterministic_grammar_forest_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let digits = g.many1(digit);
    let end = g.end();
    let number = g.sequence(vec![digits, end]);
    let parser = glr(Parser::new(g, number).unwrap());

    let tree = parser.parse(b"2048").unwrap();
    assert_eq!((tree.start, tree.end), (0, 4));
    parser.parse(b"20a8").expect_err("A letter should stall every stack.");
}

#[test]
fn failure_position_test() {
    let mut g = GrammarBuilder::new();
    let word = g.token("ab");
    let parser = glr(Parser::new(g, word).unwrap());

    match parser.parse(b"ax").unwrap_err() {
        ParseError::Failed { position, .. } => assert_eq!(position, 1),
        other => panic!("Expected a parse failure, got {:?}.", other),
    }
}

#[test]
fn quota_exhaustion_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let digits = g.many1(digit);
    let parser = glr(Parser::new(g, digits).unwrap());

    let arena = Arena::with_quota(16);
    match parser.parse_in(&arena, b"123").unwrap_err() {
        ParseError::AllocationFailed(err) => assert_eq!(err.limit, 16),
        other => panic!("Expected allocation failure, got {:?}.", other),
    }
}
