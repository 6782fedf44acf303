use crate::{
    Arena, Expected, GrammarBuilder, ParseError, Parser, TreeValue,
};

#[test]
fn literal_test() {
    let mut g = GrammarBuilder::new();
    let abc = g.token("abc");
    let parser = Parser::new(g, abc).unwrap();

    let tree = parser.parse(b"abcde").unwrap();
    assert_eq!((tree.start, tree.end), (0, 3));
    match &tree.value {
        TreeValue::Token(bytes) => assert_eq!(bytes, b"abc"),
        other => panic!("Expected a token leaf, got {:?}.", other),
    }
}

#[test]
fn choice_order_test() {
    let mut g = GrammarBuilder::new();
    let short = g.token("if");
    let long = g.token("ifx");
    let keyword = g.choice(vec![short, long]);
    let parser = Parser::new(g, keyword).unwrap();

    // Ordered choice commits to the first success and leaves "x" unconsumed.
    let tree = parser.parse(b"ifx").unwrap();
    assert_eq!((tree.start, tree.end), (0, 2));
    match &tree.value {
        TreeValue::Token(bytes) => assert_eq!(bytes, b"if"),
        other => panic!("Expected a token leaf, got {:?}.", other),
    }
}

#[test]
fn repetition_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let digits = g.many(digit);
    let parser = Parser::new(g, digits).unwrap();

    let tree = parser.parse(b"42a").unwrap();
    assert_eq!((tree.start, tree.end), (0, 2));
    assert_eq!(tree.children().len(), 2);
    for child in tree.children() {
        assert!(matches!(child.value, TreeValue::Bytes));
    }

    let empty = parser.parse(b"x").unwrap();
    assert_eq!((empty.start, empty.end), (0, 0));
    assert_eq!(empty.children().len(), 0);
}

#[test]
fn optional_test() {
    let mut g = GrammarBuilder::new();
    let sign = g.token("-");
    let opt = g.optional(sign);
    let parser = Parser::new(g, opt).unwrap();

    let present = parser.parse(b"-").unwrap();
    assert_eq!((present.start, present.end), (0, 1));
    let absent = parser.parse(b"x").unwrap();
    assert_eq!((absent.start, absent.end), (0, 0));
}

#[test]
fn sep_by_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let comma = g.token(",");
    let list = g.sep_by(digit, comma);
    let parser = Parser::new(g, list).unwrap();

    let tree = parser.parse(b"1,2,3").unwrap();
    assert_eq!((tree.start, tree.end), (0, 5));
    // Separators stay visible unless wrapped with ignore.
    assert_eq!(tree.children().len(), 5);

    // A trailing separator is left unconsumed.
    let trailing = parser.parse(b"1,2,").unwrap();
    assert_eq!((trailing.start, trailing.end), (0, 3));
}

#[test]
fn negative_lookahead_test() {
    let mut g = GrammarBuilder::new();
    let keyword = g.token("if");
    let letter = g.class("a-z").unwrap();
    let boundary = g.not_followed_by(letter);
    let statement = g.sequence(vec![keyword, boundary]);
    let parser = Parser::new(g, statement).unwrap();

    let tree = parser.parse(b"if(").unwrap();
    assert_eq!((tree.start, tree.end), (0, 2));
    parser
        .parse(b"ifx")
        .expect_err("A letter after the keyword should be rejected.");
}

#[test]
fn positive_lookahead_test() {
    let mut g = GrammarBuilder::new();
    let name = g.class("a-z").unwrap();
    let run = g.many1(name);
    let open = g.token("(");
    let call_ahead = g.followed_by(open);
    let callee = g.sequence(vec![run, call_ahead]);
    let parser = Parser::new(g, callee).unwrap();

    let tree = parser.parse(b"print(1)").unwrap();
    assert_eq!((tree.start, tree.end), (0, 5));
    parser
        .parse(b"print+1")
        .expect_err("The lookahead should demand an open parenthesis.");
}

#[test]
fn attr_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let digits = g.many1(digit);
    let short = g.attr(digits, |tree, _| tree.children().len() <= 2);
    let parser = Parser::new(g, short).unwrap();

    parser.parse(b"12").unwrap();
    parser
        .parse(b"123")
        .expect_err("The predicate should reject three digits.");
}

#[test]
fn action_reject_test() {
    let mut g = GrammarBuilder::new();
    let any = g.any();
    let rejected = g.action(any, |_, _| Err(crate::Rejected));
    let parser = Parser::new(g, rejected).unwrap();
    parser
        .parse(b"x")
        .expect_err("A rejecting action should fail the match.");
}

#[test]
fn left_recursion_test() {
    // expr : expr '+' digit | digit
    let mut g = GrammarBuilder::new();
    let expr = g.indirect();
    let digit = g.class("0-9").unwrap();
    let plus = g.token("+");
    let plus = g.ignore(plus);
    let sum = g.sequence(vec![expr, plus, digit]);
    let body = g.choice(vec![sum, digit]);
    g.bind(expr, body).unwrap();
    let parser = Parser::new(g, expr).unwrap();

    let tree = parser.parse(b"1+2+3").unwrap();
    assert_eq!((tree.start, tree.end), (0, 5));
    // Left associative: the nested sum covers "1+2".
    assert_eq!(tree.children().len(), 2);
    assert_eq!((tree.children()[0].start, tree.children()[0].end), (0, 3));
    assert_eq!((tree.children()[1].start, tree.children()[1].end), (4, 5));
}

#[test]
fn furthest_failure_test() {
    let mut g = GrammarBuilder::new();
    let ab = g.token("ab");
    let cd = g.token("cd");
    let word = g.sequence(vec![ab, cd]);
    let parser = Parser::new(g, word).unwrap();

    match parser.parse(b"abce").unwrap_err() {
        ParseError::Failed { position, expected } => {
            assert_eq!(position, 2);
            assert!(expected.contains(&Expected::Literal(b"cd".to_vec())));
        }
        other => panic!("Expected a parse failure, got {:?}.", other),
    }
}

#[test]
fn error_describe_test() {
    let mut g = GrammarBuilder::new();
    let token = g.token("let");
    let parser = Parser::new(g, token).unwrap();
    let err = parser.parse(b"lot").unwrap_err();
    let message = err.describe(&crate::Code::new(b"lot"));
    assert!(message.contains("Failed to parse at"), "{}", message);
}

#[test]
fn arena_accounting_test() {
    let parser = crate::examples::json_parser();
    let arena = Arena::new();
    parser.parse_in(&arena, b"[1, 2, {\"k\": true}]").unwrap();
    assert!(arena.allocated_bytes() > 0);
    assert!(arena.allocation_count() > 0);
}

#[test]
fn quota_exhaustion_test() {
    let parser = crate::examples::json_parser();
    let arena = Arena::with_quota(64);
    match parser.parse_in(&arena, b"[1, 2, 3]").unwrap_err() {
        ParseError::AllocationFailed(err) => assert_eq!(err.limit, 64),
        other => panic!("Expected allocation failure, got {:?}.", other),
    }
}

#[test]
fn arena_isolation_test() {
    let mut g = GrammarBuilder::new();
    let word = g.token("tree");
    let parser = Parser::new(g, word).unwrap();
    let tree = {
        let arena = Arena::new();
        parser.parse_in(&arena, b"tree").unwrap()
        // The arena is destroyed here; the returned tree owns its data.
    };
    assert_eq!((tree.start, tree.end), (0, 4));
}
