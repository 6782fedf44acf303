use crate::examples::{arithmetic_parser, as_uint};
use crate::{BackendId, CompileOptions, ParseError};

#[test]
fn packrat_left_recursion_test() {
    let parser = arithmetic_parser();
    parser.set_log(crate::Log::Result("arithmetic")).unwrap();
    let tree = parser.parse(b"1+2*3").unwrap();
    tree.print().unwrap();
    assert_eq!((tree.start, tree.end), (0, 5));
    assert_eq!(as_uint(&tree), 7);
}

#[test]
fn lalr_actions_test() {
    let mut parser = arithmetic_parser();
    parser
        .compile(BackendId::Lalr, CompileOptions::default())
        .unwrap();
    let tree = parser.parse(b"1+2*3").unwrap();
    assert_eq!(as_uint(&tree), 7);
}

#[test]
fn backends_agree_test() {
    let top_down = arithmetic_parser();
    let mut bottom_up = arithmetic_parser();
    bottom_up
        .compile(BackendId::Lalr, CompileOptions::default())
        .unwrap();

    for input in [&b"7"[..], b"1+2*3", b"(1+2)*3", b"2*(3+4)+5", b"1*2*3"] {
        let a = top_down.parse(input).unwrap();
        let b = bottom_up.parse(input).unwrap();
        assert!(
            a.structural_eq(&b),
            "Trees diverge on {:?}: {:?} vs {:?}",
            String::from_utf8_lossy(input),
            a,
            b
        );
    }
}

#[test]
fn grouping_test() {
    let parser = arithmetic_parser();
    assert_eq!(as_uint(&parser.parse(b"(1+2)*3").unwrap()), 9);
    assert_eq!(as_uint(&parser.parse(b"2*(3+4)+5").unwrap()), 19);
}

#[test]
fn truncated_input_test() {
    let mut parser = arithmetic_parser();
    parser
        .compile(BackendId::Lalr, CompileOptions::default())
        .unwrap();
    match parser.parse(b"1+").unwrap_err() {
        ParseError::Failed { position, .. } => assert_eq!(position, 2),
        other => panic!("Expected a parse failure, got {:?}.", other),
    }
}

#[test]
fn glr_prefix_roots_test() {
    let mut parser = arithmetic_parser();
    parser
        .compile(BackendId::Glr, CompileOptions::default())
        .unwrap();

    // Every prefix that is a complete expression survives as a root.
    let forest = parser.parse_forest(b"1+2*3").unwrap();
    let values: Vec<u64> = forest.iter().map(as_uint).collect();
    assert_eq!(values, vec![1, 3, 7]);

    // Each root consumed a prefix of the input.
    let mut last_end = 0;
    for root in &forest {
        assert_eq!(root.start, 0);
        assert!(root.end >= last_end);
        last_end = root.end;
    }
}
