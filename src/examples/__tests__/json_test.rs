use crate::examples::json_parser;
use crate::{BackendId, CompileOptions, TreeValue};

#[test]
fn acceptance_parity_test() {
    let parser = json_parser();
    let documents: Vec<&[u8]> = vec![
        &br#"{"a": 1, "b": [true, null, "x"]}"#[..],
        b"  [ ] ",
        b"{ }",
        br#""hi\n""#,
        b"-0.5e+10",
        b"1e5",
        b" 42 ",
        br#"[{"nested": [[]]}, -7]"#,
        br#""A""#,
        // Rejected by both sides.
        b"[1,]",
        b"{a: 1}",
        b"01",
        b"tru",
        b"",
        b"[1 2]",
        br#"{"a" 1}"#,
    ];

    for document in documents {
        let ours = parser.parse(document).is_ok();
        let reference = serde_json::from_slice::<serde_json::Value>(document).is_ok();
        assert_eq!(
            ours,
            reference,
            "Acceptance diverges on {:?}.",
            String::from_utf8_lossy(document)
        );
    }
}

#[test]
fn tree_structure_test() {
    let parser = json_parser();
    let tree = parser.parse(br#"{"k": [1, true]}"#).unwrap();

    let literal = tree
        .find_tree(&|node| matches!(&node.value, TreeValue::Token(bytes) if bytes == b"true"))
        .expect("The literal should appear in the tree.");
    assert_eq!((literal.start, literal.end), (10, 14));

    let key = tree
        .find_tree(&|node| node.start == 1 && node.end == 4)
        .expect("The object key should appear in the tree.");
    assert!(matches!(key.value, TreeValue::Sequence(_)));

    // The object sits under the padded value wrapper of the document.
    let object = tree.at_path(&[0, 0]).expect("The document holds a value.");
    assert_eq!((object.start, object.end), (0, 16));
}

#[test]
fn lalr_json_test() {
    let mut parser = json_parser();
    parser
        .compile(BackendId::Lalr, CompileOptions::default())
        .unwrap();

    let document = br#"{"k": [1, true], "s": "v"}"#;
    let bottom_up = parser.parse(document).unwrap();
    let top_down = json_parser().parse(document).unwrap();
    assert!(
        bottom_up.structural_eq(&top_down),
        "Backends disagree: {:?} vs {:?}",
        bottom_up,
        top_down
    );

    parser
        .parse(b"[1,]")
        .expect_err("A trailing comma should fail bottom up as well.");
}

#[test]
fn error_position_test() {
    let parser = json_parser();
    let err = parser.parse(br#"{"k": }"#).unwrap_err();
    let position = err.position().expect("A syntax error carries a position.");
    assert_eq!(position, 6);
}
