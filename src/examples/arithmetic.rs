use crate::{GrammarBuilder, Parser, ParseTree, TreeValue};

/// The classic left recursive arithmetic grammar, folded to a value by
/// semantic actions:
///
/// ```text
/// expr   : expr '+' term | term
/// term   : term '*' factor | factor
/// factor : '(' expr ')' | digit
/// ```
///
/// The packrat backend parses it through left recursion seeding; the LALR(1)
/// backend parses it natively; both return the same tree.
pub fn arithmetic_parser() -> Parser {
    let mut g = GrammarBuilder::new();

    let expr = g.indirect();
    let expr = g.label(expr, "expr");
    let term = g.indirect();
    let term = g.label(term, "term");

    let digit = g.class("0-9").unwrap();
    let digit_value = g.action(digit, |tree, code| {
        let byte = tree.bytes(code)[0];
        Ok(TreeValue::Uint((byte - b'0') as u64))
    });

    let open = g.token("(");
    let open = g.ignore(open);
    let close = g.token(")");
    let close = g.ignore(close);
    let group = g.sequence(vec![open, expr, close]);
    let group_value = g.action(group, |tree, _| Ok(tree.children()[0].value.clone()));

    let factor = g.choice(vec![group_value, digit_value]);
    let factor = g.label(factor, "factor");

    let star = g.token("*");
    let star = g.ignore(star);
    let product = g.sequence(vec![term, star, factor]);
    let product_value = g.action(product, |tree, _| {
        Ok(TreeValue::Uint(as_uint(&tree.children()[0]) * as_uint(&tree.children()[1])))
    });
    let term_body = g.choice(vec![product_value, factor]);
    g.bind(term, term_body).unwrap();

    let plus = g.token("+");
    let plus = g.ignore(plus);
    let sum = g.sequence(vec![expr, plus, term]);
    let sum_value = g.action(sum, |tree, _| {
        Ok(TreeValue::Uint(as_uint(&tree.children()[0]) + as_uint(&tree.children()[1])))
    });
    let expr_body = g.choice(vec![sum_value, term]);
    g.bind(expr, expr_body).unwrap();

    Parser::new(g, expr).unwrap()
}

/// The folded value of an arithmetic subtree.
pub fn as_uint(tree: &ParseTree) -> u64 {
    match tree.value {
        TreeValue::Uint(value) => value,
        _ => panic!("Arithmetic subtree {:?} carries no value.", tree.value),
    }
}
