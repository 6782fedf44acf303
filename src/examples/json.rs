use crate::{GrammarBuilder, NodeId, Parser};

/// A scannerless JSON grammar.
///
/// Whitespace is consumed by padding after every structural token and after
/// every value, so the grammar works the same under the packrat backend and
/// the table driven backends.
pub fn json_parser() -> Parser {
    let mut g = GrammarBuilder::new();

    let ws_char = g.class(" \t\r\n").unwrap();
    let ws_run = g.many(ws_char);
    let ws = g.ignore(ws_run);

    let value = g.indirect();
    let value = g.label(value, "value");
    let value_padded = g.sequence(vec![value, ws]);

    // Strings: a quoted run of plain bytes and backslash escapes.
    let quote = g.token("\"");
    let hidden_quote = g.ignore(quote);
    let plain_run = g.class("^\"\\\\\x00-\x1f").unwrap();
    let backslash = g.token("\\");
    let escaped_byte = g.any();
    let escape = g.sequence(vec![backslash, escaped_byte]);
    let string_char = g.choice(vec![plain_run, escape]);
    let string_body = g.many(string_char);
    let string = g.sequence(vec![hidden_quote, string_body, hidden_quote]);
    let string = g.label(string, "string");

    // Numbers: -? int frac? exp?, with no leading zeroes in the integer part.
    let minus = g.token("-");
    let minus_opt = g.optional(minus);
    let digit = g.class("0-9").unwrap();
    let digits = g.many1(digit);
    let zero = g.token("0");
    let lead_digit = g.class("1-9").unwrap();
    let digit_run = g.many(digit);
    let nonzero = g.sequence(vec![lead_digit, digit_run]);
    let int_part = g.choice(vec![zero, nonzero]);
    let dot = g.token(".");
    let frac = g.sequence(vec![dot, digits]);
    let frac_opt = g.optional(frac);
    let exp_mark = g.class("eE").unwrap();
    let sign = g.class("+\\-").unwrap();
    let sign_opt = g.optional(sign);
    let exp = g.sequence(vec![exp_mark, sign_opt, digits]);
    let exp_opt = g.optional(exp);
    let number = g.sequence(vec![minus_opt, int_part, frac_opt, exp_opt]);
    let number = g.label(number, "number");

    let true_lit = g.token("true");
    let false_lit = g.token("false");
    let null_lit = g.token("null");
    let literal = g.choice(vec![true_lit, false_lit, null_lit]);
    let literal = g.label(literal, "literal");

    let comma = padded_token(&mut g, ws, ",");
    let colon = padded_token(&mut g, ws, ":");

    let open_bracket = padded_token(&mut g, ws, "[");
    let close_bracket = g.token("]");
    let close_bracket = g.ignore(close_bracket);
    let elements = g.sep_by(value_padded, comma);
    let array = g.sequence(vec![open_bracket, elements, close_bracket]);
    let array = g.label(array, "array");

    let open_brace = padded_token(&mut g, ws, "{");
    let close_brace = g.token("}");
    let close_brace = g.ignore(close_brace);
    let member = g.sequence(vec![string, ws, colon, value_padded]);
    let member = g.label(member, "member");
    let members = g.sep_by(member, comma);
    let object = g.sequence(vec![open_brace, members, close_brace]);
    let object = g.label(object, "object");

    let alternatives = g.choice(vec![string, number, literal, array, object]);
    g.bind(value, alternatives).unwrap();

    let end = g.end();
    let document = g.sequence(vec![ws, value_padded, end]);
    let document = g.label(document, "json");

    Parser::new(g, document).unwrap()
}

/// A hidden literal with the trailing whitespace consumed.
fn padded_token(g: &mut GrammarBuilder, ws: NodeId, literal: &str) -> NodeId {
    let token = g.token(literal);
    let token = g.ignore(token);
    let padded = g.sequence(vec![token, ws]);
    g.ignore(padded)
}
