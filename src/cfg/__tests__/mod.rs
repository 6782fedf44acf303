use crate::cfg::{desugar, recompute_analyses, Augment, Cfg, NtId};
use crate::error::CompileError;
use crate::grammar::{Grammar, GrammarBuilder, NodeId};

fn lower(g: GrammarBuilder, start: NodeId) -> (Grammar, Cfg) {
    let grammar = g.into_grammar();
    let cfg = desugar(&grammar, start, Augment::Exact, "test").unwrap();
    (grammar, cfg)
}

fn nt_by_name(cfg: &Cfg, name: &str) -> NtId {
    (0..cfg.nonterminal_count())
        .map(NtId)
        .find(|nt| cfg.name(*nt) == name)
        .unwrap_or_else(|| panic!("No non-terminal named {}.", name))
}

#[test]
fn token_decomposition_test() {
    let mut g = GrammarBuilder::new();
    let word = g.token("abc");
    let word = g.label(word, "word");
    let (_, cfg) = lower(g, word);

    let nt = nt_by_name(&cfg, "word");
    let prods: Vec<_> = cfg.productions_of(nt).collect();
    assert_eq!(prods.len(), 1);
    // One singleton byte class per literal byte.
    assert_eq!(cfg.production(prods[0]).rhs.len(), 3);
}

#[test]
fn shared_subgraph_test() {
    let mut g = GrammarBuilder::new();
    let digit = g.class("0-9").unwrap();
    let pair = g.sequence(vec![digit, digit]);
    let (_, cfg) = lower(g, pair);

    // digit, pair, and the augmented start: sharing is preserved.
    assert_eq!(cfg.nonterminal_count(), 3);
}

#[test]
fn analyses_test() {
    let mut g = GrammarBuilder::new();
    let a = g.token("a");
    let a_opt = g.optional(a);
    let a_opt = g.label(a_opt, "a_opt");
    let b = g.ch(b'b');
    let bs = g.many(b);
    let bs = g.label(bs, "bs");
    let word = g.sequence(vec![a_opt, bs]);
    let word = g.label(word, "word");
    let (_, cfg) = lower(g, word);

    let word = nt_by_name(&cfg, "word");
    let a_opt = nt_by_name(&cfg, "a_opt");
    let bs = nt_by_name(&cfg, "bs");

    assert!(cfg.is_nullable(word));
    assert!(cfg.is_nullable(a_opt));
    assert!(cfg.is_nullable(bs));

    assert!(cfg.first(word).contains(Some(b'a')));
    assert!(cfg.first(word).contains(Some(b'b')));
    assert!(!cfg.first(word).contains(Some(b'c')));

    // FOLLOW(a_opt) starts with the repetition or the end of the word.
    assert!(cfg.follow(a_opt).contains(Some(b'b')));
    assert!(cfg.follow(a_opt).contains(None));
    assert!(cfg.follow(bs).contains(None));
}

#[test]
fn fixed_point_test() {
    let mut g = GrammarBuilder::new();
    let expr = g.indirect();
    let digit = g.class("0-9").unwrap();
    let plus = g.token("+");
    let sum = g.sequence(vec![expr, plus, digit]);
    let body = g.choice(vec![sum, digit]);
    g.bind(expr, body).unwrap();
    let grammar = g.into_grammar();
    let mut cfg = desugar(&grammar, expr, Augment::Exact, "test").unwrap();

    // Re-running the analyses on a settled grammar grows nothing.
    assert!(!recompute_analyses(&mut cfg));
}

#[test]
fn peg_only_rejection_test() {
    let mut g = GrammarBuilder::new();
    let a = g.token("a");
    let ahead = g.followed_by(a);
    let word = g.sequence(vec![ahead, a]);
    let grammar = g.into_grammar();
    match desugar(&grammar, word, Augment::Exact, "LALR(1)") {
        Err(CompileError::PegOnlyConstruct { backend, .. }) => {
            assert_eq!(backend, "LALR(1)");
        }
        other => panic!("Expected PegOnlyConstruct, got {:?}.", other.err()),
    }
}

#[test]
fn grammar_listing_test() {
    let mut g = GrammarBuilder::new();
    let item = g.class("a-z").unwrap();
    let comma = g.token(",");
    let list = g.sep_by1(item, comma);
    let list = g.label(list, "list");
    let (_, cfg) = lower(g, list);

    let listing = format!("{}", cfg);
    assert!(listing.contains("list"), "{}", listing);
    assert!(listing.contains(":"), "{}", listing);
    assert!(listing.contains(";"), "{}", listing);
    println!("{}", listing);
}

#[test]
fn nothing_has_no_production_test() {
    let mut g = GrammarBuilder::new();
    let dead = g.nothing();
    let dead = g.label(dead, "dead");
    let (_, cfg) = lower(g, dead);
    let nt = nt_by_name(&cfg, "dead");
    assert_eq!(cfg.productions_of(nt).count(), 0);
    assert!(!cfg.is_nullable(nt));
    assert!(cfg.first(nt).is_empty());
}
