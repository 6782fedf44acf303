use super::{Cfg, Symbol, TermSet};

/// FIRST of a symbol string: the terminals its derivations can begin with,
/// plus whether the whole string can derive ε.
pub(crate) fn first_of_sequence(cfg: &Cfg, symbols: &[Symbol]) -> (TermSet, bool) {
    let mut set = TermSet::empty();
    for symbol in symbols {
        match symbol {
            Symbol::Term(term) => {
                set.insert(term);
                return (set, false);
            }
            Symbol::Nt(nt) => {
                set.union_with(cfg.first(*nt));
                if !cfg.is_nullable(*nt) {
                    return (set, false);
                }
            }
        }
    }
    (set, true)
}

/// Run the NULLABLE, FIRST and FOLLOW fixed points until no set grows.
/// Returns whether any set grew, so re-running on a settled grammar reports `false`.
pub(crate) fn recompute_analyses(cfg: &mut Cfg) -> bool {
    let mut grew_any = false;

    // NULLABLE is the boolean pre-pass the two set analyses depend on.
    let mut additions_made = true;
    while additions_made {
        additions_made = false;
        for production in &cfg.productions {
            if cfg.nullable[production.lhs.0] {
                continue;
            }
            let nullable = production.rhs.iter().all(|symbol| match symbol {
                Symbol::Term(_) => false,
                Symbol::Nt(nt) => cfg.nullable[nt.0],
            });
            if nullable {
                cfg.nullable[production.lhs.0] = true;
                additions_made = true;
                grew_any = true;
            }
        }
    }

    let mut additions_made = true;
    while additions_made {
        additions_made = false;
        for index in 0..cfg.productions.len() {
            let lhs = cfg.productions[index].lhs;
            let mut addition = TermSet::empty();
            for symbol in &cfg.productions[index].rhs {
                match symbol {
                    Symbol::Term(term) => {
                        addition.insert(term);
                        break;
                    }
                    Symbol::Nt(nt) => {
                        addition.union_with(&cfg.first[nt.0]);
                        if !cfg.nullable[nt.0] {
                            break;
                        }
                    }
                }
            }
            if cfg.first[lhs.0].union_with(&addition) {
                additions_made = true;
                grew_any = true;
            }
        }
    }

    let mut additions_made = true;
    while additions_made {
        additions_made = false;
        for index in 0..cfg.productions.len() {
            let lhs = cfg.productions[index].lhs;
            let rhs_len = cfg.productions[index].rhs.len();
            for position in 0..rhs_len {
                let nt = match cfg.productions[index].rhs[position] {
                    Symbol::Nt(nt) => nt,
                    Symbol::Term(_) => continue,
                };
                let mut addition = TermSet::empty();
                let mut rest_nullable = true;
                for symbol in &cfg.productions[index].rhs[position + 1..] {
                    match symbol {
                        Symbol::Term(term) => {
                            addition.insert(term);
                            rest_nullable = false;
                            break;
                        }
                        Symbol::Nt(rest) => {
                            addition.union_with(&cfg.first[rest.0]);
                            if !cfg.nullable[rest.0] {
                                rest_nullable = false;
                                break;
                            }
                        }
                    }
                }
                if rest_nullable {
                    let follow_lhs = cfg.follow[lhs.0];
                    addition.union_with(&follow_lhs);
                }
                if cfg.follow[nt.0].union_with(&addition) {
                    additions_made = true;
                    grew_any = true;
                }
            }
        }
    }

    grew_any
}
