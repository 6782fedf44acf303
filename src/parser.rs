use crate::arena::Arena;
use crate::backend::{registry, BackendId, Compiled, CompileOptions};
use crate::cfg::{desugar, Augment, Cfg};
use crate::error::{CompileError, ParseError};
use crate::grammar::{Grammar, GrammarBuilder, NodeId};
use crate::tree::ParseTree;
use crate::util::{Code, Log};
use once_cell::unsync::OnceCell;

/// A grammar frozen for parsing, with an optional compiled backend attached.
///
/// A parser with no compiled backend runs the packrat backend, which needs no
/// preparation. Compiling for a table driven backend builds the normalized
/// grammar and its tables; a failed compile reports the grammar error and
/// leaves the previously attached backend in place.
pub struct Parser {
    grammar: Grammar,
    start: NodeId,
    compiled: Option<Compiled>,
    log: OnceCell<Log<&'static str>>,
}

impl Parser {
    /// Freeze the builder. Fails with [CompileError::UnboundIndirect] when an
    /// indirect node was never bound.
    pub fn new(builder: GrammarBuilder, start: NodeId) -> Result<Self, CompileError> {
        if let Some(node) = builder.unbound_indirect() {
            return Err(CompileError::UnboundIndirect { node });
        }
        Ok(Self {
            grammar: builder.into_grammar(),
            start,
            compiled: None,
            log: OnceCell::new(),
        })
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn grammar_graph(&self) -> &Grammar {
        &self.grammar
    }

    /// The backend the next parse will run on.
    pub fn backend(&self) -> BackendId {
        self.compiled
            .as_ref()
            .map(|compiled| compiled.backend)
            .unwrap_or(BackendId::Packrat)
    }

    /// Build the backend state for `backend` and attach it, replacing any
    /// previously attached state.
    pub fn compile(
        &mut self,
        backend: BackendId,
        options: CompileOptions,
    ) -> Result<(), CompileError> {
        let compiled = registry(backend).compile(&self.grammar, self.start, &options)?;
        self.compiled = Some(compiled);
        Ok(())
    }

    /// The normalized grammar of the attached backend, when it compiled one.
    pub fn cfg(&self) -> Option<&Cfg> {
        self.compiled.as_ref().and_then(|compiled| compiled.cfg.as_ref())
    }

    /// List the productions of the normalized grammar.
    pub fn grammar(&self) -> Result<String, CompileError> {
        if let Some(cfg) = self.cfg() {
            return Ok(format!("{}", cfg));
        }
        let cfg = desugar(&self.grammar, self.start, Augment::Exact, "grammar listing")?;
        Ok(format!("{}", cfg))
    }

    /// Set a log label to debug the parser based on the level of [Log].
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log {} is already set for this parser.", err))
    }

    /// Parse `input`, demanding a unique result.
    pub fn parse(&self, input: &[u8]) -> Result<ParseTree, ParseError> {
        let arena = Arena::new();
        self.parse_in(&arena, input)
    }

    /// Parse with an explicit arena; all per call state is bounded by its quota.
    pub fn parse_in(&self, arena: &Arena, input: &[u8]) -> Result<ParseTree, ParseError> {
        let mut forest = self.parse_forest_in(arena, input)?;
        if forest.len() > 1 {
            return Err(ParseError::AmbiguousParse {
                count: forest.len(),
            });
        }
        Ok(forest
            .pop()
            .expect("Bug! A successful parse returned an empty forest."))
    }

    /// Parse `input`, keeping every surviving alternative. Deterministic
    /// backends always return one tree; the GLR backend may return several.
    pub fn parse_forest(&self, input: &[u8]) -> Result<Vec<ParseTree>, ParseError> {
        let arena = Arena::new();
        self.parse_forest_in(&arena, input)
    }

    pub fn parse_forest_in(
        &self,
        arena: &Arena,
        input: &[u8],
    ) -> Result<Vec<ParseTree>, ParseError> {
        let code = Code::new(input);
        let log = self.log.get().copied().unwrap_or(Log::None);
        match &self.compiled {
            Some(compiled) => {
                registry(compiled.backend).parse(&self.grammar, compiled, &code, arena, log)
            }
            None => {
                let fallback = Compiled::packrat_default(self.start);
                registry(BackendId::Packrat).parse(&self.grammar, &fallback, &code, arena, log)
            }
        }
    }
}
