//! Two-tier utterance resolution.
//!
//! A pluggable primary strategy (a learned matcher, eventually) gets
//! the first look at every utterance. When it declines, the compiled
//! grammar is the deterministic backstop: commands are tried in
//! declaration order and the first full match wins, no scoring.

use std::collections::HashMap;
use thiserror::Error;

use crate::compile::{CompiledCommand, CompiledGrammar, ParamSpec};
use crate::types::{ArgValue, TypeRegistry};

/// A command name plus its typed arguments, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCommand {
    pub name: String,
    pub args: Vec<ArgValue>,
}

/// What a primary strategy had to say about an utterance. There is no
/// partial outcome: either a fully resolved command or a decline.
#[derive(Debug)]
pub enum PrimaryOutcome {
    Resolved(ResolvedCommand),
    Declined,
}

/// First-pass resolution strategy, tried before the grammar.
pub trait PrimaryResolver {
    fn try_resolve(&self, utterance: &str) -> PrimaryOutcome;
}

/// The default primary strategy: declines everything, leaving all
/// resolution to the grammar.
pub struct DeclineAll;

impl PrimaryResolver for DeclineAll {
    fn try_resolve(&self, _utterance: &str) -> PrimaryOutcome {
        PrimaryOutcome::Declined
    }
}

/// Per-utterance resolution failures. The caller reports these and
/// stays ready for the next utterance.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unrecognized command: `{0}`")]
    UnrecognizedUtterance(String),

    #[error("bad `{letter}` argument for `{command}`: `{text}`: {msg}")]
    ArgumentConversion {
        command: String,
        letter: char,
        text: String,
        msg: String,
    },
}

/// Owns the compiled grammar and type registry for the life of the
/// session; read-only after construction.
pub struct Resolver {
    grammar: CompiledGrammar,
    registry: TypeRegistry,
    primary: Box<dyn PrimaryResolver>,
}

impl Resolver {
    pub fn new(grammar: CompiledGrammar, registry: TypeRegistry) -> Self {
        Self {
            grammar,
            registry,
            primary: Box::new(DeclineAll),
        }
    }

    /// Install a primary strategy in front of the grammar fallback.
    pub fn with_primary(mut self, primary: Box<dyn PrimaryResolver>) -> Self {
        self.primary = primary;
        self
    }

    pub fn grammar(&self) -> &CompiledGrammar {
        &self.grammar
    }

    /// Resolve one utterance: primary strategy first, grammar second.
    pub fn resolve(&self, utterance: &str) -> Result<ResolvedCommand, ResolveError> {
        if let PrimaryOutcome::Resolved(cmd) = self.primary.try_resolve(utterance) {
            return Ok(cmd);
        }
        self.match_grammar(utterance)
    }

    /// Deterministic fallback: first command in declaration order whose
    /// pattern fully matches the utterance wins.
    fn match_grammar(&self, utterance: &str) -> Result<ResolvedCommand, ResolveError> {
        for cmd in self.grammar.commands() {
            let Some(captured) = cmd.match_utterance(utterance) else {
                continue;
            };
            return self.build_args(cmd, &captured);
        }
        Err(ResolveError::UnrecognizedUtterance(utterance.to_string()))
    }

    /// Assemble the argument list in parameter declaration order:
    /// literals use their pre-converted constant, named parameters
    /// convert the captured text.
    fn build_args(
        &self,
        cmd: &CompiledCommand,
        captured: &HashMap<char, &str>,
    ) -> Result<ResolvedCommand, ResolveError> {
        let mut args = Vec::with_capacity(cmd.params().len());
        for param in cmd.params() {
            match param {
                ParamSpec::Literal(value) => args.push(value.clone()),
                ParamSpec::Named { letter, tag } => {
                    let conversion_error = |text: &str, msg: String| {
                        ResolveError::ArgumentConversion {
                            command: cmd.name().to_string(),
                            letter: *letter,
                            text: text.to_string(),
                            msg,
                        }
                    };
                    let text = captured.get(letter).copied().ok_or_else(|| {
                        conversion_error("", "not captured by the matched phrasing".to_string())
                    })?;
                    let spec = self
                        .registry
                        .get(tag)
                        .ok_or_else(|| conversion_error(text, format!("unknown type {}", tag)))?;
                    args.push((spec.convert)(text).map_err(|msg| conversion_error(text, msg))?);
                }
            }
        }
        Ok(ResolvedCommand {
            name: cmd.name().to_string(),
            args,
        })
    }
}
