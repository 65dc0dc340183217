//! Utterance session - runs transcribed text through the resolver and
//! dispatcher, one utterance at a time.
//!
//! Resolve and dispatch failures are reported and the session stays
//! ready for the next utterance; only a terminating handler (or end of
//! input) ends the loop.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::actions::KeystrokeExecutor;
use crate::dispatch::{DispatchOutcome, dispatch};
use crate::resolve::Resolver;

/// Whether the session loop should keep going after an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Continue,
    Stop,
}

/// Trim surrounding whitespace and the trailing punctuation that
/// transcribers like to append ("go to line 42." -> "go to line 42").
pub fn normalize_utterance(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim_end()
}

pub struct Session<W: Write> {
    resolver: Resolver,
    executor: KeystrokeExecutor<W>,
    echo: bool,
}

impl<W: Write> Session<W> {
    pub fn new(resolver: Resolver, executor: KeystrokeExecutor<W>) -> Self {
        Self {
            resolver,
            executor,
            echo: false,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Resolve and dispatch one normalized utterance, propagating
    /// failures to the caller.
    pub fn dispatch_one(&mut self, utterance: &str) -> Result<DispatchOutcome> {
        let resolved = self.resolver.resolve(utterance)?;
        if self.echo {
            let args: Vec<String> = resolved.args.iter().map(|a| a.to_string()).collect();
            eprintln!("-> {}({})", resolved.name, args.join(", "));
        }
        Ok(dispatch(&resolved, &mut self.executor)?)
    }

    /// Handle one raw input line. Failures are reported to stderr and
    /// the session continues; termination is signalled to the caller.
    pub fn handle(&mut self, line: &str) -> SessionStatus {
        let utterance = normalize_utterance(line);
        if utterance.is_empty() {
            return SessionStatus::Continue;
        }
        match self.dispatch_one(utterance) {
            Ok(DispatchOutcome::Done) => SessionStatus::Continue,
            Ok(DispatchOutcome::TerminateSession) => {
                eprintln!("Voice control off.");
                SessionStatus::Stop
            }
            Err(e) => {
                eprintln!("{:#}", e);
                SessionStatus::Continue
            }
        }
    }

    /// Interactive loop: one utterance per input line until a handler
    /// terminates the session or input runs out.
    pub fn run(&mut self, input: impl BufRead, prompt: &str) -> Result<()> {
        eprint!("{}", prompt);
        for line in input.lines() {
            if self.handle(&line?) == SessionStatus::Stop {
                return Ok(());
            }
            eprint!("{}", prompt);
        }
        Ok(())
    }

    pub fn into_executor(self) -> KeystrokeExecutor<W> {
        self.executor
    }
}
