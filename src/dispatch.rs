//! Command dispatch - routes a resolved command to a registered action
//! handler.
//!
//! Handlers live in an explicit capability table registered at startup;
//! there is no reflection. Lookup tries the `cmd_`-prefixed form of the
//! lower-cased command name first, then the bare name, so grammar-level
//! commands (`cmd_vvc_off`) can coexist with plain editor actions
//! (`goto_line`).

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::resolve::ResolvedCommand;
use crate::types::ArgValue;

/// What a handler wants the enclosing session to do next. Termination
/// is a deliberate control signal, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerFlow {
    Continue,
    Terminate,
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Done,
    TerminateSession,
}

/// Recoverable dispatch failures; the caller reports and keeps going.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("this command is not implemented: {0}")]
    UnknownCommand(String),

    #[error("`{name}` expects {expected} argument(s), got {got}")]
    HandlerArgumentError {
        name: String,
        expected: Arity,
        got: usize,
    },

    #[error("`{name}` failed: {msg}")]
    HandlerFailed { name: String, msg: String },
}

/// Declared argument count of a handler, checked before invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Inclusive range, for handlers with optional trailing arguments.
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exact(count) => n == *count,
            Arity::Range(min, max) => (*min..=*max).contains(&n),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(count) => write!(f, "{}", count),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
        }
    }
}

/// The capability the dispatcher needs from the host: nothing more
/// than "is this action registered" and "run it".
pub trait ActionExecutor {
    fn has_action(&self, name: &str) -> bool;
    fn invoke(&mut self, name: &str, args: &[ArgValue]) -> Result<HandlerFlow, DispatchError>;
}

type Handler<C> = Box<dyn FnMut(&mut C, &[ArgValue]) -> Result<HandlerFlow, String>>;

struct Action<C> {
    arity: Arity,
    run: Handler<C>,
}

/// Explicit name -> handler table. `C` is whatever context the
/// handlers operate on (an output sink, an editor connection, ...).
pub struct ActionRegistry<C> {
    actions: HashMap<String, Action<C>>,
}

impl<C> Default for ActionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ActionRegistry<C> {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        arity: Arity,
        run: impl FnMut(&mut C, &[ArgValue]) -> Result<HandlerFlow, String> + 'static,
    ) {
        self.actions.insert(
            name.to_string(),
            Action {
                arity,
                run: Box::new(run),
            },
        );
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn invoke(
        &mut self,
        ctx: &mut C,
        name: &str,
        args: &[ArgValue],
    ) -> Result<HandlerFlow, DispatchError> {
        let action = self
            .actions
            .get_mut(name)
            .ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))?;
        if !action.arity.accepts(args.len()) {
            return Err(DispatchError::HandlerArgumentError {
                name: name.to_string(),
                expected: action.arity,
                got: args.len(),
            });
        }
        (action.run)(ctx, args).map_err(|msg| DispatchError::HandlerFailed {
            name: name.to_string(),
            msg,
        })
    }
}

/// Route a resolved command to its handler: `cmd_<name>` first, then
/// the bare lower-cased name.
pub fn dispatch(
    resolved: &ResolvedCommand,
    executor: &mut dyn ActionExecutor,
) -> Result<DispatchOutcome, DispatchError> {
    let bare = resolved.name.to_lowercase();
    let prefixed = format!("cmd_{}", bare);
    let target = if executor.has_action(&prefixed) {
        prefixed
    } else if executor.has_action(&bare) {
        bare
    } else {
        return Err(DispatchError::UnknownCommand(resolved.name.clone()));
    };
    match executor.invoke(&target, &resolved.args)? {
        HandlerFlow::Continue => Ok(DispatchOutcome::Done),
        HandlerFlow::Terminate => Ok(DispatchOutcome::TerminateSession),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test executor: records every invocation into its context.
    struct RecordingExecutor {
        registry: ActionRegistry<Vec<String>>,
        log: Vec<String>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                registry: ActionRegistry::new(),
                log: Vec::new(),
            }
        }

        fn register(&mut self, name: &str, arity: Arity) {
            let tag = name.to_string();
            self.registry.register(name, arity, move |log, args| {
                log.push(format!("{}/{}", tag, args.len()));
                Ok(HandlerFlow::Continue)
            });
        }
    }

    impl ActionExecutor for RecordingExecutor {
        fn has_action(&self, name: &str) -> bool {
            self.registry.has_action(name)
        }

        fn invoke(&mut self, name: &str, args: &[ArgValue]) -> Result<HandlerFlow, DispatchError> {
            self.registry.invoke(&mut self.log, name, args)
        }
    }

    fn resolved(name: &str, args: Vec<ArgValue>) -> ResolvedCommand {
        ResolvedCommand {
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn test_prefixed_name_takes_precedence() {
        let mut executor = RecordingExecutor::new();
        executor.register("cmd_smart_edit", Arity::Exact(0));
        executor.register("smart_edit", Arity::Exact(0));
        dispatch(&resolved("smart_edit", vec![]), &mut executor).unwrap();
        assert_eq!(executor.log, vec!["cmd_smart_edit/0"]);
    }

    #[test]
    fn test_bare_name_fallback() {
        let mut executor = RecordingExecutor::new();
        executor.register("smart_edit", Arity::Exact(0));
        let outcome = dispatch(&resolved("smart_edit", vec![]), &mut executor).unwrap();
        assert_eq!(outcome, DispatchOutcome::Done);
        assert_eq!(executor.log, vec!["smart_edit/0"]);
    }

    #[test]
    fn test_name_lookup_lowercases() {
        let mut executor = RecordingExecutor::new();
        executor.register("smart_edit", Arity::Exact(0));
        dispatch(&resolved("Smart_Edit", vec![]), &mut executor).unwrap();
        assert_eq!(executor.log, vec!["smart_edit/0"]);
    }

    #[test]
    fn test_unknown_command() {
        let mut executor = RecordingExecutor::new();
        let err = dispatch(&resolved("smart_edit", vec![]), &mut executor).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownCommand(name) if name == "smart_edit"));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut executor = RecordingExecutor::new();
        executor.register("goto_line", Arity::Exact(1));
        let err = dispatch(&resolved("goto_line", vec![]), &mut executor).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::HandlerArgumentError {
                expected: Arity::Exact(1),
                got: 0,
                ..
            }
        ));
        assert!(executor.log.is_empty(), "handler must not run");
    }

    #[test]
    fn test_optional_arguments_accepted() {
        let mut executor = RecordingExecutor::new();
        executor.register("select_lines", Arity::Range(1, 2));
        dispatch(
            &resolved("select_lines", vec![ArgValue::UInt(3)]),
            &mut executor,
        )
        .unwrap();
        dispatch(
            &resolved(
                "select_lines",
                vec![ArgValue::UInt(3), ArgValue::UInt(9)],
            ),
            &mut executor,
        )
        .unwrap();
        assert_eq!(executor.log, vec!["select_lines/1", "select_lines/2"]);
    }

    #[test]
    fn test_terminate_propagates_distinctly() {
        let mut executor = RecordingExecutor::new();
        executor
            .registry
            .register("cmd_vvc_off", Arity::Exact(0), |_, _| {
                Ok(HandlerFlow::Terminate)
            });
        let outcome = dispatch(&resolved("vvc_off", vec![]), &mut executor).unwrap();
        assert_eq!(outcome, DispatchOutcome::TerminateSession);
    }

    #[test]
    fn test_handler_failure() {
        let mut executor = RecordingExecutor::new();
        executor
            .registry
            .register("smart_edit", Arity::Exact(0), |_, _| {
                Err("not implemented yet".to_string())
            });
        let err = dispatch(&resolved("smart_edit", vec![]), &mut executor).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::HandlerFailed { msg, .. } if msg == "not implemented yet"
        ));
    }
}
