//! Built-in editor actions, rendered as vim-style keystroke sequences.
//!
//! The host editor is external; this executor writes the keystrokes it
//! would feed (one action per line) into a sink - stdout in the CLI, a
//! buffer in tests.

use std::io::Write;

use crate::dispatch::{ActionExecutor, ActionRegistry, Arity, DispatchError, HandlerFlow};
use crate::types::ArgValue;

/// Executor backed by the default action table, writing keystrokes to
/// `out`.
pub struct KeystrokeExecutor<W: Write> {
    actions: ActionRegistry<W>,
    out: W,
}

impl<W: Write + 'static> KeystrokeExecutor<W> {
    pub fn new(out: W) -> Self {
        Self {
            actions: default_actions(),
            out,
        }
    }

    /// Recover the sink, e.g. to inspect keystrokes written in tests.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ActionExecutor for KeystrokeExecutor<W> {
    fn has_action(&self, name: &str) -> bool {
        self.actions.has_action(name)
    }

    fn invoke(&mut self, name: &str, args: &[ArgValue]) -> Result<HandlerFlow, DispatchError> {
        self.actions.invoke(&mut self.out, name, args)
    }
}

fn feed<W: Write>(out: &mut W, keys: &str) -> Result<HandlerFlow, String> {
    writeln!(out, "{}", keys).map_err(|e| e.to_string())?;
    Ok(HandlerFlow::Continue)
}

fn default_actions<W: Write + 'static>() -> ActionRegistry<W> {
    let mut actions = ActionRegistry::new();

    actions.register("goto_line", Arity::Exact(1), |out: &mut W, args| {
        let line = args[0].as_uint().ok_or("goto_line takes a line number")?;
        feed(out, &format!("{}gg", line))
    });

    actions.register("select_lines", Arity::Range(1, 2), |out: &mut W, args| {
        let start = args[0]
            .as_uint()
            .ok_or("select_lines takes line numbers")?;
        let mut keys = format!("{}ggV", start);
        if let Some(end) = args.get(1) {
            let end = end.as_uint().ok_or("select_lines takes line numbers")?;
            keys.push_str(&format!("{}gg", end));
        }
        feed(out, &keys)
    });

    actions.register("next_tab", Arity::Exact(0), |out: &mut W, _| feed(out, "gt"));
    actions.register("prev_tab", Arity::Exact(0), |out: &mut W, _| feed(out, "gT"));

    actions.register("copy_to_register", Arity::Range(0, 1), |out: &mut W, args| {
        let keys = match args.first() {
            None => "y".to_string(),
            Some(arg) => {
                let register = arg.as_register().ok_or("copy_to_register takes a register")?;
                format!("\"{}y", register)
            }
        };
        feed(out, &keys)
    });

    // Optional register and repeat count, in either spoken order.
    actions.register(
        "paste_from_register",
        Arity::Range(0, 2),
        |out: &mut W, args| {
            let mut register = None;
            let mut times = None;
            for arg in args {
                match arg {
                    ArgValue::Register(r) => register = Some(*r),
                    ArgValue::UInt(n) => times = Some(*n),
                    other => {
                        return Err(format!("paste_from_register cannot take `{}`", other));
                    }
                }
            }
            let mut keys = String::from("p");
            if let Some(r) = register {
                keys = format!("\"{}{}", r, keys);
            }
            if let Some(n) = times {
                keys = format!("{}{}", n, keys);
            }
            feed(out, &keys)
        },
    );

    actions.register("cmd_smart_edit", Arity::Exact(0), |_: &mut W, _| {
        Err("not implemented yet".to_string())
    });
    actions.register("cmd_smart_complete", Arity::Exact(0), |_: &mut W, _| {
        Err("not implemented yet".to_string())
    });

    actions.register("cmd_vvc_off", Arity::Exact(0), |_: &mut W, _| {
        Ok(HandlerFlow::Terminate)
    });

    actions
}
