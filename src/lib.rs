//! Voice command grammar compiler and dispatcher.
//!
//! A grammar file declares commands, each with typed parameters and a
//! list of natural-language phrasings. The compiler turns every command
//! into one anchored, case-insensitive pattern; the resolver matches a
//! transcribed utterance against them (after an optional pluggable
//! first-pass strategy) and produces a command name plus typed
//! arguments; the dispatcher routes that to a registered action
//! handler.
//!
//! Speech capture and transcription are external concerns: text comes
//! in, keystrokes go out.

pub mod actions;
pub mod compile;
pub mod config;
pub mod dispatch;
pub mod grammar;
pub mod resolve;
pub mod session;
pub mod types;
