//! Grammar source - the TOML file mapping commands to their spoken
//! phrasings, plus the vocabulary variable table.
//!
//! `[vars]` holds named sets of interchangeable words usable inside
//! phrasings. `[[command]]` entries carry a declaration line
//! (`name TAG(x) TAG(literal) ...`) and the phrasings; the array
//! order is the matching priority.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One command definition as written in the grammar file.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSource {
    /// Declaration line: command name followed by parameter tokens.
    /// `TAG(x)` binds a spoken capture to the single lowercase letter
    /// `x`; `TAG(text)` is a literal converted at compile time.
    pub define: String,

    /// Natural-language phrasings. `{x}` marks where a named parameter
    /// is spoken; UPPERCASE words are `[vars]` references.
    #[serde(default)]
    pub phrases: Vec<String>,
}

/// The normalized grammar source, straight out of the TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct GrammarSource {
    #[serde(default)]
    pub vars: HashMap<String, Vec<String>>,

    #[serde(default, rename = "command")]
    pub commands: Vec<CommandSource>,
}

impl GrammarSource {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid grammar file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read grammar file {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("cannot parse grammar file {}", path.display()))
    }
}

/// Vocabulary variable lookups for template expansion.
pub struct VocabTable {
    vars: HashMap<String, Vec<String>>,
}

impl VocabTable {
    pub fn new(vars: HashMap<String, Vec<String>>) -> Self {
        Self { vars }
    }

    /// The alternatives for a variable, in declaration order. `None`
    /// means the template referenced an undefined variable; the
    /// compiler turns that into a compile error.
    pub fn resolve(&self, name: &str) -> Option<&[String]> {
        self.vars.get(name).map(Vec::as_slice)
    }
}

impl From<&GrammarSource> for VocabTable {
    fn from(source: &GrammarSource) -> Self {
        Self::new(source.vars.clone())
    }
}
