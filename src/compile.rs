//! Grammar compiler - turns command definitions into anchored regex
//! matchers with one named capture group per parameter occurrence.
//!
//! Each command compiles to a single case-insensitive alternation over
//! all its phrasings. A parameter letter may be spoken in several
//! phrasings of the same command, so capture group names carry the
//! phrasing index (`x_0`, `x_1`, ...) to stay unique; the compiler
//! records a letter -> group names table so the resolver never has to
//! reverse-engineer group names at match time.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::grammar::{GrammarSource, VocabTable};
use crate::types::{ArgValue, TypeRegistry};

/// Fatal grammar-load errors. A grammar that fails to compile must not
/// be used; there is no partial compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("undefined vocabulary variable: {0}")]
    UndefinedVariable(String),

    #[error("unknown type tag `{tag}` in command `{command}`")]
    UnknownType { command: String, tag: String },

    #[error("malformed parameter `{token}` in command `{command}`")]
    MalformedParameter { command: String, token: String },

    #[error("literal `{text}` is not a valid {tag} in command `{command}`: {msg}")]
    MalformedLiteral {
        command: String,
        tag: String,
        text: String,
        msg: String,
    },

    #[error("empty command declaration")]
    EmptyDeclaration,

    #[error("phrasing of command `{command}` does not compile: {source}")]
    MalformedPhrase {
        command: String,
        source: regex::Error,
    },
}

/// One parameter slot of a command, in declaration order.
#[derive(Debug, Clone)]
pub enum ParamSpec {
    /// Spoken parameter: captured from the utterance and converted
    /// with the tag's converter at resolve time.
    Named { letter: char, tag: String },
    /// Constant argument, converted once at compile time.
    Literal(ArgValue),
}

/// A command with all its phrasings merged into one anchored pattern.
#[derive(Debug)]
pub struct CompiledCommand {
    name: String,
    params: Vec<ParamSpec>,
    pattern: Regex,
    /// Parameter letter -> capture group names, one per phrasing the
    /// letter appears in.
    groups: HashMap<char, Vec<String>>,
}

impl CompiledCommand {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn pattern_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Full-match the utterance. On success, returns the captured text
    /// per parameter letter; only the groups of the phrasing that
    /// actually matched participate, so each letter maps to at most
    /// one capture.
    pub fn match_utterance<'u>(&self, utterance: &'u str) -> Option<HashMap<char, &'u str>> {
        let caps = self.pattern.captures(utterance)?;
        let mut captured = HashMap::new();
        for (letter, names) in &self.groups {
            for name in names {
                if let Some(m) = caps.name(name) {
                    captured.insert(*letter, m.as_str());
                    break;
                }
            }
        }
        Some(captured)
    }
}

/// The compiled grammar: commands in declaration order, which is also
/// the matching priority. Immutable once built; a grammar reload is a
/// wholesale swap for a freshly compiled value.
#[derive(Debug, Default)]
pub struct CompiledGrammar {
    commands: Vec<CompiledCommand>,
}

impl CompiledGrammar {
    pub fn commands(&self) -> &[CompiledCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Whole-word UPPERCASE tokens in a phrasing are vocabulary references.
fn var_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][A-Z_]*\b").unwrap())
}

/// `{x}` placeholders referencing a named parameter.
fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z])\}").unwrap())
}

/// A pattern that matches no utterance, for commands declared with
/// zero phrasings: no position is both a word boundary and not one.
const NEVER_MATCH: &str = r"\b\B";

pub fn compile(
    source: &GrammarSource,
    registry: &TypeRegistry,
) -> Result<CompiledGrammar, CompileError> {
    let vocab = VocabTable::from(source);
    let mut commands = Vec::with_capacity(source.commands.len());
    for cmd in &source.commands {
        commands.push(compile_command(&cmd.define, &cmd.phrases, &vocab, registry)?);
    }
    Ok(CompiledGrammar { commands })
}

fn compile_command(
    define: &str,
    phrases: &[String],
    vocab: &VocabTable,
    registry: &TypeRegistry,
) -> Result<CompiledCommand, CompileError> {
    let mut tokens = define.split_whitespace();
    let name = tokens.next().ok_or(CompileError::EmptyDeclaration)?;

    // Parameter letter -> type tag, for placeholder expansion.
    let mut letter_tags: HashMap<char, String> = HashMap::new();
    let mut params = Vec::new();
    for token in tokens {
        params.push(parse_param(name, token, registry, &mut letter_tags)?);
    }

    let mut groups: HashMap<char, Vec<String>> = HashMap::new();
    let mut parts = Vec::with_capacity(phrases.len());
    for (index, phrase) in phrases.iter().enumerate() {
        let expanded = expand_vars(phrase, vocab)?;
        parts.push(expand_placeholders(
            name,
            &expanded,
            index,
            &letter_tags,
            registry,
            &mut groups,
        )?);
    }

    let pattern = if parts.is_empty() {
        NEVER_MATCH.to_string()
    } else {
        format!(r"(?i)\A(?:{})\z", parts.join("|"))
    };
    let pattern = Regex::new(&pattern).map_err(|source| CompileError::MalformedPhrase {
        command: name.to_string(),
        source,
    })?;

    Ok(CompiledCommand {
        name: name.to_string(),
        params,
        pattern,
        groups,
    })
}

/// Parse one `TAG(x)` or `TAG(literal)` token from a declaration line.
fn parse_param(
    command: &str,
    token: &str,
    registry: &TypeRegistry,
    letter_tags: &mut HashMap<char, String>,
) -> Result<ParamSpec, CompileError> {
    let malformed = || CompileError::MalformedParameter {
        command: command.to_string(),
        token: token.to_string(),
    };

    let open = token.find('(').ok_or_else(malformed)?;
    if open == 0 || !token.ends_with(')') {
        return Err(malformed());
    }
    let tag = &token[..open];
    if !tag.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        return Err(malformed());
    }
    let spec = registry.get(tag).ok_or_else(|| CompileError::UnknownType {
        command: command.to_string(),
        tag: tag.to_string(),
    })?;

    let inner = &token[open + 1..token.len() - 1];
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        // TAG(x): a single lowercase letter binds a spoken capture
        (Some(letter), None) if letter.is_ascii_lowercase() => {
            if letter_tags.insert(letter, tag.to_string()).is_some() {
                return Err(malformed());
            }
            Ok(ParamSpec::Named {
                letter,
                tag: tag.to_string(),
            })
        }
        // TAG(text): a literal, converted right now
        _ => {
            let value =
                (spec.convert)(inner).map_err(|msg| CompileError::MalformedLiteral {
                    command: command.to_string(),
                    tag: tag.to_string(),
                    text: inner.to_string(),
                    msg,
                })?;
            Ok(ParamSpec::Literal(value))
        }
    }
}

/// Replace vocabulary references with a non-capturing alternation of
/// their (escaped) alternatives.
fn expand_vars(phrase: &str, vocab: &VocabTable) -> Result<String, CompileError> {
    let mut out = String::with_capacity(phrase.len());
    let mut last = 0;
    for m in var_token_re().find_iter(phrase) {
        let alternatives = vocab
            .resolve(m.as_str())
            .ok_or_else(|| CompileError::UndefinedVariable(m.as_str().to_string()))?;
        out.push_str(&phrase[last..m.start()]);
        out.push_str("(?:");
        for (i, alt) in alternatives.iter().enumerate() {
            if i > 0 {
                out.push('|');
            }
            out.push_str(&regex::escape(alt));
        }
        out.push(')');
        last = m.end();
    }
    out.push_str(&phrase[last..]);
    Ok(out)
}

/// Replace `{x}` placeholders with named capture groups built from the
/// parameter's type pattern, recording the group name in the letter ->
/// groups table.
fn expand_placeholders(
    command: &str,
    phrase: &str,
    phrase_index: usize,
    letter_tags: &HashMap<char, String>,
    registry: &TypeRegistry,
    groups: &mut HashMap<char, Vec<String>>,
) -> Result<String, CompileError> {
    let mut out = String::with_capacity(phrase.len());
    let mut last = 0;
    for m in placeholder_re().find_iter(phrase) {
        // The pattern guarantees the shape `{x}` with an ASCII letter
        let letter = m.as_str().as_bytes()[1] as char;
        let tag = letter_tags
            .get(&letter)
            .ok_or_else(|| CompileError::MalformedParameter {
                command: command.to_string(),
                token: m.as_str().to_string(),
            })?;
        // Tag existence was checked when the declaration was parsed.
        let spec = registry.get(tag).ok_or_else(|| CompileError::UnknownType {
            command: command.to_string(),
            tag: tag.to_string(),
        })?;

        let group = format!("{}_{}", letter, phrase_index);
        out.push_str(&phrase[last..m.start()]);
        out.push_str(&format!("(?P<{}>{})", group, spec.pattern));
        groups.entry(letter).or_default().push(group);
        last = m.end();
    }
    out.push_str(&phrase[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarSource;

    fn compile_str(text: &str) -> Result<CompiledGrammar, CompileError> {
        let source = GrammarSource::parse(text).unwrap();
        compile(&source, &TypeRegistry::default())
    }

    #[test]
    fn test_basic_command_matches() {
        let grammar = compile_str(
            r#"
[[command]]
define = "goto_line UINT(x)"
phrases = ["go to line {x}", "line {x}"]
"#,
        )
        .unwrap();
        let cmd = &grammar.commands()[0];
        assert_eq!(cmd.name(), "goto_line");
        let captured = cmd.match_utterance("go to line 42").unwrap();
        assert_eq!(captured[&'x'], "42");
        let captured = cmd.match_utterance("line 7").unwrap();
        assert_eq!(captured[&'x'], "7");
        assert!(cmd.match_utterance("go to line").is_none());
    }

    #[test]
    fn test_match_is_case_insensitive_and_anchored() {
        let grammar = compile_str(
            r#"
[[command]]
define = "goto_line UINT(x)"
phrases = ["go to line {x}"]
"#,
        )
        .unwrap();
        let cmd = &grammar.commands()[0];
        assert!(cmd.match_utterance("GO TO Line 3").is_some());
        // Substring matches do not count
        assert!(cmd.match_utterance("please go to line 3").is_none());
        assert!(cmd.match_utterance("go to line 3 now").is_none());
    }

    #[test]
    fn test_vocabulary_substitution() {
        let grammar = compile_str(
            r#"
[vars]
GOTO = ["go to", "jump to"]

[[command]]
define = "goto_line UINT(x)"
phrases = ["GOTO line {x}"]
"#,
        )
        .unwrap();
        let cmd = &grammar.commands()[0];
        assert!(cmd.match_utterance("go to line 5").is_some());
        assert!(cmd.match_utterance("jump to line 5").is_some());
        assert!(cmd.match_utterance("walk to line 5").is_none());
    }

    #[test]
    fn test_undefined_variable_fails() {
        let err = compile_str(
            r#"
[[command]]
define = "goto_line UINT(x)"
phrases = ["NOWHERE line {x}"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UndefinedVariable(name) if name == "NOWHERE"));
    }

    #[test]
    fn test_unknown_type_tag_fails() {
        let err = compile_str(
            r#"
[[command]]
define = "wait FLOAT(x)"
phrases = ["wait {x} seconds"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnknownType { tag, .. } if tag == "FLOAT"));
    }

    #[test]
    fn test_undeclared_placeholder_fails() {
        let err = compile_str(
            r#"
[[command]]
define = "goto_line UINT(x)"
phrases = ["go to line {y}"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::MalformedParameter { token, .. } if token == "{y}"));
    }

    #[test]
    fn test_malformed_parameter_token_fails() {
        for bad in ["UINT[x]", "UINT(x", "uint(x)", "(x)"] {
            let err = compile_str(&format!(
                "[[command]]\ndefine = \"goto_line {}\"\nphrases = []\n",
                bad
            ))
            .unwrap_err();
            assert!(
                matches!(err, CompileError::MalformedParameter { .. }),
                "expected malformed parameter for `{}`",
                bad
            );
        }
    }

    #[test]
    fn test_duplicate_parameter_letter_fails() {
        let err = compile_str(
            r#"
[[command]]
define = "select_lines UINT(x) UINT(x)"
phrases = []
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::MalformedParameter { .. }));
    }

    #[test]
    fn test_bad_literal_is_a_compile_error() {
        let err = compile_str(
            r#"
[[command]]
define = "goto_line UINT(top)"
phrases = ["go to the top"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::MalformedLiteral { text, .. } if text == "top"));
    }

    #[test]
    fn test_literal_is_preconverted_and_deterministic() {
        for _ in 0..3 {
            let grammar = compile_str(
                r#"
[[command]]
define = "goto_line UINT(1)"
phrases = ["go to the top"]
"#,
            )
            .unwrap();
            let cmd = &grammar.commands()[0];
            assert!(
                matches!(cmd.params(), [ParamSpec::Literal(ArgValue::UInt(1))]),
                "literal must be converted at compile time"
            );
        }
    }

    #[test]
    fn test_zero_parameter_command() {
        let grammar = compile_str(
            r#"
[[command]]
define = "vvc_off"
phrases = ["voice control off"]
"#,
        )
        .unwrap();
        let cmd = &grammar.commands()[0];
        assert!(cmd.params().is_empty());
        assert!(cmd.match_utterance("voice control off").is_some());
    }

    #[test]
    fn test_zero_phrasings_never_match() {
        let grammar = compile_str(
            r#"
[[command]]
define = "ghost"
phrases = []
"#,
        )
        .unwrap();
        let cmd = &grammar.commands()[0];
        assert!(cmd.match_utterance("").is_none());
        assert!(cmd.match_utterance("ghost").is_none());
        assert!(cmd.match_utterance("anything at all").is_none());
    }

    #[test]
    fn test_group_names_unique_across_phrasings() {
        // The same letter reused in several phrasings gets a distinct
        // group per phrasing; the right one is read back after a match.
        let grammar = compile_str(
            r#"
[[command]]
define = "goto_line UINT(x)"
phrases = ["go to line {x}", "line {x}", "{x}th line"]
"#,
        )
        .unwrap();
        let cmd = &grammar.commands()[0];
        for utterance in ["go to line 12", "line 12", "12th line"] {
            let captured = cmd.match_utterance(utterance).unwrap();
            assert_eq!(captured[&'x'], "12", "failed for `{}`", utterance);
        }
    }

    #[test]
    fn test_letters_scoped_per_command() {
        let grammar = compile_str(
            r#"
[[command]]
define = "goto_line UINT(x)"
phrases = ["line {x}"]

[[command]]
define = "open_file PATH(x)"
phrases = ["open {x}"]
"#,
        )
        .unwrap();
        assert_eq!(grammar.len(), 2);
        assert!(grammar.commands()[1].match_utterance("open src main").is_some());
    }
}
