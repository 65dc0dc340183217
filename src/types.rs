//! Argument type registry - maps grammar type tags to a match pattern
//! and a converter from captured text to a typed value.
//!
//! Converters run twice in a command's life: at compile time for
//! literal parameters, and at resolve time for spoken ones.

use std::collections::HashMap;
use std::fmt;

/// A typed argument value produced by a converter.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    UInt(u64),
    Int(i64),
    Text(String),
    Register(char),
}

impl ArgValue {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            ArgValue::UInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_register(&self) -> Option<char> {
        match self {
            ArgValue::Register(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::UInt(n) => write!(f, "{}", n),
            ArgValue::Int(n) => write!(f, "{}", n),
            ArgValue::Text(s) => write!(f, "{}", s),
            ArgValue::Register(r) => write!(f, "\"{}", r),
        }
    }
}

/// Conversion from captured text to a typed value. The error is a
/// plain message; callers wrap it into their own error taxonomy.
pub type Converter = fn(&str) -> Result<ArgValue, String>;

/// Pattern fragment plus converter for one type tag.
pub struct TypeSpec {
    /// Regex fragment the tag matches in an utterance.
    pub pattern: &'static str,
    pub convert: Converter,
}

/// Lookup table from type tag to its spec. Built once, read-only.
pub struct TypeRegistry {
    specs: HashMap<&'static str, TypeSpec>,
}

impl TypeRegistry {
    pub fn get(&self, tag: &str) -> Option<&TypeSpec> {
        self.specs.get(tag)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut specs = HashMap::new();
        specs.insert(
            "UINT",
            TypeSpec {
                pattern: r"\d+",
                convert: convert_uint,
            },
        );
        specs.insert(
            "INT",
            TypeSpec {
                pattern: r"-?\d+",
                convert: convert_int,
            },
        );
        specs.insert(
            "ID",
            TypeSpec {
                pattern: ".+",
                convert: convert_id,
            },
        );
        specs.insert(
            "PATH",
            TypeSpec {
                pattern: ".+",
                convert: convert_path,
            },
        );
        specs.insert(
            "REG",
            TypeSpec {
                pattern: ".+",
                convert: convert_register,
            },
        );
        Self { specs }
    }
}

fn convert_uint(text: &str) -> Result<ArgValue, String> {
    text.parse::<u64>()
        .map(ArgValue::UInt)
        .map_err(|e| e.to_string())
}

fn convert_int(text: &str) -> Result<ArgValue, String> {
    text.parse::<i64>()
        .map(ArgValue::Int)
        .map_err(|e| e.to_string())
}

/// Spoken identifiers use underscores where the speaker paused:
/// "read me" becomes "read_me".
fn convert_id(text: &str) -> Result<ArgValue, String> {
    Ok(ArgValue::Text(
        text.split_whitespace().collect::<Vec<_>>().join("_"),
    ))
}

/// Spoken paths use slashes: "src main" becomes "src/main".
fn convert_path(text: &str) -> Result<ArgValue, String> {
    Ok(ArgValue::Text(
        text.split_whitespace().collect::<Vec<_>>().join("/"),
    ))
}

/// Spoken names for vim registers. Anything not listed falls back to
/// the first character of the spoken text, so "register x" works.
const REGISTER_ALIASES: &[(&str, char)] = &[
    ("main", '"'),
    ("unnamed", '"'),
    ("insert", '.'),
    ("file", '%'),
    ("path", '%'),
    ("current file", '%'),
    ("current path", '%'),
    ("command", ':'),
    ("command line", ':'),
    ("last command", ':'),
    ("last command line", ':'),
    ("alternate file", '#'),
    ("alternate buffer", '#'),
    ("expression", '='),
    ("last expression", '='),
    ("search", '/'),
    ("last search", '/'),
    ("delete", '-'),
    ("small delete", '-'),
    ("selection", '*'),
    ("clipboard", '+'),
    ("black hole", '_'),
    ("void", '_'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("first", '1'),
    ("second", '2'),
    ("third", '3'),
    ("fourth", '4'),
    ("fifth", '5'),
    ("sixth", '6'),
    ("seventh", '7'),
    ("eighth", '8'),
    ("ninth", '9'),
];

fn convert_register(text: &str) -> Result<ArgValue, String> {
    let spoken = text.trim().to_lowercase();
    for (alias, reg) in REGISTER_ALIASES {
        if *alias == spoken {
            return Ok(ArgValue::Register(*reg));
        }
    }
    spoken
        .chars()
        .next()
        .map(ArgValue::Register)
        .ok_or_else(|| "empty register name".to_string())
}
