use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Grammar file with command phrasings and vocabulary variables
    #[serde(default = "default_grammar_path")]
    pub grammar_path: String,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grammar_path: default_grammar_path(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Prompt shown before each utterance in interactive mode
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Echo each resolved command before dispatching it
    #[serde(default = "default_echo")]
    pub echo: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            echo: default_echo(),
        }
    }
}

fn default_grammar_path() -> String {
    "grammar.toml".into()
}

fn default_prompt() -> String {
    "listening> ".into()
}

fn default_echo() -> bool {
    true
}

impl Config {
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if !path.exists() {
            return Config::default();
        }
        match fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: ignoring bad config.toml: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: cannot read config.toml: {}", e);
                Config::default()
            }
        }
    }
}
