use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use utter::actions::KeystrokeExecutor;
use utter::compile::compile;
use utter::config::Config;
use utter::dispatch::DispatchOutcome;
use utter::grammar::GrammarSource;
use utter::resolve::Resolver;
use utter::session::{Session, normalize_utterance};
use utter::types::TypeRegistry;

#[derive(Parser)]
#[command(name = "utter")]
struct Cli {
    /// Path to the grammar file (overrides config.toml)
    #[arg(short, long)]
    grammar: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the grammar and list the commands it defines
    Check,
    /// Resolve and dispatch a single utterance
    Say {
        /// The utterance, as transcribed
        utterance: Vec<String>,
    },
    /// Interactive loop reading utterances from stdin (default)
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    let grammar_path = cli
        .grammar
        .unwrap_or_else(|| PathBuf::from(&config.grammar_path));
    let source = GrammarSource::load(&grammar_path)?;
    let registry = TypeRegistry::default();
    // Compile errors are fatal: a grammar that fails to compile must
    // not be used.
    let grammar = compile(&source, &registry)
        .with_context(|| format!("grammar {} does not compile", grammar_path.display()))?;

    match cli.command {
        Some(Command::Check) => {
            println!("{} commands", grammar.len());
            for cmd in grammar.commands() {
                println!("  {} ({} args)", cmd.name(), cmd.params().len());
                println!("    {}", cmd.pattern_str());
            }
            Ok(())
        }
        Some(Command::Say { utterance }) => {
            let text = utterance.join(" ");
            let resolver = Resolver::new(grammar, registry);
            let mut session = Session::new(resolver, KeystrokeExecutor::new(io::stdout()))
                .with_echo(config.session.echo);
            match session.dispatch_one(normalize_utterance(&text))? {
                DispatchOutcome::Done => Ok(()),
                DispatchOutcome::TerminateSession => {
                    eprintln!("Voice control off.");
                    Ok(())
                }
            }
        }
        Some(Command::Run) | None => {
            let resolver = Resolver::new(grammar, registry);
            let mut session = Session::new(resolver, KeystrokeExecutor::new(io::stdout()))
                .with_echo(config.session.echo);
            let stdin = io::stdin();
            session.run(stdin.lock(), &config.session.prompt)
        }
    }
}
