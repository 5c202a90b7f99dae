use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crimescribe::config::{self, Settings, DEFAULT_LAWYERS_PATH, DEFAULT_OFFENSES_PATH};
use crimescribe::offense_matcher::DEFAULT_MIN_SCORE;
use crimescribe::session::{
    LawyerView, OffenseView, Session, NO_LAWYER_MESSAGE, NO_OFFENSE_MESSAGE,
};
use crimescribe::startup::Engine;
use crimescribe::{EmbedderKind, Language, PassthroughTranslator};

#[derive(Parser)]
#[command(name = "crimescribe")]
#[command(about = "Find the IPC offense matching a situation, and a lawyer near you")]
#[command(version)]
struct Cli {
    /// Offense catalog (CSV with IPC Section, Offense, Punishment, Cognizable, Bailable, Court)
    #[arg(long, env = "CRIMESCRIBE_OFFENSES", default_value = DEFAULT_OFFENSES_PATH, global = true)]
    offenses: PathBuf,

    /// Lawyer directory (CSV with Name, Address, Phone No)
    #[arg(long, env = "CRIMESCRIBE_LAWYERS", default_value = DEFAULT_LAWYERS_PATH, global = true)]
    lawyers: PathBuf,

    /// Embedding model: paraphrase-multilingual-minilm-l12-v2, all-minilm-l6-v2,
    /// bge-small-en-v1.5 or hash
    #[arg(
        long,
        env = "CRIMESCRIBE_MODEL",
        default_value_t = EmbedderKind::default(),
        global = true
    )]
    model: EmbedderKind,

    /// Offense matches must score strictly above this
    #[arg(
        long,
        env = "CRIMESCRIBE_MIN_SCORE",
        default_value_t = DEFAULT_MIN_SCORE,
        allow_negative_numbers = true,
        global = true
    )]
    min_score: f32,

    /// Where downloaded models are cached
    #[arg(long, env = "CRIMESCRIBE_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Language of queries and answers (en, hi, es, fr, de, zh-CN, ar, te)
    #[arg(long, default_value_t = Language::English, global = true)]
    lang: Language,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Describe a situation and get the closest IPC offense
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Find a lawyer whose address mentions a location
    Lawyer {
        #[arg(required = true)]
        location: Vec<String>,
    },
    /// Interactive session reading questions from stdin
    Chat,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            offenses_path: self.offenses.clone(),
            lawyers_path: self.lawyers.clone(),
            model: self.model,
            min_score: self.min_score,
            cache_dir: self.cache_dir.clone().or_else(config::default_cache_dir),
            language: self.lang,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "crimescribe=debug" } else { "crimescribe=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_offense(view: Option<&OffenseView>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    match view {
        Some(v) => {
            println!("IPC Section: {}", v.ipc_section);
            println!("Offense:     {}", v.offense);
            println!("Punishment:  {}", v.punishment);
            println!("Cognizable:  {}", v.cognizable);
            println!("Bailable:    {}", v.bailable);
            println!("Court:       {}", v.court);
            println!("Score:       {:.4}", v.score);
        }
        None => println!("{}", NO_OFFENSE_MESSAGE),
    }
    Ok(())
}

fn print_lawyer(view: Option<&LawyerView>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    match view {
        Some(v) => {
            println!("Name:    {}", v.name);
            println!("Address: {}", v.address);
            println!("Phone:   {}", v.phone);
        }
        None => println!("{}", NO_LAWYER_MESSAGE),
    }
    Ok(())
}

fn print_history(session: &Session, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session.history())?);
        return Ok(());
    }
    for entry in session.history().entries() {
        println!("[{}] {}", entry.at.format("%Y-%m-%d %H:%M:%S"), entry.query);
        println!("    {}", serde_json::to_string(&entry.response)?);
    }
    Ok(())
}

/// One line of chat input.
#[derive(Debug, PartialEq)]
enum ChatCommand<'a> {
    Ask(&'a str),
    Lawyer(&'a str),
    Lang(&'a str),
    History,
    Quit,
    Unknown(&'a str),
}

fn parse_chat_line(line: &str) -> ChatCommand<'_> {
    let line = line.trim();
    if !line.starts_with('/') {
        return ChatCommand::Ask(line);
    }

    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match command {
        "/lawyer" => ChatCommand::Lawyer(rest.trim()),
        "/lang" => ChatCommand::Lang(rest.trim()),
        "/history" => ChatCommand::History,
        "/quit" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(command),
    }
}

fn print_banner(session: &Session) {
    println!("Answering in {}.", session.language().label());
    println!(
        "Describe your situation, '/lawyer <location>' to find a lawyer, \
         '/lang <code>' to switch language, '/history' or '/quit'."
    );
}

async fn chat(session: &mut Session, json: bool) -> Result<()> {
    print_banner(session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let outcome = match parse_chat_line(&line) {
            ChatCommand::Quit => break,
            ChatCommand::History => print_history(session, json),
            ChatCommand::Lawyer(location) => session
                .find_lawyer(location)
                .map_err(anyhow::Error::from)
                .and_then(|view| print_lawyer(view.as_ref(), json)),
            ChatCommand::Lang(code) => match code.parse::<Language>() {
                Ok(language) => {
                    session.set_language(language);
                    println!("Answering in {}.", language.label());
                    Ok(())
                }
                Err(e) => Err(anyhow::anyhow!(e)),
            },
            ChatCommand::Unknown(command) => Err(anyhow::anyhow!("Unknown command {}", command)),
            ChatCommand::Ask(question) => session
                .ask(question)
                .map_err(anyhow::Error::from)
                .and_then(|view| print_offense(view.as_ref(), json)),
        };

        if let Err(e) = outcome {
            eprintln!("Error: {:#}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = cli.settings();
    let engine = Engine::load(&settings).await?;
    let mut session = engine.session(Arc::new(PassthroughTranslator), &settings);

    match &cli.command {
        Command::Ask { text } => {
            let view = session.ask(&text.join(" "))?;
            print_offense(view.as_ref(), cli.json)?;
        }
        Command::Lawyer { location } => {
            let view = session.find_lawyer(&location.join(" "))?;
            print_lawyer(view.as_ref(), cli.json)?;
        }
        Command::Chat => {
            engine.warm_up().await?;
            chat(&mut session, cli.json).await?;
        }
    }

    Ok(())
}
