//! CLI entry point for the translation bridge.
//!
//! # Usage
//!
//! ```bash
//! # One-shot translation
//! translate-bridge translate "你好，世界"
//!
//! # Check whether text would trigger a translation
//! translate-bridge detect "hello 你好"
//!
//! # Drive a session from stdin against a headless page
//! translate-bridge interactive
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use translate_bridge::host::memory::{MemoryPage, NodeSpec};
use translate_bridge::translation::run_translation;
use translate_bridge::{
    contains_source_language, Config, EngineId, EngineRouter, FileStore, HostPage, MemoryStore,
    NodeId, SelectionStore, Session, SessionHandle, TranslationRequest, TranslationResult, UiEvent,
};

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Translate(String),
    Detect(String),
    Interactive,
    Help,
    Version,
}

#[derive(Debug)]
struct Options {
    config_path: Option<PathBuf>,
    engine: Option<EngineId>,
    command: Command,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config_path: None,
        engine: None,
        command: Command::Help,
    };
    let mut positional = Vec::new();
    let mut info_flag = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => info_flag = Some(Command::Help),
            "--version" | "-v" => info_flag = Some(Command::Version),
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).ok_or("--config requires a path")?;
                options.config_path = Some(PathBuf::from(path));
            }
            "--engine" | "-e" => {
                i += 1;
                let name = args.get(i).ok_or("--engine requires google or deepl")?;
                options.engine = Some(name.parse()?);
            }
            arg if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("Unknown argument: {}", arg));
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    if let Some(command) = info_flag {
        options.command = command;
        return Ok(options);
    }

    let mut positional = positional.into_iter();
    options.command = match positional.next().as_deref() {
        None => options.command,
        Some("translate") => {
            let text: Vec<String> = positional.collect();
            if text.is_empty() {
                return Err("translate requires the text to translate".into());
            }
            Command::Translate(text.join(" "))
        }
        Some("detect") => {
            let text: Vec<String> = positional.collect();
            if text.is_empty() {
                return Err("detect requires some text".into());
            }
            Command::Detect(text.join(" "))
        }
        Some("interactive") => Command::Interactive,
        Some(other) => return Err(format!("Unknown command: {}", other)),
    };
    Ok(options)
}

fn print_help() {
    println!(
        r#"translate-bridge - Debounced Chinese to English translation bridge

USAGE:
    translate-bridge [OPTIONS] <COMMAND>

COMMANDS:
    translate <TEXT>        Translate TEXT once and print the result
    detect <TEXT>           Report whether TEXT contains Chinese (JSON)
    interactive             Type into the panel from stdin

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version
    -c, --config <PATH>     Path to configuration file
    -e, --engine <ENGINE>   Translation engine: google (default) or deepl

INTERACTIVE COMMANDS:
    /translate              Translate the panel input now
    /fill                   Translate and write into the target input
    /auto                   Toggle auto mode
    /engine <ENGINE>        Switch engine
    /target                 Print the target input's content
    /quit                   Save the selection and exit
    anything else           Replaces the panel input (debounced)

ENVIRONMENT:
    RUST_LOG                Log filter, overrides [general] log_level
"#
    );
}

fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information.");
            std::process::exit(1);
        }
    };

    match options.command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("translate-bridge v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let mut config = match &options.config_path {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    init_logging(&config);
    if let Some(engine) = options.engine {
        config.translation.engine = engine;
    }

    match options.command {
        Command::Translate(text) => translate_once(&config, &text).await,
        Command::Detect(text) => {
            let output = serde_json::json!({
                "text": text,
                "contains_source_language": contains_source_language(&text),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Command::Interactive => interactive(config).await,
        Command::Help | Command::Version => Ok(()),
    }
}

async fn translate_once(config: &Config, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let router = EngineRouter::from_config(&config.translation)?;
    let Some(request) = TranslationRequest::new(text, config.translation.engine) else {
        eprintln!("Please enter text to translate");
        std::process::exit(1);
    };

    match run_translation(&router, &request).await {
        TranslationResult::Translated(t) if t.is_empty() => {
            eprintln!("Translation result is empty");
        }
        TranslationResult::Translated(t) => println!("{}", t),
        TranslationResult::Failed(reason) => {
            eprintln!("Translation error: {}", reason);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Run a session against a headless page holding one reply box
async fn interactive(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let page = Arc::new(MemoryPage::new("localhost"));
    let reply_box = page.append(page.body(), NodeSpec::new("textarea").id("reply"));

    let backend = Arc::new(EngineRouter::from_config(&config.translation)?);
    let store: Arc<dyn SelectionStore> = if config.persistence.enabled {
        Arc::new(FileStore::new(config.persistence.resolved_store_path()))
    } else {
        Arc::new(MemoryStore::new())
    };

    let host: Arc<dyn HostPage> = page.clone();
    let (handle, mut ui_rx, task) = Session::spawn(config, host, backend, store);
    page.connect(handle.host_sender());

    tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            print_ui_event(&event);
        }
    });

    if !handle.restore_last_selection().await? {
        handle.enter_selection_mode().await?;
        page.click(reply_box);
    }

    println!("Type Chinese text; /quit to exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !run_line(&handle, &page, reply_box, &line).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    info!("Shutting down");
    handle.shutdown().await?;
    task.await?;
    Ok(())
}

/// Returns `false` when the user asked to quit
async fn run_line(
    handle: &SessionHandle,
    page: &MemoryPage,
    reply_box: NodeId,
    line: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut parts = line.trim().splitn(2, ' ');
    match parts.next().unwrap_or("") {
        "/quit" | "/exit" => return Ok(false),
        "/translate" => {
            handle.translate().await?;
        }
        "/fill" => {
            handle.fill_translation_to_target_input().await?;
        }
        "/auto" => {
            handle.toggle_auto_mode().await?;
        }
        "/engine" => match parts.next().unwrap_or("").parse::<EngineId>() {
            Ok(engine) => handle.set_engine(engine).await?,
            Err(e) => eprintln!("{}", e),
        },
        "/target" => println!("[target] {}", page.value(reply_box).unwrap_or_default()),
        _ => handle.set_local_input(line).await?,
    }
    Ok(true)
}

fn print_ui_event(event: &UiEvent) {
    match event {
        UiEvent::Status(message) => println!("[status] {}", message),
        UiEvent::Output(text) => println!("[output] {}", text),
        UiEvent::Countdown {
            remaining_seconds: Some(seconds),
            ..
        } => println!("[waiting] {}s", seconds),
        UiEvent::Countdown { .. } => {}
        UiEvent::LocalInput(text) => println!("[input] {}", text),
        UiEvent::AutoMode(on) => println!("[auto] {}", if *on { "on" } else { "off" }),
        UiEvent::SelectionMode(_) => {}
        UiEvent::TargetChanged(Some(descriptor)) => println!("[target] {}", descriptor.label()),
        UiEvent::TargetChanged(None) => println!("[target] none"),
        UiEvent::EngineChanged(engine) => println!("[engine] {}", engine),
    }
}
