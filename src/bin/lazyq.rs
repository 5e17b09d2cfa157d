//! CLI binary for lazyq.
//!
//! `generate` runs one quiz non-interactively; `shell` (the default) drives a
//! [`Session`] from stdin; `setup` stores the API key; `--selftest` sends a
//! fixed request and reports through the exit code.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lazyq::driver::Driver;
use lazyq::session::{Event, Notice, NoticeLevel, ResultView, Screen, Session};
use lazyq::{
    generate_from_files, selftest, write_result, CompletionClient, GenerationConfig,
    GenerationProgressCallback, ProgressCallback, ProviderCredential, QuestionStyle,
    PreferencesStore, API_KEY_GUIDE, DEFAULT_MODEL,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while sources load and the request is in flight.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Caricamento");
        bar.set_message("lettura dei file…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl CliProgressCallback {
    /// Remove the spinner if no request event has finished it yet.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_source_loaded(&self, label: &str) {
        self.bar.println(format!("  {} {}", green("✓"), label));
    }

    fn on_request_start(&self, text_chars: usize, image_parts: usize) {
        self.bar.set_prefix("Generazione");
        self.bar.set_message(format!(
            "{} caratteri, {} immagini",
            text_chars, image_parts
        ));
    }

    fn on_request_complete(&self, reply_len: usize, elapsed_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} risposta ricevuta  {}",
            green("✔"),
            dim(&format!("{reply_len} caratteri, {:.1}s", elapsed_ms as f64 / 1000.0))
        );
    }

    fn on_request_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Store the OpenRouter key and preferred model
  lazyq setup --api-key sk-or-v1-... --model openai/gpt-4o

  # Ten standard questions from a PDF
  lazyq generate lecture.pdf

  # True/false questions from a PDF and a photo, answers included, saved
  lazyq generate -n 20 --style true-false notes.pdf board.jpg --show-answers -o quiz.txt

  # Interactive session
  lazyq

  # Smoke test against the live API (exit 0 ok, 1 no key, 2 request failed)
  OPENROUTER_API_KEY=sk-or-v1-... lazyq --selftest

QUESTION STYLES:
  none               Standard (default)
  true-false         Vero o Falso
  sequential         Sequenziale
  complex            Complicate
  dates-and-numbers  Date e numeri

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY  API key (takes precedence over the stored one)
  LAZYQ_MODEL         Model ID (e.g. openai/gpt-4o, anthropic/claude-3.5-sonnet)
  LAZYQ_ENDPOINT      Chat-completions URL
  LAZYQ_TIMEOUT       Request timeout in seconds
  LAZYQ_CONFIG_DIR    Directory holding preferences.json
  PDFIUM_LIB_PATH     Path to libpdfium for PDF text extraction

NOTES:
  Generated answers are a study aid and can be incomplete or wrong; check
  them against the material. Every generation uses OpenRouter credit.
"#;

/// Generate study quizzes from PDFs and images with OpenRouter models.
#[derive(Parser, Debug)]
#[command(
    name = "lazyq",
    version,
    about = "Generate study quizzes (questions + answer key) from PDFs and images",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Send a fixed five-question request and exit (0 ok, 1 no key, 2 failed).
    #[arg(long)]
    selftest: bool,

    /// Chat-completions endpoint.
    #[arg(long, global = true, env = "LAZYQ_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "LAZYQ_TIMEOUT", default_value_t = 90)]
    timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LAZYQ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "LAZYQ_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the OpenRouter API key and model.
    Setup {
        /// API key; prompted for when omitted.
        #[arg(long)]
        api_key: Option<String>,

        /// Model ID; prompted for when omitted.
        #[arg(long)]
        model: Option<String>,

        /// Print how to obtain an OpenRouter key and exit.
        #[arg(long)]
        guide: bool,
    },

    /// Generate one quiz from the given files.
    Generate {
        /// PDF, PNG, JPG or JPEG files, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of questions (1–100).
        #[arg(short = 'n', long, default_value_t = 10)]
        count: i64,

        /// Question style.
        #[arg(long, default_value = "none")]
        style: QuestionStyle,

        /// Model ID (overrides the stored one).
        #[arg(long, env = "LAZYQ_MODEL")]
        model: Option<String>,

        /// Also write questions and answers to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the answers after the questions.
        #[arg(long)]
        show_answers: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Disable the spinner.
        #[arg(long, env = "LAZYQ_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Interactive session (default).
    Shell,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would interleave with the spinner and the shell
    // prompt, so they are only shown with --verbose.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    if cli.selftest {
        return Ok(run_selftest(&cli).await);
    }

    match cli.command {
        Some(Command::Setup { guide: true, .. }) => {
            println!("{API_KEY_GUIDE}");
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Setup {
            ref api_key,
            ref model,
            ..
        }) => run_setup(api_key.clone(), model.clone()).map(|_| ExitCode::SUCCESS),
        Some(Command::Generate {
            ref files,
            count,
            style,
            ref model,
            ref output,
            show_answers,
            json,
            no_progress,
        }) => {
            let spinner = (!cli.quiet && !json && !no_progress).then(CliProgressCallback::new);
            let progress: Option<ProgressCallback> = spinner
                .clone()
                .map(|s| s as Arc<dyn GenerationProgressCallback>);
            let config = build_config(&cli, progress)?;
            let credential = resolve_credential(model.as_deref())?;
            let result =
                generate_from_files(files.as_slice(), &credential, count, style, &config).await;
            // Validation and loading failures happen before any request event.
            if let Some(ref s) = spinner {
                s.clear();
            }
            let result = result.context("Generation failed")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("Failed to serialise result")?
                );
            } else {
                println!("{}", result.questions_with_footer());
                if show_answers {
                    println!("\n{}\n\n{}", bold("RISPOSTE"), result.answers_or_placeholder());
                }
            }

            if let Some(path) = output {
                write_result(path, &result)
                    .await
                    .with_context(|| format!("Failed to save to {}", path.display()))?;
                if !cli.quiet {
                    eprintln!("{} salvato in {}", green("✔"), bold(&path.display().to_string()));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Shell) | None => run_shell(&cli).await.map(|_| ExitCode::SUCCESS),
    }
}

/// Map CLI flags to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder().timeout_secs(cli.timeout);
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

/// Environment key first, then the stored preferences.
fn resolve_credential(model_override: Option<&str>) -> Result<ProviderCredential> {
    let stored = PreferencesStore::default_location()
        .load()
        .context("Failed to read preferences")?;
    let api_key = std::env::var("OPENROUTER_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .unwrap_or(stored.api_key.clone());
    let model = model_override
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| stored.model_or_default());
    Ok(ProviderCredential::new(api_key, model))
}

async fn run_selftest(cli: &Cli) -> ExitCode {
    let key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();
    if key.trim().is_empty() {
        eprintln!("OPENROUTER_API_KEY not set");
        return ExitCode::from(1);
    }
    let config = match build_config(cli, None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::from(2);
        }
    };
    match selftest(&key, &config).await {
        Ok(result) => {
            println!("{}", result.raw_reply);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Errore: {e}");
            ExitCode::from(2)
        }
    }
}

fn run_setup(api_key: Option<String>, model: Option<String>) -> Result<()> {
    let store = PreferencesStore::default_location();
    let stored = store.load().unwrap_or_default();

    let api_key = match api_key {
        Some(k) => k,
        None => {
            eprintln!(
                "{}",
                dim("Non hai una chiave? Esegui 'lazyq setup --guide' per le istruzioni.")
            );
            prompt_line("Chiave API OpenRouter (sk-or-v1-...): ")?
        }
    };
    let model = match model {
        Some(m) => m,
        None => prompt_line(&format!("Modello [{}]: ", stored.model_or_default()))?,
    };
    let model = if model.trim().is_empty() {
        stored.model_or_default().to_string()
    } else {
        model
    };

    let credential = ProviderCredential::new(api_key, model);
    if !credential.has_key() {
        anyhow::bail!("Inserisci una chiave API di OpenRouter valida.");
    }
    store
        .save_credential(&credential)
        .context("Failed to save preferences")?;
    eprintln!(
        "{} salvato in {}  (modello {})",
        green("✔"),
        bold(&store.path().display().to_string()),
        credential.model
    );
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

// ── Interactive shell ────────────────────────────────────────────────────────

const SHELL_HELP: &str = "\
Comandi:
  add <file>...       aggiungi PDF o immagini
  files               elenca i file aggiunti
  count <n>           numero di domande (1-100)
  model <id>          modello OpenRouter
  style <nome>        none | true-false | sequential | complex | dates-and-numbers
  generate            genera le domande
  answers             mostra/nascondi le risposte
  save [file]         salva domande e risposte (default domande_risposte.txt)
  clear               rimuovi file e risultato
  key <chiave> [mod]  imposta la chiave API (e il modello)
  guide               come ottenere la chiave API
  status              parametri correnti
  help                questo aiuto
  quit                esci";

/// One parsed shell line.
#[derive(Debug)]
enum ShellCommand {
    Events(Vec<Event>),
    Files,
    Status,
    Guide,
    Help,
    Quit,
    Nothing,
}

fn parse_command(line: &str) -> std::result::Result<ShellCommand, String> {
    let line = line.trim();
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    let one = |e: Event| Ok(ShellCommand::Events(vec![e]));
    match cmd.to_lowercase().as_str() {
        "" => Ok(ShellCommand::Nothing),
        "add" if rest.is_empty() => Err("uso: add <file>...".into()),
        "add" => Ok(ShellCommand::Events(
            rest.split_whitespace()
                .map(|p| Event::AddFile(PathBuf::from(p)))
                .collect(),
        )),
        "files" | "ls" => Ok(ShellCommand::Files),
        "count" | "n" => one(Event::SetQuestionCount(rest.to_string())),
        "model" => one(Event::SetModel(rest.to_string())),
        "style" => rest
            .parse::<QuestionStyle>()
            .map(|s| ShellCommand::Events(vec![Event::SetStyle(s)])),
        "generate" | "gen" | "g" => one(Event::Generate),
        "answers" | "a" => one(Event::ToggleAnswers),
        "save" => one(Event::Save((!rest.is_empty()).then(|| PathBuf::from(rest)))),
        "clear" => one(Event::Clear),
        "key" => {
            let mut parts = rest.split_whitespace();
            let api_key = parts.next().unwrap_or_default().to_string();
            let model = parts.next().unwrap_or_default().to_string();
            one(Event::SaveCredentials { api_key, model })
        }
        "settings" => one(Event::OpenSettings),
        "status" => Ok(ShellCommand::Status),
        "guide" | "guida" => Ok(ShellCommand::Guide),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
        other => Err(format!("comando sconosciuto '{other}' (help per l'elenco)")),
    }
}

async fn run_shell(cli: &Cli) -> Result<()> {
    let store = PreferencesStore::default_location();
    let prefs = store.load().unwrap_or_else(|e| {
        eprintln!("{} {}", red("✘"), e);
        Default::default()
    });
    let config = build_config(cli, None)?;
    let client = CompletionClient::from_config(&config).context("Failed to create HTTP client")?;
    let (driver, mut events) = Driver::new(config, client, store);
    let mut session = Session::new(&prefs);

    println!("{}", bold("LazyQ"));
    println!("Aggiungi PDF e/o immagini, scegli il modello e il numero di domande, poi genera.");
    println!("{}", dim("Si consiglia di usare PDF. Digita 'help' per i comandi."));
    dispatch(&mut session, &driver, Event::Continue).await;
    if session.screen() == Screen::Credentials {
        println!(
            "Nessuna chiave API salvata. Usa {} per impostarla ({} per le istruzioni).",
            cyan("key <sk-or-v1-...> [modello]"),
            cyan("guide")
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&session);
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(ShellCommand::Events(evs)) => {
                        for ev in evs {
                            dispatch(&mut session, &driver, ev).await;
                        }
                    }
                    Ok(ShellCommand::Files) => print_files(&session),
                    Ok(ShellCommand::Status) => print_status(&session),
                    Ok(ShellCommand::Guide) => println!("{API_KEY_GUIDE}"),
                    Ok(ShellCommand::Help) => println!("{SHELL_HELP}"),
                    Ok(ShellCommand::Quit) => break,
                    Ok(ShellCommand::Nothing) => {}
                    Err(msg) => println!("{} {}", red("✘"), msg),
                }
            }
            Some(ev) = events.recv() => {
                dispatch(&mut session, &driver, ev).await;
            }
        }
    }
    Ok(())
}

/// Apply one event, run its effect and print what changed.
async fn dispatch(session: &mut Session, driver: &Driver, event: Event) {
    let kind = EventKind::of(&event);
    if let Some(effect) = session.update(event) {
        if let Some(notice) = driver.execute(effect).await {
            print_notice(&notice);
        }
    }
    match kind {
        EventKind::Loaded => {
            if let Some(file) = session.files().last() {
                println!("\n  {} {}", green("✓"), file.label);
            }
        }
        EventKind::Started => {
            if session.is_generating() {
                println!("{}", dim(&session.questions_text()));
            }
        }
        EventKind::Finished => println!("\n{}\n", session.questions_text()),
        EventKind::Answers => {
            if let ResultView::Ready { answers_visible, .. } = session.result() {
                match session.visible_answers() {
                    Some(answers) => println!("\n{}\n{}\n", bold("RISPOSTE"), answers),
                    None if !answers_visible => println!("{}", dim("Risposte nascoste.")),
                    None => {}
                }
            }
        }
        EventKind::Other => {}
    }
}

enum EventKind {
    Loaded,
    Started,
    Finished,
    Answers,
    Other,
}

impl EventKind {
    fn of(event: &Event) -> Self {
        match event {
            Event::FileLoaded(_) => EventKind::Loaded,
            Event::Generate => EventKind::Started,
            Event::JobFinished(_) => EventKind::Finished,
            Event::ToggleAnswers => EventKind::Answers,
            _ => EventKind::Other,
        }
    }
}

fn print_prompt(session: &Session) {
    let marker = if session.is_generating() {
        cyan("…")
    } else {
        String::new()
    };
    print!("lazyq{marker}> ");
    io::stdout().flush().ok();
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => println!("{} {}", cyan(&format!("{}:", notice.title)), notice.message),
        NoticeLevel::Error => println!("{} {}", red(&format!("{}:", notice.title)), notice.message),
    }
}

fn print_files(session: &Session) {
    if session.files().is_empty() {
        println!("Nessun file selezionato.");
        return;
    }
    for (i, f) in session.files().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, f.label);
    }
}

fn print_status(session: &Session) {
    let model = match session.model_input().trim() {
        "" => DEFAULT_MODEL,
        m => m,
    };
    println!("Modello:            {model}");
    println!("Numero di domande:  {}", session.count_input());
    println!("Stile:              {}", session.style().label());
    println!("File:               {}", session.files().len());
    println!(
        "Chiave API:         {}",
        if session.credential().has_key() {
            green("impostata")
        } else {
            red("mancante")
        }
    );
    if session.is_generating() {
        println!("{}", dim("Generazione in corso…"));
    }
}
