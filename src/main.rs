//! CLI entry point for `msgreader`.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use humansize::{format_size, BINARY};

use msgreader::config::{self, Config};
use msgreader::i18n;
use msgreader::launch::{launch, SystemLauncher};
use msgreader::scratch::ScratchDirectory;
use msgreader::session::{DisplayPayload, Reply, Session, SessionSettings, Upload};

#[derive(Parser)]
#[command(name = "msgreader", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// .msg file to open
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Language (en, fr). Defaults to config, then system locale.
    #[arg(long, value_name = "LANG", global = true)]
    lang: Option<String>,

    /// Scratch folder, wiped on every load
    #[arg(long, value_name = "DIR", global = true, env = "MSGREADER_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a .msg file and show its content
    Open {
        path: PathBuf,
        /// Print the display payload as JSON
        #[arg(long)]
        json: bool,
        /// Open the rendered body in the default browser
        #[arg(long)]
        view: bool,
    },
    /// Export a .msg file to .eml
    Export {
        path: PathBuf,
        /// Do not open the .eml after writing it
        #[arg(long)]
        no_open: bool,
    },
    /// Serve the JSON-lines command protocol on stdin/stdout
    Serve,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Language from `--lang` in the raw args, then config, then the environment.
///
/// Runs before clap so `--help` is localized.
fn detect_lang_early(config: &Config) -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    for (i, arg) in args.iter().enumerate() {
        let code = match arg.strip_prefix("--lang=") {
            Some(code) => Some(code),
            None if arg == "--lang" => args.get(i + 1).map(String::as_str),
            None => None,
        };
        if let Some(lang) = code.and_then(i18n::Lang::from_code) {
            return lang;
        }
    }
    config
        .general
        .lang
        .as_deref()
        .and_then(i18n::Lang::from_code)
        .unwrap_or_else(i18n::detect_system_lang)
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command()
        .about(i18n::app_about())
        .long_about(i18n::app_long_about());

    let subcommands: Vec<clap::Command> = cmd
        .get_subcommands()
        .map(|sub| {
            let about = match sub.get_name() {
                "open" => Some(i18n::help_cmd_open()),
                "export" => Some(i18n::help_cmd_export()),
                "serve" => Some(i18n::help_cmd_serve()),
                "completions" => Some(i18n::help_cmd_completions()),
                "manpage" => Some(i18n::help_cmd_manpage()),
                _ => None,
            };
            match about {
                Some(about) => sub.clone().about(about),
                None => sub.clone(),
            }
        })
        .collect();

    for sub in subcommands {
        cmd = cmd.mut_subcommand(sub.get_name(), |_| sub.clone());
    }

    cmd
}

fn main() -> anyhow::Result<()> {
    let mut config = config::load_config();

    i18n::set_lang(detect_lang_early(&config));

    let matches = build_localized_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    if let Some(dir) = cli.scratch_dir.clone() {
        config.scratch.dir = Some(dir);
    }

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);
    tracing::debug!(lang = i18n::lang().code(), "Starting msgreader");

    match cli.command {
        Some(Commands::Open { path, json, view }) => cmd_open(&path, json, view, &config),
        None => match cli.file {
            Some(path) => cmd_open(&path, false, false, &config),
            None => {
                build_localized_command().print_help()?;
                Ok(())
            }
        },
        Some(Commands::Export { path, no_open }) => cmd_export(&path, no_open, &config),
        Some(Commands::Serve) => cmd_serve(&config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Log to stderr, and to the log file when its directory can be created.
///
/// Logs go to stderr so `serve` keeps stdout for replies.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_file = config::log_file_path(config);
    let file_layer = log_file
        .parent()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .zip(log_file.file_name())
        .map(|(dir, name)| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(tracing_appender::rolling::never(dir, name))
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

/// Load `path` and print its headers, or the JSON reply with `--json`.
fn cmd_open(path: &Path, json: bool, view: bool, config: &Config) -> anyhow::Result<()> {
    let mut session = Session::from_config(config);
    let result = Upload::from_path(path).and_then(|upload| session.load(Some(upload)));

    if json {
        println!("{}", Reply::from(result).to_json());
        return Ok(());
    }

    let payload = result.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print_payload(&payload, &session);

    if view {
        let preview = write_preview(&payload, session.scratch())?;
        launch(session.launcher(), &preview).map_err(|e| anyhow::anyhow!(e.user_message()))?;
        println!("  {:<16} {}", i18n::cli_preview(), preview.display());
    }
    Ok(())
}

/// Load `path` and write it to `.eml` in the scratch folder.
fn cmd_export(path: &Path, no_open: bool, config: &Config) -> anyhow::Result<()> {
    let mut settings = SessionSettings::from_config(config);
    if no_open {
        settings.open_after_export = false;
    }
    let mut session = Session::new(
        ScratchDirectory::new(config::scratch_dir(config)),
        SystemLauncher::new(config.launcher.command.clone()),
        settings,
    );

    let exported = Upload::from_path(path)
        .and_then(|upload| session.load(Some(upload)))
        .and_then(|_| session.export_to_eml())
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("  {:<16} {}", i18n::cli_exported_to(), exported.path.display());
    Ok(())
}

/// Answer one JSON request per stdin line until EOF.
fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let mut session = Session::from_config(config);
    tracing::info!(scratch = %session.scratch().path().display(), "Serving commands on stdin");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(stdout, "{}", session.handle_line(&line))?;
        stdout.flush()?;
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "msgreader", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

fn print_payload(payload: &DisplayPayload, session: &Session) {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();

    println!();
    println!("  {:<16} {}", i18n::cli_subject(), field(&payload.subject));
    println!("  {:<16} {}", i18n::cli_from(), field(&payload.from));
    println!("  {:<16} {}", i18n::cli_to(), field(&payload.to));
    if payload.cc.is_some() {
        println!("  {:<16} {}", i18n::cli_cc(), field(&payload.cc));
    }
    println!("  {:<16} {}", i18n::cli_date(), field(&payload.date));

    let saved = session
        .loaded()
        .map(|l| l.attachments.as_slice())
        .unwrap_or_default();
    if saved.is_empty() {
        println!("  {:<16} {}", i18n::cli_attachments(), i18n::cli_no_attachments());
    } else {
        println!("  {:<16} {}", i18n::cli_attachments(), saved.len());
        for attachment in saved {
            println!(
                "    {:<40} {:>10}",
                attachment.filename,
                format_size(attachment.size, BINARY)
            );
        }
    }
    println!(
        "  {:<16} {}",
        i18n::cli_scratch(),
        session.scratch().path().display()
    );
    println!();
}

/// Write the rendered body as a standalone HTML page in the scratch folder.
fn write_preview(payload: &DisplayPayload, scratch: &ScratchDirectory) -> anyhow::Result<PathBuf> {
    let title = payload.subject.as_deref().unwrap_or(i18n::app_name());
    let page = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body></html>\n",
        html_escape::encode_text(title),
        payload.body
    );
    Ok(scratch.write_unique("preview.html", page.as_bytes())?)
}
