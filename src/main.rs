use clap::{Parser, Subcommand, ValueEnum};
use mailpress::compile::{self, MjmlCli};
use mailpress::config::{self, ProjectConfig};
use mailpress::naming::Layout;
use mailpress::package::RandomBoundaries;
use mailpress::rewrite::Client;
use mailpress::watch::{RebuildCoordinator, WatchSession};
use mailpress::{archive, export, output, scan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mailpress")]
#[command(about = "Build pipeline for MJML email templates")]
#[command(long_about = "\
Build pipeline for MJML email templates

Compiles MJML to HTML, adapts a copy of every document for specific mail
clients, packages Outlook templates and bundles everything into archives.

Project structure:

  project/
  ├── mailpress.toml               # Config (optional)
  ├── src/                         # Templates, flattened into dist/
  │   └── campaigns/spring.mjml    #   → dist/spring.html
  ├── promo/launch.mjml            # Elsewhere: structure kept → dist/promo/launch.html
  ├── components/                  # <mj-include> fragments, never compiled alone
  ├── dist/                        # Compiled HTML
  └── exports/
      ├── html/                    # Generic client copies
      ├── outlook/                 # .oft, .emltpl, -outlook.html, README.md
      └── archives/                # <project>-<date>-<group>.tar.gz + manifest

Run 'mailpress gen-config' to generate a documented mailpress.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ClientArg {
    Html,
    Outlook,
    All,
}

impl ClientArg {
    fn clients(self) -> Vec<Client> {
        match self {
            ClientArg::Html => vec![Client::Html],
            ClientArg::Outlook => vec![Client::Outlook],
            ClientArg::All => Client::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Compile every template into the output directory
    Build {
        /// Exit with status 2 when any template failed to compile
        #[arg(long)]
        strict: bool,
    },
    /// List the templates a build would compile, without compiling
    Check,
    /// Rewrite and package compiled HTML for mail clients
    Export {
        #[arg(long, value_enum, default_value = "all")]
        client: ClientArg,
    },
    /// Bundle outputs and exports into dated archives
    Archive,
    /// Run the full pipeline: build → export → archive
    All,
    /// Rebuild whenever a template changes
    Watch,
    /// Print a stock mailpress.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build { strict } => {
            let config = load(&cli.root)?;
            println!("==> Compiling {}", cli.root.display());
            let run = compile::build(&cli.root, &config, &MjmlCli::new(&config.compiler))?;
            output::print_build_output(&run);
            if strict && run.failed() > 0 {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Check => {
            let config = load(&cli.root)?;
            println!("==> Checking {}", cli.root.display());
            let sources = scan::discover(&cli.root, &config)?;
            output::print_check_output(&sources, &config);
        }
        Command::Export { client } => {
            let config = load(&cli.root)?;
            run_export(&cli.root, &config, &client.clients())?;
        }
        Command::Archive => {
            let config = load(&cli.root)?;
            let report = archive::bundle(&Layout::new(&cli.root, &config), &config)?;
            output::print_archive_output(&report);
        }
        Command::All => {
            let config = load(&cli.root)?;
            println!("==> Stage 1: Compiling {}", cli.root.display());
            let run = compile::build(&cli.root, &config, &MjmlCli::new(&config.compiler))?;
            output::print_build_output(&run);

            println!("==> Stage 2: Exporting");
            run_export(&cli.root, &config, &Client::ALL)?;

            println!("==> Stage 3: Archiving");
            let report = archive::bundle(&Layout::new(&cli.root, &config), &config)?;
            output::print_archive_output(&report);

            println!("==> Pipeline complete: {}", run);
        }
        Command::Watch => run_watch(&cli.root, load(&cli.root)?)?,
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(ExitCode::SUCCESS)
}

/// Load `mailpress.toml` and size the rayon pool from it.
fn load(root: &Path) -> Result<ProjectConfig, config::ConfigError> {
    let config = config::load_config(root)?;
    init_thread_pool(&config.processing);
    Ok(config)
}

fn run_export(root: &Path, config: &ProjectConfig, clients: &[Client]) -> Result<(), Box<dyn std::error::Error>> {
    let layout = Layout::new(root, config);
    for client in clients {
        let report = export::export(&client.profile(config), &layout, &mut RandomBoundaries)?;
        output::print_export_output(&report);
    }
    Ok(())
}

/// Build once, then rebuild on template changes until Ctrl+C.
fn run_watch(root: &Path, config: ProjectConfig) -> Result<(), Box<dyn std::error::Error>> {
    let root = std::fs::canonicalize(root)?;
    let compiler = MjmlCli::new(&config.compiler);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer_root = root.clone();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_watch_event(&event, &printer_root) {
                println!("{}", line);
            }
        }
    });

    let coordinator = RebuildCoordinator::new(&root, config, compiler, tx);
    coordinator.initial_build()?;

    let session = WatchSession::new(coordinator);
    let shutdown = session.shutdown_handle();
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("Cannot install Ctrl+C handler: {e}");
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            log::info!("Interrupted, stopping watcher");
            shutdown.shutdown();
        }
    });

    session.run()?;
    // The session owned the last event sender; the printer drains and exits.
    if printer.join().is_err() {
        log::error!("Output thread panicked");
    }
    Ok(())
}

/// Default level `info`, raised by each `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
