use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use directories::ProjectDirs;
use newsstand_application::Shell;
use newsstand_core::Catalog;
use newsstand_storage::Storage;
use newsstand_ui::Ui;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const USAGE: &str = "\
usage: newsstand [--catalog <catalog.json>] [--library <dir>]

  --catalog <path>   read categories and magazines from a JSON catalog
  --library <dir>    folder that magazine locators resolve against
  --help             show this message

env:
  NEWSSTAND_LOG              log filter (default: info)
  NEWSSTAND_PDFIUM_LIB_PATH  path to the pdfium shared library
";

#[derive(Debug, Default, PartialEq)]
struct Args {
    catalog: Option<PathBuf>,
    library: Option<PathBuf>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--catalog" => {
                let value = args.next().context("--catalog needs a path")?;
                parsed.catalog = Some(PathBuf::from(value));
            }
            "--library" => {
                let value = args.next().context("--library needs a directory")?;
                parsed.library = Some(PathBuf::from(value));
            }
            "-h" | "--help" => parsed.help = true,
            other => anyhow::bail!("unknown argument: {other}\n\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        print!("{USAGE}");
        return Ok(());
    }

    let project_dirs =
        ProjectDirs::from("dev", "newsstand", "newsstand").context("resolve project dirs")?;

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;
    init_tracing(&config_dir.join("newsstand.log"));

    let db_path = config_dir.join("newsstand.db");
    let storage = Storage::open(&db_path)?;
    let mut settings = storage.load_settings()?;

    let cwd = std::env::current_dir().context("get cwd")?;
    if settings.library_root.is_empty() {
        settings.library_root = cwd.to_string_lossy().to_string();
        settings.normalize();
        storage.save_settings(&settings)?;
    }
    let library_root = args
        .library
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.library_root));

    let catalog = load_catalog(args.catalog.as_deref(), config_dir)?;
    tracing::info!(
        categories = catalog.categories.len(),
        documents = catalog.documents.len(),
        library = %library_root.display(),
        "starting"
    );

    let shell = Shell::new(catalog, &settings);
    let ui = Ui::new(shell, settings, &storage, library_root)?;
    let outcome = ui.run()?;
    storage.save_settings(&outcome.settings)?;
    tracing::info!("exiting");

    Ok(())
}

fn load_catalog(explicit: Option<&Path>, config_dir: &Path) -> anyhow::Result<Catalog> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = config_dir.join("catalog.json");
            if !default.is_file() {
                tracing::info!("using built-in catalog");
                return Ok(Catalog::builtin());
            }
            default
        }
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read catalog {}", path.display()))?;
    Catalog::from_json(&raw).with_context(|| format!("parse catalog {}", path.display()))
}

fn init_tracing(log_path: &Path) {
    let filter =
        EnvFilter::try_from_env("NEWSSTAND_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let file = match fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("failed to open log file {}: {err}", log_path.display());
            return;
        }
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_target(true)
            .with_file(true)
            .with_line_number(true),
    );
    let _ = tracing::subscriber::set_global_default(subscriber);
}
