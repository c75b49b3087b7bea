use std::path::PathBuf;

use anyhow::Context as _;
use engine::{DocumentRenderer, Engine};
use newsstand_core::{DEFAULT_SCALE, clamp_scale};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut pdf_path: Option<PathBuf> = None;
    let mut page_number: u32 = 1;
    let mut scale = DEFAULT_SCALE;

    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();
        match arg_str.as_ref() {
            "--pdf" => {
                let value = args.next().context("missing value for --pdf")?;
                pdf_path = Some(PathBuf::from(value));
            }
            "--page" => {
                let value = args.next().context("missing value for --page")?;
                let value_str = value.to_string_lossy();
                page_number = value_str
                    .parse::<u32>()
                    .with_context(|| format!("invalid --page value: {value_str}"))?;
                if page_number == 0 {
                    anyhow::bail!("--page must be >= 1");
                }
            }
            "--scale" => {
                let value = args.next().context("missing value for --scale")?;
                let value_str = value.to_string_lossy();
                let parsed = value_str
                    .parse::<f32>()
                    .with_context(|| format!("invalid --scale value: {value_str}"))?;
                scale = clamp_scale(parsed);
            }
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            other => anyhow::bail!("unknown arg: {other} (try --help)"),
        }
    }

    let engine = Engine::new();
    engine.check_pdfium().context("bind pdfium")?;
    println!("pdfium: ok");

    let Some(pdf) = pdf_path else {
        return Ok(());
    };
    let count = engine.page_count(&pdf)?;
    println!("load: ok (pages={count})");
    if page_number > count {
        anyhow::bail!("--page {page_number} is past the last page ({count})");
    }

    let bitmap = engine.render_page(&pdf, page_number, scale)?;
    println!(
        "render: ok (page={} scale={:.1} {}x{})",
        page_number, scale, bitmap.width, bitmap.height
    );
    Ok(())
}

fn print_help() {
    println!(
        "\
page_probe

Usage:
  cargo run -p engine --bin page_probe -- --pdf <file> [--page <n>] [--scale <f>]

Options:
  --pdf <path>    PDF to load and render
  --page <n>      Page number to render (1-based, default: 1)
  --scale <f>     Render scale, clamped to 0.3..=2.0 (default: 1.0)
  --help          Show this help

Set NEWSSTAND_PDFIUM_LIB_PATH or NEWSSTAND_PDFIUM_DIR to point at libpdfium.
"
    );
}
