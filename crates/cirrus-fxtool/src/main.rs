//! Offline validator for `.cfx` effect descriptions.
//!
//! Loads an effect through the null backend (no GPU) and prints the
//! technique/pass structure plus the per-category binding layout each pass
//! resolved to. Exits non-zero on a fatal load error; diagnostics are
//! printed but do not fail the run unless `--strict` is given.

use std::process::ExitCode;
use std::sync::Once;

use anyhow::{Context, Result, bail};
use cirrus_effect::{Effect, NullBackend, SlotCategory};

static INIT: Once = Once::new();

/// Initializes the global logger once, honoring `RUST_LOG`.
fn init_logging() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Warn);
        }
        builder.init();
    });
}

struct Args {
    file: String,
    platform: String,
    search_paths: Vec<String>,
    strict: bool,
}

fn parse_args() -> Result<Args> {
    let mut file = None;
    let mut platform = "null".to_string();
    let mut search_paths = Vec::new();
    let mut strict = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--platform" => {
                platform = it.next().context("--platform needs a value")?;
            }
            "--search" => {
                search_paths.push(it.next().context("--search needs a directory")?);
            }
            "--strict" => strict = true,
            "--help" | "-h" => {
                eprintln!(
                    "usage: cirrus-fxtool <file.cfx> [--platform NAME] [--search DIR]... [--strict]"
                );
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option {other:?}"),
            other => {
                if file.replace(other.to_string()).is_some() {
                    bail!("more than one input file given");
                }
            }
        }
    }
    Ok(Args {
        file: file.context("no input file given (try --help)")?,
        platform,
        search_paths,
        strict,
    })
}

const CATEGORY_TAGS: [(SlotCategory, &str); SlotCategory::COUNT] = [
    (SlotCategory::ConstantBuffer, "c"),
    (SlotCategory::Sampler, "s"),
    (SlotCategory::TextureRead, "t"),
    (SlotCategory::TextureWrite, "u"),
    (SlotCategory::BufferRead, "b"),
    (SlotCategory::BufferWrite, "z"),
];

fn run(args: &Args) -> Result<bool> {
    let mut backend = NullBackend::new(args.platform.as_str());
    for dir in &args.search_paths {
        backend = backend.with_search_path(dir);
    }

    let loaded = Effect::load(&args.file, &mut backend)
        .with_context(|| format!("loading {}", args.file))?;
    let fx = &loaded.effect;

    println!("{}", fx.source_path);
    if let Some(binary) = &fx.binary_path {
        println!("  companion binary: {binary}");
    }

    for tech in fx.techniques() {
        let mode = if tech.variant_mode { " (variant mode)" } else { "" };
        println!("  technique {:?}{mode}", tech.name);
        for pass in tech.passes() {
            println!("    pass [{}] {:?}", pass.index, pass.name);
            for (cat, tag) in CATEGORY_TAGS {
                let slots = pass.resource_slots(cat);
                if !slots.is_empty() {
                    let list: Vec<String> = slots.iter().map(|s| s.to_string()).collect();
                    println!("      {tag}: {}", list.join(","));
                }
            }
        }
        for vp in tech.variant_passes() {
            println!("    variant_pass {:?} ({} variants)", vp.name, vp.len());
        }
    }

    for diag in loaded.diagnostics() {
        eprintln!("warning: line {}: {}", diag.line, diag.message);
    }
    Ok(loaded.is_clean())
}

fn main() -> ExitCode {
    init_logging();
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };
    match run(&args) {
        Ok(clean) if clean || !args.strict => ExitCode::SUCCESS,
        Ok(_) => {
            eprintln!("error: diagnostics reported and --strict given");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
