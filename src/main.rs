//! `lsys`: derive generations of an L-system and emit its drawing commands.

use anyhow::{Context, Result};
use clap::Parser;
use lsystem_plotter::{
    Bounds, EngineConfig, ProductionEngine, Strategy, TurtleInterpreter, parse_file, segments,
};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "lsys",
    version,
    about = "Rewrite an L-system and interpret it as plotter drawing commands"
)]
struct Cli {
    /// L-system description file.
    file: PathBuf,

    /// Number of rewrite steps applied to the axiom.
    #[arg(short = 'n', long, default_value_t = 1)]
    iterations: usize,

    /// Size of the production worker pool (overrides the config file).
    #[arg(short, long)]
    workers: Option<usize>,

    /// How each generation is split across workers (overrides the config file).
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Refuse to build generations longer than this many symbols.
    #[arg(long, conflicts_with = "no_limit")]
    max_len: Option<usize>,

    /// Disable the generation size limit.
    #[arg(long)]
    no_limit: bool,

    /// TOML file with production settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every generation, starting with the axiom.
    #[arg(long)]
    print: bool,

    /// Write the final generation's draw commands to stdout as JSON.
    #[arg(long)]
    commands: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config '{}'", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if cli.no_limit {
        config.max_generation_len = None;
    } else if let Some(max_len) = cli.max_len {
        config.max_generation_len = Some(max_len);
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = engine_config(&cli)?;
    let definition = parse_file(&cli.file)?;
    log::info!(
        "Loaded '{}' ({} rule(s)); {} step(s) with {:?} on {} worker(s)",
        definition.name,
        definition.grammar.len(),
        cli.iterations,
        config.strategy,
        config.workers
    );

    let engine = ProductionEngine::new(config)?;
    let mut out = BufWriter::new(io::stdout().lock());

    if cli.print {
        writeln!(out, "0: {}", definition.axiom)?;
    }

    let mut current = definition.axiom.clone();
    for (i, next) in engine
        .derive(&definition.axiom, &definition.grammar)
        .take(cli.iterations)
        .enumerate()
    {
        current = next.with_context(|| format!("producing generation {}", i + 1))?;
        if cli.print {
            writeln!(out, "{}: {}", i + 1, current)?;
        }
    }

    if cli.commands {
        let interpreter = TurtleInterpreter::new(definition.params);
        let commands = interpreter
            .interpret(&current)
            .context("interpreting final generation")?;
        log::info!(
            "{} command(s), {} segment(s), bounds {:?}",
            commands.len(),
            segments(&commands).count(),
            Bounds::of(&commands)
        );
        serde_json::to_writer(&mut out, &commands)?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}
