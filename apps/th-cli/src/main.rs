use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use th_config::{ConfigError, RunFile};
use th_thermo::{CharacteristicEpochs, InterpMode, TableCursor, ThermoError, ThermoHistory};
use tracing::Level;

#[derive(Parser)]
#[command(name = "th-cli")]
#[command(about = "Thermal and ionization history of the early universe", long_about = None)]
struct Cli {
    /// Log integration details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a run file and write the thermodynamics table
    Run {
        /// Path to the run file (YAML or JSON)
        run_path: PathBuf,
        /// Table destination, overriding the run file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write every n-th row, overriding the run file
        #[arg(long)]
        every: Option<usize>,
        /// Print the characteristic epochs as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a run file without integrating
    Validate {
        /// Path to the run file (YAML or JSON)
        run_path: PathBuf,
    },
    /// Solve a run file and print the table at given redshifts
    At {
        /// Path to the run file (YAML or JSON)
        run_path: PathBuf,
        /// Redshifts to query
        #[arg(long, num_args = 1.., required = true)]
        z: Vec<f64>,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Thermo(#[from] ThermoError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            run_path,
            output,
            every,
            json,
        } => cmd_run(&run_path, output, every, json),
        Commands::Validate { run_path } => cmd_validate(&run_path),
        Commands::At { run_path, z } => cmd_at(&run_path, &z),
    }
}

fn cmd_validate(run_path: &Path) -> CliResult<()> {
    println!("Validating run file: {}", run_path.display());
    let run = th_config::load(run_path)?;
    run.prepare()?.check()?;
    println!("✓ Run '{}' is valid", run.name);
    Ok(())
}

fn solve(run: &RunFile) -> CliResult<ThermoHistory> {
    let prepared = run.prepare()?;
    let start = Instant::now();
    let history = prepared.solve()?;
    eprintln!(
        "✓ Solved '{}' in {:.2} s ({} rows)",
        run.name,
        start.elapsed().as_secs_f64(),
        history.len()
    );
    Ok(history)
}

fn cmd_run(run_path: &Path, output: Option<PathBuf>, every: Option<usize>, json: bool) -> CliResult<()> {
    let mut run = th_config::load(run_path)?;
    if let Some(every) = every {
        run.output.every = every;
    }
    if output.is_some() {
        run.output.path = output;
    }
    th_config::validate_run(&run).map_err(ConfigError::from)?;

    let history = solve(&run)?;
    match &run.output.path {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_table(&mut out, &history, run.output.every)?;
            out.flush()?;
            eprintln!("✓ Table written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_table(&mut out, &history, run.output.every)?;
            out.flush()?;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(history.epochs())?);
    } else {
        print_epochs(history.epochs());
    }
    Ok(())
}

fn cmd_at(run_path: &Path, redshifts: &[f64]) -> CliResult<()> {
    let run = th_config::load(run_path)?;
    let history = solve(&run)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_header(&mut out, &history)?;
    let mut cursor = TableCursor::default();
    for &z in redshifts {
        let row = history.at_z(z, InterpMode::Nearby, &mut cursor)?;
        let mut values = vec![row.z, row.tau];
        values.extend_from_slice(row.values());
        write_row(&mut out, &values)?;
    }
    out.flush()?;
    Ok(())
}

fn write_header(out: &mut impl Write, history: &ThermoHistory) -> io::Result<()> {
    let titles: Vec<String> = history
        .titles()
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}:{}", i + 1, t))
        .collect();
    writeln!(out, "# {}", titles.join("  "))
}

fn write_row(out: &mut impl Write, values: &[f64]) -> io::Result<()> {
    for v in values {
        write!(out, " {v:>14.6e}")?;
    }
    writeln!(out)
}

fn write_table(out: &mut impl Write, history: &ThermoHistory, every: usize) -> io::Result<()> {
    write_header(out, history)?;
    for row in history.output_rows(every) {
        write_row(out, &row)?;
    }
    Ok(())
}

fn print_epochs(epochs: &CharacteristicEpochs) {
    println!("Recombination:");
    println!("  z_rec   = {:.4}", epochs.z_rec);
    println!("  tau_rec = {:.4} Mpc", epochs.tau_rec);
    println!("  rs_rec  = {:.4} Mpc (comoving sound horizon)", epochs.rs_rec);
    println!("  ra_rec  = {:.4} Mpc (comoving angular distance)", epochs.ra_rec);
    println!("  rd_rec  = {:.4} Mpc (damping scale)", epochs.rd_rec);
    println!("Baryon drag:");
    println!("  z_d     = {:.4}", epochs.z_d);
    println!("  rs_d    = {:.4} Mpc", epochs.rs_d);
    println!("Reionization:");
    match epochs.z_reio {
        Some(z) => println!("  z_reio   = {z:.4}"),
        None => println!("  z_reio   = -"),
    }
    println!("  tau_reio = {:.6}", epochs.tau_reio);
    println!("Free streaming from tau = {:.4} Mpc", epochs.tau_free_streaming);
}
