//! paramhist CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ph_func::{FunctionSpecV0, HistConstraint, ParamHistFunc, RealFunction, integrate};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "paramhist")]
#[command(about = "paramhist - per-bin parameterized histogram functions")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the function at one observable tuple
    Eval {
        /// Template spec (paramhist_spec_v0 JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Observable values, one per axis
        #[arg(long, num_args = 1.., allow_negative_numbers = true, required = true)]
        x: Vec<f64>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Integrate over a set of observables (analytic when possible)
    Integral {
        /// Template spec (paramhist_spec_v0 JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Observables to integrate over. Defaults to all.
        #[arg(long, num_args = 1..)]
        vars: Vec<String>,

        /// Values of the observables that are not integrated (one per axis)
        #[arg(long, num_args = 1.., allow_negative_numbers = true)]
        x: Vec<f64>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sampling hint (or plain bin boundaries) along one observable
    Hint {
        /// Template spec (paramhist_spec_v0 JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Observable name
        #[arg(long)]
        obs: String,

        /// Range low edge
        #[arg(long, allow_negative_numbers = true)]
        lo: f64,

        /// Range high edge
        #[arg(long, allow_negative_numbers = true)]
        hi: f64,

        /// Return the bin boundaries instead of straddling pairs
        #[arg(long)]
        boundaries: bool,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-bin parameters, nominal contents and constraint value
    Snapshot {
        /// Template spec (paramhist_spec_v0 JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Only report this bin
        #[arg(long, allow_negative_numbers = true)]
        bin: Option<i64>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Eval { input, x, output } => cmd_eval(&input, &x, output.as_deref()),
        Commands::Integral { input, vars, x, output } => {
            cmd_integral(&input, &vars, &x, output.as_deref())
        }
        Commands::Hint { input, obs, lo, hi, boundaries, output } => {
            cmd_hint(&input, &obs, lo, hi, boundaries, output.as_deref())
        }
        Commands::Snapshot { input, bin, output } => {
            cmd_snapshot(&input, bin, output.as_deref())
        }
        Commands::Version => {
            println!("paramhist {}", ph_core::VERSION);
            Ok(())
        }
    }
}

fn load_function(input: &Path) -> Result<ParamHistFunc> {
    tracing::info!(path = %input.display(), "loading template spec");
    let spec = FunctionSpecV0::from_path(input)
        .with_context(|| format!("failed to load spec {}", input.display()))?;
    let func = spec.build().with_context(|| format!("failed to build '{}'", spec.name))?;
    tracing::info!(
        name = func.name(),
        n_bins = func.n_bins(),
        relative = func.is_relative(),
        "function built"
    );
    Ok(func)
}

fn write_json(output: Option<&Path>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

fn cmd_eval(input: &Path, x: &[f64], output: Option<&Path>) -> Result<()> {
    let func = load_function(input)?;
    let bin = func.shared_template().read()?.resolve(x)?;
    let value = func.evaluate(x)?;
    tracing::info!(bin, value, "evaluated");

    write_json(
        output,
        serde_json::json!({
            "name": func.name(),
            "x": x,
            "bin": bin,
            "value": value,
        }),
    )
}

fn cmd_integral(input: &Path, vars: &[String], x: &[f64], output: Option<&Path>) -> Result<()> {
    let func = load_function(input)?;
    let vars: Vec<&str> = if vars.is_empty() {
        func.observables().iter().map(String::as_str).collect()
    } else {
        vars.iter().map(String::as_str).collect()
    };
    let code = func.analytic_integral_code(&vars);
    let value = integrate(&func, &vars, x)?;
    tracing::info!(code = code.code(), value, "integrated");

    write_json(
        output,
        serde_json::json!({
            "name": func.name(),
            "vars": vars,
            "code": code.code(),
            "value": value,
        }),
    )
}

fn cmd_hint(
    input: &Path,
    obs: &str,
    lo: f64,
    hi: f64,
    boundaries: bool,
    output: Option<&Path>,
) -> Result<()> {
    if !(lo.is_finite() && hi.is_finite()) || lo > hi {
        anyhow::bail!("invalid range: expected finite lo <= hi, got ({lo}, {hi})");
    }
    let func = load_function(input)?;
    let (kind, points): (&str, Vec<f64>) = if boundaries {
        ("bin_boundaries", func.bin_boundaries(obs, lo, hi).collect())
    } else {
        ("sampling_hint", func.sampling_hint(obs, lo, hi).collect())
    };
    if points.is_empty() && !func.observables().iter().any(|o| o == obs) {
        tracing::warn!(obs, "not an observable of this function");
    }

    write_json(
        output,
        serde_json::json!({
            "name": func.name(),
            "obs": obs,
            "lo": lo,
            "hi": hi,
            "kind": kind,
            "points": points,
        }),
    )
}

#[derive(Debug, Serialize)]
struct BinRow {
    bin: usize,
    name: String,
    value: f64,
    /// `None` for degenerate (infinite) error seeds.
    error: Option<f64>,
    constant: bool,
    nominal: f64,
    nominal_error: f64,
}

fn cmd_snapshot(input: &Path, bin: Option<i64>, output: Option<&Path>) -> Result<()> {
    let func = load_function(input)?;
    let only = bin.map(|b| ph_core::checked_index("bin", b, func.n_bins())).transpose()?;
    let mut bins = Vec::with_capacity(func.n_bins());
    for (i, p) in func.parameters().snapshot()?.into_iter().enumerate() {
        if only.is_some_and(|b| b != i) {
            continue;
        }
        bins.push(BinRow {
            bin: i,
            name: p.name,
            value: p.value,
            error: p.error.is_finite().then_some(p.error),
            constant: p.constant,
            nominal: func.nominal(i)?,
            nominal_error: func.nominal_error(i)?,
        });
    }
    let constraint = HistConstraint::new(format!("{}_constraint", func.name()), &[&func])?;

    write_json(
        output,
        serde_json::json!({
            "name": func.name(),
            "relative": func.is_relative(),
            "observables": func.observables(),
            "degenerate_bins": func.degenerate_bins()?,
            "bins": bins,
            "constraint": {
                "name": constraint.name(),
                "n_terms": constraint.n_terms(),
                "nll": constraint.nll()?,
                "terms": constraint.terms()?,
            },
        }),
    )
}
