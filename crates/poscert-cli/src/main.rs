//! Poscert command-line interface.
//!
//! Parses an if-then program, reduces it to an SDP feasibility problem,
//! solves it through an external backend, and on success writes a sympy
//! verification script next to the input file.

use std::env;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use poscert_dsl::{parse_program, ParseConfig};
use poscert_engine::{ComplexityEstimator, Engine, Feasibility, Method, SolverConfig};

#[derive(Parser, Debug)]
#[command(name = "poscert")]
#[command(about = "Polynomial positivity certificates for if-then systems")]
#[command(version)]
struct Cli {
    /// Input program file
    #[arg(long = "inp", value_name = "FILE")]
    inp: Option<PathBuf>,

    /// Highest degree of the monomial templates (default 2)
    #[arg(long = "deg", value_name = "VALUE")]
    deg: Option<u32>,

    /// Certificate method: putinar or handelman
    #[arg(long = "met", value_name = "METHOD", default_value = "putinar")]
    met: String,

    /// SDP solver engine: mosek or csdp
    #[arg(long = "eng", value_name = "ENGINE", default_value = "mosek")]
    eng: String,

    /// Write the solved assignment as JSON to this file
    #[arg(long = "json", value_name = "FILE")]
    json: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let method: Method = cli.met.parse().map_err(|e: String| anyhow!(e))?;
    let engine: Engine = cli.eng.parse().map_err(|e: String| anyhow!(e))?;

    let Some(input) = cli.inp else {
        eprintln!("Input file name not found. Run --help to get more info");
        return Ok(ExitCode::FAILURE);
    };

    let mut config = SolverConfig {
        method,
        engine,
        ..SolverConfig::default()
    };
    match cli.deg {
        Some(degree) => config.degree = degree,
        None => {
            println!(
                "Using default value for high degree monomial: {}",
                config.degree
            );
            println!("To change it, use --deg <value>");
        }
    }

    let text = fs::read_to_string(&input)
        .with_context(|| format!("cannot read input file {}", input.display()))?;
    let program = parse_program(&text, &ParseConfig::default())?;
    debug!(
        variables = program.variables().count(),
        conditions = program.conditions.len(),
        "parsed program"
    );

    let mut estimator = ComplexityEstimator::new(program, config);
    estimator.accept_trusted_input_only();

    match estimator.solve()? {
        Feasibility::Infeasible | Feasibility::Unknown => {
            println!("===========================================================");
            println!("{}", "Infeasible".red().bold());
            println!("The system is either infeasible or the specified degree is too small");
            println!("Try to increase the degree using --deg <value>");
            Ok(ExitCode::SUCCESS)
        }
        Feasibility::Feasible => {
            println!("===========================================================");
            println!("{}", "The solution is found".green().bold());

            let cert_path = PathBuf::from(format!("{}.cert.py", input.display()));
            let invocation = env::args().collect::<Vec<_>>().join(" ");
            let file = fs::File::create(&cert_path)
                .with_context(|| format!("cannot create {}", cert_path.display()))?;
            let mut out = BufWriter::new(file);
            estimator.write_certificate(&invocation, &mut out)?;
            out.flush()?;

            println!(
                "To print the solution, run python {} answer",
                cert_path.display()
            );
            println!(
                "To check the correctness of the solution, run python {}",
                cert_path.display()
            );

            if let Some(json_path) = cli.json {
                let file = fs::File::create(&json_path)
                    .with_context(|| format!("cannot create {}", json_path.display()))?;
                serde_json::to_writer_pretty(file, estimator.solution()?)?;
                println!("Solution map written to {}", json_path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
