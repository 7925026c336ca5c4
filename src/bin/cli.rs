use std::process;

use agraph_eval::demo::{SMOKE_COMMANDS, SMOKE_CONSTANTS, SMOKE_TABLE};
use agraph_eval::prelude::*;
use clap::Parser;
use colored::Colorize;
use itertools::Itertools;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "agraph-eval")]
#[command(about = "Evaluate the built-in acyclic-graph program and its derivatives")]
#[command(version)]
struct Args {
    /// Format of the program listing: console, latex or stack
    #[arg(long, default_value = "console")]
    format: Format,

    /// Differentiate with respect to the constants instead of the input columns
    #[arg(long)]
    constants_gradient: bool,

    /// Handling of undefined operations: error or propagate
    #[arg(long, default_value = "error")]
    domain_policy: DomainPolicy,

    /// Run the program exactly as written, without deduplication or reduction
    #[arg(long)]
    no_optimize: bool,

    /// Evaluate all rows on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Maximum level of log events written to stderr
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("{} {}", "Error:".bright_red().bold(), e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), EvalError> {
    let program = Program::from_command_array(&SMOKE_COMMANDS)?;
    let table = SMOKE_TABLE;
    let constants = SMOKE_CONSTANTS;

    let config = EvaluatorConfig::default()
        .with_domain_policy(args.domain_policy)
        .with_optimize(!args.no_optimize)
        .with_parallel(!args.sequential);
    let evaluator = StackEvaluator::new(config);

    println!("\n{}", "=== Program ===".bright_blue().bold());
    println!("{}", program.render(args.format, Some(constants.as_slice())).trim_end());
    println!("complexity: {}", program.complexity());

    println!("\n{}", "=== Input table ===".bright_blue().bold());
    for row in &table {
        println!("[{}]", row.iter().join(", "));
    }

    let output = evaluator.evaluate(&program, &table, &constants)?;
    println!("\n{}", "=== Output ===".bright_green().bold());
    println!(
        "[{}]",
        output.iter().map(|value| format!("{value:.6}")).join(", ")
    );

    let (_, derivatives) = if args.constants_gradient {
        println!("\n{}", "=== d/dC ===".bright_yellow().bold());
        evaluator.evaluate_with_constant_derivative(&program, &table, &constants)?
    } else {
        println!("\n{}", "=== d/dX ===".bright_yellow().bold());
        evaluator.evaluate_with_derivative(&program, &table, &constants)?
    };
    print!("{derivatives}");

    Ok(())
}
