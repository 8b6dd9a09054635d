//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads the model (configuration, covariances, dials)
//! - runs the requested subcommand
//! - prints reports/plots

use clap::Parser;

use crate::cli::{Chi2Args, Cli, Command, ScanArgs, SummaryArgs, ThrowArgs, parse_assignment};
use crate::dial::ResponseRegistry;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `fitdials` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Chi2(args) => handle_chi2(args),
        Command::Scan(args) => handle_scan(args),
        Command::Throw(args) => handle_throw(args),
    }
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let model = pipeline::load_model(&args.model.config, &ResponseRegistry::with_builtins())?;

    for (set, dials) in model.parameters.sets().iter().zip(&model.dials) {
        println!("{}", crate::report::format_set_summary(set));
        if args.eigen && set.is_enabled() && set.uses_eigen_decomposition() {
            println!("{}", crate::report::format_eigen_spectrum(set.eigen()?));
        }
        if args.dials {
            println!("{}\n", dials.summary());
        }
    }
    Ok(())
}

fn handle_chi2(args: Chi2Args) -> Result<(), AppError> {
    let assignments = args
        .values
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|msg| AppError::new(2, msg))?;

    let model = pipeline::load_model(&args.model.config, &ResponseRegistry::with_builtins())?;
    let report = pipeline::evaluate_chi2(&model, &assignments, args.force)?;
    println!("{}", crate::report::format_chi2(&report));
    Ok(())
}

fn handle_scan(args: ScanArgs) -> Result<(), AppError> {
    let model = pipeline::load_model(&args.model.config, &ResponseRegistry::with_builtins())?;

    let scan = if args.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build()
            .map_err(|e| AppError::new(2, format!("cannot build thread pool: {e}")))?;
        pool.install(|| pipeline::scan_parameter(&model, &args.parameter, args.min, args.max, args.steps))?
    } else {
        pipeline::scan_parameter(&model, &args.parameter, args.min, args.max, args.steps)?
    };

    println!("{}", crate::report::format_scan_table(&scan));
    if args.plot {
        println!("{}", crate::plot::render_scan_plot(&scan, args.width, args.height));
    }
    Ok(())
}

fn handle_throw(args: ThrowArgs) -> Result<(), AppError> {
    if !(args.n_sigma.is_finite() && args.n_sigma > 0.0) {
        return Err(AppError::new(2, format!("--n-sigma must be positive, got {}", args.n_sigma)));
    }
    let model = pipeline::load_model(&args.model.config, &ResponseRegistry::with_builtins())?;
    let report = pipeline::run_throws(&model, args.toys, args.seed, args.n_sigma, !args.flagged_only)?;
    println!("{}", crate::report::format_throw_report(&report));
    Ok(())
}
