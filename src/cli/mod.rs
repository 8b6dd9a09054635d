//! Command-line parsing for `fitdials`.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! parameter/dial code. Dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fitdials", version, about = "Parameter sets, covariance geometry and dial responses")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize the model and print every parameter set (and its dials).
    Summary(SummaryArgs),
    /// Set parameter values and print the penalty term per set.
    Chi2(Chi2Args),
    /// Evaluate every dial bound to one parameter over a grid of values.
    Scan(ScanArgs),
    /// Throw correlated toys around the priors and report chi-square statistics.
    Throw(ThrowArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Model configuration JSON.
    #[arg(short, long, value_name = "JSON")]
    pub config: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Also list the dials of every set.
    #[arg(long)]
    pub dials: bool,

    /// Print the eigen spectrum of sets using eigen decomposition.
    #[arg(long)]
    pub eigen: bool,
}

#[derive(Debug, Args, Clone)]
pub struct Chi2Args {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Parameter assignment `<set>/<parameter>=<value>` (repeatable).
    #[arg(long = "value", value_name = "SET/PARAM=V")]
    pub values: Vec<String>,

    /// Write values even when they violate the parameter's validity checks.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ScanArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Parameter to scan, `<set>/<parameter>`.
    #[arg(short, long, value_name = "SET/PARAM")]
    pub parameter: String,

    /// Lower end of the scan (defaults to the domain minimum or prior - 3 sigma).
    #[arg(long)]
    pub min: Option<f64>,

    /// Upper end of the scan (defaults to the domain maximum or prior + 3 sigma).
    #[arg(long)]
    pub max: Option<f64>,

    /// Number of grid points.
    #[arg(long, default_value_t = 21)]
    pub steps: usize,

    /// Threads (0 = rayon default).
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Render an ASCII plot of the responses.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ThrowArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of toys.
    #[arg(long, default_value_t = 100)]
    pub toys: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Width of the throws in units of the covariance.
    #[arg(long, default_value_t = 1.0)]
    pub n_sigma: f64,

    /// Only throw sets flagged with `enableThrowMcBeforeFit`.
    #[arg(long)]
    pub flagged_only: bool,
}

/// Parse `<set>/<parameter>=<value>`.
pub fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (path, value) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected <set>/<parameter>=<value>, got '{s}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value in '{s}': {e}"))?;
    Ok((path.trim().to_string(), value))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scan_with_global_log_level() {
        let cli = Cli::parse_from([
            "fitdials", "scan", "-c", "model.json", "-p", "xsec/MaQE", "--steps", "5", "--log-level", "debug",
        ]);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        match cli.command {
            Command::Scan(args) => {
                assert_eq!(args.parameter, "xsec/MaQE");
                assert_eq!(args.steps, 5);
                assert_eq!(args.min, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn assignments_split_on_the_last_equals() {
        assert_eq!(parse_assignment("flux/#0=1.2"), Ok(("flux/#0".to_string(), 1.2)));
        assert!(parse_assignment("flux/#0").is_err());
        assert!(parse_assignment("flux/#0=abc").is_err());
    }
}
