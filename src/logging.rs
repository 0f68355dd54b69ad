//! Logging setup, grounded on `estuary-flow`'s `flow_cli_common::logging`
//! (same `tracing-subscriber` builder shape), simplified to the one
//! verbosity knob MORC's CLI needs instead of Flow's JSON/text/color
//! format switch.

use clap::Args;

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Increase verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl LogArgs {
    /// `-q/--quiet` is the CLI's own informational-output switch
    /// (spec.md §6); it doubles as the log-level override here so a quiet
    /// invocation doesn't also spray `warn`-level diagnostics to stderr.
    fn filter(&self, quiet: bool) -> &'static str {
        if quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Initializes the global `tracing` subscriber. Idempotent-safe to call
/// once at process startup; a second call is a logic error, matching the
/// teacher's `init_logging` contract.
pub fn init_logging(args: &LogArgs, quiet: bool) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(args.filter(quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .init();
}
