//! `hist` — inspect or clear recorded request history.

use super::Mutation;
use crate::error::MorcError;
use crate::project::Project;
use clap::Args;

#[derive(Args, Debug)]
pub struct HistArgs {
    /// Discard all recorded history entries.
    #[arg(long)]
    pub clear: bool,
}

pub(crate) fn run(args: &HistArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    if args.clear {
        project.history.clear();
        if !quiet {
            println!("Cleared history");
        }
        return Ok(Mutation::All);
    }

    if project.history.is_empty() {
        println!("(none)");
    } else {
        for (i, entry) in project.history.iter().enumerate() {
            println!(
                "{i}: {} {} {} -> {} ({})",
                entry.template_name,
                entry.request_snapshot.method,
                entry.request_snapshot.url,
                entry.response_snapshot.status,
                entry.timestamp.to_rfc3339()
            );
        }
    }
    Ok(Mutation::None)
}
