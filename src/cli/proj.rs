//! `proj` — inspect or edit top-level project settings (name, `Settings`).

use super::Mutation;
use crate::error::MorcError;
use crate::project::Project;
use clap::Args;

#[derive(Args, Debug)]
pub struct ProjArgs {
    /// New project display name.
    #[arg(long)]
    pub name: Option<String>,

    /// Substitution prefix character (a single non-alphanumeric ASCII char).
    #[arg(long = "var-prefix")]
    pub var_prefix: Option<String>,

    /// Cookie retention lifetime, e.g. `24h`, `30m`, `90s`.
    #[arg(long = "cookie-lifetime", value_parser = humantime::parse_duration)]
    pub cookie_lifetime: Option<std::time::Duration>,

    /// Whether to record request/response history.
    #[arg(long = "record-history")]
    pub record_history: Option<bool>,

    /// Whether to persist the cookie jar across invocations.
    #[arg(long = "record-session")]
    pub record_session: Option<bool>,
}

pub(crate) fn run(args: &ProjArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    let has_edits = args.name.is_some()
        || args.var_prefix.is_some()
        || args.cookie_lifetime.is_some()
        || args.record_history.is_some()
        || args.record_session.is_some();

    if !has_edits {
        print_detail(project);
        return Ok(Mutation::None);
    }

    if let Some(name) = &args.name {
        project.name = name.clone();
    }
    if let Some(prefix) = &args.var_prefix {
        project.config.var_prefix = prefix.clone();
        project.config.prefix_char()?;
    }
    if let Some(lifetime) = args.cookie_lifetime {
        project.config.cookie_lifetime = lifetime;
    }
    if let Some(record_history) = args.record_history {
        project.config.record_history = record_history;
    }
    if let Some(record_session) = args.record_session {
        project.config.record_session = record_session;
    }

    if !quiet {
        println!("Updated project settings");
    }
    Ok(Mutation::ProjectOnly)
}

fn print_detail(project: &Project) {
    println!("name: {}", project.name);
    println!("var_prefix: {}", project.config.var_prefix);
    println!(
        "cookie_lifetime: {}",
        humantime::format_duration(project.config.cookie_lifetime)
    );
    println!("record_history: {}", project.config.record_history);
    println!("record_session: {}", project.config.record_session);
}
