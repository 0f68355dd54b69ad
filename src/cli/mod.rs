//! §6 EXTERNAL INTERFACES — CLI surface. Sub-commands only invoke the
//! engine's public operations (§4); this module owns no engine logic of
//! its own, matching the "external collaborator" boundary spec.md §1
//! draws around the CLI.

use crate::error::MorcError;
use crate::logging::LogArgs;
use crate::project::Project;
use crate::store::ProjectStore;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod caps;
mod cookies;
mod env;
mod flows;
mod hist;
mod oneshot;
mod proj;
mod reqs;
mod send;
mod vars;

pub use oneshot::OneShotArgs;
pub use send::{ExecArgs, SendArgs};

#[derive(Parser, Debug)]
#[command(name = "morc", version, about = "Mordor Optional Request Client")]
pub struct Cli {
    /// Project file to operate on.
    #[arg(
        short = 'F',
        long = "project-file",
        global = true,
        default_value = ".morc/project.json"
    )]
    pub project_file: String,

    /// Suppress informational output (primary command output is unaffected).
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new, empty project file.
    Init(InitArgs),
    /// Inspect or edit top-level project settings.
    Proj(proj::ProjArgs),
    /// List or edit request templates.
    Reqs(reqs::ReqsArgs),
    /// List or edit flows.
    Flows(flows::FlowsArgs),
    /// List, add, or delete captures on a template.
    Caps(caps::CapsArgs),
    /// Inspect or edit stored variables.
    Vars(vars::VarsArgs),
    /// Inspect, switch, or delete environments.
    Env(env::EnvArgs),
    /// Inspect or clear the cookie jar.
    Cookies(cookies::CookiesArgs),
    /// Inspect or clear request history.
    Hist(hist::HistArgs),
    /// Send a single stored template.
    Send(SendArgs),
    /// Execute a stored flow.
    Exec(ExecArgs),
    /// One-shot GET, bypassing stored templates.
    Get(OneShotArgs),
    /// One-shot POST, bypassing stored templates.
    Post(OneShotArgs),
    /// One-shot PUT, bypassing stored templates.
    Put(OneShotArgs),
    /// One-shot PATCH, bypassing stored templates.
    Patch(OneShotArgs),
    /// One-shot DELETE, bypassing stored templates.
    Delete(OneShotArgs),
    /// One-shot HEAD, bypassing stored templates.
    Head(OneShotArgs),
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Project display name.
    #[arg(default_value = "untitled")]
    pub name: String,
}

/// What a subcommand needs written back to disk once it returns.
pub(crate) enum Mutation {
    None,
    ProjectOnly,
    All,
}

pub async fn run(cli: Cli) -> Result<(), MorcError> {
    let project_path = PathBuf::from(&cli.project_file);

    if let Command::Init(args) = &cli.command {
        return run_init(&project_path, args, cli.quiet);
    }

    let mut project = ProjectStore::load(&project_path, true)?;
    let transport = crate::transport::ReqwestTransport::new();

    let mutation = match &cli.command {
        Command::Init(_) => unreachable!("handled above"),
        Command::Proj(args) => proj::run(args, &mut project, cli.quiet)?,
        Command::Reqs(args) => reqs::run(args, &mut project, cli.quiet)?,
        Command::Flows(args) => flows::run(args, &mut project, cli.quiet)?,
        Command::Caps(args) => caps::run(args, &mut project, cli.quiet)?,
        Command::Vars(args) => vars::run(args, &mut project, cli.quiet)?,
        Command::Env(args) => env::run(args, &mut project, cli.quiet)?,
        Command::Cookies(args) => cookies::run(args, &mut project, cli.quiet)?,
        Command::Hist(args) => hist::run(args, &mut project, cli.quiet)?,
        Command::Send(args) => send::run_send(args, &mut project, &transport).await?,
        Command::Exec(args) => send::run_exec(args, &mut project, &transport).await?,
        Command::Get(args) => oneshot::run(http::Method::GET, args, &mut project, &transport).await?,
        Command::Post(args) => oneshot::run(http::Method::POST, args, &mut project, &transport).await?,
        Command::Put(args) => oneshot::run(http::Method::PUT, args, &mut project, &transport).await?,
        Command::Patch(args) => oneshot::run(http::Method::PATCH, args, &mut project, &transport).await?,
        Command::Delete(args) => oneshot::run(http::Method::DELETE, args, &mut project, &transport).await?,
        Command::Head(args) => oneshot::run(http::Method::HEAD, args, &mut project, &transport).await?,
    };

    match mutation {
        Mutation::None => {}
        Mutation::ProjectOnly => ProjectStore::persist(&project_path, &project, false)?,
        Mutation::All => ProjectStore::persist(&project_path, &project, true)?,
    }

    Ok(())
}

fn run_init(path: &Path, args: &InitArgs, quiet: bool) -> Result<(), MorcError> {
    if path.exists() {
        return Err(MorcError::already_exists(
            "project file",
            path.display().to_string(),
        ));
    }
    let project = Project::new(&args.name);
    ProjectStore::persist(path, &project, true)?;
    if !quiet {
        println!("Initialized project '{}' at {}", project.name, path.display());
    }
    Ok(())
}

/// Parses a repeated `KEY:VALUE` header flag.
pub(crate) fn parse_header(raw: &str) -> Result<(String, String), MorcError> {
    raw.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| MorcError::BadInput(format!("malformed header '{raw}', expected KEY:VALUE")))
}
