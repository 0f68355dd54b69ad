//! `env` — inspect, switch, or delete environments.

use super::Mutation;
use crate::error::MorcError;
use crate::project::Project;
use clap::Args;

#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Environment to switch to; omit to list environments.
    pub switch: Option<String>,

    /// Delete this environment instead of switching.
    #[arg(short = 'D', long = "delete")]
    pub delete: Option<String>,
}

pub(crate) fn run(args: &EnvArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    if let Some(env) = &args.delete {
        if !project.vars.delete_env(env) {
            return Err(MorcError::not_found("environment", env.clone()));
        }
        if !quiet {
            println!("Deleted environment {env}");
        }
        return Ok(Mutation::ProjectOnly);
    }

    let Some(env) = &args.switch else {
        for name in project.vars.envs() {
            let marker = if name == project.vars.current_env() { "* " } else { "  " };
            let label = if name.is_empty() { "(default)" } else { name };
            println!("{marker}{label}");
        }
        return Ok(Mutation::None);
    };

    project.vars.switch_env(env);
    if !quiet {
        println!("Switched to environment {env}");
    }
    Ok(Mutation::ProjectOnly)
}
