//! `vars` — inspect or edit stored variables in the current environment.

use super::Mutation;
use crate::error::MorcError;
use crate::project::Project;
use clap::Args;

#[derive(Args, Debug)]
pub struct VarsArgs {
    /// Variable name; omit to list every variable in scope.
    pub name: Option<String>,

    /// New value to assign; omit to read the current value.
    pub value: Option<String>,

    /// Environment to read/write instead of the current one.
    #[arg(long)]
    pub env: Option<String>,
}

pub(crate) fn run(args: &VarsArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    let Some(name) = &args.name else {
        let env = args.env.clone().unwrap_or_else(|| project.vars.current_env().to_string());
        let mut any = false;
        for (k, v) in project.vars.vars_in(&env) {
            println!("{k}={v}");
            any = true;
        }
        if !any {
            println!("(none)");
        }
        // `VarStore::count()` only reports the *current* environment, so the
        // summary only applies when no `--env` override was given.
        if !quiet && args.env.is_none() {
            println!("{} variable(s) in {}", project.vars.count(), env_label(&env));
        }
        return Ok(Mutation::None);
    };

    let Some(value) = &args.value else {
        let value = match &args.env {
            Some(env) => project.vars.get_in(name, env),
            None => project.vars.get(name),
        };
        println!("{value}");
        return Ok(Mutation::None);
    };

    match &args.env {
        Some(env) => project.vars.set_in(name, value.clone(), env),
        None => project.vars.set(name, value.clone()),
    }
    Ok(Mutation::ProjectOnly)
}

fn env_label(env: &str) -> &str {
    if env.is_empty() {
        "(default)"
    } else {
        env
    }
}
