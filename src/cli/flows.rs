//! `flows` — list, create, edit, or delete flows and their steps.

use super::Mutation;
use crate::error::MorcError;
use crate::project::{Flow, FlowStep, Project};
use clap::Args;

#[derive(Args, Debug)]
pub struct FlowsArgs {
    /// Flow name; omit to list all flows.
    pub name: Option<String>,

    /// Create a new, empty flow (fails if the name is already taken).
    #[arg(long)]
    pub new: bool,

    /// Delete the named flow.
    #[arg(short = 'D', long = "delete")]
    pub delete: bool,

    /// Append a step invoking this template.
    #[arg(long = "add-step", value_name = "TEMPLATE")]
    pub add_step: Option<String>,

    /// Remove the step at this 0-based index.
    #[arg(long = "remove-step", value_name = "INDEX")]
    pub remove_step: Option<usize>,
}

pub(crate) fn run(args: &FlowsArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    let Some(name) = &args.name else {
        if project.flows.is_empty() {
            println!("(none)");
        } else {
            for flow in project.flows.values() {
                println!("{}", flow.name);
            }
        }
        return Ok(Mutation::None);
    };

    if args.delete {
        let removed = project.remove_flow(name)?;
        if !quiet {
            println!("Deleted flow {}", removed.name);
        }
        return Ok(Mutation::ProjectOnly);
    }

    if args.new {
        project.add_flow(Flow::new(name.clone()))?;
        if !quiet {
            println!("Created flow {name}");
        }
    }

    if let Some(template) = &args.add_step {
        let flow = project
            .get_flow_mut(name)
            .ok_or_else(|| MorcError::not_found("flow", name.clone()))?;
        flow.steps.push(FlowStep {
            template: template.to_lowercase(),
        });
        if !quiet {
            println!("Added step {template} to flow {name}");
        }
        return Ok(Mutation::ProjectOnly);
    }

    if let Some(index) = args.remove_step {
        let flow = project
            .get_flow_mut(name)
            .ok_or_else(|| MorcError::not_found("flow", name.clone()))?;
        if index >= flow.steps.len() {
            return Err(MorcError::BadInput(format!(
                "flow {name} has no step at index {index}"
            )));
        }
        flow.steps.remove(index);
        if !quiet {
            println!("Removed step {index} from flow {name}");
        }
        return Ok(Mutation::ProjectOnly);
    }

    if args.new {
        return Ok(Mutation::ProjectOnly);
    }

    let flow = project
        .get_flow(name)
        .ok_or_else(|| MorcError::not_found("flow", name.clone()))?;
    print_detail(project, flow);
    Ok(Mutation::None)
}

fn print_detail(project: &Project, flow: &Flow) {
    println!(
        "{} ({})",
        flow.name,
        if project.flow_is_execable(flow) {
            "execable"
        } else {
            "not execable"
        }
    );
    if flow.steps.is_empty() {
        println!("(no steps)");
    } else {
        for (i, step) in flow.steps.iter().enumerate() {
            println!("{i}: {}", step.template);
        }
    }
}
