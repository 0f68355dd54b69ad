//! `caps` — list, create, or delete captures on a request template.

use super::Mutation;
use crate::capture;
use crate::error::MorcError;
use crate::project::Project;
use clap::Args;

#[derive(Args, Debug)]
pub struct CapsArgs {
    /// Template name (case-insensitive).
    pub template: String,

    /// Variable name for a new capture; requires `--spec`.
    #[arg(long = "new")]
    pub new: Option<String>,

    /// Capture DSL spec (`:START,END` or a dot/index path).
    #[arg(short = 's', long = "spec", requires = "new")]
    pub spec: Option<String>,

    /// Delete the capture that writes this variable name.
    #[arg(short = 'D', long = "delete")]
    pub delete: Option<String>,
}

pub(crate) fn run(args: &CapsArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    let display_name = project
        .get_template(&args.template)
        .ok_or_else(|| MorcError::not_found("template", args.template.clone()))?
        .name
        .clone();

    if let Some(var_name) = &args.delete {
        let template = project.get_template_mut(&args.template).unwrap();
        let key = var_name.to_uppercase();
        if template.captures.shift_remove(&key).is_none() {
            return Err(MorcError::not_found("capture", var_name.clone()));
        }
        if !quiet {
            println!("Deleted capture to ${key} from {display_name}");
        }
        return Ok(Mutation::ProjectOnly);
    }

    if let Some(var_name) = &args.new {
        let spec = args
            .spec
            .as_ref()
            .ok_or_else(|| MorcError::BadInput("--new requires --spec".to_string()))?;
        let scraper = capture::parse(var_name, spec)?;
        let template = project.get_template_mut(&args.template).unwrap();
        let key = scraper.name().to_string();
        if template.captures.contains_key(&key) {
            return Err(MorcError::already_exists("capture", key));
        }
        let kind = match &scraper {
            capture::VarScraper::Offset { .. } => "response byte offset",
            capture::VarScraper::Path { .. } => "response JSON path",
        };
        template.captures.insert(key.clone(), scraper);
        if !quiet {
            println!("Added new capture from {kind} to ${key} on {display_name}");
        }
        return Ok(Mutation::ProjectOnly);
    }

    // List.
    let template = project.get_template(&args.template).unwrap();
    if template.captures.is_empty() {
        println!("(none)");
    } else {
        for scraper in template.captures.values() {
            println!("${} from {}", scraper.name(), scraper.display_form());
        }
    }
    Ok(Mutation::None)
}
