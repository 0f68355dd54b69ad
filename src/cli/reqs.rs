//! `reqs` — list, create, edit, or delete request templates.

use super::{parse_header, Mutation};
use crate::error::MorcError;
use crate::project::{Project, RequestTemplate};
use clap::Args;

#[derive(Args, Debug)]
pub struct ReqsArgs {
    /// Template name; omit to list all templates.
    pub name: Option<String>,

    /// Create a new template (fails if the name is already taken).
    #[arg(long)]
    pub new: bool,

    /// Delete the named template.
    #[arg(short = 'D', long = "delete")]
    pub delete: bool,

    #[arg(long)]
    pub method: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    /// Repeatable `KEY:VALUE` header to add.
    #[arg(short = 'H', long = "header", value_name = "KEY:VALUE")]
    pub headers: Vec<String>,

    #[arg(long)]
    pub body: Option<String>,

    #[arg(long = "auth-flow")]
    pub auth_flow: Option<String>,
}

pub(crate) fn run(args: &ReqsArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    let Some(name) = &args.name else {
        if project.templates.is_empty() {
            println!("(none)");
        } else {
            for template in project.templates.values() {
                println!("{}", template.name);
            }
        }
        return Ok(Mutation::None);
    };

    if args.delete {
        let removed = project.remove_template(name)?;
        if !quiet {
            println!("Deleted template {}", removed.name);
        }
        return Ok(Mutation::ProjectOnly);
    }

    if args.new {
        project.add_template(RequestTemplate::new(name.clone()))?;
        if !quiet {
            println!("Created template {name}");
        }
    }

    let has_edits = args.method.is_some()
        || args.url.is_some()
        || !args.headers.is_empty()
        || args.body.is_some()
        || args.auth_flow.is_some();

    if !has_edits && !args.new {
        let template = project
            .get_template(name)
            .ok_or_else(|| MorcError::not_found("template", name.clone()))?;
        print_detail(template);
        return Ok(Mutation::None);
    }

    if has_edits {
        let template = project
            .get_template_mut(name)
            .ok_or_else(|| MorcError::not_found("template", name.clone()))?;
        if let Some(method) = &args.method {
            template.method = method.to_uppercase();
        }
        if let Some(url) = &args.url {
            template.url = url.clone();
        }
        for raw in &args.headers {
            let (key, value) = parse_header(raw)?;
            template.headers.entry(key).or_default().push(value);
        }
        if let Some(body) = &args.body {
            template.body = Some(body.clone().into_bytes());
        }
        if let Some(auth_flow) = &args.auth_flow {
            template.auth_flow = Some(auth_flow.clone());
        }
        if !quiet {
            println!("Updated template {name}");
        }
    }

    Ok(Mutation::ProjectOnly)
}

fn print_detail(template: &RequestTemplate) {
    println!("{} {}", template.method, template.url);
    for (key, values) in &template.headers {
        for value in values {
            println!("{key}: {value}");
        }
    }
    if let Some(body) = &template.body {
        println!("{}", String::from_utf8_lossy(body));
    }
    if let Some(auth_flow) = &template.auth_flow {
        println!("auth_flow: {auth_flow}");
    }
    if template.captures.is_empty() {
        println!("captures: (none)");
    } else {
        for scraper in template.captures.values() {
            println!("capture ${} from {}", scraper.name(), scraper.display_form());
        }
    }
}
