//! `send`/`exec` — invoke the Sender or FlowRunner against stored templates.

use super::Mutation;
use crate::error::MorcError;
use crate::flow::FlowRunner;
use crate::project::Project;
use crate::sender::{OutputControl, Sender, SendOptions};
use crate::transport::SendTransport;
use clap::Args;
use std::collections::HashMap;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Template name to send.
    pub name: String,

    #[command(flatten)]
    pub opts: CommonSendFlags,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Flow name to execute.
    pub name: String,

    #[command(flatten)]
    pub opts: CommonSendFlags,
}

#[derive(Args, Debug)]
pub struct CommonSendFlags {
    /// One-time variable overlay `NAME=VALUE`, repeatable.
    #[arg(short = 'V', long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    #[arg(long = "show-request")]
    pub show_request: bool,

    #[arg(long = "show-response-headers")]
    pub show_response_headers: bool,

    #[arg(long = "no-body")]
    pub no_body: bool,

    #[arg(long = "show-captures")]
    pub show_captures: bool,
}

impl CommonSendFlags {
    pub(crate) fn to_options(&self) -> Result<SendOptions, MorcError> {
        let mut overlay = HashMap::new();
        for raw in &self.vars {
            let (name, value) = raw
                .split_once('=')
                .ok_or_else(|| MorcError::BadInput(format!("malformed --var '{raw}', expected NAME=VALUE")))?;
            overlay.insert(name.to_uppercase(), value.to_string());
        }
        Ok(SendOptions {
            overlay,
            output: OutputControl {
                show_request: self.show_request,
                show_response_headers: self.show_response_headers,
                no_body: self.no_body,
                show_captures: self.show_captures,
            },
            ..Default::default()
        })
    }
}

pub(crate) async fn run_send(
    args: &SendArgs,
    project: &mut Project,
    transport: &dyn SendTransport,
) -> Result<Mutation, MorcError> {
    let template = project
        .get_template(&args.name)
        .cloned()
        .ok_or_else(|| MorcError::not_found("template", args.name.clone()))?;
    let opts = args.opts.to_options()?;
    Sender::send(&template, project, &opts, transport).await?;
    Ok(Mutation::All)
}

pub(crate) async fn run_exec(
    args: &ExecArgs,
    project: &mut Project,
    transport: &dyn SendTransport,
) -> Result<Mutation, MorcError> {
    let opts = args.opts.to_options()?;
    FlowRunner::run(&args.name, project, &opts, transport).await?;
    Ok(Mutation::All)
}
