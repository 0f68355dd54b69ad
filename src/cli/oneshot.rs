//! One-shot verb aliases (`get`, `post`, ...) — send an ad hoc request
//! without first storing it as a template.

use super::send::CommonSendFlags;
use super::{parse_header, Mutation};
use crate::error::MorcError;
use crate::project::{Project, RequestTemplate};
use crate::sender::Sender;
use crate::transport::SendTransport;
use clap::Args;

#[derive(Args, Debug)]
pub struct OneShotArgs {
    /// Request URL (substituted before sending).
    pub url: String,

    /// Repeatable `KEY:VALUE` header.
    #[arg(short = 'H', long = "header", value_name = "KEY:VALUE")]
    pub headers: Vec<String>,

    #[arg(long)]
    pub body: Option<String>,

    #[command(flatten)]
    pub opts: CommonSendFlags,
}

pub(crate) async fn run(
    method: http::Method,
    args: &OneShotArgs,
    project: &mut Project,
    transport: &dyn SendTransport,
) -> Result<Mutation, MorcError> {
    let mut template = RequestTemplate::new(format!("{method} {}", args.url));
    template.method = method.to_string();
    template.url = args.url.clone();
    for raw in &args.headers {
        let (key, value) = parse_header(raw)?;
        template.headers.entry(key).or_default().push(value);
    }
    template.body = args.body.as_ref().map(|b| b.clone().into_bytes());

    let opts = args.opts.to_options()?;
    Sender::send(&template, project, &opts, transport).await?;
    Ok(Mutation::All)
}
