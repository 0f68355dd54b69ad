//! `cookies` — inspect or clear the recorded cookie jar.

use super::Mutation;
use crate::error::MorcError;
use crate::project::Project;
use crate::session::SessionJar;
use clap::Args;

#[derive(Args, Debug)]
pub struct CookiesArgs {
    /// Discard every recorded Set-Cookie call.
    #[arg(long)]
    pub clear: bool,
}

pub(crate) fn run(args: &CookiesArgs, project: &mut Project, quiet: bool) -> Result<Mutation, MorcError> {
    if args.clear {
        project.cookies = SessionJar::new();
        if !quiet {
            println!("Cleared cookie jar");
        }
        return Ok(Mutation::All);
    }

    let calls = project.cookies.calls_snapshot();
    if calls.is_empty() {
        println!("(none)");
    } else {
        for call in &calls {
            println!(
                "{} {} set-cookie header(s) at {}",
                call.request_url,
                call.set_cookie_headers.len(),
                call.received_at.to_rfc3339()
            );
        }
    }
    Ok(Mutation::None)
}
