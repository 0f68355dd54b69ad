use clap::Parser;
use morc::cli::{self, Cli};
use morc::logging;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            std::process::exit(1);
        }
    };

    logging::init_logging(&cli.log, cli.quiet);

    if let Err(e) = cli::run(cli).await {
        eprintln!("morc: {e}");
        std::process::exit(e.exit_code());
    }
}
