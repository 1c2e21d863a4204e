mod app;
mod cli;
mod logging;
mod repl;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.verbose);

    let app = app::App::from_cli(&cli)?;
    app.run(cli.command).await
}
