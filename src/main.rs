mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use secret_fetch::Session;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let session = Session::new().context("failed to open a secret service session")?;

    let result = if cli.creds {
        session
            .get_credential(&cli.label)
            .map(|credential| credential.to_string())
    } else {
        session.get_secret(&cli.label)
    };

    // The lookup outcome stands either way; a close failure is only noise.
    if let Err(err) = session.close() {
        log::warn!("{err}");
    }

    let output = result.with_context(|| format!("searching for '{}'", cli.label))?;
    println!("{output}");

    Ok(())
}
