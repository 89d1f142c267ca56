use clap::Parser;

#[derive(Parser)]
#[command(name = "secret-fetch")]
#[command(about = "Fetch a secret from the desktop secret service by label")]
#[command(long_about = "Fetch a secret from the desktop secret service by label.

Searches the keyring for items whose Title attribute equals the given label,
unlocking locked items when the service allows it, and prints the first
match. Locked items that need an interactive prompt are skipped.")]
#[command(version)]
#[command(after_help = "Examples:
  secret-fetch example.com            Print the stored secret for the label
  secret-fetch example.com --creds    Print URL, username and password
  secret-fetch -v example.com         Show protocol diagnostics on stderr")]
pub struct Cli {
    /// Label to search for (matched against the item's Title attribute)
    pub label: String,

    /// Print the full credential (URL, username, password) instead of just
    /// the secret value
    #[arg(short, long)]
    pub creds: bool,

    /// Enable diagnostic logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
