use clap::{Parser, Subcommand};
use tf_auth::TfAuthConfig;
use tf_directory::DirectoryClient;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "tagfinder",
    version,
    about = "Resolve Xbox Live gamertags to XUIDs and profiles"
)]
struct Cli {
    /// Microsoft Entra ID application client ID
    #[arg(long, env = "TAGFINDER_CLIENT_ID")]
    client_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in to Xbox Live with the device code flow
    Auth,
    /// Clear cached authentication tokens
    Logout,
    /// Convert a gamertag to its XUID
    Lookup { gamertag: String },
    /// Print the full profile for a gamertag
    Profile { gamertag: String },
    /// Convert multiple comma-separated gamertags to XUIDs
    Batch { gamertags: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = DirectoryClient::new(TfAuthConfig::new(cli.client_id), None).await?;

    match cli.command {
        Command::Auth => {
            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("interrupt received, cancelling sign-in");
                    signal_cancel.cancel();
                }
            });

            println!("Starting authentication...");
            client.authenticate(&cancel).await?;
            println!("Authentication successful! Tokens cached; lookups are ready to use.");
        }
        Command::Logout => {
            client.clear_cache().await?;
            println!("Logged out and cleared cached tokens.");
        }
        Command::Lookup { gamertag } => {
            let profile = client.lookup_profile(&gamertag).await?;
            println!("Gamertag: {}", profile.gamertag);
            println!("XUID:     {}", profile.xuid);
        }
        Command::Profile { gamertag } => {
            let profile = client.lookup_profile(&gamertag).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Batch { gamertags } => {
            let gamertags = parse_gamertags(&gamertags);
            let batch = client.gamertags_to_xuids(&gamertags).await?;

            println!("{}", serde_json::to_string_pretty(&batch.xuids)?);
            if !batch.fuzzy_only.is_empty() {
                eprintln!(
                    "No exact match (fuzzy results shown): {}",
                    batch.fuzzy_only.join(", ")
                );
            }
        }
    }

    Ok(())
}

fn parse_gamertags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|gt| gt.trim().to_string())
        .filter(|gt| !gt.is_empty())
        .collect()
}
