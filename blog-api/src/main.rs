use anyhow::Result;
use blog_auth::{BlogAuth, ADMIN_ROLE};
use blog_core::BlogConfig;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "blog-api")]
#[command(about = "Blog posts CRUD API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Overrides `http.host`
        #[arg(long)]
        host: Option<String>,

        /// Overrides `http.port`
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print an access token signed with `auth.secret`
    Token {
        /// Subject claim
        #[arg(long)]
        sub: String,

        #[arg(long, default_value = ADMIN_ROLE)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = BlogConfig::with_defaults();
    config.load_env();

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Token { sub, role } => {
            let auth = BlogAuth::from_config(&config.snapshot());
            println!("{}", auth.create_access_token(&sub, &role)?);
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.set("http.host", host);
            }
            if let Some(port) = port {
                config.set("http.port", port.to_string());
            }

            let ax = blog_api::build(&config)?;

            let host = config.get("http.host").unwrap_or("127.0.0.1");
            let port = config.get("http.port").unwrap_or("3036");
            let addr = format!("{host}:{port}");

            ax.listen(addr).await?;
        }
    }

    Ok(())
}
