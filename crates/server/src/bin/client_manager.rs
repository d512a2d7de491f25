use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, bail};
use sea_orm::Database;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use techfood_auth::config::load_database_url;
use techfood_auth::entity::service_client;
use techfood_auth::provisioning::{NewClient, NewUser, Provisioner};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "client-manager",
    version,
    about = "Manage service clients and users of the TechFood auth service"
)]
struct Cli {
    /// Database URL. Falls back to `database_url` from the service configuration.
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a service client and print its secret once.
    Create {
        /// Human-readable name, e.g. "Order Service"
        #[arg(long)]
        name: String,

        /// Public client id. Defaults to the name in lower case with dashes.
        #[arg(long)]
        client_id: Option<String>,

        /// Comma-separated allowed scopes, e.g. orders.read,orders.write
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,
    },

    /// List service clients, newest first.
    List,

    /// Stop a client from obtaining tokens.
    Deactivate { client_id: String },

    /// Allow a deactivated client to obtain tokens again.
    Reactivate { client_id: String },

    /// Replace a client's secret. The old secret stops working immediately.
    RotateSecret {
        client_id: String,

        /// Skip the confirmation prompt
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Create a user who can sign in with a password.
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: String,
        #[arg(long, env = "TECHFOOD_USER_PASSWORD")]
        password: String,
    },
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn print_secret(client_id: &str, secret: &str) {
    println!();
    println!("Client secret (shown only once, store it now):");
    println!("  {secret}");
    println!();
    println!("Example token request:");
    println!("  curl -X POST http://localhost:8080/auth/v1/token \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!(
        "    -d '{{\"client_id\":\"{client_id}\",\"client_secret\":\"{secret}\",\"grant_type\":\"client_credentials\"}}'"
    );
}

fn print_clients(clients: &[service_client::Model]) {
    if clients.is_empty() {
        println!("No service clients.");
        return;
    }
    println!(
        "{:<36}  {:<24}  {:<24}  {:<8}  {:<30}  {:<25}  {}",
        "ID", "CLIENT ID", "NAME", "STATUS", "SCOPES", "CREATED", "LAST USED"
    );
    for c in clients {
        let status = if c.is_active { "active" } else { "inactive" };
        let last_used = c
            .last_used_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<36}  {:<24}  {:<24}  {:<8}  {:<30}  {:<25}  {}",
            c.id,
            c.client_id,
            c.name,
            status,
            c.scopes_list().join(" "),
            c.created_at.to_string(),
            last_used
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let database_url = match cli.database_url {
        Some(url) => url,
        None => load_database_url()?,
    };
    let db = Arc::new(Database::connect(&database_url).await?);
    let provisioner = Provisioner::new(db);

    match cli.cmd {
        Command::Create {
            name,
            client_id,
            scopes,
        } => {
            let created = provisioner
                .create_client(NewClient {
                    name,
                    client_id,
                    scopes,
                })
                .await?;
            println!(
                "Created client '{}' ({})",
                created.client.client_id, created.client.name
            );
            println!("Scopes: {}", created.client.scopes_list().join(" "));
            print_secret(&created.client.client_id, &created.secret);
        }
        Command::List => {
            let clients = provisioner.list_clients().await?;
            print_clients(&clients);
        }
        Command::Deactivate { client_id } => {
            provisioner.set_active(&client_id, false).await?;
            println!("Client '{client_id}' deactivated.");
        }
        Command::Reactivate { client_id } => {
            provisioner.set_active(&client_id, true).await?;
            println!("Client '{client_id}' reactivated.");
        }
        Command::RotateSecret { client_id, yes } => {
            if !yes && !confirm(&format!("Rotate the secret of '{client_id}'?"))? {
                bail!("aborted");
            }
            let secret = provisioner.rotate_secret(&client_id).await?;
            println!("Secret of '{client_id}' rotated.");
            print_secret(&client_id, &secret);
        }
        Command::AddUser {
            username,
            full_name,
            email,
            role,
            password,
        } => {
            let user = provisioner
                .add_user(NewUser {
                    username,
                    full_name,
                    email,
                    role,
                    password,
                })
                .await?;
            println!(
                "Created user '{}' ({}) with role '{}'",
                user.username, user.id, user.role
            );
        }
    }

    Ok(())
}
