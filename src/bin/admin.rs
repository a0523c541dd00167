//! Operator tooling: schema setup, administrator recovery and connection
//! diagnostics against the configured database.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use link_organizer::config::AdminBootstrap;
use link_organizer::db::repository::UserRepository;
use link_organizer::db::{ssl, DatabaseClient};
use link_organizer::models::user::{CreateUserRequest, UpdateUserRequest};
use link_organizer::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "link-organizer-admin", about = "Maintenance commands for the link organizer database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create missing tables, columns and indexes, then bootstrap the admin
    InitDb,
    /// Create an administrator, or promote and reset an existing user
    CreateAdmin {
        #[arg(long, env = "ADMIN_USERNAME")]
        username: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the resolved connection target and probe it
    Diagnose,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let db = DatabaseClient::new(&config);

    let outcome = match cli.command {
        Command::InitDb => init_db(&db, &config).await,
        Command::CreateAdmin { username, password } => create_admin(&db, username, password).await,
        Command::Diagnose => diagnose(&db, &config).await,
    };

    db.close().await;
    outcome
}

async fn init_db(db: &DatabaseClient, config: &AppConfig) -> anyhow::Result<()> {
    db.initialize(&config.admin).await?;
    println!("✅ Database schema is up to date");
    Ok(())
}

async fn create_admin(db: &DatabaseClient, username: String, password: String) -> anyhow::Result<()> {
    if password.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    // Schema only; the configured bootstrap admin is not touched here
    let no_bootstrap = AdminBootstrap { enabled: false, username: String::new(), password: String::new() };
    db.initialize(&no_bootstrap).await?;

    match db.user_repo.get_user_by_username(&username).await? {
        Some(existing) => {
            let update = UpdateUserRequest { username: username.clone(), password: Some(password), is_admin: true };
            db.user_repo.update_user(existing.id, &update).await?;
            println!("🔑 User '{}' promoted to administrator and password reset", username);
        }
        None => {
            let create = CreateUserRequest { username: username.clone(), password, is_admin: true };
            let user = db.user_repo.create_user(&create).await?;
            println!("👤 Administrator '{}' created (id {})", user.username, user.id);
        }
    }
    Ok(())
}

async fn diagnose(db: &DatabaseClient, config: &AppConfig) -> anyhow::Result<()> {
    let target = db.manager.target()?;
    println!("Environment:   {:?}", config.environment);
    println!("Target:        {}", target.describe());
    if let Some(host) = target.host() {
        println!("Managed host:  {}", ssl::is_managed_host(&host));
    }
    println!("SSL required:  {}", db.manager.ssl_required()?);

    match db.manager.test_connection().await {
        Ok(()) => println!("Connection:    ok"),
        Err(e) => {
            println!("Connection:    failed ({})", e);
            return Err(e.into());
        }
    }

    let health = db.health_check().await;
    println!("Health:        {}", serde_json::to_string_pretty(&health)?);
    Ok(())
}
