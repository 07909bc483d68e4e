use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ppms_api::{config, db, entities::UserRole, services::auth::AuthService};
use std::sync::Arc;

/// Creates a login, or resets the password and role of an existing one.
#[derive(Parser, Debug)]
#[command(name = "create-user", version)]
struct Cli {
    /// Login name
    username: String,
    /// Plain-text password; at least 4 characters
    #[arg(long, short)]
    password: String,
    #[arg(long, value_enum, default_value_t = RoleArg::User)]
    role: RoleArg,
    /// Apply pending migrations before writing
    #[arg(long)]
    migrate: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => UserRole::User,
            RoleArg::Admin => UserRole::Admin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cli.migrate || cfg.auto_migrate {
        db::run_migrations(&pool).await?;
    }

    let auth = AuthService::new(Arc::new(pool), cfg.jwt_secret.clone(), cfg.jwt_expiration);
    let user = auth
        .create_or_reset_user(&cli.username, &cli.password, cli.role.into())
        .await?;

    println!("saved user '{}' (id {}, role {:?})", user.username, user.id, user.role);
    Ok(())
}
