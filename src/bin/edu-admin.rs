//! Platform Administration CLI
//!
//! Operator tasks that bypass the HTTP API: bootstrapping the first admin,
//! changing roles, revoking sessions and flushing catalog cache entries.
//!
//! Commands act on the shared PostgreSQL database and Redis only; they refuse
//! to run against the in-process backends, whose contents vanish on exit.

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use uuid::Uuid;

use edu_core::{
    cache::{connect_redis, keys, Cache},
    config::{AppConfig, StorageBackend},
    models::{Role, UserWithPassword},
    repository::{constraints, Stores, UserStore},
    service::UserService,
    utils::{
        security::hash_password,
        validation::{normalize_email, validate_email},
    },
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Education platform administration CLI
#[derive(Parser)]
#[command(name = "edu-admin", about = "Education platform administration CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
    /// Change the role of an existing user
    SetRole(SetRoleArgs),
    /// Revoke every refresh token of a user
    RevokeSessions(UserArgs),
    /// Delete the cached category list, featured list and course list generation
    FlushCatalogCache,
}

#[derive(Args)]
struct CreateAdminArgs {
    /// Login email
    #[arg(short, long)]
    email: String,

    /// Initial password
    #[arg(short, long)]
    password: String,

    /// Display name
    #[arg(short = 'n', long, default_value = "Administrator")]
    full_name: String,
}

#[derive(Args)]
struct SetRoleArgs {
    /// Email of the user
    email: String,

    /// user, instructor or admin
    role: Role,
}

#[derive(Args)]
struct UserArgs {
    /// Email of the user
    email: String,
}

#[tokio::main]
async fn main() -> CliResult {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    config.validate()?;

    match cli.command {
        Commands::CreateAdmin(args) => create_admin(&config, args).await?,
        Commands::SetRole(args) => set_role(&config, args).await?,
        Commands::RevokeSessions(args) => revoke_sessions(&config, args).await?,
        Commands::FlushCatalogCache => flush_catalog_cache(&config).await?,
    }

    Ok(())
}

async fn create_admin(config: &AppConfig, args: CreateAdminArgs) -> CliResult {
    if !validate_email(&args.email) {
        return Err(format!("invalid email: {}", args.email).into());
    }
    if args.password.len() < 6 {
        return Err("password must be at least 6 characters".into());
    }

    let stores = open_stores(config).await?;
    let now = Utc::now();
    let user = UserWithPassword {
        id: Uuid::new_v4(),
        email: normalize_email(&args.email),
        password_hash: hash_password(&args.password)?,
        full_name: args.full_name.trim().to_string(),
        role: Role::Admin,
        profile_picture: None,
        created_at: now,
        updated_at: now,
    };

    match stores.users.create(&user).await {
        Ok(()) => {
            println!("Created admin {} ({})", user.email, user.id);
            Ok(())
        }
        Err(e) if e.is_duplicate_of(constraints::USERS_EMAIL) => {
            Err(format!("{} is already registered; use set-role instead", user.email).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn set_role(config: &AppConfig, args: SetRoleArgs) -> CliResult {
    let stores = open_stores(config).await?;
    let user_id = find_user(&stores, &args.email).await?;

    let users = UserService::new(stores.users, stores.refresh_tokens);
    let user = users.set_role(user_id, args.role).await?;

    println!("{} is now {}", user.email, user.role);
    Ok(())
}

async fn revoke_sessions(config: &AppConfig, args: UserArgs) -> CliResult {
    let stores = open_stores(config).await?;
    let user_id = find_user(&stores, &args.email).await?;

    let users = UserService::new(stores.users, stores.refresh_tokens);
    let revoked = users.revoke_sessions(user_id).await?;

    println!("Revoked {} sessions of {}", revoked, args.email);
    Ok(())
}

async fn flush_catalog_cache(config: &AppConfig) -> CliResult {
    let cache = connect_redis(&config.redis).await?;

    for key in [
        keys::ALL_CATEGORIES,
        keys::FEATURED_COURSES,
        keys::COURSE_LIST_GENERATION,
    ] {
        cache.delete(key).await?;
        println!("Deleted {}", key);
    }

    println!("Catalog cache entries flushed; course detail entries expire on their own");
    Ok(())
}

fn require_durable_storage(config: &AppConfig) -> CliResult {
    match config.storage {
        StorageBackend::Postgres => Ok(()),
        StorageBackend::Memory => Err(
            "STORAGE_BACKEND=memory keeps data inside one process; set STORAGE_BACKEND=postgres"
                .into(),
        ),
    }
}

async fn open_stores(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    require_durable_storage(config)?;
    Ok(Stores::connect(config.storage, &config.database).await?)
}

async fn find_user(stores: &Stores, email: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    stores
        .users
        .get_by_email(&normalize_email(email))
        .await?
        .map(|user| user.id)
        .ok_or_else(|| format!("no user with email {}", email).into())
}
