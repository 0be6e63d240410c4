use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use utoipa::OpenApi;

use atelier_core::models::user;
use atelier_core::openapi::ApiDoc;
use atelier_core::prelude::*;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Content API with role-based approval for the atelier CMS")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Run pending migrations and exit
    Migrate,
    /// User operations
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Print a bearer token for a user
    Token {
        /// User ID
        user_id: String,
        /// Token lifetime in hours (defaults to JWT_EXPIRY_HOURS)
        #[arg(long)]
        hours: Option<u64>,
    },
    /// Inspect the effective policy
    Policy {
        #[command(subcommand)]
        action: PolicyCommands,
    },
    /// OpenAPI documentation operations
    Docs {
        #[command(subcommand)]
        action: DocsCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Role to grant; repeat for several (owner, admin, editor, author, moderator, viewer)
        #[arg(long = "role", required = true)]
        roles: Vec<Role>,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Print built-in defaults merged with POLICY_FILE, as TOML
    Show,
}

#[derive(Subcommand)]
enum DocsCommands {
    /// Export the OpenAPI document to a file
    Export {
        /// Output format: json or yaml
        #[arg(long, default_value = "json")]
        format: String,
        /// Output file path
        #[arg(long, short, default_value = "openapi.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    atelier_core::logging::init_logging_for(&config.log_format);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Config) -> Result<(), AtelierError> {
    match command {
        Commands::Serve => App::with_config(config).await?.run().await,
        Commands::Migrate => {
            let db = atelier_core::db::connect(&config).await?;
            atelier_core::app::run_migrations(&db).await
        }
        Commands::User { action } => match action {
            UserCommands::Add { name, email, roles } => {
                let db = atelier_core::db::connect(&config).await?;
                atelier_core::app::run_migrations(&db).await?;
                let created = user::create(&db, &name, &email, &roles).await?;
                println!("{}", created.id);
                Ok(())
            }
        },
        Commands::Token { user_id, hours } => {
            let db = atelier_core::db::connect(&config).await?;
            if user::find(&db, &user_id).await?.is_none() {
                return Err(AtelierError::NotFound(format!("User '{}' not found", user_id)));
            }
            let hours = hours.unwrap_or(config.jwt_expiry_hours);
            let token = atelier_core::auth::create_token(&user_id, &config.jwt_secret, hours)?;
            println!("{}", token);
            Ok(())
        }
        Commands::Policy { action } => match action {
            PolicyCommands::Show => {
                print!("{}", config.load_policy()?.to_toml()?);
                Ok(())
            }
        },
        Commands::Docs { action } => match action {
            DocsCommands::Export { format, output } => export_openapi(&format, &output),
        },
    }
}

fn export_openapi(format: &str, output: &PathBuf) -> Result<(), AtelierError> {
    let doc = ApiDoc::openapi();
    let spec = match format {
        "json" => doc
            .to_pretty_json()
            .map_err(|e| AtelierError::Internal(format!("Failed to render JSON: {}", e)))?,
        "yaml" => doc
            .to_yaml()
            .map_err(|e| AtelierError::Internal(format!("Failed to render YAML: {}", e)))?,
        other => {
            return Err(AtelierError::BadRequest(format!(
                "Unsupported format: {}. Use 'json' or 'yaml'.",
                other
            )));
        }
    };

    std::fs::write(output, spec).map_err(|e| {
        AtelierError::Internal(format!("Cannot write {}: {}", output.display(), e))
    })?;
    println!("OpenAPI spec exported to: {}", output.display());
    Ok(())
}
