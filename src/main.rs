//! `profilehub` command line: account and profile management against a
//! hosted auth provider.
//!
//! Results print as JSON on stdout. Notifications raised while a command
//! runs print on stderr after it finishes, next to the tracing log.

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use time::Date;
use tracing_subscriber::EnvFilter;

use auth::notify::drain;
use auth::validators::{validate_email, validate_password_match, validate_password_strength};
use auth::{AuthError, AuthSession, Level, SignUpOutcome};

use profilehub::config::{Config, ConfigError};
use profilehub::profile::avatars::{AVATARS, AvatarCategory, by_category};
use profilehub::profile::{AddressInfo, BasicInfo, EmailChange, Gender, PasswordChange, ProfileError, ProfileUpdate};
use profilehub::router::{NavigationError, Router};
use profilehub::state::{AppState, StateError};

const DEFAULT_LOG_FILTER: &str = "profilehub=info,auth=info,warn";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "profilehub", about = "Account and profile management CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROFILEHUB_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "PROFILEHUB_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROFILEHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    SignOut,
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    UpdatePassword {
        #[arg(long, env = "PROFILEHUB_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "PROFILEHUB_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    UpdateEmail {
        #[arg(long)]
        email: String,
    },
    /// Show the current session.
    Session,
    /// Run a guarded navigation and print where it lands.
    Navigate { path: String },
    Profile(ProfileCommand),
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    /// List the preset avatars.
    Avatars {
        #[arg(long)]
        category: Option<AvatarCategory>,
    },
    /// Change basic info. Omitted fields keep their current value.
    UpdateBasic {
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        gender: Option<Gender>,
        #[arg(long, value_parser = parse_date, help = "YYYY-MM-DD")]
        birthday: Option<Date>,
        #[arg(long)]
        bio: Option<String>,
    },
    UpdateAddress {
        #[arg(long)]
        province: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        district: String,
        #[arg(long)]
        detailed_address: String,
    },
    ChangePassword {
        #[arg(long, env = "PROFILEHUB_PASSWORD", hide_env_values = true)]
        old_password: String,
        #[arg(long, env = "PROFILEHUB_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
        #[arg(long, env = "PROFILEHUB_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    ChangeEmail {
        #[arg(long, env = "PROFILEHUB_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        new_email: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let app = AppState::new(&config)?;
    let _background = app.spawn_background(config.auto_refresh);
    let mut toasts = app.notifier.subscribe();

    let result = run(&app, cli.command).await;
    for notification in drain(&mut toasts) {
        eprintln!("[{}] {}", level_label(notification.level), notification.message);
    }
    result
}

async fn run(app: &AppState, command: Command) -> Result<(), CliError> {
    match command {
        Command::SignUp { email, password, confirm_password } => {
            check(validate_email(&email))?;
            check(validate_password_strength(&password))?;
            check(validate_password_match(&password, &confirm_password))?;
            let outcome = app.actions.sign_up(&email, &password).await?;
            let body = match outcome {
                SignUpOutcome::Registered(user) => json!({ "status": "registered", "user": user }),
                SignUpOutcome::PendingConfirmation => json!({ "status": "pending_confirmation" }),
            };
            print_json(&body)
        }
        Command::SignIn { email, password } => {
            check(validate_email(&email))?;
            let session = app.actions.sign_in(&email, &password).await?;
            print_json(&session_summary(Some(&session)))
        }
        Command::SignOut => {
            app.actions.sign_out().await?;
            print_json(&json!({ "signed_out": true }))
        }
        Command::ResetPassword { email } => {
            check(validate_email(&email))?;
            app.actions.reset_password(&email).await?;
            print_json(&json!({ "sent": true }))
        }
        Command::UpdatePassword { password, confirm_password } => {
            check(validate_password_strength(&password))?;
            check(validate_password_match(&password, &confirm_password))?;
            app.actions.update_password(&password).await?;
            print_json(&json!({ "updated": true }))
        }
        Command::UpdateEmail { email } => {
            check(validate_email(&email))?;
            app.actions.update_email(&email).await?;
            print_json(&json!({ "updated": true }))
        }
        Command::Session => {
            let snapshot = app.cache.initialize().await;
            if let Some(err) = snapshot.error() {
                return Err(err.clone().into());
            }
            print_json(&session_summary(snapshot.data()))
        }
        Command::Navigate { path } => {
            let mut router = Router::new(app.guard.clone(), app.app_name.clone());
            let location = router.push(&path).await?;
            let body = json!({ "path": location.full_path, "route": location.route.name });
            print_json(&json!({ "location": body, "title": router.title() }))
        }
        Command::Profile(profile) => run_profile(app, profile.command).await,
    }
}

async fn run_profile(app: &AppState, command: ProfileSubcommand) -> Result<(), CliError> {
    match command {
        ProfileSubcommand::Show => {
            let profile = app.profiles.load().await?;
            print_json(&serde_json::to_value(profile)?)
        }
        ProfileSubcommand::Avatars { category } => {
            let avatars: Vec<_> = match category {
                Some(category) => by_category(category).collect(),
                None => AVATARS.iter().collect(),
            };
            print_json(&serde_json::to_value(avatars)?)
        }
        ProfileSubcommand::UpdateBasic { nickname, avatar, gender, birthday, bio } => {
            let current = app.profiles.load().await?;
            let info = BasicInfo {
                nickname: nickname.unwrap_or(current.nickname),
                avatar: avatar.unwrap_or(current.avatar),
                gender: gender.unwrap_or(current.gender),
                birthday: Some(birthday.unwrap_or(current.birthday)),
                bio: bio.unwrap_or(current.bio),
            };
            update(app, ProfileUpdate::Basic(info)).await
        }
        ProfileSubcommand::UpdateAddress { province, city, district, detailed_address } => {
            let info = AddressInfo { province, city, district, detailed_address };
            update(app, ProfileUpdate::Address(info)).await
        }
        ProfileSubcommand::ChangePassword { old_password, new_password, confirm_password } => {
            let change = PasswordChange { old_password, new_password, confirm_password };
            update(app, ProfileUpdate::Password(change)).await
        }
        ProfileSubcommand::ChangeEmail { password, new_email } => {
            update(app, ProfileUpdate::Email(EmailChange { password, new_email })).await
        }
    }
}

async fn update(app: &AppState, update: ProfileUpdate) -> Result<(), CliError> {
    match app.profiles.update(update).await {
        Ok(()) => print_json(&json!({ "updated": true })),
        Err(ProfileError::Invalid(fields)) => {
            let errors: Vec<Value> =
                fields.iter().map(|e| json!({ "field": e.field, "message": e.message })).collect();
            print_json(&json!({ "updated": false, "errors": errors }))?;
            Err(CliError::Invalid(fields.first().map_or("invalid form", |e| e.message)))
        }
        Err(err) => Err(err.into()),
    }
}

/// Session without its tokens.
fn session_summary(session: Option<&AuthSession>) -> Value {
    match session {
        Some(session) => json!({
            "signed_in": true,
            "user": session.user,
            "expires_in": session.expires_in,
        }),
        None => json!({ "signed_in": false }),
    }
}

fn check(rule: Option<&'static str>) -> Result<(), CliError> {
    rule.map_or(Ok(()), |message| Err(CliError::Invalid(message)))
}

fn parse_date(raw: &str) -> Result<Date, String> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(raw, format).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::Success => "ok",
        Level::Error => "error",
        Level::Info => "info",
        Level::Warning => "warn",
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
