use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use vetauth::{
    commands::{self, RequestOptions, SignupOptions, UsersAction, config::ConfigOptions},
    users::ProfileUpdate,
};

/// vetauth - command-line client for the veterans' support API
///
/// Logs in, keeps the access/refresh token pair on disk and sends
/// authenticated requests, refreshing an expired access token once per
/// request.
///
/// The API base URL is taken from --api-url, then VETAUTH_API_URL, then
/// http://127.0.0.1:8000.
///
/// Examples:
///   vetauth login a@b.com
///   vetauth request GET /api/v1/users/
#[derive(Parser, Debug)]
#[command(author, version = env!("VETAUTH_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Credentials file (overrides the platform config directory)
    #[arg(long = "store", env = "VETAUTH_STORE", value_name = "PATH", global = true)]
    pub store_path: Option<PathBuf>,

    /// Delete stored tokens when a token refresh fails
    #[arg(long, env = "VETAUTH_PURGE_ON_REFRESH_FAILURE", global = true)]
    pub purge_on_refresh_failure: bool,

    /// Per-request timeout in seconds
    #[arg(
        long,
        value_name = "SECONDS",
        global = true,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,
}

impl Cli {
    fn config_options(&self) -> ConfigOptions {
        ConfigOptions {
            api_url: self.api_url.clone(),
            store_path: self.store_path.clone(),
            purge_on_refresh_failure: self.purge_on_refresh_failure,
            timeout_secs: self.timeout,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Log in and store the issued tokens
    Login(LoginArgs),

    /// Create an account and log in
    Signup(SignupArgs),

    /// Forget the stored tokens
    Logout,

    /// Show which tokens are stored
    Status,

    /// Send an authenticated request and print the response
    Request(RequestArgs),

    /// Member profiles and connections
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
}

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Username (the email address used at sign-up)
    pub username: String,

    /// Password (prompted for when omitted)
    #[arg(long, env = "VETAUTH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SignupArgs {
    pub email: String,

    #[arg(long = "full-name", value_name = "NAME")]
    pub full_name: String,

    /// Password (prompted for, with confirmation, when omitted)
    #[arg(long)]
    pub password: Option<String>,

    #[arg(long = "confirm-password", requires = "password")]
    pub confirm_password: Option<String>,

    /// Create the account without logging in
    #[arg(long)]
    pub no_login: bool,
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// HTTP method, e.g. GET or POST
    pub method: String,

    /// Path below the API URL, or an absolute URL
    pub path: String,

    /// JSON request body
    #[arg(long, short = 'd', value_name = "JSON")]
    pub data: Option<String>,

    /// Extra header, repeatable
    #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Surface a 401 instead of refreshing the access token
    #[arg(long)]
    pub no_refresh: bool,
}

#[derive(clap::Subcommand, Debug)]
enum UsersCommand {
    /// List all members
    List,

    /// Show one member's profile
    Show { id: u64 },

    /// Update profile fields; omitted fields are left as they are
    Update {
        id: u64,
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// List a member's connections
    Connections { id: u64 },

    /// Connect a member to another
    Connect { id: u64, other: u64 },

    /// Remove a connection
    Disconnect { id: u64, other: u64 },
}

#[derive(clap::Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub job: Option<String>,
    #[arg(long = "mental-health")]
    pub mental_health: Option<u16>,
    #[arg(long)]
    pub wellness: Option<u16>,
    #[arg(long)]
    pub engage: Option<u16>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub age: Option<u16>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub hobby: Option<String>,
}

impl From<ProfileArgs> for ProfileUpdate {
    fn from(args: ProfileArgs) -> Self {
        ProfileUpdate {
            job: args.job,
            mental_health: args.mental_health,
            wellness: args.wellness,
            engage: args.engage,
            location: args.location,
            gender: args.gender,
            age: args.age,
            description: args.description,
            hobby: args.hobby,
        }
    }
}

impl From<UsersCommand> for UsersAction {
    fn from(command: UsersCommand) -> Self {
        match command {
            UsersCommand::List => UsersAction::List,
            UsersCommand::Show { id } => UsersAction::Show { id },
            UsersCommand::Update { id, profile } => UsersAction::Update {
                id,
                update: profile.into(),
            },
            UsersCommand::Connections { id } => UsersAction::Connections { id },
            UsersCommand::Connect { id, other } => UsersAction::Connect { id, other },
            UsersCommand::Disconnect { id, other } => UsersAction::Disconnect { id, other },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = vetauth::runtime::RealRuntime;
    let options = cli.config_options();

    match cli.command {
        Commands::Login(args) => {
            commands::login(runtime, options, &args.username, args.password).await?
        }
        Commands::Signup(args) => {
            let signup = SignupOptions {
                email: args.email,
                full_name: args.full_name,
                password: args.password,
                confirm_password: args.confirm_password,
                no_login: args.no_login,
            };
            commands::signup(runtime, options, signup).await?
        }
        Commands::Logout => commands::logout(runtime, options)?,
        Commands::Status => commands::status(runtime, options)?,
        Commands::Request(args) => {
            let request = RequestOptions {
                method: args.method,
                path: args.path,
                data: args.data,
                headers: args.headers,
                no_refresh: args.no_refresh,
            };
            commands::request(runtime, options, request).await?
        }
        Commands::Users { command } => {
            commands::users(runtime, options, command.into()).await?
        }
    }
    Ok(())
}
