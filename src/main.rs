
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use projectflow::config::{ConfigError, ShellConfig};
use projectflow::net::api::{ApiError, HttpIdentityApi, IdentityApi};
use projectflow::net::mock::MockIdentityApi;
use projectflow::net::types::User;
use projectflow::services::gateway::{AuthError, AuthGateway};
use projectflow::shell::AppShell;
use projectflow::state::auth::{SessionState, SessionStore};
use projectflow::state::storage::{DurableStorage, FileStorage, MemoryStorage};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("identity API error: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "projectflow", about = "ProjectFlow session shell")]
struct Cli {
    /// Identity API base URL. Without one the in-memory demo service is used.
    #[arg(long, env = "PROJECTFLOW_API_URL")]
    api_url: Option<String>,

    /// Storage file for the session token.
    #[arg(long, env = "PROJECTFLOW_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    /// Use the in-memory demo identity service even if an API URL is configured.
    #[arg(long, default_value_t = false)]
    demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in as it.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the persisted session.
    Logout,
    /// Print the identity behind the persisted session.
    Whoami,
    /// Show what the app renders for a path.
    Visit { path: String },
    /// Interactive session: login/register/logout/whoami/visit from stdin.
    Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ShellConfig::from_env()?;
    if let Some(url) = cli.api_url {
        let url = url.trim().trim_end_matches('/');
        config.api_url = (!url.is_empty()).then(|| url.to_owned());
    }
    if let Some(path) = cli.token_path {
        config.storage_path = path;
    }
    if cli.demo {
        config.api_url = None;
    }

    let shell = build_shell(&config)?;

    match cli.command {
        Command::Login { email, password } => {
            shell.wait_ready().await;
            shell.gateway().login(&email, &password).await?;
            print_session(&shell.session());
        }
        Command::Register { name, email, password } => {
            shell.wait_ready().await;
            shell.gateway().register(&name, &email, &password).await?;
            print_session(&shell.session());
        }
        Command::Logout => {
            shell.gateway().logout();
            println!("signed out");
        }
        Command::Whoami => {
            shell.wait_ready().await;
            print_session(&shell.session());
        }
        Command::Visit { path } => {
            shell.wait_ready().await;
            let nav = shell.navigate(&path);
            println!("{} => {}", nav.path, nav.view);
        }
        Command::Shell => run_repl(&shell).await?,
    }
    Ok(())
}

fn build_shell(config: &ShellConfig) -> Result<AppShell, CliError> {
    let api: Arc<dyn IdentityApi>;
    let storage: Arc<dyn DurableStorage>;
    if let Some(url) = &config.api_url {
        tracing::info!(api_url = %url, storage = %config.storage_path.display(), "using identity API");
        api = Arc::new(HttpIdentityApi::new(url, config.http)?);
        storage = Arc::new(FileStorage::new(&config.storage_path));
    } else {
        // Tokens from the in-memory service die with the process, so they are not written to disk.
        tracing::warn!("no identity API configured; using in-memory demo service");
        api = Arc::new(MockIdentityApi::with_demo_account());
        storage = Arc::new(MemoryStorage::new());
    }

    let store = Arc::new(SessionStore::new(storage));
    let gateway = Arc::new(AuthGateway::new(store, api, config.resolve_timeout));
    Ok(AppShell::start(gateway, config.min_loading))
}

fn print_session(state: &SessionState) {
    match (&state.user, &state.error) {
        (Some(user), _) => println!("[{}] {} <{}> ({})", user.initial(), user.name, user.email, user.role),
        (None, Some(error)) => println!("anonymous ({error})"),
        (None, None) => println!("anonymous"),
    }
}

const REPL_HELP: &str = "commands: login <email> <password> | register <name...> <email> <password> | logout | whoami | visit <path> | help | quit";

async fn run_repl(shell: &AppShell) -> Result<(), CliError> {
    let mut changes = shell.gateway().store().subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let phase = changes.borrow_and_update().phase();
            tracing::debug!(?phase, "session changed");
        }
    });

    println!("{}", shell.render("/"));
    shell.wait_ready().await;
    println!("{}", shell.navigate("/").view);
    println!("{REPL_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["quit" | "exit"] => break,
            ["help"] => println!("{REPL_HELP}"),
            ["whoami"] => print_session(&shell.session()),
            ["logout"] => {
                shell.gateway().logout();
                println!("{}", shell.navigate("/login").view);
            }
            ["visit" | "go", path] => {
                let nav = shell.navigate(path);
                println!("{} => {}", nav.path, nav.view);
            }
            ["login", email, password] => submit(shell, shell.gateway().login(email, password)).await,
            ["register", name @ .., email, password] if !name.is_empty() => {
                let name = name.join(" ");
                submit(shell, shell.gateway().register(&name, email, password)).await;
            }
            _ => println!("unrecognised command; {REPL_HELP}"),
        }
    }
    Ok(())
}

async fn submit<F>(shell: &AppShell, attempt: F)
where
    F: Future<Output = Result<User, AuthError>>,
{
    match attempt.await {
        Ok(_) => println!("{}", shell.navigate("/dashboard").view),
        Err(e) => println!("{e}"),
    }
}
