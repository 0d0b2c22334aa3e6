//! Purpose: `tagfolders` CLI entry point for managing a user's folder tree.
//! Role: Binary crate root; parses args, builds the client, emits JSON on stdout.
//! Invariants: Successful commands print exactly one JSON document on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Logs go to stderr through `tracing`; stdout stays machine-readable.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::time::Duration;

use clap::{Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use tagfolders::api::{
    Environment, Error, ErrorKind, INTERNETBOOK_RESOURCE_TYPE, ServiceConfig, UserFolders,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `tagfolders --help`."));
            }
        },
    };

    init_tracing();

    let config = service_config(&cli)?;
    let folders = UserFolders::from_config(&config)?
        .with_timeout(Duration::from_millis(cli.timeout_ms));
    command_dispatch::dispatch_command(cli.command, &folders)
}

#[derive(Parser)]
#[command(
    name = "tagfolders",
    version,
    about = "Manage a user's folder tree stored in the tagging service",
    long_about = None,
    after_help = r#"EXAMPLES
  $ tagfolders --token "$TOKEN" create Math --color '#ff0000'
  $ tagfolders --token "$TOKEN" create Algebra --color '#00ff00' --parent <uuid>
  $ tagfolders --token "$TOKEN" ls --parent <uuid>
  $ tagfolders --token "$TOKEN" add <uuid> 9780000000001
  $ tagfolders --token "$TOKEN" content <uuid>"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long = "env",
        env = "TAGFOLDERS_ENV",
        default_value = "production",
        help = "Deployment environment: production|staging|local|test"
    )]
    environment: String,
    #[arg(
        long,
        env = "TAGFOLDERS_SERVICE_URL",
        help = "Tagging service base URL (overrides --env)"
    )]
    service_url: Option<String>,
    #[arg(long, default_value = tagfolders::api::DEFAULT_BASE_DOMAIN)]
    base_domain: String,
    #[arg(
        long,
        env = "TAGFOLDERS_BEARER_TOKEN",
        hide_env_values = true,
        help = "User bearer token; also determines the folder identity"
    )]
    token: Option<String>,
    #[arg(
        long,
        env = "TAGFOLDERS_API_KEY",
        hide_env_values = true,
        conflicts_with = "token",
        help = "Service API key (folder commands still need a token for identity)"
    )]
    api_key: Option<String>,
    #[arg(long, default_value_t = 3000, help = "Per-request timeout in milliseconds")]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the identity derived from the bearer token.
    Whoami,
    /// Create a folder at the root or under --parent.
    Create {
        name: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Rename and/or recolor a folder; omitted fields are kept.
    Update {
        uuid: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Move a folder under --parent, or to the root when omitted.
    Move {
        uuid: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Show one folder.
    Get { uuid: String },
    /// List direct children of --parent (root by default), or every folder with --all.
    Ls {
        #[arg(long, conflicts_with = "all")]
        parent: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// List subfolders and content of a folder.
    Content { uuid: String },
    /// Put a resource into a folder.
    Add {
        uuid: String,
        identifier: String,
        #[arg(long = "type", default_value = INTERNETBOOK_RESOURCE_TYPE)]
        resource_type: String,
    },
    /// Take a resource out of a folder.
    Remove {
        uuid: String,
        identifier: String,
        #[arg(long = "type", default_value = INTERNETBOOK_RESOURCE_TYPE)]
        resource_type: String,
    },
    /// Delete one folder (its children and content are left in place).
    Rm { uuid: String },
    /// Delete every folder of this identity (content tags are left in place).
    RmAll {
        #[arg(long, help = "Confirm deleting all folders")]
        yes: bool,
    },
}

fn service_config(cli: &Cli) -> Result<ServiceConfig, Error> {
    let environment: Environment = cli.environment.parse()?;
    let mut config = ServiceConfig::new(environment).with_base_domain(cli.base_domain.clone());
    if let Some(url) = &cli.service_url {
        config = config.with_service_url(url.clone());
    }
    if let Some(token) = &cli.token {
        config = config.with_bearer_token(token.clone());
    } else if let Some(key) = &cli.api_key {
        config = config.with_api_key(key.clone());
    }
    Ok(config)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Configuration => "missing or invalid configuration".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Transport => "tagging service request failed".to_string(),
        ErrorKind::Corrupt => "corrupt folder data".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(resource) = err.resource() {
        inner.insert("resource".to_string(), json!(resource));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(body) = err.body().filter(|body| !body.is_empty()) {
        inner.insert("body".to_string(), json!(body));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(status) = err.status() {
        lines.push(format!("status: {status}"));
    }
    if let Some(body) = err.body().filter(|body| !body.is_empty()) {
        lines.push(format!("body: {body}"));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, error_json, service_config};
    use clap::Parser;
    use tagfolders::api::{Error, ErrorKind};

    #[test]
    fn parses_create_with_parent() {
        let cli = Cli::try_parse_from([
            "tagfolders", "--env", "local", "--token", "t", "create", "Algebra", "--color",
            "#00ff00", "--parent", "p-1",
        ])
        .expect("parse");
        match &cli.command {
            Command::Create { name, color, parent } => {
                assert_eq!(name, "Algebra");
                assert_eq!(color, "#00ff00");
                assert_eq!(parent.as_deref(), Some("p-1"));
            }
            _ => panic!("expected create"),
        }
        let config = service_config(&cli).expect("config");
        assert_eq!(
            config.base_url().expect("url").as_str(),
            "https://staging-tagging.services.systime.dk/"
        );
        assert_eq!(config.credentials.bearer_token(), Some("t"));
    }

    #[test]
    fn token_and_api_key_conflict() {
        let result = Cli::try_parse_from(["tagfolders", "--token", "t", "--api-key", "k", "whoami"]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_environment_is_usage_error() {
        let cli = Cli::try_parse_from(["tagfolders", "--env", "mars", "whoami"]).expect("parse");
        let err = service_config(&cli).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn error_json_carries_transport_details() {
        let err = Error::new(ErrorKind::Transport)
            .with_message("got 500")
            .with_status(500)
            .with_body("boom");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Transport");
        assert_eq!(value["error"]["status"], 500);
        assert_eq!(value["error"]["body"], "boom");
    }
}
