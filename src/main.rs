use anyhow::Result;
use clap::Parser;
use fetchr::commands::{self, Data};
use fetchr::config::{Config, DEFAULT_MAX_REDIRECTS};
use fetchr::http::{RETRY_DELAY_MS, RetryPolicy};
use fetchr::request::Method;
use std::time::Duration;

/// fetchr - make an HTTP request and print the response
///
/// A successful (2xx) response body is written to stdout: JSON is
/// pretty-printed, text is printed as-is. Any other outcome exits non-zero
/// with the reason on stderr.
///
/// Examples:
///   fetchr send https://api.example.com
///   fetchr send -X POST -d '{"name":"widget"}' https://api.example.com/items
///   fetchr graphql https://api.example.com/graphql --query '{ users { name email } }'
#[derive(Parser, Debug)]
#[command(author, version = env!("FETCHR_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL for relative request paths such as /api/getData (also via FETCHR_BASE_URL)
    #[arg(long, env = "FETCHR_BASE_URL", value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Request timeout in milliseconds (also via FETCHR_TIMEOUT_MS)
    #[arg(long, short = 't', env = "FETCHR_TIMEOUT_MS", value_name = "MS", global = true)]
    timeout: Option<u64>,

    /// Maximum redirects to follow; 0 reports 3xx responses as errors
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_REDIRECTS, global = true)]
    max_redirects: usize,

    /// Total attempts for transient failures (connection errors, 408, 429, 5xx)
    #[arg(long, value_name = "N", default_value_t = 1, global = true)]
    retries: usize,

    /// Delay between attempts in milliseconds
    #[arg(long, value_name = "MS", default_value_t = RETRY_DELAY_MS, global = true)]
    retry_delay: u64,

    /// Print the status line and response headers before the body
    #[arg(long, short = 'i', global = true)]
    include: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a request
    Send(SendArgs),

    /// Send a GraphQL query as a JSON POST
    Graphql(GraphqlArgs),
}

#[derive(clap::Args, Debug)]
pub struct SendArgs {
    /// Absolute http(s) URL, or a path resolved against --base-url
    #[arg(value_name = "URL")]
    pub url: String,

    /// Request method
    #[arg(long = "request", short = 'X', value_name = "METHOD", default_value = "GET")]
    pub method: Method,

    /// Request header, e.g. 'Accept: application/json' (repeatable)
    #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// JSON body, or @file to read it from a file
    #[arg(long, short = 'd', value_name = "JSON", conflicts_with = "data_raw")]
    pub data: Option<String>,

    /// Body sent verbatim as text
    #[arg(long, value_name = "TEXT")]
    pub data_raw: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct GraphqlArgs {
    /// GraphQL endpoint
    #[arg(value_name = "URL")]
    pub url: String,

    /// Query document
    #[arg(long, short = 'q', value_name = "QUERY")]
    pub query: String,

    /// Variables as a JSON object, or @file
    #[arg(long, value_name = "JSON")]
    pub variables: Option<String>,

    /// Request header (repeatable)
    #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
    pub headers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut config = Config {
        max_redirects: cli.max_redirects,
        ..Config::default()
    }
    .with_timeout_ms(cli.timeout);
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }

    let spec = match cli.command {
        Commands::Send(args) => {
            let data = match (args.data, args.data_raw) {
                (Some(json), _) => Some(Data::Json(json)),
                (None, Some(text)) => Some(Data::Raw(text)),
                (None, None) => None,
            };
            commands::build_send_spec(&args.url, args.method, &args.headers, data)?
        }
        Commands::Graphql(args) => commands::build_graphql_spec(
            &args.url,
            &args.query,
            args.variables.as_deref(),
            &args.headers,
        )?,
    };

    let client = config.build_client()?;
    let policy = RetryPolicy::new(cli.retries, Duration::from_millis(cli.retry_delay));
    let mut stdout = std::io::stdout().lock();
    commands::send(&client, spec, &policy, cli.include, &mut stdout).await
}
