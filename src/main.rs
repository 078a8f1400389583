mod config;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use paramcache::{
  filter_key_id, filter_type, new_filters, FilterFn, FilterOption, HttpSource, ParamClient,
  ParameterOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "paramcache")]
#[command(about = "Fetch and cache parameters from an SSM-style parameter store")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/paramcache/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Log at debug level unless RUST_LOG is set
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Seconds a fetched value stays valid (overrides config defaults)
  #[arg(long, global = true)]
  expiry_secs: Option<u64>,

  /// Refresh expired values automatically (overrides config defaults)
  #[arg(long, global = true)]
  auto_refresh: Option<bool>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print a single parameter
  Get { key: String },

  /// Print every parameter directly under a path
  Path {
    path: String,

    /// Only parameters encrypted with this KMS key
    #[arg(long)]
    key_id: Option<String>,

    /// Only parameters of this type (String, StringList, SecureString)
    #[arg(long = "type")]
    param_type: Option<String>,

    /// How filter values are compared
    #[arg(long, default_value = "Equals")]
    option: FilterOption,
  },

  /// Re-read a parameter periodically, refreshing it as it expires
  Watch {
    key: String,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: u64,

    /// Stop after this many reads
    #[arg(long)]
    count: Option<u64>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log, args.verbose)?;

  let source = HttpSource::new(&config.source.endpoint, config.source.max_retries)?;
  info!(endpoint = %source.endpoint(), "using parameter store");
  let client = ParamClient::new(Arc::new(source)).with_timeout(config.client.timeout());

  let options = parameter_options(&args, &config);

  match args.command {
    Command::Get { key } => {
      let param = client.fetch_by_key(&key, options).await?;
      println!("{}", param.value().await?);
    }
    Command::Path {
      path,
      key_id,
      param_type,
      option,
    } => {
      let mut builders: Vec<FilterFn> = Vec::new();
      if let Some(key_id) = key_id {
        builders.push(filter_key_id(&key_id, option));
      }
      if let Some(param_type) = param_type {
        builders.push(filter_type(&param_type, option));
      }
      let filters = new_filters(builders);

      for param in client.fetch_by_path(&path, &filters, options).await? {
        println!("{}={}", param.name(), param.value().await?);
      }
    }
    Command::Watch {
      key,
      interval_secs,
      count,
    } => {
      let param = client.fetch_by_key(&key, options).await?;
      let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
      let mut reads = 0u64;

      loop {
        interval.tick().await;
        match param.value().await {
          Ok(value) => println!("{}", value),
          Err(e) => warn!(key = %key, error = %e, "read failed"),
        }

        reads += 1;
        if count.is_some_and(|limit| reads >= limit) {
          break;
        }
      }
    }
  }

  Ok(())
}

fn parameter_options(args: &Args, config: &config::Config) -> ParameterOptions {
  let mut options = config.defaults.parameter_options();
  if let Some(secs) = args.expiry_secs {
    options.expires = true;
    options.expiry = Duration::from_secs(secs);
  }
  if let Some(auto_refresh) = args.auto_refresh {
    options.auto_refresh = auto_refresh;
  }
  options
}
