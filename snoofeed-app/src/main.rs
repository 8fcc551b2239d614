use anyhow::Result;
use clap::{Parser, ValueEnum};
use snoofeed_common::observability::{LogConfig, LogFormat, init_logging};
use snoofeed_config::{RedditConfig, SnoofeedConfig, SnoofeedConfigLoader};
use snoofeed_social::reddit::{CollectOptions, RedditApi, RedditSettings, collect_posts};
use std::path::PathBuf;
use std::time::Duration;
mod report;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snoofeed")]
#[command(about = "Collect hot posts from a subreddit through Reddit's mobile API")]
struct Args {
    /// Subreddit to read, with or without the `r/` prefix [default: Steam]
    subreddit: Option<String>,

    /// Number of posts to collect [default: 100]
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Config file (YAML); replaces the default lookup locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (defaults to reddit_posts_<subreddit>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for the default output file name
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Pause between page requests, in milliseconds [default: 1000]
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Per-request timeout, in seconds [default: 30]
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,

    /// Skip the console summary and stderr logging
    #[arg(short, long)]
    quiet: bool,
}

fn normalize_subreddit(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('/');
    let s = s
        .strip_prefix("r/")
        .or_else(|| s.strip_prefix("R/"))
        .unwrap_or(s);
    s.trim_end_matches('/').to_string()
}

fn load_config(args: &Args) -> Result<SnoofeedConfig> {
    let loader = match &args.config {
        Some(path) => SnoofeedConfigLoader::new().with_file(path),
        None => SnoofeedConfigLoader::new().with_default_files(),
    };
    Ok(loader.load()?)
}

/// CLI flags sit above every config source.
fn apply_overrides(cfg: &mut SnoofeedConfig, args: &Args) {
    if let Some(sub) = &args.subreddit {
        cfg.collect.subreddit = sub.clone();
    }
    cfg.collect.subreddit = normalize_subreddit(&cfg.collect.subreddit);
    if let Some(n) = args.count {
        cfg.collect.target_count = n;
    }
    if let Some(dir) = &args.output_dir {
        cfg.collect.output_dir = Some(dir.clone());
    }
    if let Some(ms) = args.delay_ms {
        cfg.collect.page_delay_ms = ms;
    }
    if let Some(secs) = args.timeout_secs {
        cfg.reddit.timeout_secs = Some(secs);
    }
    if let Some(format) = args.log_format {
        cfg.logging.format = format.into();
    }
    if args.quiet {
        cfg.logging.stderr = false;
    }
}

fn reddit_settings(cfg: &RedditConfig) -> RedditSettings {
    let defaults = RedditSettings::default();
    RedditSettings {
        client_id: cfg.client_id.clone().unwrap_or(defaults.client_id),
        user_agent: cfg.user_agent.clone().unwrap_or(defaults.user_agent),
        auth_base: cfg.auth_base.clone().unwrap_or(defaults.auth_base),
        gql_base: cfg.gql_base.clone().unwrap_or(defaults.gql_base),
        timeout: cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Config: defaults < files < env < CLI
    let mut cfg = load_config(&args)?;
    apply_overrides(&mut cfg, &args);
    cfg.validate()?;

    let log_path = init_logging(LogConfig {
        app_name: "snoofeed",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;

    let subreddit = cfg.collect.subreddit.clone();
    tracing::info!(
        %subreddit,
        target = cfg.collect.target_count,
        log = %log_path.display(),
        "snoofeed.start"
    );

    // 2) Collect. Auth and feed failures are logged inside and never abort the run.
    let api = RedditApi::new(reddit_settings(&cfg.reddit))?;
    let opts = CollectOptions {
        target_count: cfg.collect.target_count,
        page_delay: Duration::from_millis(cfg.collect.page_delay_ms),
    };
    let collected = collect_posts(&api, &subreddit, &opts).await;
    tracing::info!(
        posts = collected.posts.len(),
        pages = collected.pages,
        stop = ?collected.stop,
        "snoofeed.collected"
    );

    // 3) Always write what we have, even an empty list.
    let out = report::output_path(
        args.output.as_deref(),
        cfg.collect.output_dir.as_deref(),
        &subreddit,
    );
    report::write_posts(&out, &collected.posts)?;
    tracing::info!(path = %out.display(), "snoofeed.saved");

    if !args.quiet {
        report::print_summary(&mut std::io::stdout().lock(), &collected, &out)?;
    }
    Ok(())
}
