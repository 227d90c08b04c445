use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use newsboard::util::{parse_date_loose, sanitize_line};
use newsboard::{ArticleAggregator, ArticleRow, Config, NewsClient};

/// Get the config directory path (~/.config/newsboard/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsboard"))
}

#[derive(Parser, Debug)]
#[command(
    name = "newsboard",
    about = "Google News articles about a list of entities, newest first"
)]
struct Args {
    /// Config file (default: ~/.config/newsboard/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Entity to search for; repeat for several. Replaces `queries` from the config
    #[arg(short, long = "query", value_name = "TEXT")]
    queries: Vec<String>,

    /// First day of the window (default: `window_days` before the end)
    #[arg(long, value_name = "DATE")]
    start: Option<String>,

    /// Last day of the window (default: today)
    #[arg(long, value_name = "DATE")]
    end: Option<String>,

    /// Print rows as JSON instead of Markdown
    #[arg(long)]
    json: bool,
}

fn resolve_date(input: Option<&str>, today: NaiveDate, default: NaiveDate) -> Result<NaiveDate> {
    match input {
        Some(raw) => parse_date_loose(raw, today)
            .with_context(|| format!("Could not parse date: {raw:?}")),
        None => Ok(default),
    }
}

fn render_markdown(out: &mut impl Write, rows: &[ArticleRow]) -> std::io::Result<()> {
    writeln!(out, "### News Articles")?;
    writeln!(out)?;
    for row in rows {
        writeln!(out, "#### {}", sanitize_line(&row.title))?;
        writeln!(out, "**Query:** {}", sanitize_line(&row.query))?;
        writeln!(out, "**Source:** {}", sanitize_line(&row.source))?;
        writeln!(out, "**Publication Date:** {}", row.published.format("%Y-%m-%d"))?;
        writeln!(out, "[Read more]({})", sanitize_line(&row.link))?;
        writeln!(out, "---")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let today = Local::now().date_naive();
    let end = resolve_date(args.end.as_deref(), today, today)?;
    let default_start = end
        .checked_sub_days(Days::new(config.window_days))
        .unwrap_or(NaiveDate::MIN);
    let start = resolve_date(args.start.as_deref(), today, default_start)?;

    let queries = if args.queries.is_empty() {
        config.queries.clone()
    } else {
        args.queries
    };
    if queries.is_empty() {
        anyhow::bail!("No queries given: pass --query or set `queries` in the config file");
    }

    let client = NewsClient::from_config(&config).context("Failed to create news client")?;
    let rows = ArticleAggregator::new(&client)
        .with_filter(config.source_filter())
        .with_concurrency(config.concurrency)
        .aggregate(&queries, start, end)
        .await
        .context("Failed to retrieve news")?;

    if rows.is_empty() {
        eprintln!("No articles found between {start} and {end}.");
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &rows)?;
        writeln!(out)?;
    } else {
        render_markdown(&mut out, &rows)?;
    }

    Ok(())
}
