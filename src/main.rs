use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use jobharvest::catalog::JobCatalog;
use jobharvest::drivers::{choose_user_agent, HttpDriver};
use jobharvest::models::{JobPosting, TagCategory};
use jobharvest::sources::{builtin_sources, SourceProfile};
use jobharvest::storage::{create_store, export_json, JsonExporter, SearchFilters, StoreType};
use jobharvest::{compose_query, harvest_sources, HarvestConfig, HarvestResult, StoreConfig};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Harvest job postings and keep a tag index over them", long_about = None)]
struct Cli {
    /// JSON file holding stored postings and tags (default: $JOBHARVEST_DATA_FILE
    /// or jobharvest_store.json); ignored when MongoDB is configured
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape listing pages from one or all sources
    Harvest(HarvestArgs),

    /// Query stored postings
    Search(SearchArgs),

    /// Show tag counts
    Tags(TagsArgs),

    /// Delete postings older than a number of days
    Purge(PurgeArgs),
}

#[derive(Args, Debug)]
struct HarvestArgs {
    /// Built-in source id, or "all"
    #[arg(short, long, default_value = "all")]
    source: String,

    /// Load the source from a JSON profile instead
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Search keywords
    #[arg(short, long, default_value = "")]
    query: String,

    /// Company name, prepended to the keywords
    #[arg(short, long)]
    company: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    /// Postings per source (at most 1000)
    #[arg(short = 'n', long, default_value = "25")]
    limit: usize,

    /// Store the postings and update tag counts
    #[arg(long)]
    persist: bool,

    /// Write the postings to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write one timestamped JSON file per source into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print per-source harvest statistics
    #[arg(long)]
    stats: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Text contained in the title
    #[arg(short, long)]
    query: Option<String>,

    #[arg(short, long)]
    source: Option<String>,

    #[arg(short, long)]
    company: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    #[arg(long)]
    remote: Option<bool>,

    /// Comma-separated; postings with any of them match
    #[arg(short, long, value_delimiter = ',')]
    tags: Vec<String>,

    #[arg(short = 'n', long, default_value = "50")]
    limit: usize,

    #[arg(long, default_value = "0")]
    offset: usize,

    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct TagsArgs {
    #[arg(short = 'n', long, default_value = "20")]
    limit: usize,

    /// technology, experience, location, job_type or other
    #[arg(short, long)]
    category: Option<String>,

    /// Group every tag by category
    #[arg(long)]
    by_category: bool,

    /// Tags containing this text
    #[arg(short, long)]
    search: Option<String>,

    /// Full tag and posting statistics as JSON
    #[arg(long)]
    stats: bool,
}

#[derive(Args, Debug)]
struct PurgeArgs {
    #[arg(short, long, default_value = "90", value_parser = clap::value_parser!(i64).range(0..))]
    days: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("selectors", log::LevelFilter::Warn)
        .filter_module("html5ever", log::LevelFilter::Error)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let mut store_config = StoreConfig::from_env();
    if let Some(path) = cli.data_file {
        store_config.data_file = path;
    }

    match cli.command {
        Commands::Harvest(args) => harvest_command(args, &store_config).await,
        Commands::Search(args) => search_command(args, &store_config).await,
        Commands::Tags(args) => tags_command(args, &store_config).await,
        Commands::Purge(args) => purge_command(args, &store_config).await,
    }
}

async fn open_catalog(config: &StoreConfig) -> anyhow::Result<JobCatalog> {
    let store = create_store(StoreType::from_config(config))
        .await
        .context("Failed to open the job store")?;
    Ok(JobCatalog::new(store))
}

fn select_sources(args: &HarvestArgs) -> anyhow::Result<Vec<SourceProfile>> {
    if let Some(path) = &args.profile {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        return Ok(vec![SourceProfile::from_json(&json)?]);
    }
    if args.source.eq_ignore_ascii_case("all") {
        return Ok(builtin_sources());
    }
    SourceProfile::builtin(&args.source)
        .map(|source| vec![source])
        .ok_or_else(|| anyhow!("Unknown source {:?}", args.source))
}

async fn harvest_command(args: HarvestArgs, store_config: &StoreConfig) -> anyhow::Result<()> {
    let config = HarvestConfig::from_env()?;
    let sources = select_sources(&args)?;
    let query = compose_query(args.company.as_deref(), Some(&args.query));

    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| choose_user_agent(config.user_agent_seed).to_string());
    let page_load_timeout = config.ready_timeout;
    let make_driver = |_: &SourceProfile| -> HarvestResult<HttpDriver> {
        Ok(HttpDriver::with_user_agent(&user_agent)?.with_page_load_timeout(page_load_timeout)?)
    };

    let results = harvest_sources(
        sources,
        make_driver,
        &config,
        &query,
        args.limit,
        args.location.as_deref(),
    )
    .await;

    let exporter = match &args.export_dir {
        Some(dir) => Some(JsonExporter::new(dir)?),
        None => None,
    };
    let catalog = if args.persist {
        Some(open_catalog(store_config).await?)
    } else {
        None
    };

    let mut all_postings: Vec<JobPosting> = Vec::new();
    for result in &results {
        match &result.error {
            Some(error) => println!("{}: failed ({})", result.source, error),
            None => println!("{}: {} posting(s)", result.source, result.postings.len()),
        }
        if args.stats {
            if let Some(stats) = &result.stats {
                stats.print_summary();
            }
        }
        if let Some(exporter) = &exporter {
            let path = exporter.export(&result.source, &result.postings)?;
            println!("  exported to {}", path.display());
        }
        if let Some(catalog) = &catalog {
            // An unavailable store fails persistence only; the harvest output stands.
            match catalog.insert_many(&result.postings).await {
                Ok(report) => println!(
                    "  stored {} new, {} duplicate, {} failed",
                    report.inserted, report.duplicates, report.failed
                ),
                Err(e) => eprintln!("  persistence skipped: {}", e),
            }
        }
        all_postings.extend(result.postings.iter().cloned());
    }

    match &args.output {
        Some(path) => {
            export_json(path, &all_postings)?;
            println!("Wrote {} posting(s) to {}", all_postings.len(), path.display());
        }
        None => {
            for posting in &all_postings {
                print_posting(posting);
            }
        }
    }
    Ok(())
}

fn print_posting(posting: &JobPosting) {
    let location = posting.location.as_deref().unwrap_or("-");
    let remote = if posting.is_remote { " [remote]" } else { "" };
    println!(
        "[{}] {} @ {} ({}){} posted {}",
        posting.source,
        posting.title,
        posting.company,
        location,
        remote,
        posting.posted_date.format("%Y-%m-%d")
    );
    if let (Some(min), Some(max)) = (posting.salary_min, posting.salary_max) {
        println!(
            "    salary {}-{} {}",
            min,
            max,
            posting.currency.as_deref().unwrap_or("")
        );
    }
    println!("    {}", posting.job_url);
}

async fn search_command(args: SearchArgs, store_config: &StoreConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(store_config).await?;
    let filters = SearchFilters {
        query: args.query,
        source: args.source,
        company: args.company,
        location: args.location,
        is_remote: args.remote,
        tags: args.tags,
        ..SearchFilters::default()
    };

    let total = catalog.count_matching(&filters).await?;
    let postings = catalog
        .find_matching(&filters, args.limit, args.offset)
        .await?;

    if args.format == "json" {
        let body = serde_json::json!({ "total": total, "jobs": postings });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{} matching posting(s)", total);
        for posting in &postings {
            print_posting(posting);
        }
    }
    Ok(())
}

async fn tags_command(args: TagsArgs, store_config: &StoreConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(store_config).await?;

    if args.stats {
        let body = serde_json::json!({
            "tags": catalog.tag_statistics().await?,
            "jobs": catalog.job_statistics().await?,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if args.by_category {
        for (category, records) in catalog.tags_by_category().await? {
            println!("{}:", category);
            for record in records.iter().take(args.limit) {
                println!("  {:<30} {}", record.tag, record.count);
            }
        }
        return Ok(());
    }

    let records = match &args.search {
        Some(needle) => catalog.search_tags(needle, args.limit).await?,
        None => {
            let category = args
                .category
                .as_deref()
                .map(str::parse::<TagCategory>)
                .transpose()
                .map_err(|e| anyhow!(e))?;
            catalog.top_tags(args.limit, category).await?
        }
    };
    for record in records {
        println!("{:<30} {:>6}  {}", record.tag, record.count, record.category);
    }
    Ok(())
}

async fn purge_command(args: PurgeArgs, store_config: &StoreConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(store_config).await?;
    let purged = catalog.purge_older_than_days(args.days).await?;
    println!("Purged {} posting(s) older than {} days", purged, args.days);
    Ok(())
}
