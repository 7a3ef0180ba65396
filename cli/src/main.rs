mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use common::{normalize, ListKind, KNOWN_JOB_TYPES};
use jobdeck_sync::config::LoggingConfig;
use jobdeck_sync::{Config, CreateJobForm, Dashboard, JobListView, QueryState, SyncError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (.yaml, .yml or .toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Scheduler API base URL, overrides config and JOBDECK_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show job counts by status
    Stats,
    /// List jobs, one page at a time
    List {
        /// Show the dead-letter queue instead of all jobs
        #[arg(long)]
        dead: bool,
        #[arg(short, long, default_value_t = 1)]
        page: u64,
        /// Print CSV instead of a table
        #[arg(long)]
        csv: bool,
    },
    /// Get job details
    Get { id: String },
    /// Submit a new job
    Create {
        /// Job type, e.g. notification:email
        #[arg(short = 't', long = "type")]
        job_type: String,
        /// JSON payload
        #[arg(short, long)]
        payload: Option<String>,
    },
    /// Resubmit a failed job
    Resubmit { id: String },
    /// Keep stats and a job list on screen, refreshed every poll interval
    Watch {
        #[arg(long)]
        dead: bool,
        #[arg(short, long, default_value_t = 1)]
        page: u64,
        /// Dump sync counters on exit
        #[arg(long)]
        metrics: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref(), cli.api_url.as_deref())?;
    setup_logging(&config.logging)?;

    let dash = Dashboard::connect(&config)?;
    let result = run(&dash, cli.command).await;
    dash.shutdown();
    result
}

fn load_config(path: Option<&PathBuf>, api_url: Option<&str>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    match path {
        Some(p) => config.merge(Config::from_file(p)?),
        None => {
            if let Some(p) = discover_config() {
                log::debug!("Loading config from {:?}", p);
                config.merge(Config::from_file(&p)?);
            }
        }
    }
    config.apply_env();
    if let Some(url) = api_url {
        config.api.base_url = url.to_string();
    }
    config.validate()?;
    Ok(config)
}

fn discover_config() -> Option<PathBuf> {
    let user = common::USER_CONFIG_PATH
        .strip_prefix("~/")
        .and_then(|rest| std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(rest)));
    user.into_iter()
        .chain(std::iter::once(PathBuf::from(common::DEFAULT_CONFIG_PATH)))
        .find(|p| p.exists())
}

fn setup_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let base = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d][%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(logging.level_filter());

    let base = match &logging.output {
        Some(path) => base.chain(fern::log_file(path)?),
        None => base.chain(std::io::stderr()),
    };
    base.apply()?;
    Ok(())
}

async fn run(dash: &Dashboard, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Stats => {
            let state = dash.stats().settled().await;
            let stats = match (state.stats(), &state.error) {
                (Some(stats), _) => *stats,
                (None, Some(err)) => anyhow::bail!("Error loading stats: {}", err),
                (None, None) => anyhow::bail!("Error loading stats"),
            };
            println!("{}", render::stats_table(&stats));
            if let Some(note) = render::stats_note(&stats) {
                println!("{}", note);
            }
        }
        Commands::List { dead, page, csv } => {
            let mut view = dash.jobs(list_kind(dead), page);
            let state = view.settled().await;
            let Some(page) = state.page() else {
                match &state.error {
                    Some(err) => anyhow::bail!("Failed to load jobs: {}", err),
                    None => anyhow::bail!("Failed to load jobs"),
                }
            };
            if csv {
                print!("{}", render::jobs_csv(page)?);
            } else if page.is_empty() {
                println!("No jobs found.");
            } else {
                println!("{}", render::jobs_table(page));
                println!("{}", render::page_footer(page));
            }
        }
        Commands::Get { id } => {
            let state = dash.job(&id).settled().await;
            match (state.job(), &state.error) {
                (Some(job), _) => print!("{}", render::job_detail(job)),
                (None, Some(err)) => anyhow::bail!("Failed to load job {}: {}", id, err),
                (None, None) => anyhow::bail!("Job {} not found", id),
            }
        }
        Commands::Create { job_type, payload } => {
            let mut form = CreateJobForm {
                job_type,
                ..Default::default()
            };
            if let Some(payload) = payload {
                form.payload = payload;
            }
            if !KNOWN_JOB_TYPES.contains(&form.job_type.trim()) {
                log::warn!("Job type {:?} has no known handler", form.job_type);
            }
            match dash.mutations().create_job(&mut form).await {
                Ok(created) => {
                    let job = normalize::normalize_job(&created);
                    if job.id.0.is_empty() {
                        println!("Job submitted");
                    } else {
                        println!("Job submitted: {}", job.id);
                    }
                }
                Err(SyncError::Validation { field, message }) => {
                    anyhow::bail!("{}: {}", field, message)
                }
                Err(e) => anyhow::bail!("Failed to create job: {}", e),
            }
        }
        Commands::Resubmit { id } => {
            let state = dash.job(&id).settled().await;
            let Some(job) = state.job() else {
                match &state.error {
                    Some(err) => anyhow::bail!("Failed to load job {}: {}", id, err),
                    None => anyhow::bail!("Job {} not found", id),
                }
            };
            dash.mutations().resubmit(job).await?;
            println!("Job {} resubmitted", job.id);
        }
        Commands::Watch { dead, page, metrics } => {
            watch(dash, list_kind(dead), page).await?;
            if metrics {
                print!("{}", dash.cache().metrics().export());
            }
        }
    }
    Ok(())
}

fn list_kind(dead: bool) -> ListKind {
    if dead {
        ListKind::Dead
    } else {
        ListKind::All
    }
}

async fn watch(dash: &Dashboard, kind: ListKind, page: u64) -> anyhow::Result<()> {
    let mut stats = dash.stats();
    let mut view = dash.jobs(kind, page);
    draw(&stats.state(), &view);

    loop {
        tokio::select! {
            state = stats.changed() => draw(&state, &view),
            _ = view.changed() => draw(&stats.state(), &view),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn draw(stats: &QueryState, view: &JobListView) {
    print!("\x1B[2J\x1B[H");
    match stats.stats() {
        Some(s) => {
            println!("{}", render::stats_table(s));
            if let Some(note) = render::stats_note(s) {
                println!("{}", note);
            }
        }
        None if stats.is_loading => println!("Loading stats..."),
        None => println!("Stats unavailable"),
    }
    println!("stats {}", render::freshness(stats));
    println!();

    let state = view.state();
    let title = match view.kind() {
        ListKind::All => "All jobs",
        ListKind::Dead => "Dead-letter queue",
    };
    println!("{}", title);
    match state.page() {
        Some(page) if page.is_empty() => println!("No jobs found."),
        Some(page) => {
            println!("{}", render::jobs_table(page));
            println!("{}", render::page_footer(page));
        }
        None if state.is_loading => println!("Loading jobs..."),
        None => println!("Failed to load jobs."),
    }
    println!("jobs {}", render::freshness(&state));
    println!("(Ctrl-C to quit)");
}
