use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use simplelog::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use sumoredrive::batch::BatchOrchestrator;
use sumoredrive::config::Config;
use sumoredrive::config_wizard;
use sumoredrive::models::order::{BatchResult, OrderRequest};
use sumoredrive::query::{QueryBuilder, TimeInput, TimeWindow};
use sumoredrive::retry::RetryPolicy;
use sumoredrive::runner::OrderRunner;
use sumoredrive::sink::{HttpQueueSink, Sink};
use sumoredrive::utils::order_csv::read_order_rows;

#[derive(Parser)]
#[command(name = "sumoredrive")]
#[command(
    about = "Find the charge request for an order ID in Sumo Logic and print its JSON",
    long_about = "Input is a single order ID (with --day or --from/--to) or a CSV file with columns orderID, date."
)]
#[command(subcommand_negates_reqs = true, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Order ID, or path to a CSV with columns orderID, date (YYYY-MM-DD)
    #[arg(required = true)]
    input: Option<String>,

    /// Day to search, YYYY-MM-DD (single order ID only)
    #[arg(long, env = "SUMO_DAY")]
    day: Option<String>,

    /// Search start, ISO 8601 or relative like -7d; ignored with --day
    #[arg(long, env = "SUMO_FROM", default_value = "-7d", allow_hyphen_values = true)]
    from: String,

    /// Search end, ISO 8601 or "now"; ignored with --day
    #[arg(long, env = "SUMO_TO")]
    to: Option<String>,

    /// Time zone for from/to
    #[arg(long)]
    timezone: Option<String>,

    /// Forward each extracted JSON payload to this queue URL
    #[arg(long, env = "SINK_QUEUE_URL")]
    sink_url: Option<String>,

    /// Max concurrent orders
    #[arg(long)]
    workers: Option<usize>,

    /// Do not retry the next day when a day search finds nothing
    #[arg(long)]
    no_retry: bool,

    /// Print the query and search job for the first order, then exit
    #[arg(long)]
    debug: bool,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Also write diagnostics to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configuration wizard
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let args = Cli::parse();

    if let Some(Commands::Config) = args.command {
        config_wizard::run()?;
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(args.verbose, args.log_file.as_deref())?;
    log::info!("Application started");

    let mut config = Config::load()?;
    if let Some(tz) = &args.timezone {
        config.time_zone = tz.clone();
    }
    if let Some(url) = &args.sink_url {
        config.sink_url = Some(url.clone());
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;

    let input = args.input.clone().context("Missing order ID or CSV path.")?;
    let builder = config.query_builder();
    let (orders, batch_mode) = build_orders(&args, &input, &builder)?;

    if args.debug {
        print_debug(&builder, &orders)?;
        return Ok(ExitCode::SUCCESS);
    }

    let sink: Option<Arc<dyn Sink>> = match &config.sink_url {
        Some(url) => Some(Arc::new(HttpQueueSink::new(url.clone())?) as Arc<dyn Sink>),
        None => None,
    };
    let retry = if args.no_retry {
        RetryPolicy::Never
    } else {
        RetryPolicy::NextDay
    };

    let runner = OrderRunner::new(config.credentials(), builder, config.search_settings())
        .with_retry(retry)
        .with_sink(sink);
    let orchestrator = BatchOrchestrator::new(runner, config.workers);

    if batch_mode {
        eprintln!(
            "Running {} orders with {} workers.",
            orders.len(),
            orchestrator.workers()
        );
    }
    let start_time = Instant::now();

    let batch = orchestrator.run(orders, |event| eprintln!("{}", event)).await;

    for value in batch.results() {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    print_summary(&batch, start_time);

    Ok(ExitCode::from(batch.exit_code() as u8))
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        loggers.push(WriteLogger::new(
            LevelFilter::Debug,
            simplelog::Config::default(),
            file,
        ));
    }

    let _ = CombinedLogger::init(loggers);
    Ok(())
}

/// A readable file means batch mode; anything else is a single order ID.
fn build_orders(
    args: &Cli,
    input: &str,
    builder: &QueryBuilder,
) -> Result<(Vec<OrderRequest>, bool)> {
    if Path::new(input).is_file() {
        let rows = read_order_rows(Path::new(input))
            .with_context(|| format!("Failed to read CSV {}", input))?;
        if rows.is_empty() {
            anyhow::bail!("CSV has no valid rows (need at least two columns: orderID, date).");
        }
        let orders = rows
            .into_iter()
            .map(|row| OrderRequest {
                order_id: row.order_id,
                window: TimeWindow::day(row.date, builder.time_zone()),
            })
            .collect();
        return Ok((orders, true));
    }

    let time_input = match &args.day {
        Some(day) => TimeInput::parse_day(day).context("--day must be YYYY-MM-DD")?,
        None => TimeInput::Range {
            from: args.from.clone(),
            to: args.to.clone(),
        },
    };
    let window = builder.resolve_window(&time_input)?;
    Ok((
        vec![OrderRequest {
            order_id: input.to_string(),
            window,
        }],
        false,
    ))
}

fn print_debug(builder: &QueryBuilder, orders: &[OrderRequest]) -> Result<()> {
    let Some(first) = orders.first() else {
        return Ok(());
    };
    let spec = builder.build(&first.order_id, &first.window);
    eprintln!("Query: {:?}", spec.query);
    eprintln!(
        "Search job: {}",
        serde_json::to_string_pretty(&spec.to_request())?
    );
    if orders.len() > 1 {
        eprintln!("Total rows: {}", orders.len());
    }
    Ok(())
}

fn print_summary(batch: &BatchResult, start_time: Instant) {
    if !batch.not_found.is_empty() {
        eprintln!();
        eprintln!("Order IDs not found: {}", batch.not_found.join(", "));
    }
    if let Some(hint) = batch.sink_hint {
        eprintln!();
        eprintln!("{}", hint);
    }
    eprintln!();
    eprintln!("Messages published (to sink): {}", batch.delivered);
    eprintln!("Elapsed: {:.1}s", start_time.elapsed().as_secs_f64());
}
