use clap::Parser;
use eyre::{Result, WrapErr};
use fibmem::{
    naive, FibonacciMemo, Format, PeakSampler, ProcessMemory, Report, SamplerConfig, Strategy,
};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "fibmem: compute a Fibonacci number, naive or memoized, and report
wall-clock time and peak resident memory sampled while it runs"
)]
pub struct Args {
    #[arg(short, long, default_value_t = 30, help = "Fibonacci index to compute")]
    pub n: u64,

    #[arg(long, help = "Use the unmemoized exponential recursion")]
    pub naive: bool,

    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Memory sampling interval in milliseconds [default: $FIBMEM_SAMPLE_INTERVAL_MS or 100]"
    )]
    pub interval_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = Format::Table, help = "Report format")]
    pub format: Format,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = SamplerConfig::from_env();
    if let Some(ms) = args.interval_ms {
        config = config.with_interval(Duration::from_millis(ms));
    }
    let sampler = PeakSampler::new(ProcessMemory, config);

    let strategy = if args.naive {
        Strategy::Naive
    } else {
        Strategy::Memoized
    };
    info!(n = args.n, %strategy, "computing fibonacci");

    let measurement = match strategy {
        Strategy::Naive => sampler.measure(|| naive::fibonacci(args.n)),
        Strategy::Memoized => {
            let mut memo = FibonacciMemo::new();
            sampler.measure(|| memo.fibonacci(args.n))
        }
    }
    .transpose()
    .wrap_err_with(|| format!("failed to compute fibonacci({})", args.n))?;
    info!(n = args.n, value = %measurement.value, %strategy, "computed fibonacci");

    let report = Report::new(args.n, strategy, &measurement, sampler.config().interval);
    let rendered = report
        .render(args.format)
        .wrap_err("failed to render report")?;
    println!("{}", rendered);

    Ok(())
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}
