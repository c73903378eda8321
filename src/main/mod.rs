use std::{io::Write, path::PathBuf, rc::Rc};

use clap::{ArgAction, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use snpview::{
    commands::{snpview_chromosomes, snpview_show, ShowOptions},
    prelude::*,
    reporting::CommandOutput,
    Position,
};

const INFO: &str = "\
snpview: browse per-sample genotype calls from a variant matrix backend
usage: snpview [--help] <subcommand>

Subcommands:

  chromosomes: list the chromosomes of the dataset.
  show: open a window of variants and write its genotype classes as TSV.

";

#[derive(Parser)]
#[clap(name = "snpview")]
#[clap(about = INFO)]
struct Cli {
    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbosity: u8,

    /// a JSON viewer configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// the backend base URL (overrides the configuration file)
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Chromosomes {
        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Show {
        /// the chromosome to open (the first one if not specified)
        #[arg(long)]
        chromosome: Option<String>,

        /// the start position of the window
        #[arg(long)]
        position: Option<Position>,

        /// number of pages to move forward
        #[arg(long, default_value_t = 0)]
        forward: usize,

        /// number of pages to move backward
        #[arg(long, default_value_t = 0)]
        backward: usize,

        /// move by this many variants instead of whole pages
        #[arg(long)]
        step: Option<usize>,

        /// comma-separated sample ids (the whole cohort if not specified)
        #[arg(long, value_delimiter = ',')]
        samples: Option<Vec<String>>,

        /// fetch calls for every selected sample
        #[arg(long)]
        all: bool,

        /// pixel width of one variant column
        #[arg(long)]
        snp_width: Option<u32>,

        /// pixel width of the viewport
        #[arg(long)]
        viewport_width: Option<u32>,

        /// an optional output file, gzip-compressed if it ends in .gz
        /// (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_verbose(cli: &Cli) {
    let filter_level: LevelFilter = match cli.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.module_path().unwrap_or("unknown_module"),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn load_config(cli: &Cli) -> Result<ViewerConfig, ViewError> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::from_path(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(api) = &cli.api {
        config.api_base_url = api.clone();
    }
    Ok(config)
}

async fn run_command(cli: &Cli, mut config: ViewerConfig) -> Result<(), ViewError> {
    let report = match &cli.command {
        Some(Commands::Chromosomes { output }) => {
            let source = HttpSource::from_config(&config)?;
            let (count, report) = snpview_chromosomes(&source, output.as_ref())
                .await?
                .into_parts();
            log::debug!("{} chromosomes", count);
            report
        }
        Some(Commands::Show {
            chromosome,
            position,
            forward,
            backward,
            step,
            samples,
            all,
            snp_width,
            viewport_width,
            output,
        }) => {
            if let Some(samples) = samples {
                config.samples = Some(SampleInput::Ids(samples.clone()));
            }
            if let Some(snp_width) = snp_width {
                config.snp_width = *snp_width;
            }
            if let Some(viewport_width) = viewport_width {
                config.viewport_width = *viewport_width;
            }
            config.validate()?;

            let source = Rc::new(HttpSource::from_config(&config)?);
            let controller = Controller::new(source, Rc::new(EventBus::new()), config);
            let options = ShowOptions {
                chromosome: chromosome.clone(),
                position: *position,
                forward: *forward,
                backward: *backward,
                step: *step,
                load_all: *all,
            };
            let output: CommandOutput<DrawOutcome> =
                snpview_show(&controller, &options, output.as_ref()).await?;
            let (outcome, report) = output.into_parts();
            log::debug!("last navigation: {:?}", outcome);
            report
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };
    report.log();
    Ok(())
}

fn run() -> Result<(), ViewError> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_command(&cli, config))
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
