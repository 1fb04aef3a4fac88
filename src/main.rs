use anyhow::{Context, Result};
use clap::Parser;
use dbflow::ast::Schema;
use dbflow::config::load_config;
use dbflow::controller::DiagramController;
use dbflow::import;
use dbflow::parser::parse_dbml;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{Level, warn};

#[derive(Parser, Debug)]
#[command(name = "dbflow", version, about = "Lay out a DBML schema as a table diagram")]
struct Args {
    /// Input file (.dbml, or database JSON with --json) or '-' for stdin
    input: PathBuf,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Read the exported database JSON object instead of DBML
    #[arg(long)]
    json: bool,

    /// Simulation seed, for repeatable layouts
    #[arg(long)]
    seed: Option<u64>,

    /// Config JSON file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Only lay out this table and its direct neighbors
    #[arg(long)]
    focus: Option<String>,

    /// More log output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("loading config {:?}", args.config))?;
    if args.seed.is_some() {
        config.layout.seed = args.seed;
    }

    let input = read_input(&args.input)?;
    let (schema, warnings): (Schema, Vec<String>) = if args.json {
        let (schema, issues) = import::from_json_str(&input)?;
        (schema, issues.iter().map(ToString::to_string).collect())
    } else {
        let outcome = parse_dbml(&input);
        let warnings = outcome.warnings.iter().map(ToString::to_string).collect();
        (outcome.schema, warnings)
    };
    let schema = focus(schema, args.focus.as_deref())?;

    let mut controller = DiagramController::new(config);
    let ticket = controller.begin_load();
    let loaded = controller.prepare_schema(schema, warnings);
    controller.commit(ticket, loaded);
    for warning in controller.warnings() {
        warn!("{warning}");
    }

    let json = serde_json::to_string_pretty(&controller.diagram())?;
    write_output(&json, args.output.as_deref())
}

fn focus(schema: Schema, table: Option<&str>) -> Result<Schema> {
    match table {
        Some(name) => schema
            .focus(name)
            .with_context(|| format!("table `{name}` not found")),
        None => Ok(schema),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_output(json: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
