use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use dwarfdecl_core::config::{BaseTypeNaming, Dialect, GeneratorConfig};
use dwarfdecl_core::loader::load_file;
use dwarfdecl_core::{generate, DeclError, InterfaceFilter};
use dwarfdecl_utils::{
    default_log_file, info, init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel,
};

/// Emit dependency-ordered, layout-faithful C declarations from a binary's DWARF.
#[derive(Parser, Debug)]
#[command(name = "dwarfdecl")]
#[command(version)]
#[command(about = "Emit dependency-ordered, layout-faithful C declarations from a binary's DWARF", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    /// Log to a file instead of stderr (default: a dated file in the temp dir)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Generate a header for the selected functions of a binary
    Generate
    {
        /// Object file carrying DWARF debug information
        binary: PathBuf,
        /// Function (or variable) name to include; repeatable, default is every exported function
        #[arg(short, long = "name")]
        names: Vec<String>,
        /// File with one name per line ("-" reads stdin)
        #[arg(long)]
        names_file: Option<PathBuf>,
        /// Also include exported variables
        #[arg(long, default_value_t = false)]
        include_variables: bool,
        /// Output dialect: c or c++
        #[arg(long, default_value = "c", value_parser = parse_dialect)]
        dialect: Dialect,
        /// How base types are spelled
        #[arg(long, value_enum, default_value_t = BaseTypes::Abi)]
        base_types: BaseTypes,
        /// Write the header here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Omit formal parameter names
        #[arg(long, default_value_t = false)]
        no_param_names: bool,
        #[arg(long, default_value_t = false)]
        no_group_comments: bool,
        #[arg(long, default_value_t = false)]
        no_offset_comments: bool,
    },
    /// List the exported functions a header could be generated for
    Functions
    {
        binary: PathBuf,
        #[arg(long, default_value_t = false)]
        include_variables: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BaseTypes
{
    /// Keep the compiler's names
    Verbatim,
    /// Normalise to LP64 C spellings
    Abi,
}

fn parse_dialect(s: &str) -> Result<Dialect, String>
{
    s.parse().map_err(|err: DeclError| err.to_string())
}

fn parse_log_level(s: &str) -> Result<LogLevel, String>
{
    s.parse()
}

fn main()
{
    let cli = Cli::parse();

    let logging = match (cli.log_file, cli.log_level) {
        (Some(path), level) => {
            let path = path.unwrap_or_else(default_log_file);
            init_logging_to_file(&path, level, log_format_from_env()).map(Some)
        }
        (None, Some(level)) => init_logging_with_level(level, log_format_from_env()),
        (None, None) => init_logging(),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        match e {
            DeclError::Stuck(report) => {
                eprintln!("Error: {} item(s) could not be ordered", report.pending.len());
                eprintln!("{}", report.to_dot());
            }
            other => eprintln!("Error: {}", other),
        }
        process::exit(1);
    }
}

fn log_format_from_env() -> LogFormat
{
    std::env::var("DWARFDECL_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

fn run_command(command: Commands) -> dwarfdecl_core::Result<()>
{
    match command {
        Commands::Generate {
            binary,
            mut names,
            names_file,
            include_variables,
            dialect,
            base_types,
            output,
            no_param_names,
            no_group_comments,
            no_offset_comments,
        } => {
            if let Some(path) = names_file {
                names.extend(read_names(&path)?);
            }
            info!("Loading debug info from {}", binary.display());
            let graph = load_file(&binary)?;

            let filter = InterfaceFilter::new(names).with_variables(include_variables);
            let base_types = match base_types {
                BaseTypes::Verbatim => BaseTypeNaming::Verbatim,
                BaseTypes::Abi => BaseTypeNaming::default(),
            };
            let config = GeneratorConfig::default()
                .with_dialect(dialect)
                .with_base_types(base_types)
                .with_fp_names(!no_param_names)
                .with_group_comments(!no_group_comments)
                .with_offset_comments(!no_offset_comments);

            let emission = generate(&graph, &config, &filter)?;
            info!("Generated {} fragment(s)", emission.fragments.len());

            let header = emission.render();
            match output {
                Some(path) => fs::write(&path, header)?,
                None => io::stdout().write_all(header.as_bytes())?,
            }
            Ok(())
        }
        Commands::Functions { binary, include_variables } => {
            let graph = load_file(&binary)?;
            let filter = InterfaceFilter::default().with_variables(include_variables);
            let names: BTreeSet<&str> = graph
                .toplevel()
                .filter(|&id| filter.matches(&graph, id))
                .filter_map(|id| graph.name(id))
                .collect();
            let mut stdout = io::stdout().lock();
            for name in names {
                writeln!(stdout, "{}", name)?;
            }
            Ok(())
        }
    }
}

/// One name per line; blank lines and `#` comments are skipped.
fn read_names(path: &Path) -> dwarfdecl_core::Result<Vec<String>>
{
    let text = if path == Path::new("-") {
        io::read_to_string(io::stdin())?
    } else {
        fs::read_to_string(path)?
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
