use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tourniquet::facts::{CommandExtractor, Extractor, Location, NoFacts, SidecarExtractor};
use tourniquet::templates::builtin_templates;
use tourniquet::{
    Error, Locator, Result, StatementLocator, Target, TestCase, Tourniquet, TourniquetConfig,
    TrivialLocator,
};

#[derive(Parser)]
#[command(name = "tourniquet", version, about = "Automated program repair for C and C++")]
struct Cli {
    /// Project root; config and the fact database are looked up under it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// More logging (-v info, -vv debug); TOURNIQUET_LOG takes a filter otherwise
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Fact database (defaults to $TOURNIQUET_DB, then the configured one)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and store the AST facts of a source file
    Collect {
        file: PathBuf,

        /// Parse as C++ even if the extension says otherwise
        #[arg(long)]
        cxx: bool,
    },

    /// List the built-in templates
    Templates,

    /// Show a template's unexpanded sketch at a location
    View {
        template: String,
        file: PathBuf,
        line: u32,
        col: u32,
    },

    /// Print the candidate patches of a template at a location
    Concretize {
        template: String,
        file: PathBuf,
        line: u32,
        col: u32,

        /// Stop after this many candidates
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search for a patch that makes the program pass its tests
    Patch {
        template: String,
        file: PathBuf,

        /// Only try this line (with --col); every statement otherwise
        #[arg(long, requires = "col")]
        line: Option<u32>,

        #[arg(long, requires = "line")]
        col: Option<u32>,

        /// Executable produced by the build
        #[arg(long)]
        exe: PathBuf,

        /// Build command, e.g. "cc -o prog prog.c" (defaults to [build] command)
        #[arg(long)]
        build: Option<String>,

        /// Test case as INPUT=EXIT_CODE; repeatable
        #[arg(long = "test", value_name = "INPUT=CODE")]
        tests: Vec<TestCase>,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("TOURNIQUET_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = TourniquetConfig::load(&cli.root)?;
    let db_path = cli.db.clone().unwrap_or_else(|| config.database_path(&cli.root));

    match cli.command {
        Commands::Collect { file, cxx } => {
            let mut engine = open_engine(&db_path, &config)?;
            let stats = if cxx {
                engine.collect_info_as(&file, true)?
            } else {
                engine.collect_info(&file)?
            };
            println!(
                "{}: {} function(s) ({} skipped), {} global(s), {} statement(s), {} call(s), {} variable(s)",
                file.display(),
                stats.functions,
                stats.skipped_functions,
                stats.globals,
                stats.statements,
                stats.calls,
                stats.var_decls
            );
        }
        Commands::Templates => {
            let nowhere = Location::new("", 0, 0);
            for (name, template) in builtin_templates() {
                println!("{name}:");
                for line in template.view(&NoFacts, &nowhere)?.lines() {
                    println!("    {line}");
                }
            }
        }
        Commands::View {
            template,
            file,
            line,
            col,
        } => {
            let engine = open_engine(&db_path, &config)?;
            print!(
                "{}",
                engine.view_template(&template, &Location::new(file, line, col))?
            );
        }
        Commands::Concretize {
            template,
            file,
            line,
            col,
            limit,
        } => {
            let engine = open_engine(&db_path, &config)?;
            let candidates = engine.concretize_template(&template, &Location::new(file, line, col))?;
            for (i, candidate) in candidates.iter().take(limit.unwrap_or(usize::MAX)).enumerate() {
                println!("// candidate {}", i + 1);
                println!("{candidate}");
            }
        }
        Commands::Patch {
            template,
            file,
            line,
            col,
            exe,
            build,
            tests,
        } => {
            let build_command = match build {
                Some(cmd) => cmd.split_whitespace().map(String::from).collect(),
                None => config.build.command.clone().unwrap_or_default(),
            };
            if build_command.is_empty() {
                return Err(Error::Config(
                    "no build command: pass --build or set [build] command".to_string(),
                ));
            }
            let locator: Box<dyn Locator> = match (line, col) {
                (Some(line), Some(col)) => Box::new(TrivialLocator::new(line, col)),
                _ => Box::new(StatementLocator),
            };

            let mut engine = open_engine(&db_path, &config)?;
            let target = Target::new(file, exe, build_command, tests, locator)?;
            match engine.auto_patch(&template, &target)? {
                Some(patch) => println!("{patch}"),
                None => {
                    eprintln!("no candidate passed the tests");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn extractor(config: &TourniquetConfig) -> Box<dyn Extractor> {
    match config
        .extractor
        .command
        .as_deref()
        .and_then(CommandExtractor::from_command)
    {
        Some(command) => Box::new(command),
        None => Box::new(SidecarExtractor),
    }
}

fn open_engine(db_path: &Path, config: &TourniquetConfig) -> Result<Tourniquet> {
    let mut engine = Tourniquet::open(db_path, extractor(config))?
        .with_max_candidates(config.search.max_candidates);
    engine.register_builtins()?;
    Ok(engine)
}
