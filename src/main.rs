use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use mojom_compiler::build::{self, Compilation, CompileOptions, FileSystemLoader};
use mojom_compiler::codegen::{self, BackendKind, BuiltinTemplates, TemplateDir, TemplateSource};
use mojom_compiler::lexer::tokenize;
use mojom_compiler::model::module_to_data;

#[derive(Parser)]
#[command(name = "mojomc", version)]
#[command(about = "Compile mojom interface definitions into language bindings")]
struct Cli {
    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate bindings for one or more mojom files (glob patterns allowed)
    Compile {
        #[arg(required = true)]
        files: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Directory searched for imports (repeatable)
        #[arg(short = 'I', long = "import-path")]
        import_paths: Vec<PathBuf>,

        /// Backends to run; all of them when omitted
        #[arg(short = 'g', long = "generators", value_enum, value_delimiter = ',')]
        generators: Vec<BackendKind>,

        /// Directory of templates replacing the builtin ones
        #[arg(long)]
        templates: Option<PathBuf>,
    },

    /// Print the module data of a mojom file as JSON
    Dump {
        file: String,

        /// Directory searched for imports (repeatable)
        #[arg(short = 'I', long = "import-path")]
        import_paths: Vec<PathBuf>,
    },

    /// Print the token stream of a mojom file
    Tokens { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    // A logger may already be installed when running under a test harness.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Compile {
            files,
            output,
            import_paths,
            generators,
            templates,
        } => {
            let mut options = CompileOptions {
                search_paths: import_paths,
                output_dir: output,
                template_dir: templates,
                ..CompileOptions::default()
            };
            if !generators.is_empty() {
                options.backends = generators;
            }
            compile(&files, &options)
        }
        Command::Dump { file, import_paths } => {
            let loader = FileSystemLoader::new(import_paths);
            let mut compilation = Compilation::new(Box::new(loader));
            match compilation.compile(&file) {
                Ok(module) => {
                    let data = serde_json::to_string_pretty(&module_to_data(&module))?;
                    println!("{}", data);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Tokens { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            for token in tokenize(&source) {
                match token {
                    Ok(t) => println!("{:>4}:{:<4} {}", t.span.pos.line, t.span.pos.column, t.node.describe()),
                    Err(e) => {
                        eprintln!("{}:{}", file.display(), e);
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn compile(patterns: &[String], options: &CompileOptions) -> Result<ExitCode> {
    let start = Instant::now();
    let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
    let result = build::build(&patterns, options);

    let mut failed = !result.errors.is_empty();
    for error in &result.errors {
        eprintln!("{}", error);
    }

    let templates: Box<dyn TemplateSource> = match &options.template_dir {
        Some(dir) => Box::new(TemplateDir::new(dir)),
        None => Box::new(BuiltinTemplates),
    };

    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    for module in &result.modules {
        for (backend, generated) in codegen::generate_all(module, &options.backends, templates.as_ref()) {
            match generated {
                Ok(files) => {
                    let files = codegen::relocate(files, &module.name, &cwd, &options.search_paths);
                    if let Err(e) = codegen::write_files(&files, &options.output_dir) {
                        eprintln!("{}", e);
                        failed = true;
                    }
                }
                Err(e) => {
                    log::warn!("{}: no output written for {}", backend, module.name);
                    eprintln!("{}", e);
                    failed = true;
                }
            }
        }
    }

    log::info!(
        "compiled {} modules in {:.2?}",
        result.modules.len(),
        start.elapsed()
    );
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
