//! tidy-tweet - Tidy twarc results into `SQLite`
//!
//! Main entry point for the tidy-tweet command-line tool.

use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::process::ExitCode;
use tracing::{debug, warn};

use tidy_tweet::cli::{CheckArgs, Cli, Commands, CompletionsArgs, InitArgs, LoadArgs, SchemaArgs};
use tidy_tweet::config::LoadedConfig;
use tidy_tweet::error::format_tidy_error;
use tidy_tweet::logging::{self, OperationGuard};
use tidy_tweet::storage::{self, Compatibility, Storage};
use tidy_tweet::{
    Config, IngestOptions, LIBRARY_VERSION, PageIngestor, SchemaRegistry, TidyTweetError,
    format_bytes, format_number, format_number_usize,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let LoadedConfig { config, warnings } = match Config::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{}", format_tidy_error(&err));
            return ExitCode::FAILURE;
        }
    };

    if !config.logging.colors {
        colored::control::set_override(false);
    }
    logging::init_cli_logging(config.log_config(), cli.quiet, cli.verbose);
    for warning in &warnings {
        warn!("{}", warning);
    }

    let result = match &cli.command {
        Commands::Load(args) => cmd_load(&cli, &config, args),
        Commands::Init(args) => cmd_init(&cli, &config, args),
        Commands::Check(args) => cmd_check(&cli, args),
        Commands::Schema(args) => cmd_schema(args),
        Commands::Completions(args) => {
            cmd_completions(args);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(tidy) = err.downcast_ref::<TidyTweetError>() {
                eprintln!("{}", format_tidy_error(tidy));
            } else {
                eprintln!("{} {:#}", "Error:".red().bold(), err);
            }
            ExitCode::FAILURE
        }
    }
}

fn print_compatibility_warning(cli: &Cli, compatibility: &Compatibility) {
    if let Some(mismatch) = compatibility.warning() {
        if !cli.quiet {
            eprintln!("{} {}", "Warning:".yellow().bold(), mismatch);
        }
    }
}

fn cmd_load(cli: &Cli, config: &Config, args: &LoadArgs) -> Result<()> {
    for file in &args.files {
        if !file.is_file() {
            bail!("Input file does not exist: {}", file.display());
        }
    }

    let registry = SchemaRegistry::new()?;

    if args.db.exists() {
        let compatibility = storage::check_compatibility(&args.db, &registry)?;
        print_compatibility_warning(cli, &compatibility);
    } else {
        let mut options = config.init_options();
        options.strict |= args.strict;
        Storage::initialise(&args.db, &options, &registry)?;
        if !cli.quiet {
            println!(
                "{} Created {} (schema version {})",
                "✓".green(),
                args.db.display(),
                registry.schema_version()
            );
        }
    }

    // Compatibility was settled above, once for the whole run.
    let ingestor = PageIngestor::new(
        &registry,
        IngestOptions {
            check_compatibility: false,
        },
    );

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(args.files.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut total_pages = 0;
    for file in &args.files {
        pb.set_message(file.display().to_string());
        let guard = OperationGuard::new(format!("load {}", file.display()));

        match ingestor.ingest_file(file, &args.db) {
            Ok(pages) => {
                guard.complete();
                total_pages += pages;
                pb.println(format!(
                    "  {} {} ({} pages)",
                    "✓".green(),
                    file.display(),
                    format_number_usize(pages)
                ));
                pb.inc(1);
            }
            Err(e) => {
                guard.fail(&e);
                pb.abandon();
                return Err(e.into());
            }
        }
    }
    pb.finish_and_clear();

    if !cli.quiet {
        let size = std::fs::metadata(&args.db).map(|m| m.len()).unwrap_or(0);
        println!(
            "{} All done! {} pages from {} files loaded into {} ({})",
            "✓".green().bold(),
            format_number_usize(total_pages),
            format_number_usize(args.files.len()),
            args.db.display(),
            format_bytes(size)
        );
    }
    Ok(())
}

fn cmd_init(cli: &Cli, config: &Config, args: &InitArgs) -> Result<()> {
    let registry = SchemaRegistry::new()?;
    let mut options = config.init_options();
    options.strict |= args.strict;
    options.allow_existing |= args.allow_existing;

    Storage::initialise(&args.db, &options, &registry)?;
    debug!("Initialised {} with {:?}", args.db.display(), options);

    if !cli.quiet {
        println!(
            "{} Created {} (schema version {}{})",
            "✓".green(),
            args.db.display(),
            registry.schema_version(),
            if options.strict { ", strict" } else { "" }
        );
    }
    Ok(())
}

fn cmd_check(cli: &Cli, args: &CheckArgs) -> Result<()> {
    let registry = SchemaRegistry::new()?;
    let compatibility = storage::check_compatibility(&args.db, &registry)?;
    print_compatibility_warning(cli, &compatibility);

    if cli.quiet {
        return Ok(());
    }

    println!(
        "{} {} is compatible with tidy-tweet {} (schema version {})",
        "✓".green(),
        args.db.display(),
        LIBRARY_VERSION,
        registry.schema_version()
    );
    println!();

    let storage = Storage::open(&args.db)?;
    for stat in storage.table_row_counts(&registry)? {
        println!("  {:<16} {:>12}", stat.name, format_number(stat.rows));
    }
    Ok(())
}

fn cmd_schema(args: &SchemaArgs) -> Result<()> {
    let registry = SchemaRegistry::new()?;
    println!("-- tidy-tweet schema version {}", registry.schema_version());
    println!();
    print!("{}", registry.schema_sql(args.strict));
    Ok(())
}

fn cmd_completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "tidy-tweet", &mut io::stdout());
}
