use anyhow::Context;
use clap::Parser;
use rental_etl::utils::error::ErrorSeverity;
use rental_etl::utils::{logger, validation::Validate};
use rental_etl::{CliConfig, DateNormalizer, EtlEngine, RecordValidator, RunSummary};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if let Some(dir) = &cli.log_file {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let _log_guard = logger::init_cli_logger(cli.verbose, cli.json_logs, cli.log_file.as_deref());

    tracing::info!("Starting rental-etl");
    tracing::debug!("CLI config: {:?}", cli);

    let config = match cli.resolve().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            tracing::error!("Suggestion: {}", e.recovery_suggestion());
            eprintln!("{}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let validator = RecordValidator::new(
        DateNormalizer::new(config.cleaning.cutoff_year),
        config.cleaning.on_malformed_date,
    );
    let engine = EtlEngine::new(config, validator);

    let summary = if cli.dry_run {
        tracing::info!("Dry run: the database will not be opened");
        engine.dry_run()
    } else {
        match engine.open_store().and_then(|mut store| engine.run(&mut store)) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Setup failed: {}", e);
                tracing::error!("Suggestion: {}", e.recovery_suggestion());
                eprintln!("{}", e.user_friendly_message());
                let code = match e.severity() {
                    ErrorSeverity::Critical => 3,
                    _ => 1,
                };
                std::process::exit(code);
            }
        }
    };

    print_summary(&summary);

    if let Some(path) = &cli.rejections {
        summary
            .write_rejections(path)
            .with_context(|| format!("writing rejection report to {}", path.display()))?;
        tracing::info!(
            "Wrote {} rejected records to {}",
            summary.rejections.len(),
            path.display()
        );
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for outcome in &summary.sources {
        match (&outcome.summary, &outcome.error) {
            (Some(s), _) => println!(
                "{} -> {}: read {}, accepted {}, rejected {}, inserted {}",
                outcome.path.display(),
                outcome.table,
                s.rows_read,
                s.rows_accepted,
                s.rows_rejected,
                s.rows_inserted
            ),
            (None, Some(err)) if outcome.table.is_empty() => {
                println!("{}: FAILED {}", outcome.path.display(), err)
            }
            (None, Some(err)) => println!("{} -> {}: FAILED {}", outcome.path.display(), outcome.table, err),
            (None, None) => {}
        }
    }
}
