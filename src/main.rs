use anyhow::Context;
use clap::Parser;
use notes_to_orders::utils::{logger, validation::Validate};
use notes_to_orders::{
    AppConfig, BatchWorker, CliArgs, FileReader, LlmNoteExtractor, NotesProcessor, OrderClient,
    RunReport,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose, args.json_logs);

    tracing::info!("Starting notes-to-orders");
    tracing::info!("Loading configuration from: {}", args.config.display());

    let mut config = match AppConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config file '{}': {}", args.config.display(), e);
            eprintln!("❌ Failed to load config file '{}': {}", args.config.display(), e);
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    if config.order_client.bypass {
        tracing::info!("Order delivery bypass is enabled, no orders will be posted");
    }

    let extractor = LlmNoteExtractor::new(config.llm.clone())?;
    let sink = OrderClient::new(config.order_client.clone())?;
    let source = FileReader::new(config.file_reader.clone());
    let mut worker = BatchWorker::new(source, NotesProcessor::new(extractor, sink));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Cancellation requested. Stopping physician notes file worker.");
            signal_token.cancel();
        }
    });

    let report = match worker.run(&cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error_kind = ?e.kind(), "Run aborted: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.report {
        write_report(&report, path).await?;
        tracing::info!("Run report saved to: {}", path.display());
    }

    println!(
        "Processed: {}, Failed: {}, Total: {}",
        report.processed, report.failed, report.total
    );

    let exit_code = report.exit_code(config.run.fail_on_note_errors);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn write_report(report: &RunReport, path: &std::path::Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("serializing run report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing run report to {}", path.display()))?;
    Ok(())
}
