use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use grade_harvest::cli::{Cli, Command};
use grade_harvest::utils::logging;
use grade_harvest::{App, Config, Ledger, MergeEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = cli.apply(Config::load(cli.config.as_deref()).await?);

    // 初始化日志：只有抓取会写日志文件
    let log_file = matches!(cli.command, Command::Scrape { .. }).then_some(config.output_log_file.as_path());
    logging::init(log_file, config.verbose_logging)?;

    if let Err(e) = run(&cli, config).await {
        error!("❌ 运行失败: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: &Cli, config: Config) -> Result<()> {
    match &cli.command {
        Command::Scrape { .. } => {
            let probe = cli.probe_target();
            let app = App::initialize(config).await?;
            match probe {
                Some(target) => {
                    app.probe(&target.session, &target.subject, &target.unit).await?;
                }
                None => {
                    app.run().await?;
                }
            }
        }
        Command::Merge { source, target } => {
            let source = source.clone().unwrap_or_else(|| config.raw_output_dir.clone());
            let target = target.clone().unwrap_or_else(|| config.merged_output_dir.clone());
            MergeEngine::new(source, target)?.run().await?;
        }
        Command::Progress => {
            let ledger = Ledger::open_read_only(&config.progress_file);
            println!("{}", ledger.summary());
        }
        Command::ResetFailed { session, subject } => {
            let mut ledger = Ledger::load(&config.progress_file)?;
            let removed = ledger.clear_failed(
                &config.qualification_type,
                session.as_deref(),
                subject.as_deref(),
            );
            ledger.save()?;
            info!("✓ 已清除 {} 条失败记录", removed);
        }
    }
    Ok(())
}
