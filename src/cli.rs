//! 命令行参数

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{parse_filter_list, Config};

#[derive(Debug, Parser)]
#[command(name = "grade_harvest", version, about = "成绩换算表抓取与合并去重")]
pub struct Cli {
    /// TOML 配置文件（也可用 HARVEST_CONFIG 指定）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出 debug 日志
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 遍历 考试季 → 科目 → 单元 并保存成绩表
    Scrape {
        /// 只处理名称包含这些关键词的科目（逗号分隔，不区分大小写）
        #[arg(long)]
        subjects: Option<String>,

        /// 只试跑一个单元，不写文件也不写账本
        #[arg(long, num_args = 3, value_names = ["SESSION", "SUBJECT", "UNIT"])]
        test: Option<Vec<String>>,
    },
    /// 合并原始目录树并按单元代码去重
    Merge {
        /// 原始目录（默认取配置中的 raw_output_dir）
        #[arg(long)]
        source: Option<PathBuf>,

        /// 规范目录（默认取配置中的 merged_output_dir）
        #[arg(long)]
        target: Option<PathBuf>,
    },
    /// 显示进度账本汇总
    Progress,
    /// 清除失败记录，下次运行时重新尝试
    ResetFailed {
        #[arg(long)]
        session: Option<String>,

        #[arg(long)]
        subject: Option<String>,
    },
}

/// 单元试跑目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub session: String,
    pub subject: String,
    pub unit: String,
}

impl ProbeTarget {
    fn from_args(args: &[String]) -> Option<Self> {
        match args {
            [session, subject, unit] => Some(Self {
                session: session.clone(),
                subject: subject.clone(),
                unit: unit.clone(),
            }),
            _ => None,
        }
    }
}

impl Cli {
    /// 命令行参数覆盖配置
    pub fn apply(&self, mut config: Config) -> Config {
        if self.verbose {
            config.verbose_logging = true;
        }
        if let Command::Scrape {
            subjects: Some(subjects),
            ..
        } = &self.command
        {
            config.subject_filters = parse_filter_list(subjects);
        }
        config
    }

    /// `scrape --test` 指定的单元
    pub fn probe_target(&self) -> Option<ProbeTarget> {
        match &self.command {
            Command::Scrape {
                test: Some(args), ..
            } => ProbeTarget::from_args(args),
            _ => None,
        }
    }
}
