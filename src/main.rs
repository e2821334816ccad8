//! dom-localizer 命令行入口
//!
//! 读取 HTML 文档，加载词典和规则，执行一轮本地化后输出结果文档。

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::Parser;
use tracing::{info, warn, Level};

use dom_localizer::env::{self as localizer_env, EnvConfig, EnvVar};
use dom_localizer::error::helpers::log_error;
use dom_localizer::{
    ConfigManager, Document, Localizer, LocalizerConfig, LocalizerError, LocalizerResult, RuleSet,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 输入 HTML 文件，`-` 表示标准输入
    #[arg(default_value = "-")]
    input: String,

    /// 词典文件路径或 http(s) 地址（默认读取 LOCALIZER_DICTIONARY）
    #[arg(short, long)]
    dictionary: Option<String>,

    /// 规则文件，TOML 或 JSON（默认读取 LOCALIZER_RULES）
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// 配置文件，不指定时按默认搜索路径查找
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 目标语言，覆盖配置文件
    #[arg(short, long)]
    lang: Option<String>,

    /// 输出文件，不指定时写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 输入文档编码
    #[arg(short = 'E', long)]
    encoding: Option<String>,

    /// 不打印运行统计
    #[arg(short, long)]
    quiet: bool,

    /// 打印环境变量说明后退出
    #[arg(long)]
    env_docs: bool,

    /// 打印当前环境变量配置后退出
    #[arg(long)]
    env_summary: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.env_docs {
        print!("{}", localizer_env::generate_env_docs());
        return;
    }

    if cli.env_summary {
        match EnvConfig::from_env() {
            Ok(env_config) => env_config.print_summary(),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    init_tracing();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// 日志级别取自 LOCALIZER_LOG_LEVEL，日志写到标准错误
fn init_tracing() {
    let level = localizer_env::core::LogLevel::get()
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let no_color = localizer_env::core::NoColor::get().unwrap_or(false);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!no_color)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> LocalizerResult<()> {
    let config = load_config(&cli)?;

    let dictionary_source = cli
        .dictionary
        .clone()
        .or_else(|| localizer_env::sources::Dictionary::get().ok())
        .ok_or_else(|| {
            LocalizerError::ConfigError(format!(
                "未指定词典，请使用 --dictionary 或设置 {}",
                localizer_env::sources::Dictionary::NAME
            ))
        })?;
    let payload = read_dictionary(&dictionary_source)?;

    let rules_path = cli.rules.clone().or_else(|| {
        localizer_env::sources::Rules::get()
            .ok()
            .map(PathBuf::from)
    });
    let rules = match rules_path {
        Some(path) => RuleSet::load(path)?,
        None => {
            warn!("{} 未指定规则文件，只会解析和输出文档", config.log_prefix);
            RuleSet::new()
        }
    };

    let input = read_input(&cli.input)?;
    let document = Rc::new(Document::parse_html(&input, cli.encoding.as_deref())?);

    let localizer = Localizer::builder(&payload, document.clone())
        .rules(rules)
        .config(config)
        .build()?;
    localizer.run();

    let output = document.serialize(cli.encoding.as_deref())?;
    write_output(cli.output.as_ref(), &output)?;

    let stats = localizer.stats();
    info!("{} {}", localizer.config().log_prefix, stats);
    if !cli.quiet {
        eprintln!("{}", stats);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> LocalizerResult<LocalizerConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path),
        None => ConfigManager::new(),
    };
    let mut config = match manager {
        Ok(manager) => manager.into_config(),
        Err(e) => return log_error(e),
    };

    if let Some(lang) = &cli.lang {
        config.target_lang = lang.to_lowercase();
        config.validate()?;
    }

    Ok(config)
}

/// 读取词典：本地文件或 http(s) 地址
fn read_dictionary(source: &str) -> LocalizerResult<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("下载词典: {}", source);
        return reqwest::blocking::get(source)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| {
                LocalizerError::DictionaryError(format!("词典下载失败: {}", e)).with_context(source)
            });
    }

    let path = shellexpand::tilde(source);
    fs::read_to_string(path.as_ref()).map_err(|e| {
        LocalizerError::DictionaryError(format!("无法读取词典: {}", e)).with_context(source)
    })
}

fn read_input(input: &str) -> LocalizerResult<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        return Ok(data);
    }

    fs::read(input)
        .map_err(|e| LocalizerError::IoError(format!("无法读取输入文档: {}", e)).with_context(input))
}

fn write_output(path: Option<&PathBuf>, data: &[u8]) -> LocalizerResult<()> {
    match path {
        Some(path) => fs::write(path, data).map_err(|e| {
            LocalizerError::IoError(format!("无法写入输出文件: {}", e)).with_context(path.display())
        }),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
