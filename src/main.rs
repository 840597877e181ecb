//! 程序入口：初始化日志、解析命令行并调用核心操作
//!
//! 数据（JSON 文档、层级列表）输出到 stdout，提示与日志输出到 stderr。

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::fmt::SubscriberBuilder;

use apic_tree::model::extract::fragment_count;
use apic_tree::utils::loader::DEFAULT_STREAMING_THRESHOLD;
use apic_tree::utils::writer::to_pretty_string;
use apic_tree::vm::bridge::*;
use apic_tree::vm::hierarchy::{flatten, format_row};
use apic_tree::{
    get_hierarchy, save, Document, LoadOptions, LoadStrategy, ObjectPath, Session, StatusIntent, Target, TreeError,
};

#[derive(Parser)]
#[command(name = "apic-tree", about = "APIC 配置树工具：搜索、提取与状态标记", version)]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
    /// 文件超过该字节数时使用增量解析
    #[arg(long, global = true, value_name = "BYTES", default_value_t = DEFAULT_STREAMING_THRESHOLD)]
    stream_threshold: u64,
    /// 总是使用增量解析
    #[arg(long, global = true)]
    streaming: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出对象层级
    Summary(SummaryArgs),
    /// 按类型与名称搜索对象，可选标记状态并导出
    Find(FindArgs),
    /// 按路径或子节点下标提取子树
    Extract(ExtractArgs),
    /// 设置或清除对象状态并保存
    Status(StatusArgs),
}

#[derive(Args)]
struct SummaryArgs {
    file: PathBuf,
    /// 展开的最大层数（根的直接子节点为第 1 层）
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
    /// 以 JSON 输出
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FindArgs {
    file: PathBuf,
    /// 对象类型标签，如 fvBD
    #[arg(long = "type", value_name = "TAG")]
    type_tag: String,
    /// 对象名称，多个名称用逗号分隔；省略时匹配该类型的全部对象
    #[arg(long, value_name = "NAMES")]
    name: Option<String>,
    /// 为找到的对象设置状态
    #[arg(long, value_enum, value_name = "STATUS", conflicts_with = "clear_status")]
    set_status: Option<StatusChoice>,
    /// 清除找到的对象的状态
    #[arg(long)]
    clear_status: bool,
    /// 输出文件；缺省时打印到 stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// 保存修改后的完整文档（写到 --output 或源文件），而不是导出找到的对象
    #[arg(long)]
    save: bool,
}

#[derive(Args)]
struct TargetArgs {
    /// 下标路径，逗号分隔，如 0/1,0/2
    #[arg(long, value_delimiter = ',', value_name = "PATHS", required_unless_present = "children", conflicts_with = "children")]
    paths: Vec<ObjectPath>,
    /// 首个根对象的子节点下标，逗号分隔，如 1,3
    #[arg(long, value_delimiter = ',', value_name = "INDICES")]
    children: Vec<usize>,
}

impl TargetArgs {
    fn into_target(self) -> Target {
        if self.paths.is_empty() {
            Target::Indices(self.children)
        } else {
            Target::Paths(self.paths)
        }
    }
}

#[derive(Args)]
struct ExtractArgs {
    file: PathBuf,
    #[command(flatten)]
    targets: TargetArgs,
    /// 输出文件；缺省时打印到 stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct StatusArgs {
    file: PathBuf,
    #[command(flatten)]
    targets: TargetArgs,
    /// 要设置的状态
    #[arg(long, value_enum, value_name = "STATUS", required_unless_present = "clear", conflicts_with = "clear")]
    set: Option<StatusChoice>,
    /// 清除状态
    #[arg(long)]
    clear: bool,
    /// 输出文件；缺省时写回源文件
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

/// 命令行可选的状态值
#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusChoice {
    #[value(alias = "create")]
    Created,
    #[value(name = "modified-created", alias = "modify-create")]
    ModifiedCreated,
    #[value(alias = "delete")]
    Deleted,
}

impl From<StatusChoice> for StatusIntent {
    fn from(choice: StatusChoice) -> Self {
        match choice {
            StatusChoice::Created => StatusIntent::Create,
            StatusChoice::ModifiedCreated => StatusIntent::ModifyCreate,
            StatusChoice::Deleted => StatusIntent::Delete,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}{:#}", STATUS_ERROR_PREFIX, err);
            if let Some(tree_err) = err.downcast_ref::<TreeError>() {
                eprintln!("{}", load_error_hint(tree_err));
            }
            EXIT_FAILURE
        }
    };
    process::exit(code);
}

fn run() -> Result<i32> {
    let Cli {
        verbose,
        stream_threshold,
        streaming,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let options = LoadOptions {
        streaming_threshold: stream_threshold,
        strategy: streaming.then_some(LoadStrategy::Streaming),
    };
    match command {
        Commands::Summary(args) => execute_summary(args, options),
        Commands::Find(args) => execute_find(args, options),
        Commands::Extract(args) => execute_extract(args, options),
        Commands::Status(args) => execute_status(args, options),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    // 日志写入 stderr，stdout 只输出数据
    let _ = SubscriberBuilder::default()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_session(file: &Path, options: LoadOptions) -> Result<Session> {
    let mut session = Session::new().with_options(options);
    session
        .load_file(file)
        .with_context(|| format!("无法加载 {}", file.display()))?;
    eprintln!("{}: {}", STATUS_LOADED, file.display());
    Ok(session)
}

/// 写到文件或打印到 stdout
fn emit(document: &Document, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if !save(document, path) {
                bail!("{} {}", STATUS_SAVE_FAILED, path.display());
            }
            eprintln!("{} {}", STATUS_SAVED, path.display());
        }
        None => print!("{}", to_pretty_string(document)),
    }
    Ok(())
}

fn save_session(session: &Session, destination: &Path) -> Result<()> {
    if !session.save(destination)? {
        bail!("{} {}", STATUS_SAVE_FAILED, destination.display());
    }
    eprintln!("{} {}", STATUS_SAVED, destination.display());
    Ok(())
}

fn split_names(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn execute_summary(args: SummaryArgs, options: LoadOptions) -> Result<i32> {
    let session = open_session(&args.file, options)?;
    let document = session.document()?;
    if document.is_empty() {
        eprintln!("{}", STATUS_NOT_FOUND);
        return Ok(EXIT_EMPTY);
    }

    let rows = flatten(&get_hierarchy(document, args.max_depth));
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}", format_row(row));
        }
    }
    Ok(EXIT_OK)
}

/// 搜索条件：按名称或只按类型
enum Query {
    Names(Vec<String>),
    Tag,
}

impl Query {
    fn parse(name: Option<&str>) -> Result<Self> {
        let Some(input) = name else {
            return Ok(Query::Tag);
        };
        let names = split_names(input);
        if names.is_empty() {
            bail!("--name 至少需要一个名称");
        }
        Ok(Query::Names(names))
    }

    fn count(&self, session: &Session, type_tag: &str) -> Result<usize> {
        Ok(match self {
            Query::Names(names) => session.find_all(type_tag, names.as_slice())?.len(),
            Query::Tag => session.find_by_tag(type_tag)?.len(),
        })
    }

    fn mark(&self, session: &mut Session, type_tag: &str, value: Option<&str>) -> Result<usize> {
        Ok(match self {
            Query::Names(names) => session.mark_matches(type_tag, names.as_slice(), value)?,
            Query::Tag => session.mark_by_tag(type_tag, value)?,
        })
    }

    fn extract(&self, session: &Session, type_tag: &str) -> Result<Document> {
        Ok(match self {
            Query::Names(names) => session.find_and_extract(type_tag, names.as_slice())?,
            Query::Tag => session.extract_by_tag(type_tag)?,
        })
    }

    fn describe(&self) -> String {
        match self {
            Query::Names(names) => format!("名称 {}", names.join(", ")),
            Query::Tag => "任意名称".to_string(),
        }
    }
}

fn execute_find(args: FindArgs, options: LoadOptions) -> Result<i32> {
    let query = Query::parse(args.name.as_deref())?;
    let mut session = open_session(&args.file, options)?;

    let found = query.count(&session, &args.type_tag)?;
    if found == 0 {
        eprintln!("{}: 类型 '{}', {}", STATUS_NOT_FOUND, args.type_tag, query.describe());
        return Ok(EXIT_EMPTY);
    }
    eprintln!("找到 {} 个类型为 '{}' 的对象", found, args.type_tag);

    let mark = if args.clear_status {
        Some(None)
    } else {
        args.set_status.map(|choice| Some(StatusIntent::from(choice).as_str()))
    };
    if let Some(value) = mark {
        query.mark(&mut session, &args.type_tag, value)?;
        eprintln!("{}: {}", STATUS_MARKED, value.unwrap_or("(已清除)"));
    }

    if args.save {
        let destination = args.output.as_deref().unwrap_or(args.file.as_path());
        save_session(&session, destination)?;
    } else {
        let fragment = query.extract(&session, &args.type_tag)?;
        emit(&fragment, args.output.as_deref())?;
    }
    Ok(EXIT_OK)
}

fn execute_extract(args: ExtractArgs, options: LoadOptions) -> Result<i32> {
    let session = open_session(&args.file, options)?;
    let fragment = session.extract(args.targets.into_target())?;
    if fragment_count(&fragment) == 0 {
        eprintln!("{}", STATUS_NOT_FOUND);
        return Ok(EXIT_EMPTY);
    }
    emit(&fragment, args.output.as_deref())?;
    Ok(EXIT_OK)
}

fn execute_status(args: StatusArgs, options: LoadOptions) -> Result<i32> {
    let value = if args.clear {
        None
    } else {
        args.set.map(|choice| StatusIntent::from(choice).as_str())
    };
    let mut session = open_session(&args.file, options)?;
    let all_applied = session.set_status(args.targets.into_target(), value)?;

    let destination = args.output.as_deref().unwrap_or(args.file.as_path());
    save_session(&session, destination)?;
    if !all_applied {
        eprintln!("{}", STATUS_PARTIAL_FAILURE);
        return Ok(EXIT_FAILURE);
    }
    eprintln!("{}: {}", STATUS_MARKED, value.unwrap_or("(已清除)"));
    Ok(EXIT_OK)
}
