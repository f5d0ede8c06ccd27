mod commands;
mod utils;

use clap::{Parser, Subcommand, ValueEnum};
use routeflow_cloud_atracker::ImportKind;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routeflow")]
#[command(about = "監査ログの行き先を、宣言で管理する。", long_about = None)]
struct Cli {
    /// デバッグログを出力 (RUST_LOG より優先)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// マニフェストとリモートの差分を表示
    Plan,
    /// マニフェストの内容をリモートに反映
    Apply {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 管理しているルートとターゲットを削除
    Destroy {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 既存のリソースを管理下に取り込む
    Import {
        /// リソースの種類
        #[arg(value_enum)]
        kind: ImportKindArg,
        /// リモートのID (リモートの名前で管理下に入る)
        id: String,
    },
    /// ターゲットを操作
    #[command(subcommand)]
    Targets(TargetCommands),
    /// ルートを操作
    #[command(subcommand)]
    Routes(RouteCommands),
    /// アカウント設定を操作
    #[command(subcommand)]
    Settings(SettingsCommands),
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
pub enum TargetCommands {
    /// ターゲットの一覧を表示
    List {
        /// このリージョンのターゲットのみ
        #[arg(long)]
        region: Option<String>,
    },
    /// ターゲットへの書き込みをテスト
    Validate {
        /// ターゲットID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum RouteCommands {
    /// ルートの一覧を表示
    List,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// 現在の設定を表示
    Show,
    /// 設定を初期値に戻す
    Reset {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportKindArg {
    Target,
    Route,
}

impl From<ImportKindArg> for ImportKind {
    fn from(kind: ImportKindArg) -> Self {
        match kind {
            ImportKindArg::Target => ImportKind::Target,
            ImportKindArg::Route => ImportKind::Route,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ、stdoutはコマンドの出力に使う
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan => commands::plan::handle().await?,
        Commands::Apply { yes } => commands::apply::handle(yes).await?,
        Commands::Destroy { yes } => commands::destroy::handle(yes).await?,
        Commands::Import { kind, id } => commands::import::handle(kind.into(), &id).await?,
        Commands::Targets(cmd) => commands::targets::handle(cmd).await?,
        Commands::Routes(cmd) => commands::routes::handle(cmd).await?,
        Commands::Settings(cmd) => commands::settings::handle(cmd).await?,
        Commands::Version => {
            println!("routeflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
