use colored::Colorize;
use routeflow_cloud::{Action, ActionType, ApplyResult, Plan, StateManager};
use routeflow_cloud_atracker::{AtrackerClient, AtrackerConfig, AtrackerProvider, Manifest};
use routeflow_config::Profile;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 読み込んだマニフェストとそのプロジェクトルート
pub struct Project {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

impl Project {
    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.root)
    }
}

/// マニフェストを探して読み込む
pub fn load_project() -> anyhow::Result<Project> {
    let manifest_path = routeflow_config::find_manifest_file()?;
    let manifest = Manifest::load(&manifest_path)?;
    let root = project_root_for(&manifest_path);

    tracing::debug!("Project root: {}", root.display());
    Ok(Project {
        root,
        manifest_path,
        manifest,
    })
}

/// `.routeflow/` 内のマニフェストはその親ディレクトリをルートとする
fn project_root_for(manifest_path: &Path) -> PathBuf {
    let parent = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    match parent.file_name() {
        Some(name) if name == ".routeflow" => parent.parent().unwrap_or(parent).to_path_buf(),
        _ => parent.to_path_buf(),
    }
}

/// プロファイル → 環境変数の順に接続設定を組み立てる
pub fn build_provider() -> anyhow::Result<AtrackerProvider> {
    let profile = Profile::load()?;

    let mut config = AtrackerConfig::new(AtrackerConfig::api_token_from_env()?);
    if let Some(region) = profile.region {
        config = config.with_region(region);
    }
    if let Some(private) = profile.private_endpoint {
        config = config.with_private_endpoint(private);
    }
    if let Some(endpoint) = profile.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(secs) = profile.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config.apply_env()?;

    tracing::debug!("Service URL: {}", config.service_url());
    Ok(AtrackerProvider::new(AtrackerClient::new(&config)?))
}

fn action_marker(action_type: ActionType) -> colored::ColoredString {
    match action_type {
        ActionType::Create => "+".green().bold(),
        ActionType::Update => "~".yellow().bold(),
        ActionType::Delete => "-".red().bold(),
        ActionType::Reset => "!".red().bold(),
        ActionType::NoOp => " ".normal(),
    }
}

fn print_action(action: &Action) {
    let label = format!("{}.{}", action.resource_type, action.resource_name);
    let label = match action.action_type {
        ActionType::NoOp => label.dimmed(),
        _ => label.cyan(),
    };
    match &action.resource_id {
        Some(id) => println!("  {} {} ({})", action_marker(action.action_type), label, id.dimmed()),
        None => println!("  {} {}", action_marker(action.action_type), label),
    }

    for change in &action.changes {
        println!("      {} {}", "~".yellow(), change);
    }
}

pub fn print_plan(plan: &Plan) {
    println!();
    println!("{}", "実行計画:".bold());
    for action in &plan.actions {
        print_action(action);
    }
    println!();
    if plan.has_changes {
        println!("{}", plan.summary().to_string().bold());
    } else {
        println!("{}", "✓ 変更はありません".green());
    }
}

/// 失敗があった場合はエラーを返す
pub fn report_result(result: &ApplyResult) -> anyhow::Result<()> {
    println!();
    for succeeded in &result.succeeded {
        if succeeded.action_type != ActionType::NoOp {
            println!("  {} {}", "✓".green(), succeeded.message);
        }
    }
    for failed in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failed.action_id,
            failed.error.as_deref().unwrap_or_default()
        );
    }

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!(
                "✓ 完了しました ({} 件変更, {}ms)",
                result.changed(),
                result.duration_ms
            )
            .green()
            .bold()
        );
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} 件の操作が失敗しました",
            result.failed.len()
        ))
    }
}
