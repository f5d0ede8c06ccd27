use crate::utils;
use colored::Colorize;
use routeflow_cloud::ResourceKind;
use routeflow_cloud_atracker::{RouteKind, TargetKind};

pub async fn handle(yes: bool) -> anyhow::Result<()> {
    let project = utils::load_project()?;
    let state_manager = project.state_manager();
    let lock = state_manager.acquire_lock().await?;
    let mut state = state_manager.load().await?;

    let routes: Vec<_> = state.bindings_of(RouteKind::KIND).collect();
    let targets: Vec<_> = state.bindings_of(TargetKind::KIND).collect();

    if routes.is_empty() && targets.is_empty() && project.manifest.settings.is_none() {
        println!("{}", "管理しているリソースはありません".dimmed());
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "削除対象:".bold());
    for binding in routes.iter().chain(targets.iter()) {
        println!(
            "  {} {}.{} ({})",
            "-".red().bold(),
            binding.kind,
            binding.name.cyan(),
            binding.identity.to_string().dimmed()
        );
    }
    if project.manifest.settings.is_some() {
        println!("  {} settings (初期値に戻す)", "!".red().bold());
    }

    if !yes {
        println!();
        println!(
            "{}",
            "⚠ 警告: 監査イベントの転送が停止します".red().bold()
        );
        println!("  実行するには --yes を指定してください。");
        lock.release().await?;
        return Ok(());
    }

    let provider = utils::build_provider()?;
    let result = provider.destroy(&project.manifest, &mut state).await?;

    state_manager.save(&state).await?;
    lock.release().await?;

    utils::report_result(&result)
}
