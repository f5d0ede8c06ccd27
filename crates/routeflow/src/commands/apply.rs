use crate::utils;
use colored::Colorize;

pub async fn handle(yes: bool) -> anyhow::Result<()> {
    let project = utils::load_project()?;
    println!(
        "マニフェスト: {}",
        project.manifest_path.display().to_string().cyan()
    );

    let provider = utils::build_provider()?;
    let state_manager = project.state_manager();
    let lock = state_manager.acquire_lock().await?;
    let mut state = state_manager.load().await?;

    let plan = provider.plan(&project.manifest, &state).await?;
    utils::print_plan(&plan);

    if !plan.has_changes {
        lock.release().await?;
        return Ok(());
    }

    if !yes {
        println!();
        println!("実行するには --yes オプションを指定してください");
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "反映中...".blue());
    let result = provider.apply(&project.manifest, &mut state).await?;

    // 失敗があっても作成済みのIDは保存する
    state_manager.save(&state).await?;
    lock.release().await?;

    utils::report_result(&result)
}
