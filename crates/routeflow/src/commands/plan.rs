use crate::utils;
use colored::Colorize;

pub async fn handle() -> anyhow::Result<()> {
    let project = utils::load_project()?;
    println!(
        "マニフェスト: {}",
        project.manifest_path.display().to_string().cyan()
    );

    let provider = utils::build_provider()?;
    let state = project.state_manager().load().await?;

    let plan = provider.plan(&project.manifest, &state).await?;
    utils::print_plan(&plan);

    Ok(())
}
