use crate::utils;
use colored::Colorize;
use routeflow_cloud_atracker::{ImportKind, Imported};

pub async fn handle(kind: ImportKind, id: &str) -> anyhow::Result<()> {
    let project = utils::load_project()?;
    let provider = utils::build_provider()?;
    let state_manager = project.state_manager();
    let lock = state_manager.acquire_lock().await?;
    let mut state = state_manager.load().await?;

    let imported = match provider.import(kind, id, &mut state).await {
        Ok(imported) => imported,
        Err(e) => {
            lock.release().await?;
            return Err(e.into());
        }
    };

    state_manager.save(&state).await?;
    lock.release().await?;

    let (section, name) = match &imported {
        Imported::Target(spec) => ("targets", spec.name.as_str()),
        Imported::Route(spec) => ("routes", spec.name.as_str()),
    };
    eprintln!(
        "{}",
        format!("✓ {} を '{}' として取り込みました", id, name)
            .green()
            .bold()
    );
    eprintln!("以下をマニフェストの {} に追加してください:", section);
    eprintln!();
    print!("{}", serde_yaml::to_string(&vec![imported])?);

    Ok(())
}
