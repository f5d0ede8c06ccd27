use crate::TargetCommands;
use crate::utils;
use colored::Colorize;

pub async fn handle(cmd: TargetCommands) -> anyhow::Result<()> {
    let provider = utils::build_provider()?;

    match cmd {
        TargetCommands::List { region } => {
            let targets = provider.list_targets(region).await?;
            if targets.is_empty() {
                println!("{}", "ターゲットはありません".dimmed());
                return Ok(());
            }

            println!("{}", format!("ターゲット ({} 個):", targets.len()).bold());
            for target in &targets {
                let status = target
                    .write_status
                    .as_ref()
                    .map(|w| w.status.as_str())
                    .unwrap_or("-");
                println!(
                    "  • {} {} [{}] {} {}",
                    target.name.cyan(),
                    target.id.dimmed(),
                    target.target_type,
                    target.region.as_deref().unwrap_or("-"),
                    status
                );
            }
        }
        TargetCommands::Validate { id } => {
            println!(
                "{}",
                format!("ターゲット {} への書き込みをテスト中...", id).blue()
            );
            let target = provider.validate_target(&id).await?;

            match target.write_status {
                Some(status) if status.status == "success" => {
                    println!(
                        "{}",
                        format!("✓ {} に書き込めました", target.name).green().bold()
                    );
                }
                Some(status) => {
                    println!(
                        "{}",
                        format!("✗ {} への書き込みに失敗しました", target.name)
                            .red()
                            .bold()
                    );
                    if let Some(reason) = status.reason_for_last_failure {
                        println!("  {}", reason);
                    }
                    return Err(anyhow::anyhow!("write status: {}", status.status));
                }
                None => {
                    println!("{}", "ℹ 書き込み状態は返されませんでした".dimmed());
                }
            }
        }
    }

    Ok(())
}
