use crate::SettingsCommands;
use crate::utils;
use colored::Colorize;

pub async fn handle(cmd: SettingsCommands) -> anyhow::Result<()> {
    let provider = utils::build_provider()?;

    match cmd {
        SettingsCommands::Show => match provider.settings().await? {
            Some(settings) => print!("{}", serde_yaml::to_string(&settings.spec)?),
            None => println!("{}", "設定はまだ初期化されていません".dimmed()),
        },
        SettingsCommands::Reset { yes } => {
            if !yes {
                println!(
                    "{}",
                    "警告: メタデータリージョン以外の設定が初期値に戻ります".yellow()
                );
                println!("実行するには --yes オプションを指定してください");
                return Ok(());
            }

            let settings = provider.reset_settings().await?;
            println!("{}", "✓ 設定を初期値に戻しました".green().bold());
            print!("{}", serde_yaml::to_string(&settings.spec)?);
        }
    }

    Ok(())
}
