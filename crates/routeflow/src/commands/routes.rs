use crate::RouteCommands;
use crate::utils;
use colored::Colorize;

pub async fn handle(cmd: RouteCommands) -> anyhow::Result<()> {
    let provider = utils::build_provider()?;

    match cmd {
        RouteCommands::List => {
            let routes = provider.list_routes().await?;
            if routes.is_empty() {
                println!("{}", "ルートはありません".dimmed());
                return Ok(());
            }

            println!("{}", format!("ルート ({} 個):", routes.len()).bold());
            for route in &routes {
                println!("  • {} {}", route.name.cyan(), route.id.dimmed());
                for rule in &route.rules {
                    let locations = if rule.locations.is_empty() {
                        "(default)".to_string()
                    } else {
                        rule.locations.join(", ")
                    };
                    println!("      {} → {}", locations, rule.target_ids.join(", "));
                }
            }
        }
    }

    Ok(())
}
