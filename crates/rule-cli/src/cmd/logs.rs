use crate::output::{print_json, print_table};
use rule_core::config::ClientConfig;
use rule_core::log::LogEntry;

pub async fn run(config: rule_core::Result<ClientConfig>, limit: usize, json: bool) -> anyhow::Result<()> {
    let signed = super::connect(config).await?;
    let mut entries = signed.context.logs().list(&signed.identity).await?;
    entries.truncate(limit);

    if json {
        print_json(&entries)?;
        return Ok(());
    }
    if entries.is_empty() {
        println!("No reviews yet.");
        return Ok(());
    }
    let rows = entries.iter().map(row).collect();
    print_table(&["WHEN", "COUNTS", "REFLECTION"], rows);
    Ok(())
}

fn row(entry: &LogEntry) -> Vec<String> {
    let when = entry
        .timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "pending".into());
    let counts = entry
        .data
        .iter()
        .map(|(habit, n)| format!("{habit}={n}"))
        .collect::<Vec<_>>()
        .join(" ");
    vec![when, counts, entry.reflection.clone()]
}
