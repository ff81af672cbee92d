use crate::output::{bar, print_json, print_table};
use rule_core::aggregate::{aggregate, Progress, WINDOW};
use rule_core::config::ClientConfig;

pub async fn run(config: rule_core::Result<ClientConfig>, json: bool) -> anyhow::Result<()> {
    let signed = super::connect(config).await?;
    let schemas = signed.context.schemas();
    let logs = signed.context.logs();
    let (schema, entries) = tokio::try_join!(
        schemas.current(&signed.identity),
        logs.list(&signed.identity)
    )?;
    let progress = aggregate(&schema, &entries);

    if json {
        print_json(&progress)?;
    } else {
        print_dashboard(&progress);
    }
    Ok(())
}

pub(crate) fn pulse_line(progress: &Progress) -> String {
    format!(
        "Weekly pulse: {}% ({}/{}) over the last {} of {} reviews",
        progress.progress, progress.current, progress.target, progress.window, WINDOW
    )
}

fn print_dashboard(progress: &Progress) {
    println!("{}", pulse_line(progress));
    println!();

    let mut rows = Vec::new();
    for cat in &progress.categories {
        if cat.habits.is_empty() {
            rows.push(vec![
                cat.label.clone(),
                "-".into(),
                String::new(),
                String::new(),
                String::new(),
                cat.purpose.clone(),
            ]);
        }
        for h in &cat.habits {
            rows.push(vec![
                cat.label.clone(),
                h.name.clone(),
                h.rhythm.to_string(),
                format!("{}/{}", h.current, h.target),
                format!("{} {:>3}%", bar(h.progress), h.progress),
                cat.purpose.clone(),
            ]);
        }
    }
    print_table(
        &["CATEGORY", "HABIT", "RHYTHM", "DONE", "PROGRESS", "PURPOSE"],
        rows,
    );
}
