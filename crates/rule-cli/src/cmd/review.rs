use crate::output::print_json;
use anyhow::{bail, Context};
use rule_core::config::ClientConfig;
use rule_core::review::{parse_count, ReviewDraft};

pub async fn run(
    config: rule_core::Result<ClientConfig>,
    check: &[String],
    count: &[String],
    reflection: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut draft = ReviewDraft::new();
    for habit in check {
        draft.toggle(habit);
    }
    for arg in count {
        let (habit, n) = parse_count(arg)?;
        draft.set_count(&habit, n);
    }
    draft.reflection = reflection.unwrap_or_default();
    if draft.is_empty() {
        bail!("nothing to record: pass --check, --count or --reflection");
    }

    let signed = super::connect(config).await?;
    let schema = signed.context.schemas().current(&signed.identity).await?;
    draft
        .check_habits(&schema)
        .context("see `rule settings show` for habit ids")?;

    let id = draft
        .submit(&signed.context.logs(), &signed.identity)
        .await
        .context("review not recorded")?;

    if json {
        print_json(&serde_json::json!({ "id": id }))?;
    } else {
        println!("Recorded review {id}");
    }
    Ok(())
}
