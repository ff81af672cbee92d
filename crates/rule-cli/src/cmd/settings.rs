use crate::output::{print_json, print_table};
use clap::Subcommand;
use rule_core::config::ClientConfig;
use rule_core::schema::{NewHabit, Schema, SchemaEdit};
use rule_core::types::{HabitType, Rhythm};

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum SettingsSubcommand {
    /// Show every category and habit
    Show,
    /// Set a category's purpose
    Purpose {
        category: String,
        #[arg(required = true)]
        purpose: Vec<String>,
    },
    /// Rename a habit
    Rename {
        category: String,
        habit: String,
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Set a habit's target
    Target {
        category: String,
        habit: String,
        target: u32,
    },
    /// Add a habit to a category
    Add {
        category: String,
        #[arg(required = true)]
        name: Vec<String>,
        /// daily or weekly
        #[arg(long, default_value = "weekly")]
        rhythm: Rhythm,
        /// Target count per window
        #[arg(long, default_value = "1")]
        target: u32,
        /// count or boolean
        #[arg(long = "type", default_value = "count")]
        kind: HabitType,
    },
    /// Remove a habit; its recorded counts stay in the log
    Remove { category: String, habit: String },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn run(
    config: rule_core::Result<ClientConfig>,
    subcmd: SettingsSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let signed = super::connect(config).await?;
    let repo = signed.context.schemas();
    let me = &signed.identity;

    let (schema, message) = match subcmd {
        SettingsSubcommand::Show => (repo.current(me).await?, None),
        SettingsSubcommand::Purpose { category, purpose } => {
            let edit = SchemaEdit::SetPurpose {
                category: category.clone(),
                purpose: purpose.join(" "),
            };
            (repo.apply(me, edit).await?, Some(format!("Updated purpose of {category}")))
        }
        SettingsSubcommand::Rename {
            category,
            habit,
            name,
        } => {
            let edit = SchemaEdit::RenameHabit {
                category,
                habit: habit.clone(),
                name: name.join(" "),
            };
            (repo.apply(me, edit).await?, Some(format!("Renamed {habit}")))
        }
        SettingsSubcommand::Target {
            category,
            habit,
            target,
        } => {
            let edit = SchemaEdit::SetTarget {
                category,
                habit: habit.clone(),
                target,
            };
            (repo.apply(me, edit).await?, Some(format!("Set target of {habit} to {target}")))
        }
        SettingsSubcommand::Add {
            category,
            name,
            rhythm,
            target,
            kind,
        } => {
            let habit = NewHabit {
                name: name.join(" "),
                rhythm,
                target,
                kind,
            };
            let (schema, id) = repo.update(me, |s| s.add_habit(&category, habit)).await?;
            (schema, Some(format!("Added habit {id} to {category}")))
        }
        SettingsSubcommand::Remove { category, habit } => {
            let edit = SchemaEdit::RemoveHabit {
                category,
                habit: habit.clone(),
            };
            (repo.apply(me, edit).await?, Some(format!("Removed {habit}")))
        }
    };

    if json {
        return print_json(&schema);
    }
    match message {
        Some(message) => println!("{message}"),
        None => print_schema(&schema),
    }
    Ok(())
}

fn print_schema(schema: &Schema) {
    let mut rows = Vec::new();
    for cat in &schema.categories {
        for h in &cat.habits {
            rows.push(vec![
                cat.id.clone(),
                h.id.clone(),
                h.name.clone(),
                h.rhythm.to_string(),
                h.kind.to_string(),
                h.target.to_string(),
                cat.purpose.clone(),
            ]);
        }
        if cat.habits.is_empty() {
            rows.push(vec![
                cat.id.clone(),
                "-".into(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                cat.purpose.clone(),
            ]);
        }
    }
    print_table(
        &["CATEGORY", "HABIT", "NAME", "RHYTHM", "TYPE", "TARGET", "PURPOSE"],
        rows,
    );
}
