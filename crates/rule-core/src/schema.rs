//! Category/habit definition tree for one identity.
//!
//! Every edit is a structural mutation of a whole [`Schema`] value; the
//! repository then writes the entire tree back.

use crate::error::{Result, RuleError};
use crate::paths::{validate_id, MAX_ID_LEN};
use crate::types::{Color, HabitType, Icon, Rhythm};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub rhythm: Rhythm,
    pub target: u32,
    #[serde(rename = "type")]
    pub kind: HabitType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub icon: Icon,
    pub color: Color,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub habits: Vec<Habit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Fields for a habit being added; the id is assigned by [`Schema::add_habit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default = "default_rhythm")]
    pub rhythm: Rhythm,
    #[serde(default)]
    pub target: u32,
    #[serde(rename = "type", default = "default_habit_type")]
    pub kind: HabitType,
}

fn default_rhythm() -> Rhythm {
    Rhythm::Weekly
}

fn default_habit_type() -> HabitType {
    HabitType::Count
}

// ---------------------------------------------------------------------------
// Default tree
// ---------------------------------------------------------------------------

fn seed(
    id: &str,
    label: &str,
    icon: Icon,
    color: Color,
    purpose: &str,
    habit: (&str, &str, u32, HabitType),
) -> Category {
    let (habit_id, name, target, kind) = habit;
    Category {
        id: id.to_string(),
        label: label.to_string(),
        icon,
        color,
        purpose: purpose.to_string(),
        habits: vec![Habit {
            id: habit_id.to_string(),
            name: name.to_string(),
            rhythm: Rhythm::Weekly,
            target,
            kind,
        }],
    }
}

impl Default for Schema {
    /// The six-category tree written for an identity on first access.
    fn default() -> Self {
        use HabitType::{Boolean, Count};
        Self {
            categories: vec![
                seed("spiritual", "Spiritual", Icon::Heart, Color::Indigo, "Connection with God", ("s1", "Scripture", 7, Count)),
                seed("physical", "Physical", Icon::Dumbbell, Color::Emerald, "Health & Vitality", ("p1", "Exercise", 5, Count)),
                seed("intellectual", "Intellectual", Icon::Brain, Color::Sky, "Learning", ("i1", "Reading", 5, Count)),
                seed("relational", "Relational", Icon::Users, Color::Rose, "Community", ("r1", "Family Time", 7, Count)),
                seed("emotional", "Emotional", Icon::Smile, Color::Amber, "Inner Peace", ("e1", "Reflection", 1, Boolean)),
                seed("career", "Career", Icon::Briefcase, Color::Slate, "Impact", ("c1", "Deep Work", 10, Count)),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup and validation
// ---------------------------------------------------------------------------

impl Schema {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn category_mut(&mut self, id: &str) -> Result<&mut Category> {
        self.categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RuleError::CategoryNotFound(id.to_string()))
    }

    fn habit_mut(&mut self, category: &str, habit: &str) -> Result<&mut Habit> {
        self.category_mut(category)?
            .habits
            .iter_mut()
            .find(|h| h.id == habit)
            .ok_or_else(|| RuleError::HabitNotFound {
                category: category.to_string(),
                habit: habit.to_string(),
            })
    }

    /// Every habit in display order, paired with its category id.
    pub fn habits(&self) -> impl Iterator<Item = (&str, &Habit)> {
        self.categories
            .iter()
            .flat_map(|c| c.habits.iter().map(move |h| (c.id.as_str(), h)))
    }

    /// Check id syntax and uniqueness (categories in the schema, habits
    /// within their category).
    pub fn validate(&self) -> Result<()> {
        let mut categories = HashSet::new();
        for cat in &self.categories {
            validate_id(&cat.id)?;
            if !categories.insert(cat.id.as_str()) {
                return Err(RuleError::DuplicateCategory(cat.id.clone()));
            }
            let mut habits = HashSet::new();
            for habit in &cat.habits {
                validate_id(&habit.id)?;
                if !habits.insert(habit.id.as_str()) {
                    return Err(RuleError::DuplicateHabit {
                        category: cat.id.clone(),
                        habit: habit.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// One structural edit of the schema tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaEdit {
    SetPurpose { category: String, purpose: String },
    RenameHabit { category: String, habit: String, name: String },
    SetTarget { category: String, habit: String, target: u32 },
    RemoveHabit { category: String, habit: String },
    AddHabit { category: String, habit: NewHabit },
}

impl Schema {
    pub fn set_purpose(&mut self, category: &str, purpose: impl Into<String>) -> Result<()> {
        self.category_mut(category)?.purpose = purpose.into();
        Ok(())
    }

    pub fn rename_habit(&mut self, category: &str, habit: &str, name: impl Into<String>) -> Result<()> {
        self.habit_mut(category, habit)?.name = name.into();
        Ok(())
    }

    pub fn set_target(&mut self, category: &str, habit: &str, target: u32) -> Result<()> {
        self.habit_mut(category, habit)?.target = target;
        Ok(())
    }

    /// Remove a habit. Old log entries keep referencing its id.
    pub fn remove_habit(&mut self, category: &str, habit: &str) -> Result<Habit> {
        let cat = self.category_mut(category)?;
        let pos = cat
            .habits
            .iter()
            .position(|h| h.id == habit)
            .ok_or_else(|| RuleError::HabitNotFound {
                category: category.to_string(),
                habit: habit.to_string(),
            })?;
        Ok(cat.habits.remove(pos))
    }

    /// Append a habit to a category and return its assigned id.
    pub fn add_habit(&mut self, category: &str, habit: NewHabit) -> Result<String> {
        let cat = self.category_mut(category)?;
        let id = next_habit_id(cat);
        cat.habits.push(Habit {
            id: id.clone(),
            name: habit.name,
            rhythm: habit.rhythm,
            target: habit.target,
            kind: habit.kind,
        });
        Ok(id)
    }

    pub fn apply(&mut self, edit: SchemaEdit) -> Result<()> {
        match edit {
            SchemaEdit::SetPurpose { category, purpose } => self.set_purpose(&category, purpose),
            SchemaEdit::RenameHabit { category, habit, name } => {
                self.rename_habit(&category, &habit, name)
            }
            SchemaEdit::SetTarget { category, habit, target } => {
                self.set_target(&category, &habit, target)
            }
            SchemaEdit::RemoveHabit { category, habit } => {
                self.remove_habit(&category, &habit).map(|_| ())
            }
            SchemaEdit::AddHabit { category, habit } => self.add_habit(&category, habit).map(|_| ()),
        }
    }
}

/// `<category id>-<8 hex chars>`. Random rather than sequential: old logs
/// still carry the ids of removed habits, and a recycled id would count
/// them toward the new habit. Long category ids are truncated so the
/// result stays a valid id.
fn next_habit_id(cat: &Category) -> String {
    const SUFFIX_LEN: usize = 8;
    let prefix: String = cat.id.chars().take(MAX_ID_LEN - SUFFIX_LEN - 1).collect();
    loop {
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("{prefix}-{}", &suffix[..SUFFIX_LEN]);
        if cat.habits.iter().all(|h| h.id != id) {
            return id;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
