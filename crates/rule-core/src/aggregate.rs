//! Trailing-window progress derived from a schema and its review log.
//!
//! The window is the most recent [`WINDOW`] reviews, not a calendar week.
//! Iteration is driven by the schema, so counts logged against habits that
//! have since been removed simply never show up.

use crate::log::LogEntry;
use crate::schema::Schema;
use crate::types::{Color, HabitType, Icon, Rhythm};
use serde::Serialize;

pub const WINDOW: usize = 7;

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitProgress {
    pub id: String,
    pub name: String,
    pub rhythm: Rhythm,
    #[serde(rename = "type")]
    pub kind: HabitType,
    pub target: u32,
    pub current: u32,
    pub progress: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub id: String,
    pub label: String,
    pub icon: Icon,
    pub color: Color,
    pub purpose: String,
    pub current: u32,
    pub target: u32,
    pub progress: u32,
    pub habits: Vec<HabitProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Number of reviews that fell inside the window.
    pub window: usize,
    pub current: u32,
    pub target: u32,
    pub progress: u32,
    pub categories: Vec<CategoryProgress>,
}

impl Progress {
    pub fn habit(&self, id: &str) -> Option<&HabitProgress> {
        self.categories
            .iter()
            .flat_map(|c| c.habits.iter())
            .find(|h| h.id == id)
    }
}

/// `min(100, 100 * current / target)`, or 0 for a zero target.
pub fn percent(current: u32, target: u32) -> u32 {
    if target == 0 {
        return 0;
    }
    let pct = 100 * u64::from(current) / u64::from(target);
    pct.min(100) as u32
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// `logs` must already be sorted newest first.
pub fn aggregate(schema: &Schema, logs: &[LogEntry]) -> Progress {
    let window = &logs[..logs.len().min(WINDOW)];

    let categories: Vec<CategoryProgress> = schema
        .categories
        .iter()
        .map(|cat| {
            let habits: Vec<HabitProgress> = cat
                .habits
                .iter()
                .map(|h| {
                    let current = window
                        .iter()
                        .fold(0u32, |acc, e| acc.saturating_add(e.count(&h.id)));
                    HabitProgress {
                        id: h.id.clone(),
                        name: h.name.clone(),
                        rhythm: h.rhythm,
                        kind: h.kind,
                        target: h.target,
                        current,
                        progress: percent(current, h.target),
                    }
                })
                .collect();
            let current = habits.iter().fold(0u32, |acc, h| acc.saturating_add(h.current));
            let target = habits.iter().fold(0u32, |acc, h| acc.saturating_add(h.target));
            CategoryProgress {
                id: cat.id.clone(),
                label: cat.label.clone(),
                icon: cat.icon.resolved(),
                color: cat.color,
                purpose: cat.purpose.clone(),
                current,
                target,
                progress: percent(current, target),
                habits,
            }
        })
        .collect();

    let current = categories.iter().fold(0u32, |acc, c| acc.saturating_add(c.current));
    let target = categories.iter().fold(0u32, |acc, c| acc.saturating_add(c.target));
    Progress {
        window: window.len(),
        current,
        target,
        progress: percent(current, target),
        categories,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
