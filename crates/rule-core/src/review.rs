//! In-progress review: per-habit counts and a reflection, submitted as one
//! log entry.

use crate::error::{Result, RuleError};
use crate::identity::Identity;
use crate::log::Counts;
use crate::log_repo::LogRepository;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    #[serde(default, alias = "data")]
    pub counts: Counts,
    #[serde(default)]
    pub reflection: String,
}

impl ReviewDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a habit between done (1) and not done.
    pub fn toggle(&mut self, habit: &str) {
        if self.counts.remove(habit).is_none() {
            self.counts.insert(habit.to_string(), 1);
        }
    }

    /// Set an explicit count. Zero clears the habit.
    pub fn set_count(&mut self, habit: &str, count: u32) {
        if count == 0 {
            self.counts.remove(habit);
        } else {
            self.counts.insert(habit.to_string(), count);
        }
    }

    pub fn is_checked(&self, habit: &str) -> bool {
        self.counts.get(habit).copied().unwrap_or(0) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.reflection.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.reflection.clear();
    }

    /// Every counted habit must exist somewhere in `schema`.
    pub fn check_habits(&self, schema: &Schema) -> Result<()> {
        match self
            .counts
            .keys()
            .find(|habit| !schema.habits().any(|(_, h)| &h.id == *habit))
        {
            Some(habit) => Err(RuleError::UnknownHabit(habit.clone())),
            None => Ok(()),
        }
    }

    /// Append the draft as one log entry. Cleared on success; left intact on
    /// failure so nothing typed is lost.
    pub async fn submit(&mut self, repo: &LogRepository, identity: &Identity) -> Result<String> {
        let id = repo
            .append(identity, self.counts.clone(), self.reflection.clone())
            .await?;
        self.clear();
        Ok(id)
    }
}

/// Parse `habit=count` as given on the command line.
pub fn parse_count(arg: &str) -> Result<(String, u32)> {
    let (habit, count) = arg
        .split_once('=')
        .ok_or_else(|| RuleError::InvalidCount(arg.to_string()))?;
    let habit = habit.trim();
    if habit.is_empty() {
        return Err(RuleError::InvalidCount(arg.to_string()));
    }
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|_| RuleError::InvalidCount(habit.to_string()))?;
    Ok((habit.to_string(), count))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
