use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Rhythm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rhythm {
    Daily,
    Weekly,
}

impl Rhythm {
    pub fn as_str(self) -> &'static str {
        match self {
            Rhythm::Daily => "daily",
            Rhythm::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Rhythm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rhythm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Rhythm::Daily),
            "weekly" => Ok(Rhythm::Weekly),
            other => Err(format!("unknown rhythm '{other}' (expected daily or weekly)")),
        }
    }
}

// ---------------------------------------------------------------------------
// HabitType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitType {
    Count,
    Boolean,
}

impl HabitType {
    pub fn as_str(self) -> &'static str {
        match self {
            HabitType::Count => "count",
            HabitType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for HabitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HabitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(HabitType::Count),
            "boolean" => Ok(HabitType::Boolean),
            other => Err(format!("unknown habit type '{other}' (expected count or boolean)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Icon
// ---------------------------------------------------------------------------

/// Icon tag stored on a category. Unrecognized tags load as `Unknown` and
/// render as `Heart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Icon {
    Heart,
    Dumbbell,
    Brain,
    Users,
    Smile,
    Briefcase,
    #[serde(other)]
    Unknown,
}

impl Icon {
    pub fn resolved(self) -> Icon {
        match self {
            Icon::Unknown => Icon::Heart,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self.resolved() {
            Icon::Heart | Icon::Unknown => "Heart",
            Icon::Dumbbell => "Dumbbell",
            Icon::Brain => "Brain",
            Icon::Users => "Users",
            Icon::Smile => "Smile",
            Icon::Briefcase => "Briefcase",
        }
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Indigo,
    Emerald,
    Sky,
    Rose,
    Amber,
    Slate,
    #[serde(other)]
    Other,
}

impl Color {
    pub fn as_str(self) -> &'static str {
        match self {
            Color::Indigo => "indigo",
            Color::Emerald => "emerald",
            Color::Sky => "sky",
            Color::Rose => "rose",
            Color::Amber => "amber",
            Color::Slate => "slate",
            Color::Other => "other",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
