//! Team colours and crests for charts, looked up in `team_identity.csv`.

use crate::core::dictionaries::load_team_identity;
use crate::domain::model::TeamIdentity;
use crate::utils::error::Result;
use std::path::Path;

pub const DEFAULT_PRIMARY: &str = "#2ecc71";
pub const DEFAULT_SECONDARY: &str = "#007bff";

#[derive(Debug, Clone, PartialEq)]
pub struct TeamStyle {
    pub primary: String,
    pub secondary: String,
    pub logo: Option<String>,
    pub slug: String,
    pub name: String,
}

impl TeamStyle {
    /// Style for a team missing from the dictionary.
    pub fn fallback(name: &str) -> Self {
        Self {
            primary: DEFAULT_PRIMARY.to_string(),
            secondary: DEFAULT_SECONDARY.to_string(),
            logo: None,
            slug: String::new(),
            name: name.to_string(),
        }
    }
}

impl From<&TeamIdentity> for TeamStyle {
    fn from(t: &TeamIdentity) -> Self {
        let or_default = |v: &str, default: &str| {
            if v.trim().is_empty() {
                default.to_string()
            } else {
                v.to_string()
            }
        };
        Self {
            primary: or_default(&t.primary, DEFAULT_PRIMARY),
            secondary: or_default(&t.secondary, DEFAULT_SECONDARY),
            logo: Some(t.logo_path.clone()).filter(|p| !p.trim().is_empty()),
            slug: t.slug.clone(),
            name: t.team_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamIdentityBook {
    teams: Vec<TeamIdentity>,
}

impl TeamIdentityBook {
    pub fn new(teams: Vec<TeamIdentity>) -> Self {
        Self { teams }
    }

    /// Load from a `team_identity.csv`; a missing file gives an empty book.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(load_team_identity(path)?))
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Look up by id, then by case-insensitive name.
    pub fn style(&self, team_id: Option<i64>, fallback_name: &str) -> Option<TeamStyle> {
        let by_id = team_id.and_then(|id| self.teams.iter().find(|t| t.team_id == id));
        let found = by_id.or_else(|| {
            let wanted = fallback_name.trim().to_lowercase();
            (!wanted.is_empty())
                .then(|| self.teams.iter().find(|t| t.team_name.to_lowercase() == wanted))
                .flatten()
        })?;
        Some(TeamStyle::from(found))
    }

    pub fn style_or_default(&self, team_id: Option<i64>, fallback_name: &str) -> TeamStyle {
        self.style(team_id, fallback_name)
            .unwrap_or_else(|| TeamStyle::fallback(fallback_name))
    }
}
