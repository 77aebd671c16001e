//! Viewer-local preferences (theme color, welcome dialog) kept per client id
//! in their own key/value table, outside the content tree.

use std::fmt;
use std::str::FromStr;

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{Result, StoreError};

const THEME_COLOR_KEY: &str = "theme_color";
const WELCOME_DISMISSED_KEY: &str = "welcome_dismissed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    #[default]
    Zinc,
    Rose,
    Blue,
    Green,
    Orange,
    Purple,
}

impl ThemeColor {
    pub const ALL: [ThemeColor; 6] = [
        ThemeColor::Zinc,
        ThemeColor::Rose,
        ThemeColor::Blue,
        ThemeColor::Green,
        ThemeColor::Orange,
        ThemeColor::Purple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeColor::Zinc => "zinc",
            ThemeColor::Rose => "rose",
            ThemeColor::Blue => "blue",
            ThemeColor::Green => "green",
            ThemeColor::Orange => "orange",
            ThemeColor::Purple => "purple",
        }
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeColor {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        ThemeColor::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::InvalidValue(format!("unknown theme color '{s}'")))
    }
}

impl Database {
    pub fn get_preference(&self, client: &str, key: &str) -> Result<Option<String>> {
        match self.conn().query_row(
            "SELECT value FROM client_preferences WHERE client_id = ?1 AND key = ?2",
            params![client, key],
            |row| row.get(0),
        ) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    pub fn set_preference(&self, client: &str, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO client_preferences (client_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(client_id, key) DO UPDATE SET value = excluded.value",
            params![client, key, value],
        )?;
        Ok(())
    }

    /// Stored theme color for `client`. An unreadable value falls back to
    /// the default.
    pub fn theme_color(&self, client: &str) -> Result<ThemeColor> {
        let Some(raw) = self.get_preference(client, THEME_COLOR_KEY)? else {
            return Ok(ThemeColor::default());
        };
        Ok(raw.parse().unwrap_or_else(|_| {
            tracing::warn!(client = %client, value = %raw, "ignoring stored theme color");
            ThemeColor::default()
        }))
    }

    pub fn set_theme_color(&self, client: &str, color: ThemeColor) -> Result<()> {
        self.set_preference(client, THEME_COLOR_KEY, color.as_str())
    }

    pub fn welcome_dismissed(&self, client: &str) -> Result<bool> {
        Ok(self.get_preference(client, WELCOME_DISMISSED_KEY)?.as_deref() == Some("true"))
    }

    pub fn dismiss_welcome(&self, client: &str) -> Result<()> {
        self.set_preference(client, WELCOME_DISMISSED_KEY, "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_defaults_to_zinc() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.theme_color("c1").unwrap(), ThemeColor::Zinc);

        db.set_theme_color("c1", ThemeColor::Rose).unwrap();
        assert_eq!(db.theme_color("c1").unwrap(), ThemeColor::Rose);
    }

    #[test]
    fn test_garbage_theme_falls_back() {
        let db = Database::open_in_memory().unwrap();
        db.set_preference("c1", "theme_color", "chartreuse").unwrap();
        assert_eq!(db.theme_color("c1").unwrap(), ThemeColor::Zinc);
    }

    #[test]
    fn test_parse_theme_color() {
        assert_eq!("Blue".parse::<ThemeColor>().unwrap(), ThemeColor::Blue);
        assert!("teal".parse::<ThemeColor>().is_err());
    }

    #[test]
    fn test_welcome_flag_persists() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.welcome_dismissed("c1").unwrap());
        db.dismiss_welcome("c1").unwrap();
        db.dismiss_welcome("c1").unwrap();
        assert!(db.welcome_dismissed("c1").unwrap());
    }

    #[test]
    fn test_clients_do_not_share_preferences() {
        let db = Database::open_in_memory().unwrap();
        db.set_theme_color("alice", ThemeColor::Purple).unwrap();
        db.dismiss_welcome("alice").unwrap();

        assert_eq!(db.theme_color("bob").unwrap(), ThemeColor::Zinc);
        assert!(!db.welcome_dismissed("bob").unwrap());
        assert_eq!(db.theme_color("alice").unwrap(), ThemeColor::Purple);
    }
}
