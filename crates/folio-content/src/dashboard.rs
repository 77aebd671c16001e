//! Admin dashboard shell: one editing pane per tab, one tab at a time.

use std::fmt;
use std::str::FromStr;

use folio_shared::constants::*;
use folio_shared::StorePath;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardTab {
    Profile,
    Home,
    Projects,
    Education,
    CurrentSkills,
    SocialMedia,
    Ratings,
    Contacts,
    Resume,
    About,
    MissionVision,
    Hobbies,
}

impl DashboardTab {
    pub const ALL: [DashboardTab; 12] = [
        DashboardTab::Profile,
        DashboardTab::Home,
        DashboardTab::Projects,
        DashboardTab::Education,
        DashboardTab::CurrentSkills,
        DashboardTab::SocialMedia,
        DashboardTab::Ratings,
        DashboardTab::Contacts,
        DashboardTab::Resume,
        DashboardTab::About,
        DashboardTab::MissionVision,
        DashboardTab::Hobbies,
    ];

    pub fn title(self) -> &'static str {
        match self {
            DashboardTab::Profile => "Profile",
            DashboardTab::Home => "My Home",
            DashboardTab::Projects => "Projects",
            DashboardTab::Education => "Education",
            DashboardTab::CurrentSkills => "Current Skills",
            DashboardTab::SocialMedia => "Social Media",
            DashboardTab::Ratings => "Ratings",
            DashboardTab::Contacts => "Contact",
            DashboardTab::Resume => "Download Resume",
            DashboardTab::About => "About Text",
            DashboardTab::MissionVision => "Mission & Vision",
            DashboardTab::Hobbies => "Hobbies",
        }
    }

    /// URL segment, also the serialized form.
    pub fn slug(self) -> &'static str {
        match self {
            DashboardTab::Profile => "profile",
            DashboardTab::Home => "home",
            DashboardTab::Projects => "projects",
            DashboardTab::Education => "education",
            DashboardTab::CurrentSkills => "current-skills",
            DashboardTab::SocialMedia => "social-media",
            DashboardTab::Ratings => "ratings",
            DashboardTab::Contacts => "contacts",
            DashboardTab::Resume => "resume",
            DashboardTab::About => "about",
            DashboardTab::MissionVision => "mission-vision",
            DashboardTab::Hobbies => "hobbies",
        }
    }

    /// Store node edited by this tab.
    pub fn store_path(self) -> StorePath {
        StorePath::from_static(match self {
            DashboardTab::Profile => PROFILE_PATH,
            DashboardTab::Home => HOME_PATH,
            DashboardTab::Projects => PROJECTS_PATH,
            DashboardTab::Education => EDUCATIONS_PATH,
            DashboardTab::CurrentSkills => CURRENT_SKILLS_PATH,
            DashboardTab::SocialMedia => SOCIAL_MEDIAS_PATH,
            DashboardTab::Ratings => RATINGS_PATH,
            DashboardTab::Contacts => CONTACTS_PATH,
            DashboardTab::Resume => RESUME_PATH,
            DashboardTab::About => ABOUT_TEXT_PATH,
            DashboardTab::MissionVision => MISSION_VISION_PATH,
            DashboardTab::Hobbies => HOBBIES_PATH,
        })
    }

    pub fn is_collection(self) -> bool {
        !matches!(
            self,
            DashboardTab::Profile | DashboardTab::Home | DashboardTab::Resume | DashboardTab::About
        )
    }
}

impl fmt::Display for DashboardTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DashboardTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DashboardTab::ALL
            .into_iter()
            .find(|tab| tab.slug() == s)
            .ok_or_else(|| format!("unknown dashboard tab '{s}'"))
    }
}

/// Which pane is mounted. Panes share nothing; switching tabs drops the
/// previous pane's viewers and controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardShell {
    active: DashboardTab,
}

impl DashboardShell {
    pub fn new() -> Self {
        Self {
            active: DashboardTab::Profile,
        }
    }

    pub fn active(&self) -> DashboardTab {
        self.active
    }

    /// Mount `tab`. Returns the tab that was unmounted, if it changed.
    pub fn select(&mut self, tab: DashboardTab) -> Option<DashboardTab> {
        if tab == self.active {
            return None;
        }
        let previous = std::mem::replace(&mut self.active, tab);
        tracing::debug!(from = %previous, to = %tab, "dashboard tab switched");
        Some(previous)
    }

    pub fn tabs(&self) -> &'static [DashboardTab] {
        &DashboardTab::ALL
    }
}

impl Default for DashboardShell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugs_round_trip() {
        for tab in DashboardTab::ALL {
            assert_eq!(tab.slug().parse::<DashboardTab>().unwrap(), tab);
            assert_eq!(
                serde_json::to_value(tab).unwrap(),
                serde_json::Value::String(tab.slug().to_string())
            );
        }
        assert!("dv-lottery".parse::<DashboardTab>().is_err());
    }

    #[test]
    fn test_select_replaces_active_tab() {
        let mut shell = DashboardShell::new();
        assert_eq!(shell.active(), DashboardTab::Profile);
        assert_eq!(shell.select(DashboardTab::Projects), Some(DashboardTab::Profile));
        assert_eq!(shell.select(DashboardTab::Projects), None);
        assert_eq!(shell.active(), DashboardTab::Projects);
    }

    #[test]
    fn test_store_paths() {
        assert_eq!(DashboardTab::Resume.store_path().to_string(), "Downloadresume");
        assert!(DashboardTab::Contacts.is_collection());
        assert!(!DashboardTab::Home.is_collection());
        assert_eq!(DashboardTab::About.store_path().to_string(), "your-about-text");
        assert!(!DashboardTab::About.is_collection());
        assert_eq!(DashboardTab::Hobbies.store_path().to_string(), "your-Hobbies");
        assert!(DashboardTab::MissionVision.is_collection());
    }
}
