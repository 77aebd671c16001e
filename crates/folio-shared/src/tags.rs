use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered list of tags that never holds the same string twice.
///
/// Tags are only edited in memory; they reach the store as part of the next
/// full entity submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the trimmed input unless it is empty or already present.
    /// Returns whether the list changed.
    pub fn add(&mut self, input: &str) -> bool {
        let tag = input.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    /// Remove exact matches only; the order of the remaining tags is kept.
    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for TagList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = TagList::new();
        for tag in iter {
            list.add(&tag.into());
        }
        list
    }
}

/// The five tool arrays of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolGroup {
    General,
    Frontend,
    Backend,
    Research,
    Deployment,
}

impl ToolGroup {
    pub const ALL: [ToolGroup; 5] = [
        ToolGroup::General,
        ToolGroup::Frontend,
        ToolGroup::Backend,
        ToolGroup::Research,
        ToolGroup::Deployment,
    ];

    /// Document field holding this group's tags.
    pub fn field_name(self) -> &'static str {
        match self {
            ToolGroup::General => "generalTools",
            ToolGroup::Frontend => "frontendTools",
            ToolGroup::Backend => "backendTools",
            ToolGroup::Research => "researchTools",
            ToolGroup::Deployment => "deploymentTools",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolGroup::General => "General tools",
            ToolGroup::Frontend => "Frontend tools",
            ToolGroup::Backend => "Backend tools",
            ToolGroup::Research => "Research tools",
            ToolGroup::Deployment => "Deployment tools",
        }
    }
}

/// Addresses one tag array on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "group", rename_all = "camelCase")]
pub enum TagField {
    /// `tags` on the home hero.
    Tags,
    /// `learnedTags` on an education entry.
    LearnedTags,
    /// One of the project tool arrays.
    Tools(ToolGroup),
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagField::Tags => write!(f, "tags"),
            TagField::LearnedTags => write!(f, "learnedTags"),
            TagField::Tools(group) => write!(f, "{}", group.field_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_trims_and_dedupes() {
        let mut tags = TagList::new();
        assert!(tags.add("  Rust "));
        assert!(!tags.add("Rust"));
        assert!(!tags.add("   "));
        assert_eq!(tags.as_slice(), ["Rust"]);
    }

    #[test]
    fn test_remove_exact_match_keeps_order() {
        let mut tags: TagList = ["axum", "tokio", "Tokio", "serde"].into_iter().collect();
        assert!(tags.remove("tokio"));
        assert!(!tags.remove("tok"));
        assert_eq!(tags.as_slice(), ["axum", "Tokio", "serde"]);
    }

    #[test]
    fn test_deserialize_from_array() {
        let tags: TagList = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(serde_json::from_str::<TagList>(r#""a,b""#).is_err());
    }

    #[test]
    fn test_tag_field_display() {
        assert_eq!(TagField::Tools(ToolGroup::Backend).to_string(), "backendTools");
        assert_eq!(TagField::LearnedTags.to_string(), "learnedTags");
    }
}
