use serde::{Deserialize, Serialize};

/// Read-only rendering of one entity, as shown by the list/detail viewers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub fields: Vec<CardField>,
    /// Present only when the entity has a non-empty image or file URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_groups: Vec<TagGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<CardAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    pub label: String,
    pub tags: Vec<String>,
}

/// Inline triggers offered in admin contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardAction {
    Edit,
    Delete,
}

impl Card {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, label: &str, value: impl Into<String>) -> Self {
        self.fields.push(CardField {
            label: label.to_string(),
            value: value.into(),
        });
        self
    }

    /// Like [`Card::field`] but skips empty values.
    pub fn field_if_set(self, label: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self
        } else {
            self.field(label, value)
        }
    }

    pub fn image(mut self, url: &str) -> Self {
        self.image_url = if url.trim().is_empty() {
            None
        } else {
            Some(url.to_string())
        };
        self
    }

    pub fn tags(mut self, label: &str, tags: &[String]) -> Self {
        if !tags.is_empty() {
            self.tag_groups.push(TagGroup {
                label: label.to_string(),
                tags: tags.to_vec(),
            });
        }
        self
    }

    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}
