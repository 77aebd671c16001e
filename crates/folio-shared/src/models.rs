//! Typed records for every document kept in the store.
//!
//! Field names match the stored JSON exactly, including the historical
//! `SkType` / `SkDescription` / `SkCategory` capitalization. Missing fields
//! fall back to their defaults; a field of the wrong shape is a parse error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::constants::*;
use crate::error::{ContentError, ValidationError};
use crate::path::StorePath;
use crate::tags::{TagField, TagList, ToolGroup};

// ---------------------------------------------------------------------------
// Entity trait
// ---------------------------------------------------------------------------

/// Where an entity lives in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// One document at a fixed path.
    Singleton(&'static str),
    /// A keyed collection; item ids are push keys.
    Collection(&'static str),
}

impl Location {
    pub fn path(self) -> StorePath {
        match self {
            Location::Singleton(p) | Location::Collection(p) => StorePath::from_static(p),
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, Location::Collection(_))
    }
}

/// Behaviour shared by every editable document type.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + Default + PartialEq + Send + Sync + 'static
{
    /// Human-readable name used in logs and notifications.
    const NAME: &'static str;
    const LOCATION: Location;
    /// Blob key prefix for uploads, `None` for entities without a file field.
    const UPLOAD_CATEGORY: Option<&'static str>;
    /// Document field holding the uploaded file's URL.
    const ATTACHMENT_FIELD: &'static str = "imageUrl";

    fn attachment_url(&self) -> &str {
        ""
    }

    fn set_attachment_url(&mut self, _url: String) {}

    /// Whether a selected file of this content type may be attached.
    fn accepts_file(content_type: &str) -> bool {
        content_type.starts_with("image/")
    }

    fn tags_mut(&mut self, _field: TagField) -> Option<&mut TagList> {
        None
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn card(&self) -> Card;

    fn to_document(&self) -> Result<serde_json::Value, ContentError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse-or-reject boundary for values read from the store.
    fn from_document(path: &StorePath, value: serde_json::Value) -> Result<Self, ContentError> {
        serde_json::from_value(value).map_err(|source| ContentError::Malformed {
            path: path.to_string(),
            source,
        })
    }
}

/// A collection item together with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<E> {
    pub id: String,
    #[serde(flatten)]
    pub entity: E,
}

impl<E: Entity> Record<E> {
    pub fn new(id: impl Into<String>, entity: E) -> Self {
        Self {
            id: id.into(),
            entity,
        }
    }

    pub fn card(&self) -> Card {
        let mut card = self.entity.card();
        card.id = Some(self.id.clone());
        card
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub image_url: String,
    pub name: String,
    pub profession: String,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    pub address: String,
}

impl Entity for Profile {
    const NAME: &'static str = "profile";
    const LOCATION: Location = Location::Singleton(PROFILE_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("profileImages");

    fn attachment_url(&self) -> &str {
        &self.image_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.image_url = url;
    }

    fn card(&self) -> Card {
        Card::new("Profile")
            .field("Name", &self.name)
            .field("Profession", &self.profession)
            .field("Email", &self.email)
            .field("Phone", &self.phone_number)
            .field("Location", &self.location)
            .field("Address", &self.address)
            .image(&self.image_url)
    }
}

// ---------------------------------------------------------------------------
// Home hero
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Home {
    pub image_url: String,
    pub start_name: String,
    pub end_name: String,
    pub tags: TagList,
}

impl Entity for Home {
    const NAME: &'static str = "home";
    const LOCATION: Location = Location::Singleton(HOME_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("homeImages");

    fn attachment_url(&self) -> &str {
        &self.image_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.image_url = url;
    }

    fn tags_mut(&mut self, field: TagField) -> Option<&mut TagList> {
        match field {
            TagField::Tags => Some(&mut self.tags),
            _ => None,
        }
    }

    fn card(&self) -> Card {
        Card::new(format!("{} {}", self.start_name, self.end_name).trim().to_string())
            .tags("Tags", self.tags.as_slice())
            .image(&self.image_url)
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub project_name: String,
    pub image_url: String,
    pub description_summary: String,
    pub description: String,
    pub github_link: String,
    pub live_link: String,
    pub general_tools: TagList,
    pub frontend_tools: TagList,
    pub backend_tools: TagList,
    pub research_tools: TagList,
    pub deployment_tools: TagList,
}

impl Project {
    pub fn tools(&self, group: ToolGroup) -> &TagList {
        match group {
            ToolGroup::General => &self.general_tools,
            ToolGroup::Frontend => &self.frontend_tools,
            ToolGroup::Backend => &self.backend_tools,
            ToolGroup::Research => &self.research_tools,
            ToolGroup::Deployment => &self.deployment_tools,
        }
    }

    pub fn tools_mut(&mut self, group: ToolGroup) -> &mut TagList {
        match group {
            ToolGroup::General => &mut self.general_tools,
            ToolGroup::Frontend => &mut self.frontend_tools,
            ToolGroup::Backend => &mut self.backend_tools,
            ToolGroup::Research => &mut self.research_tools,
            ToolGroup::Deployment => &mut self.deployment_tools,
        }
    }
}

impl Entity for Project {
    const NAME: &'static str = "project";
    const LOCATION: Location = Location::Collection(PROJECTS_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("projectImages");

    fn attachment_url(&self) -> &str {
        &self.image_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.image_url = url;
    }

    fn tags_mut(&mut self, field: TagField) -> Option<&mut TagList> {
        match field {
            TagField::Tools(group) => Some(self.tools_mut(group)),
            _ => None,
        }
    }

    fn card(&self) -> Card {
        let mut card = Card::new(&self.project_name)
            .field("Summary", &self.description_summary)
            .field("Description", &self.description)
            .field_if_set("GitHub", &self.github_link)
            .field_if_set("Live", &self.live_link)
            .image(&self.image_url);
        for group in ToolGroup::ALL {
            card = card.tags(group.label(), self.tools(group).as_slice());
        }
        card
    }
}

// ---------------------------------------------------------------------------
// Education
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    #[serde(alias = "title")]
    pub education_name: String,
    pub institution: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(rename = "SkType")]
    pub sk_type: String,
    #[serde(rename = "SkDescription")]
    pub sk_description: String,
    pub status: String,
    pub learned_tags: TagList,
    pub image_url: String,
    pub pdf_url: String,
}

impl Entity for Education {
    const NAME: &'static str = "education";
    const LOCATION: Location = Location::Collection(EDUCATIONS_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("educationImages");

    fn attachment_url(&self) -> &str {
        &self.image_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.image_url = url;
    }

    fn tags_mut(&mut self, field: TagField) -> Option<&mut TagList> {
        match field {
            TagField::LearnedTags => Some(&mut self.learned_tags),
            _ => None,
        }
    }

    fn card(&self) -> Card {
        Card::new(&self.education_name)
            .field("Period", format!("{} to {}", self.start_date, self.end_date))
            .field("Institution", &self.institution)
            .field("Type", &self.sk_type)
            .field_if_set("Status", &self.status)
            .field("Description", &self.sk_description)
            .field_if_set("Certificate", &self.pdf_url)
            .tags("Learned", self.learned_tags.as_slice())
            .image(&self.image_url)
    }
}

// ---------------------------------------------------------------------------
// Current skill
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentSkill {
    pub title: String,
    #[serde(rename = "SkDescription")]
    pub sk_description: String,
    #[serde(rename = "SkCategory")]
    pub sk_category: String,
    #[serde(rename = "SkType")]
    pub sk_type: String,
    pub image_url: String,
}

impl Entity for CurrentSkill {
    const NAME: &'static str = "current skill";
    const LOCATION: Location = Location::Collection(CURRENT_SKILLS_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("MyCurrentSkills");

    fn attachment_url(&self) -> &str {
        &self.image_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.image_url = url;
    }

    fn card(&self) -> Card {
        Card::new(&self.title)
            .field("Category", &self.sk_category)
            .field("Type", &self.sk_type)
            .field("Description", &self.sk_description)
            .image(&self.image_url)
    }
}

// ---------------------------------------------------------------------------
// Social link
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLink {
    pub title: String,
    /// Holds the link target.
    pub institution: String,
    pub image_url: String,
}

impl Entity for SocialLink {
    const NAME: &'static str = "social link";
    const LOCATION: Location = Location::Collection(SOCIAL_MEDIAS_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("socialMediaImages");

    fn attachment_url(&self) -> &str {
        &self.image_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.image_url = url;
    }

    fn card(&self) -> Card {
        Card::new(&self.title)
            .field("Link", &self.institution)
            .image(&self.image_url)
    }
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Phone {
    pub country_code: String,
    pub phone_number: String,
    pub country_flag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rating {
    pub name: String,
    pub email: String,
    pub phone: Phone,
    pub profession: String,
    pub website: String,
    pub description: String,
    pub my_contribution: String,
    pub rating: f64,
    pub review: String,
    pub image_url: String,
}

impl Entity for Rating {
    const NAME: &'static str = "rating";
    const LOCATION: Location = Location::Collection(RATINGS_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("ratingImages");

    fn attachment_url(&self) -> &str {
        &self.image_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.image_url = url;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !self.rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::Required("name"));
        }
        Ok(())
    }

    fn card(&self) -> Card {
        let phone = format!(
            "{} {} {}",
            self.phone.country_flag, self.phone.country_code, self.phone.phone_number
        );
        Card::new(&self.name)
            .field("Rating", format!("{}/5", self.rating))
            .field("Review", &self.review)
            .field_if_set("Profession", &self.profession)
            .field_if_set("Website", &self.website)
            .field_if_set("Description", &self.description)
            .field_if_set("Contribution", &self.my_contribution)
            .field_if_set("Email", &self.email)
            .field_if_set("Phone", phone.trim())
            .image(&self.image_url)
    }
}

// ---------------------------------------------------------------------------
// Contact submission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub country: String,
    pub phone: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message: String,
    pub seen: bool,
}

impl Entity for Contact {
    const NAME: &'static str = "contact";
    const LOCATION: Location = Location::Collection(CONTACTS_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = None;

    fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::Required("email"));
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::Required("message"));
        }
        Ok(())
    }

    fn card(&self) -> Card {
        let received = chrono::DateTime::from_timestamp_millis(self.timestamp)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        Card::new(format!("{} {}", self.first_name, self.last_name).trim().to_string())
            .field("Email", &self.email)
            .field_if_set("Country", &self.country)
            .field_if_set("Phone", &self.phone)
            .field("Received", received)
            .field("Message", &self.message)
            .field("Seen", if self.seen { "yes" } else { "no" })
    }
}

// ---------------------------------------------------------------------------
// Resume pointer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumePointer {
    pub resume_url: String,
}

impl Entity for ResumePointer {
    const NAME: &'static str = "resume";
    const LOCATION: Location = Location::Singleton(RESUME_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = Some("resumeFiles");
    const ATTACHMENT_FIELD: &'static str = "resumeUrl";

    fn attachment_url(&self) -> &str {
        &self.resume_url
    }

    fn set_attachment_url(&mut self, url: String) {
        self.resume_url = url;
    }

    fn accepts_file(content_type: &str) -> bool {
        content_type == "application/pdf"
    }

    fn card(&self) -> Card {
        Card::new("Resume").field_if_set("File", &self.resume_url)
    }
}

// ---------------------------------------------------------------------------
// About page
// ---------------------------------------------------------------------------

/// Body text of the about page. Stored as a bare string, not an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AboutText {
    pub text: String,
}

impl Entity for AboutText {
    const NAME: &'static str = "about text";
    const LOCATION: Location = Location::Singleton(ABOUT_TEXT_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = None;

    fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::Required("text"));
        }
        Ok(())
    }

    fn card(&self) -> Card {
        Card::new("About").field("Text", &self.text)
    }
}

/// One mission, vision or core-value card. `icon_name` is an icon font
/// class such as `fas fa-bullseye`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissionStatement {
    pub name: String,
    pub icon_name: String,
    pub text: String,
}

impl Entity for MissionStatement {
    const NAME: &'static str = "mission statement";
    const LOCATION: Location = Location::Collection(MISSION_VISION_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = None;

    fn card(&self) -> Card {
        Card::new(&self.name)
            .field_if_set("Icon", &self.icon_name)
            .field("Text", &self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hobby {
    pub name: String,
    pub icon_name: String,
    pub text: String,
}

impl Entity for Hobby {
    const NAME: &'static str = "hobby";
    const LOCATION: Location = Location::Collection(HOBBIES_PATH);
    const UPLOAD_CATEGORY: Option<&'static str> = None;

    fn card(&self) -> Card {
        Card::new(&self.name)
            .field_if_set("Icon", &self.icon_name)
            .field("Text", &self.text)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Record created the first time an identity signs in, at `users/{uid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub role: Role,
}

impl UserRecord {
    pub fn path(uid: &str) -> Result<StorePath, ContentError> {
        Ok(StorePath::from_static(USERS_PATH).child(uid)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_constants_are_valid_paths() {
        for raw in [
            PROFILE_PATH,
            HOME_PATH,
            RESUME_PATH,
            PROJECTS_PATH,
            EDUCATIONS_PATH,
            CURRENT_SKILLS_PATH,
            SOCIAL_MEDIAS_PATH,
            RATINGS_PATH,
            CONTACTS_PATH,
            USERS_PATH,
            ABOUT_TEXT_PATH,
            MISSION_VISION_PATH,
            HOBBIES_PATH,
        ] {
            assert_eq!(StorePath::parse(raw).unwrap(), StorePath::from_static(raw));
        }
    }

    #[test]
    fn test_skill_keeps_stored_field_names() {
        let skill = CurrentSkill {
            title: "Rust".into(),
            sk_type: "Language".into(),
            ..Default::default()
        };
        let doc = skill.to_document().unwrap();
        assert_eq!(doc["SkType"], "Language");
        assert!(doc.get("skType").is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let path = Project::LOCATION.path();
        let project = Project::from_document(&path, json!({ "projectName": "Folio" })).unwrap();
        assert_eq!(project.project_name, "Folio");
        assert!(project.general_tools.is_empty());
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let path = Home::LOCATION.path();
        let err = Home::from_document(&path, json!({ "tags": "a,b" })).unwrap_err();
        assert!(matches!(err, ContentError::Malformed { .. }));
    }

    #[test]
    fn test_education_accepts_title_alias() {
        let path = Education::LOCATION.path();
        let edu = Education::from_document(&path, json!({ "title": "BSc" })).unwrap();
        assert_eq!(edu.education_name, "BSc");
    }

    #[test]
    fn test_rating_bounds() {
        let mut rating = Rating {
            name: "Grace".into(),
            rating: 5.0,
            ..Default::default()
        };
        assert!(rating.validate().is_ok());
        rating.rating = 5.5;
        assert_eq!(
            rating.validate(),
            Err(ValidationError::RatingOutOfRange(5.5))
        );
        rating.rating = -1.0;
        assert!(rating.validate().is_err());
        rating.rating = f64::NAN;
        assert!(rating.validate().is_err());
    }

    #[test]
    fn test_profile_card_without_image() {
        let profile = Profile {
            name: "Ada".into(),
            profession: "Engineer".into(),
            email: "a@b.com".into(),
            phone_number: "123".into(),
            location: "X".into(),
            address: "Y".into(),
            image_url: String::new(),
        };
        let card = profile.card();
        assert_eq!(card.fields.len(), 6);
        assert!(card.image_url.is_none());
    }

    #[test]
    fn test_record_flattens_id() {
        let record = Record::new("k1", SocialLink {
            title: "GitHub".into(),
            ..Default::default()
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "k1");
        assert_eq!(value["title"], "GitHub");
    }

    #[test]
    fn test_resume_only_accepts_pdf() {
        assert!(ResumePointer::accepts_file("application/pdf"));
        assert!(!ResumePointer::accepts_file("image/png"));
        assert!(Project::accepts_file("image/png"));
    }

    #[test]
    fn test_about_text_is_a_bare_string() {
        let path = StorePath::from_static(ABOUT_TEXT_PATH);
        let about = AboutText::from_document(&path, json!("I build things.")).unwrap();
        assert_eq!(about.text, "I build things.");
        assert_eq!(about.to_document().unwrap(), json!("I build things."));

        assert!(AboutText::from_document(&path, json!({ "text": "x" })).is_err());
        assert!(AboutText::default().validate().is_err());
    }

    #[test]
    fn test_hobby_keeps_icon_name() {
        let path = StorePath::from_static(HOBBIES_PATH);
        let hobby = Hobby::from_document(
            &path,
            json!({ "name": "Chess", "iconName": "fas fa-chess", "text": "Weekends" }),
        )
        .unwrap();
        assert_eq!(hobby.icon_name, "fas fa-chess");
        assert_eq!(hobby.card().value_of("Icon"), Some("fas fa-chess"));
        assert!(!MissionStatement::LOCATION.path().is_root());
        assert!(MissionStatement::LOCATION.is_collection());
    }
}
