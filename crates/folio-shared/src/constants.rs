/// Application name
pub const APP_NAME: &str = "Folio";

/// Singleton document paths
pub const PROFILE_PATH: &str = "MyProfile";
pub const HOME_PATH: &str = "MyHome";
pub const RESUME_PATH: &str = "Downloadresume";
pub const ABOUT_TEXT_PATH: &str = "your-about-text";

/// Collection paths
pub const PROJECTS_PATH: &str = "MyProjects";
pub const EDUCATIONS_PATH: &str = "MyEducations";
pub const CURRENT_SKILLS_PATH: &str = "MyCurrentSkills";
pub const SOCIAL_MEDIAS_PATH: &str = "MySocialMedias";
pub const RATINGS_PATH: &str = "ratings";
pub const CONTACTS_PATH: &str = "contacts";
pub const USERS_PATH: &str = "users";
pub const MISSION_VISION_PATH: &str = "your-miss-viss";
pub const HOBBIES_PATH: &str = "your-Hobbies";

/// Paths that only an admin session may read
pub const PRIVATE_PATHS: [&str; 2] = [CONTACTS_PATH, USERS_PATH];

/// Inclusive bounds of a rating value
pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// Length of a generated push key
pub const PUSH_KEY_LEN: usize = 20;

/// Maximum upload size in bytes (20 MiB)
pub const MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;
