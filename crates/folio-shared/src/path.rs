//! Hierarchical key paths into the document store.
//!
//! A path is a list of segments written as `MyProjects/-Nx3.../imageUrl`.
//! Leading, trailing and doubled slashes are ignored, so `/MyHome/` and
//! `MyHome` address the same node. The empty path is the root of the tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath(Vec<String>);

impl StorePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from a compile-time constant such as
    /// [`crate::constants::PROJECTS_PATH`]. Constants are checked by tests.
    pub fn from_static(raw: &'static str) -> Self {
        Self(
            raw.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            validate_segment(segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self(segments))
    }

    /// Append one segment. The segment itself must not contain `/`.
    pub fn child(&self, segment: &str) -> Result<Self, PathError> {
        if segment.is_empty() || segment.contains('/') {
            return Err(PathError::ForbiddenCharacter(segment.to_string()));
        }
        validate_segment(segment)?;
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Ok(Self(segments))
    }

    /// Resolve `relative` beneath `self`.
    pub fn join(&self, relative: &StorePath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(relative.0.iter().cloned());
        Self(segments)
    }

    pub fn parent(&self) -> Result<Self, PathError> {
        match self.0.split_last() {
            Some((_, rest)) => Ok(Self(rest.to_vec())),
            None => Err(PathError::Root),
        }
    }

    /// Last segment of the path.
    pub fn key(&self) -> Result<&str, PathError> {
        self.0.last().map(String::as_str).ok_or(PathError::Root)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &StorePath) -> bool {
        self.0.len() <= other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Two paths overlap when a change at one is visible from the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }

    /// First segment, used to classify a path by its top-level node.
    pub fn top(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment
        .chars()
        .any(|c| FORBIDDEN.contains(&c) || c.is_control())
    {
        return Err(PathError::ForbiddenCharacter(segment.to_string()));
    }
    Ok(())
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl TryFrom<String> for StorePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StorePath> for String {
    fn from(path: StorePath) -> Self {
        path.to_string()
    }
}

impl std::str::FromStr for StorePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_extra_slashes() {
        let path = StorePath::parse("/MyProjects//abc/").unwrap();
        assert_eq!(path.segments(), ["MyProjects", "abc"]);
        assert_eq!(path.to_string(), "MyProjects/abc");
    }

    #[test]
    fn test_forbidden_characters_rejected() {
        assert!(StorePath::parse("MyProjects/a.b").is_err());
        assert!(StorePath::parse("ratings/$id").is_err());
        assert!(StorePath::root().child("a/b").is_err());
    }

    #[test]
    fn test_overlap() {
        let collection = StorePath::parse("MyProjects").unwrap();
        let item = collection.child("k1").unwrap();
        let other = StorePath::parse("MyHome").unwrap();

        assert!(collection.overlaps(&item));
        assert!(item.overlaps(&collection));
        assert!(!item.overlaps(&other));
        assert!(StorePath::root().overlaps(&other));
    }

    #[test]
    fn test_join() {
        let base = StorePath::parse("MyHome").unwrap();
        let rel = StorePath::parse("tags").unwrap();
        assert_eq!(base.join(&rel).to_string(), "MyHome/tags");
        assert_eq!(StorePath::root().join(&rel), rel);
    }

    #[test]
    fn test_parent_and_key() {
        let path = StorePath::parse("Downloadresume/resumeUrl").unwrap();
        assert_eq!(path.key().unwrap(), "resumeUrl");
        assert_eq!(path.parent().unwrap().to_string(), "Downloadresume");
        assert_eq!(StorePath::root().parent(), Err(PathError::Root));
    }
}
