//! Widget identity

use std::fmt;

/// Identifier of a widget instance
///
/// [`Tag::Unassigned`] is the sentinel for "no widget yet". It is never
/// used as a registry key and compares unequal to every assigned tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Tag {
    /// No widget has been assigned
    #[default]
    Unassigned,
    /// Numeric tag, as handed out by a toolkit
    Id(u64),
    /// Caller-chosen string tag
    Name(String),
}

impl Tag {
    /// Whether this tag names a widget
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unassigned)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => f.write_str("<unassigned>"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<u64> for Tag {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

/// An empty name maps to [`Tag::Unassigned`].
impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            Self::Unassigned
        } else {
            Self::Name(name.to_string())
        }
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        if name.is_empty() {
            Self::Unassigned
        } else {
            Self::Name(name)
        }
    }
}

impl From<Option<Tag>> for Tag {
    fn from(tag: Option<Tag>) -> Self {
        tag.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_unassigned() {
        assert!(!Tag::Unassigned.is_assigned());
        assert!(Tag::Id(0).is_assigned());
        assert_eq!(Tag::default(), Tag::Unassigned);
    }

    #[test]
    fn test_empty_name_is_sentinel() {
        assert_eq!(Tag::from(""), Tag::Unassigned);
        assert_eq!(Tag::from(String::new()), Tag::Unassigned);
        assert_eq!(Tag::from("volume"), Tag::Name("volume".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::Id(7).to_string(), "#7");
        assert_eq!(Tag::from("a").to_string(), "'a'");
        assert_eq!(Tag::Unassigned.to_string(), "<unassigned>");
    }
}
