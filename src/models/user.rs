//! Signed-in user as supplied by the auth API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The authenticated user. Only the fields the cart needs are typed; the
/// rest of the profile is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Courses the user already owns
    #[serde(rename = "purchasedCourses", default)]
    pub purchased_courses: Vec<OwnedCourse>,
    /// Remaining profile fields (name, email, avatar, ...)
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// Reference to an owned course: either a bare identifier or an object
/// carrying `_id` and/or `slug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnedCourse {
    Id(String),
    Ref {
        #[serde(
            rename = "_id",
            alias = "id",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slug: Option<String>,
    },
}

impl OwnedCourse {
    /// Whether this reference names the course with the given id or slug.
    /// Either match is sufficient.
    pub fn matches(&self, id: &str, slug: Option<&str>) -> bool {
        match self {
            OwnedCourse::Id(owned) => owned == id || slug == Some(owned.as_str()),
            OwnedCourse::Ref {
                id: owned_id,
                slug: owned_slug,
            } => {
                owned_id.as_deref() == Some(id)
                    || (owned_slug.is_some() && owned_slug.as_deref() == slug)
            }
        }
    }
}

impl User {
    /// Whether the user already owns the course with the given id or slug.
    pub fn owns(&self, id: &str, slug: Option<&str>) -> bool {
        self.purchased_courses.iter().any(|c| c.matches(id, slug))
    }
}
