use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public bucket that serves trusted-contact pictures by object key.
pub const PICTURE_BASE_URL: &str = "https://boltsample.s3.us-west-1.amazonaws.com";

/// Avatar shown for contacts added without a photo.
pub const DEFAULT_AVATAR_URL: &str = "https://images.pexels.com/photos/1222271/pexels-photo-1222271.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&dpr=2";

/// The signed-in user. Exactly one may be stored at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default, rename = "dateofbirth")]
    pub date_of_birth: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Local-cache projection of a trusted contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub relationship: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Phone number or other contact handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    /// Times remembered minus times forgotten. No floor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_score: Option<i64>,
}

impl Contact {
    pub fn score(&self) -> i64 {
        self.memory_score.unwrap_or(0)
    }
}

/// A contact created locally, before an id is assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub relationship: String,
    pub avatar: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub contact: Option<String>,
}

/// Partial contact record; `Some` fields overwrite, `None` fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_score: Option<i64>,
}

impl ContactUpdate {
    /// Shallow merge into `contact`.
    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(v) = &self.name {
            contact.name = v.clone();
        }
        if let Some(v) = &self.relationship {
            contact.relationship = v.clone();
        }
        if let Some(v) = &self.avatar {
            contact.avatar = v.clone();
        }
        if let Some(v) = &self.last_seen {
            contact.last_seen = Some(v.clone());
        }
        if let Some(v) = &self.location {
            contact.location = Some(v.clone());
        }
        if let Some(v) = &self.notes {
            contact.notes = Some(v.clone());
        }
        if let Some(v) = &self.contact {
            contact.contact = Some(v.clone());
        }
        if let Some(v) = self.memory_score {
            contact.memory_score = Some(v);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Relationship of a trusted contact to the user. The backend accepts only these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
    Mother,
    Father,
    Brother,
    Sister,
    Wife,
    Husband,
    Son,
    Daughter,
    Girlfriend,
    Boyfriend,
    Friend,
}

impl Relationship {
    pub const ALL: [Relationship; 11] = [
        Relationship::Mother,
        Relationship::Father,
        Relationship::Brother,
        Relationship::Sister,
        Relationship::Wife,
        Relationship::Husband,
        Relationship::Son,
        Relationship::Daughter,
        Relationship::Girlfriend,
        Relationship::Boyfriend,
        Relationship::Friend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Mother => "Mother",
            Relationship::Father => "Father",
            Relationship::Brother => "Brother",
            Relationship::Sister => "Sister",
            Relationship::Wife => "Wife",
            Relationship::Husband => "Husband",
            Relationship::Son => "Son",
            Relationship::Daughter => "Daughter",
            Relationship::Girlfriend => "Girlfriend",
            Relationship::Boyfriend => "Boyfriend",
            Relationship::Friend => "Friend",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown relationship: {0}")]
pub struct UnknownRelationship(pub String);

impl FromStr for Relationship {
    type Err = UnknownRelationship;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Relationship::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownRelationship(s.to_string()))
    }
}

/// Fields sent when creating a trusted contact. The picture travels as a multipart file part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustedContactRequest {
    pub name: String,
    pub relationship: Relationship,
    pub location: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Owning user id.
    pub user: String,
}

impl TrustedContactRequest {
    /// Present form fields in submission order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("relationship", self.relationship.to_string()),
            ("location", self.location.clone()),
            ("phone", self.phone.clone()),
        ];
        if let Some(email) = &self.email {
            fields.push(("email", email.clone()));
        }
        if let Some(note) = &self.note {
            fields.push(("note", note.clone()));
        }
        fields.push(("user", self.user.clone()));
        fields
    }
}

/// Server-side trusted contact, including face-index metadata that is never cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedContact {
    pub id: String,
    #[serde(default)]
    pub face_id: String,
    pub name: String,
    pub relationship: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub face_confidence: f64,
    #[serde(default)]
    pub face_indexed: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl TrustedContact {
    /// Public URL of the contact's picture.
    pub fn picture_url(&self) -> String {
        format!(
            "{PICTURE_BASE_URL}/{}",
            self.picture.as_deref().unwrap_or_default()
        )
    }
}

impl From<&TrustedContact> for Contact {
    fn from(tc: &TrustedContact) -> Self {
        Contact {
            id: tc.id.clone(),
            name: tc.name.clone(),
            relationship: tc.relationship.clone(),
            avatar: tc.picture_url(),
            last_seen: None,
            location: Some(tc.location.clone()),
            notes: tc.note.clone(),
            contact: Some(tc.phone.clone()),
            memory_score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrustedContactsList {
    #[serde(default)]
    pub message: String,
    pub contacts: Vec<TrustedContact>,
    #[serde(default)]
    pub count: usize,
}

/// One face-match event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionLog {
    pub contact_id: String,
    pub name: String,
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Captured frame as a `data:image/jpeg;base64,` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub gender: Gender,
    #[serde(rename = "dateofbirth")]
    pub date_of_birth: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<StoredUser>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub user: Option<StoredUser>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default, rename = "dateofbirth")]
    pub date_of_birth: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Body for the plain contacts endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateContactRequest {
    pub name: String,
    pub relationship: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub threshold: f64,
}

/// Face-recognition endpoint response. `matches` is ranked best first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub matches: Vec<TrustedContact>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub search_criteria: Option<SearchCriteria>,
}
