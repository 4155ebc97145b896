//! Typed profile records for the two profile variants.
//!
//! The backend has shipped several spellings for the same logical field
//! (`linkedIn`/`linkedin`, `workingDomain`/`domain`), so every read goes
//! through [`Profile::from_wire`], which folds them into one canonical shape.
//! Edits are expressed as a [`ProfilePatch`] over the fixed [`ProfileField`]
//! list of the profile's kind; anything outside that list is rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt, str::FromStr};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Which profile variant a record belongs to. Doubles as the `type` query
/// parameter of the profile endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProfileKind {
    Alumni,
    Student,
}

impl ProfileKind {
    /// Editable fields for this variant, in display order.
    #[must_use]
    pub fn fields(self) -> &'static [ProfileField] {
        match self {
            Self::Alumni => ALUMNI_FIELDS,
            Self::Student => STUDENT_FIELDS,
        }
    }
}

/// Every editable profile field across both variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfileField {
    Name,
    Email,
    Phone,
    Location,
    Bio,
    LinkedIn,
    Github,
    Occupation,
    Company,
    WorkingDomain,
    Cgpa,
    Category,
}

const ALUMNI_FIELDS: &[ProfileField] = &[
    ProfileField::Name,
    ProfileField::Email,
    ProfileField::Phone,
    ProfileField::Location,
    ProfileField::Bio,
    ProfileField::LinkedIn,
    ProfileField::Github,
    ProfileField::Occupation,
    ProfileField::Company,
    ProfileField::WorkingDomain,
];

const STUDENT_FIELDS: &[ProfileField] = &[
    ProfileField::Name,
    ProfileField::Email,
    ProfileField::Phone,
    ProfileField::Location,
    ProfileField::Bio,
    ProfileField::LinkedIn,
    ProfileField::Github,
    ProfileField::Cgpa,
    ProfileField::Category,
];

impl ProfileField {
    /// Canonical wire name used in update payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Location => "location",
            Self::Bio => "bio",
            Self::LinkedIn => "linkedIn",
            Self::Github => "github",
            Self::Occupation => "occupation",
            Self::Company => "company",
            Self::WorkingDomain => "workingDomain",
            Self::Cgpa => "cgpa",
            Self::Category => "category",
        }
    }

    /// Names accepted when reading a backend record, preferred first.
    fn wire_aliases(self) -> &'static [&'static str] {
        match self {
            Self::LinkedIn => &["linkedIn", "linkedin"],
            Self::WorkingDomain => &["workingDomain", "domain"],
            Self::Name => &["name"],
            Self::Email => &["email"],
            Self::Phone => &["phone"],
            Self::Location => &["location"],
            Self::Bio => &["bio"],
            Self::Github => &["github"],
            Self::Occupation => &["occupation"],
            Self::Company => &["company"],
            Self::Cgpa => &["cgpa"],
            Self::Category => &["category"],
        }
    }

    /// Whether the field exists on the given variant.
    #[must_use]
    pub fn applies_to(self, kind: ProfileKind) -> bool {
        kind.fields().contains(&self)
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = UnknownProfileField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "location" => Ok(Self::Location),
            "bio" => Ok(Self::Bio),
            "linkedIn" | "linkedin" | "linked_in" => Ok(Self::LinkedIn),
            "github" => Ok(Self::Github),
            "occupation" => Ok(Self::Occupation),
            "company" => Ok(Self::Company),
            "workingDomain" | "working_domain" | "domain" => Ok(Self::WorkingDomain),
            "cgpa" => Ok(Self::Cgpa),
            "category" => Ok(Self::Category),
            other => Err(UnknownProfileField(other.to_string())),
        }
    }
}

/// A field name that is not part of any profile variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown profile field `{0}`")]
pub struct UnknownProfileField(pub String);

/// A known field used on the wrong variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("field `{field}` does not exist on {kind} profiles")]
pub struct FieldNotApplicable {
    pub field: ProfileField,
    pub kind: ProfileKind,
}

/// Variant-specific part of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileDetails {
    Alumni {
        occupation: String,
        company: String,
        working_domain: String,
    },
    Student {
        cgpa: String,
        category: String,
    },
}

/// A profile in canonical shape. Absent backend values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: Option<i64>,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub bio: String,
    pub linked_in: String,
    pub github: String,
    pub profile_pic: String,
    pub details: ProfileDetails,
}

impl Profile {
    /// An empty profile of the given kind for `user_id`.
    #[must_use]
    pub fn empty(kind: ProfileKind, user_id: i64) -> Self {
        let details = match kind {
            ProfileKind::Alumni => ProfileDetails::Alumni {
                occupation: String::new(),
                company: String::new(),
                working_domain: String::new(),
            },
            ProfileKind::Student => ProfileDetails::Student {
                cgpa: String::new(),
                category: String::new(),
            },
        };
        Self {
            id: None,
            user_id,
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            location: String::new(),
            bio: String::new(),
            linked_in: String::new(),
            github: String::new(),
            profile_pic: String::new(),
            details,
        }
    }

    /// Normalize a freshly fetched record. Missing ids fall back to `subject_id`.
    #[must_use]
    pub fn from_wire(kind: ProfileKind, subject_id: i64, value: &Value) -> Self {
        let fallback = Self::empty(kind, subject_id);
        let mut profile = Self::normalize(kind, value, &fallback);
        if profile.id.is_none() {
            profile.id = Some(subject_id);
        }
        profile
    }

    /// Normalize a save response. `id`, `user_id` and `profile_pic` fall back
    /// to the values of `previous` when the server omits them.
    #[must_use]
    pub fn from_saved(previous: &Self, value: &Value) -> Self {
        Self::normalize(previous.kind(), value, previous)
    }

    fn normalize(kind: ProfileKind, value: &Value, fallback: &Self) -> Self {
        let empty = Map::new();
        let record = value.as_object().unwrap_or(&empty);

        let mut profile = Self::empty(kind, fallback.user_id);
        profile.id = read_i64(record, "id").or(fallback.id);
        profile.user_id = read_i64(record, "user_id").unwrap_or(fallback.user_id);
        profile.profile_pic = read_string(record, &["profile_pic"])
            .unwrap_or_else(|| fallback.profile_pic.clone());

        for &field in kind.fields() {
            let text = read_string(record, field.wire_aliases()).unwrap_or_default();
            profile.write(field, text);
        }
        profile
    }

    /// The variant this profile belongs to.
    #[must_use]
    pub fn kind(&self) -> ProfileKind {
        match self.details {
            ProfileDetails::Alumni { .. } => ProfileKind::Alumni,
            ProfileDetails::Student { .. } => ProfileKind::Student,
        }
    }

    /// Current value of `field`, or `None` if it is not part of this variant.
    #[must_use]
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        let value = match (field, &self.details) {
            (ProfileField::Name, _) => &self.name,
            (ProfileField::Email, _) => &self.email,
            (ProfileField::Phone, _) => &self.phone,
            (ProfileField::Location, _) => &self.location,
            (ProfileField::Bio, _) => &self.bio,
            (ProfileField::LinkedIn, _) => &self.linked_in,
            (ProfileField::Github, _) => &self.github,
            (ProfileField::Occupation, ProfileDetails::Alumni { occupation, .. }) => occupation,
            (ProfileField::Company, ProfileDetails::Alumni { company, .. }) => company,
            (ProfileField::WorkingDomain, ProfileDetails::Alumni { working_domain, .. }) => {
                working_domain
            }
            (ProfileField::Cgpa, ProfileDetails::Student { cgpa, .. }) => cgpa,
            (ProfileField::Category, ProfileDetails::Student { category, .. }) => category,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Overwrite one field.
    ///
    /// # Errors
    /// Returns [`FieldNotApplicable`] if `field` is not part of this variant.
    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) -> Result<(), FieldNotApplicable> {
        if !field.applies_to(self.kind()) {
            return Err(FieldNotApplicable {
                field,
                kind: self.kind(),
            });
        }
        self.write(field, value.into());
        Ok(())
    }

    /// Returns a copy with every entry of `patch` applied.
    ///
    /// # Errors
    /// Returns [`FieldNotApplicable`] for the first patched field outside
    /// this variant; `self` is left unchanged.
    pub fn merged(&self, patch: &ProfilePatch) -> Result<Self, FieldNotApplicable> {
        let mut merged = self.clone();
        for (field, value) in patch.iter() {
            merged.set(field, value)?;
        }
        Ok(merged)
    }

    /// Update body for the generic profile endpoint.
    ///
    /// Identifiers and the picture are server-managed and never sent. An
    /// empty CGPA is sent as `null`.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        for &field in self.kind().fields() {
            let text = self.get(field).unwrap_or_default();
            let value = if field == ProfileField::Cgpa {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Value::Null
                } else {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map_or_else(|| Value::String(text.to_string()), Value::Number)
                }
            } else {
                Value::String(text.to_string())
            };
            payload.insert(field.as_str().to_string(), value);
        }
        Value::Object(payload)
    }

    fn write(&mut self, field: ProfileField, value: String) {
        let slot = match (field, &mut self.details) {
            (ProfileField::Name, _) => &mut self.name,
            (ProfileField::Email, _) => &mut self.email,
            (ProfileField::Phone, _) => &mut self.phone,
            (ProfileField::Location, _) => &mut self.location,
            (ProfileField::Bio, _) => &mut self.bio,
            (ProfileField::LinkedIn, _) => &mut self.linked_in,
            (ProfileField::Github, _) => &mut self.github,
            (ProfileField::Occupation, ProfileDetails::Alumni { occupation, .. }) => occupation,
            (ProfileField::Company, ProfileDetails::Alumni { company, .. }) => company,
            (ProfileField::WorkingDomain, ProfileDetails::Alumni { working_domain, .. }) => {
                working_domain
            }
            (ProfileField::Cgpa, ProfileDetails::Student { cgpa, .. }) => cgpa,
            (ProfileField::Category, ProfileDetails::Student { category, .. }) => category,
            _ => return,
        };
        *slot = value;
    }
}

fn read_i64(record: &Map<String, Value>, key: &str) -> Option<i64> {
    match record.get(key)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

fn read_string(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

/// Pending field edits; a later write to the same field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch(BTreeMap<ProfileField, String>);

impl ProfilePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: ProfileField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    /// Shallow merge; entries of `other` overwrite ours.
    pub fn merge(&mut self, other: &Self) {
        for (field, value) in other.iter() {
            self.0.insert(field, value.to_string());
        }
    }

    #[must_use]
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.0.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// First field that does not exist on `kind`, if any.
    #[must_use]
    pub fn first_foreign_field(&self, kind: ProfileKind) -> Option<ProfileField> {
        self.0.keys().copied().find(|field| !field.applies_to(kind))
    }
}

impl<V: Into<String>> FromIterator<(ProfileField, V)> for ProfilePatch {
    fn from_iter<I: IntoIterator<Item = (ProfileField, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field, value.into()))
                .collect(),
        )
    }
}

/// `{ "profile": ... }` envelope used by the profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileEnvelope {
    pub profile: Value,
}
