//! Request, result and profile types crossing the engine boundary.

use crate::portal::{error::ErrorKind, metrics::Counter};
use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use utoipa::ToSchema;

/// Offset used by the portal for every timestamp it shows (IST, +05:30).
pub const PORTAL_UTC_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// Current time in the portal's local offset.
#[must_use]
pub fn portal_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(PORTAL_UTC_OFFSET_SECONDS)
        .unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset)
}

/// A profile attribute that can be requested through `fields`.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Prn,
    Srn,
    Program,
    BranchShortCode,
    Branch,
    Semester,
    Section,
    Email,
    Phone,
    CampusCode,
    Campus,
}

impl ProfileField {
    pub const ALL: [Self; 12] = [
        Self::Name,
        Self::Prn,
        Self::Srn,
        Self::Program,
        Self::BranchShortCode,
        Self::Branch,
        Self::Semester,
        Self::Section,
        Self::Email,
        Self::Phone,
        Self::CampusCode,
        Self::Campus,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Prn => "prn",
            Self::Srn => "srn",
            Self::Program => "program",
            Self::BranchShortCode => "branch_short_code",
            Self::Branch => "branch",
            Self::Semester => "semester",
            Self::Section => "section",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::CampusCode => "campus_code",
            Self::Campus => "campus",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown profile field '{s}'"))
    }
}

/// Subset of profile fields to extract; `None` means every field.
pub type FieldSelection = Option<BTreeSet<ProfileField>>;

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_short_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campus_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campus: Option<String>,
}

impl ProfileData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop every field outside `fields`.
    #[must_use]
    pub fn retain(mut self, fields: &BTreeSet<ProfileField>) -> Self {
        let keep = |field| fields.contains(&field);
        if !keep(ProfileField::Name) {
            self.name = None;
        }
        if !keep(ProfileField::Prn) {
            self.prn = None;
        }
        if !keep(ProfileField::Srn) {
            self.srn = None;
        }
        if !keep(ProfileField::Program) {
            self.program = None;
        }
        if !keep(ProfileField::BranchShortCode) {
            self.branch_short_code = None;
        }
        if !keep(ProfileField::Branch) {
            self.branch = None;
        }
        if !keep(ProfileField::Semester) {
            self.semester = None;
        }
        if !keep(ProfileField::Section) {
            self.section = None;
        }
        if !keep(ProfileField::Email) {
            self.email = None;
        }
        if !keep(ProfileField::Phone) {
            self.phone = None;
        }
        if !keep(ProfileField::CampusCode) {
            self.campus_code = None;
        }
        if !keep(ProfileField::Campus) {
            self.campus = None;
        }
        self
    }
}

/// One authenticate call. Immutable once built.
#[derive(Clone, Debug)]
pub struct AuthRequest {
    username: String,
    password: SecretString,
    want_profile: bool,
    fields: FieldSelection,
}

impl AuthRequest {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            want_profile: false,
            fields: None,
        }
    }

    #[must_use]
    pub fn with_profile(mut self, want_profile: bool) -> Self {
        self.want_profile = want_profile;
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    #[must_use]
    pub const fn want_profile(&self) -> bool {
        self.want_profile
    }

    #[must_use]
    pub const fn fields(&self) -> Option<&BTreeSet<ProfileField>> {
        self.fields.as_ref()
    }
}

/// Terminal state of one authenticate call. Each maps to exactly one counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Login succeeded but the profile page could not be retrieved.
    ProfileFetchFailed,
    /// Login succeeded but the profile page could not be parsed.
    ProfileParseFailed,
    CredentialsRejected,
    Failed(ErrorKind),
}

impl Outcome {
    #[must_use]
    pub const fn counter(self) -> Counter {
        match self {
            Self::Success => Counter::AuthSuccess,
            Self::ProfileFetchFailed => Counter::ProfileFetchError,
            Self::ProfileParseFailed => Counter::ProfileParseError,
            Self::CredentialsRejected => Counter::AuthFailure,
            Self::Failed(ErrorKind::CsrfToken) => Counter::CsrfTokenError,
            Self::Failed(ErrorKind::PesuAcademy) => Counter::PesuAcademyError,
            Self::Failed(ErrorKind::ProfileFetch) => Counter::ProfileFetchError,
            Self::Failed(ErrorKind::ProfileParse) => Counter::ProfileParseError,
            Self::Failed(ErrorKind::Unhandled) => Counter::UnhandledException,
        }
    }
}

#[derive(ToSchema, Serialize, Clone, Debug)]
pub struct AuthResult {
    pub status: bool,
    pub message: String,
    #[schema(value_type = String, example = "2024-07-28T22:30:10.103368+05:30")]
    pub timestamp: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl AuthResult {
    #[must_use]
    pub fn success(profile: Option<ProfileData>) -> Self {
        Self {
            status: true,
            message: "Login successful.".to_string(),
            timestamp: portal_now(),
            profile,
            error: None,
            outcome: Outcome::Success,
        }
    }

    /// Login succeeded but the requested profile is missing.
    #[must_use]
    pub fn success_without_profile(outcome: Outcome) -> Self {
        let message = match outcome {
            Outcome::ProfileParseFailed => {
                "Login successful, but the profile page could not be parsed."
            }
            _ => "Login successful, but the profile page could not be fetched.",
        };
        Self {
            status: true,
            message: message.to_string(),
            timestamp: portal_now(),
            profile: None,
            error: None,
            outcome,
        }
    }

    #[must_use]
    pub fn credentials_rejected() -> Self {
        Self {
            status: false,
            message: "Invalid credentials.".to_string(),
            timestamp: portal_now(),
            profile: None,
            error: None,
            outcome: Outcome::CredentialsRejected,
        }
    }

    #[must_use]
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            timestamp: portal_now(),
            profile: None,
            error: Some(kind),
            outcome: Outcome::Failed(kind),
        }
    }
}
