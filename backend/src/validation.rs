//! Payload validation.
//!
//! Every rule here is a pure function of the payload: nothing is cached between
//! requests except the compiled regexes. Handlers call [`validate`] (or one of the
//! course-specific helpers) before touching storage, and a non-empty report always
//! blocks the operation with a 400.

use regex::Regex;
use std::{collections::HashSet, sync::OnceLock};

use crate::{
    error::{AppError, FieldError},
    models::{
        Award, CourseStatus, CreateCommentRequest, CreateCourseRequest, CreateMaterialRequest,
        Education, Experience, FeedbackRequest, ManagerInput, ProfileEntryData, ProjectEntry,
        RegisterUserRequest, UpdateCourseRequest, UpdateMaterialRequest, UpdateProfileRequest,
    },
};

pub const TITLE_MAX: usize = 120;
pub const SUBTITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 5_000;
pub const TAG_MAX_LEN: usize = 40;
pub const TAGS_MAX: usize = 20;
pub const NAME_MAX: usize = 60;
pub const BIO_MAX: usize = 1_000;
pub const COMMENT_MAX: usize = 2_000;
pub const PASSWORD_MIN: usize = 8;
pub const SCORE_RANGE: std::ops::RangeInclusive<i16> = 1..=5;
pub const IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

static URL_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_RE.get_or_init(|| {
        Regex::new(r"^https?://[A-Za-z0-9.-]+(:[0-9]{1,5})?(/[^\s]*)?$")
            .unwrap_or_else(|error| panic!("url regex failed to compile: {error}"))
    })
}

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// ValidationReport
///
/// Accumulates every failed rule for one payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Requires a non-blank value no longer than `max` characters.
    pub fn required_text(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        } else {
            self.max_len(field, value, max);
        }
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("must be at most {max} characters"));
        }
    }

    pub fn url(&mut self, field: &str, value: &str) {
        if !url_regex().is_match(value.trim()) {
            self.push(field, "must be an http(s) URL");
        }
    }

    pub fn date_range(
        &mut self,
        field: &str,
        start: chrono::NaiveDate,
        end: Option<chrono::NaiveDate>,
    ) {
        if end.is_some_and(|end| end < start) {
            self.push(field, "must not be before the start date");
        }
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Validate
///
/// Implemented once per entity kind.
pub trait Validate {
    fn validate(&self) -> ValidationReport;
}

/// Runs the rules for `payload` and converts a failing report into an error.
pub fn validate<T: Validate + ?Sized>(payload: &T) -> Result<(), AppError> {
    payload.validate().into_result()
}

/// Course fields after validation, with tags normalized into a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Course update after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<CourseStatus>,
    pub managers: Vec<ManagerInput>,
}

/// Tags must be a JSON array of strings. Entries are trimmed and collapsed into a set
/// while keeping first-seen order.
fn normalize_tags(value: &serde_json::Value, report: &mut ValidationReport) -> Vec<String> {
    let Some(items) = value.as_array() else {
        report.push("tags", "must be an array of strings");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut tags = Vec::with_capacity(items.len());
    for item in items {
        let Some(tag) = item.as_str() else {
            report.push("tags", "must be an array of strings");
            return Vec::new();
        };
        let tag = tag.trim();
        if tag.is_empty() {
            report.push("tags", "must not contain empty tags");
            continue;
        }
        if tag.chars().count() > TAG_MAX_LEN {
            report.push("tags", format!("each tag must be at most {TAG_MAX_LEN} characters"));
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            tags.push(tag.to_string());
        }
    }

    if tags.len() > TAGS_MAX {
        report.push("tags", format!("must contain at most {TAGS_MAX} tags"));
    }
    tags
}

pub fn validate_new_course(req: &CreateCourseRequest) -> Result<NewCourse, AppError> {
    let mut report = ValidationReport::new();
    report.required_text("title", &req.title, TITLE_MAX);
    report.max_len("subtitle", &req.subtitle, SUBTITLE_MAX);
    report.max_len("description", &req.description, DESCRIPTION_MAX);
    let tags = req
        .tags
        .as_ref()
        .filter(|value| !value.is_null())
        .map(|value| normalize_tags(value, &mut report))
        .unwrap_or_default();

    report.into_result()?;
    Ok(NewCourse {
        title: req.title.trim().to_string(),
        subtitle: req.subtitle.trim().to_string(),
        description: req.description.trim().to_string(),
        tags,
    })
}

pub fn validate_course_update(req: &UpdateCourseRequest) -> Result<CoursePatch, AppError> {
    let mut report = ValidationReport::new();
    if let Some(title) = &req.title {
        report.required_text("title", title, TITLE_MAX);
    }
    if let Some(subtitle) = &req.subtitle {
        report.max_len("subtitle", subtitle, SUBTITLE_MAX);
    }
    if let Some(description) = &req.description {
        report.max_len("description", description, DESCRIPTION_MAX);
    }
    let tags = req
        .tags
        .as_ref()
        .map(|value| normalize_tags(value, &mut report));

    report.into_result()?;
    Ok(CoursePatch {
        title: req.title.as_ref().map(|s| s.trim().to_string()),
        subtitle: req.subtitle.as_ref().map(|s| s.trim().to_string()),
        description: req.description.as_ref().map(|s| s.trim().to_string()),
        tags,
        status: req.status,
        managers: req.managers.clone().unwrap_or_default(),
    })
}

/// Checks an uploaded image and returns the file extension to store it under.
pub fn validate_image(content_type: Option<&str>, len: usize) -> Result<&'static str, AppError> {
    let extension = match content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim()) {
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => {
            return Err(AppError::invalid_field(
                "content-type",
                "must be one of image/png, image/jpeg, image/webp, image/gif",
            ));
        }
    };
    if len == 0 {
        return Err(AppError::invalid_field("body", "must not be empty"));
    }
    if len > IMAGE_MAX_BYTES {
        return Err(AppError::invalid_field(
            "body",
            format!("must be at most {IMAGE_MAX_BYTES} bytes"),
        ));
    }
    Ok(extension)
}

impl Validate for CreateMaterialRequest {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.url("url", &self.url);
        report.max_len("description", &self.description, DESCRIPTION_MAX);
        report
    }
}

impl Validate for UpdateMaterialRequest {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        if let Some(url) = &self.url {
            report.url("url", url);
        }
        if let Some(description) = &self.description {
            report.max_len("description", description, DESCRIPTION_MAX);
        }
        report
    }
}

impl Validate for CreateCommentRequest {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.required_text("text", &self.text, COMMENT_MAX);
        report
    }
}

impl Validate for FeedbackRequest {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        if !SCORE_RANGE.contains(&self.score) {
            report.push(
                "score",
                format!(
                    "must be between {} and {}",
                    SCORE_RANGE.start(),
                    SCORE_RANGE.end()
                ),
            );
        }
        if let Some(comment) = &self.comment {
            report.max_len("comment", comment, COMMENT_MAX);
        }
        report
    }
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        if !email_regex().is_match(self.email.trim()) {
            report.push("email", "must be a valid email address");
        }
        if self.password.chars().count() < PASSWORD_MIN {
            report.push(
                "password",
                format!("must be at least {PASSWORD_MIN} characters"),
            );
        }
        report.required_text("name", &self.name, NAME_MAX);
        report.required_text("surname", &self.surname, NAME_MAX);
        report
    }
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        if let Some(name) = &self.name {
            report.required_text("name", name, NAME_MAX);
        }
        if let Some(surname) = &self.surname {
            report.required_text("surname", surname, NAME_MAX);
        }
        if let Some(bio) = &self.bio {
            report.max_len("bio", bio, BIO_MAX);
        }
        report
    }
}

impl Validate for Education {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.required_text("institution", &self.institution, TITLE_MAX);
        report.required_text("degree", &self.degree, TITLE_MAX);
        if let Some(field) = &self.field_of_study {
            report.max_len("field_of_study", field, TITLE_MAX);
        }
        report.date_range("end_date", self.start_date, self.end_date);
        report
    }
}

impl Validate for Experience {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.required_text("company", &self.company, TITLE_MAX);
        report.required_text("position", &self.position, TITLE_MAX);
        if let Some(description) = &self.description {
            report.max_len("description", description, DESCRIPTION_MAX);
        }
        report.date_range("end_date", self.start_date, self.end_date);
        report
    }
}

impl Validate for ProjectEntry {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.required_text("title", &self.title, TITLE_MAX);
        if let Some(description) = &self.description {
            report.max_len("description", description, DESCRIPTION_MAX);
        }
        if let Some(url) = &self.url {
            report.url("url", url);
        }
        report
    }
}

impl Validate for Award {
    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.required_text("title", &self.title, TITLE_MAX);
        report.required_text("issuer", &self.issuer, TITLE_MAX);
        if let Some(description) = &self.description {
            report.max_len("description", description, DESCRIPTION_MAX);
        }
        report
    }
}

impl Validate for ProfileEntryData {
    fn validate(&self) -> ValidationReport {
        match self {
            Self::Education(entry) => entry.validate(),
            Self::Experience(entry) => entry.validate(),
            Self::Project(entry) => entry.validate(),
            Self::Award(entry) => entry.validate(),
        }
    }
}
