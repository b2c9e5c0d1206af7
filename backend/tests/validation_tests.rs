use chrono::NaiveDate;
use edu_portal::{
    error::{AppError, FieldError},
    models::{
        CourseStatus, CreateCourseRequest, CreateMaterialRequest, Education, FeedbackRequest,
        ManagerInput, ManagerRole, ProfileEntryData, ProfileSection, ProjectEntry,
        RegisterUserRequest, UpdateCourseRequest,
    },
    validation::{self, CoursePatch, TAGS_MAX, Validate, validate},
};
use serde_json::json;
use uuid::Uuid;

fn fields(err: AppError) -> Vec<String> {
    match err {
        AppError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_course_tags_are_trimmed_and_deduplicated() {
    let req = CreateCourseRequest {
        title: "  Rust  ".to_string(),
        tags: Some(json!([" rust", "Rust", "async ", "tokio", "async"])),
        ..Default::default()
    };

    let course = validation::validate_new_course(&req).unwrap();

    assert_eq!(course.title, "Rust");
    assert_eq!(course.tags, vec!["rust", "async", "tokio"]);
}

#[test]
fn test_course_tags_must_be_strings() {
    for tags in [json!("rust"), json!([1, 2]), json!({"a": "b"}), json!(["ok", null])] {
        let req = CreateCourseRequest {
            title: "Rust".to_string(),
            tags: Some(tags.clone()),
            ..Default::default()
        };
        let err = validation::validate_new_course(&req).unwrap_err();
        assert_eq!(fields(err), vec!["tags"], "{tags}");
    }
}

#[test]
fn test_course_tag_count_is_bounded() {
    let tags: Vec<String> = (0..=TAGS_MAX).map(|i| format!("tag-{i}")).collect();
    let req = CreateCourseRequest {
        title: "Rust".to_string(),
        tags: Some(json!(tags)),
        ..Default::default()
    };
    assert!(validation::validate_new_course(&req).is_err());
}

#[test]
fn test_course_title_is_required() {
    let req = CreateCourseRequest {
        title: "   ".to_string(),
        ..Default::default()
    };
    assert_eq!(
        fields(validation::validate_new_course(&req).unwrap_err()),
        vec!["title"]
    );
}

#[test]
fn test_course_update_builds_trimmed_patch_with_managers() {
    let manager = ManagerInput {
        manager_id: Uuid::new_v4(),
        role: ManagerRole::Lecturer,
    };
    let patch = validation::validate_course_update(&UpdateCourseRequest {
        title: Some("  Rust 102 ".to_string()),
        status: Some(CourseStatus::Published),
        managers: Some(vec![manager.clone(), manager.clone()]),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(
        patch,
        CoursePatch {
            title: Some("Rust 102".to_string()),
            status: Some(CourseStatus::Published),
            managers: vec![manager.clone(), manager],
            ..Default::default()
        }
    );
}

#[test]
fn test_course_update_only_checks_present_fields() {
    let patch = validation::validate_course_update(&UpdateCourseRequest::default()).unwrap();
    assert!(patch.title.is_none());
    assert!(patch.tags.is_none());
    assert!(patch.managers.is_empty());

    let bad = UpdateCourseRequest {
        title: Some(String::new()),
        tags: Some(json!(42)),
        ..Default::default()
    };
    let mut failed = fields(validation::validate_course_update(&bad).unwrap_err());
    failed.sort();
    assert_eq!(failed, vec!["tags", "title"]);
}

#[test]
fn test_material_url_must_be_http() {
    let ok = CreateMaterialRequest {
        url: "https://example.com/slides.pdf".to_string(),
        description: "Slides".to_string(),
    };
    assert!(ok.validate().is_valid());

    for url in ["ftp://example.com/file", "example.com", "", "https://exa mple.com"] {
        let req = CreateMaterialRequest {
            url: url.to_string(),
            description: String::new(),
        };
        assert_eq!(
            req.validate().errors(),
            &[FieldError::new("url", "must be an http(s) URL")][..],
            "{url}"
        );
    }
}

#[test]
fn test_feedback_score_range() {
    for (score, valid) in [(0, false), (1, true), (5, true), (6, false), (-1, false)] {
        let req = FeedbackRequest {
            score,
            comment: None,
        };
        assert_eq!(validate(&req).is_ok(), valid, "score {score}");
    }
}

#[test]
fn test_register_request_rules() {
    let req = RegisterUserRequest {
        email: "not-an-email".to_string(),
        password: "short".to_string(),
        name: "Sam".to_string(),
        surname: String::new(),
    };
    let mut failed = fields(validate(&req).unwrap_err());
    failed.sort();
    assert_eq!(failed, vec!["email", "password", "surname"]);
}

#[test]
fn test_profile_entries_are_decoded_by_section_and_validated() {
    let entry = ProfileEntryData::from_section(
        ProfileSection::Education,
        json!({
            "institution": "Trinity College",
            "degree": "BSc",
            "start_date": "2020-09-01",
            "end_date": "2019-06-01"
        }),
    )
    .unwrap();
    assert_eq!(entry.section(), ProfileSection::Education);
    assert_eq!(fields(validate(&entry).unwrap_err()), vec!["end_date"]);

    // The body must match the section it is posted to.
    assert!(
        ProfileEntryData::from_section(ProfileSection::Award, json!({ "company": "ACME" }))
            .is_err()
    );
}

#[test]
fn test_education_with_open_end_date_is_valid() {
    let entry = Education {
        institution: "UL".to_string(),
        degree: "MSc".to_string(),
        field_of_study: None,
        start_date: date(2023, 9, 1),
        end_date: None,
    };
    assert!(entry.validate().is_valid());
}

#[test]
fn test_project_entry_url_is_optional_but_checked() {
    let mut entry = ProjectEntry {
        title: "Compiler".to_string(),
        description: None,
        url: None,
    };
    assert!(entry.validate().is_valid());

    entry.url = Some("javascript:alert(1)".to_string());
    assert!(!entry.validate().is_valid());
}

#[test]
fn test_image_checks() {
    assert_eq!(validation::validate_image(Some("image/png"), 10), Ok("png"));
    assert_eq!(
        validation::validate_image(Some("image/jpeg; charset=binary"), 10),
        Ok("jpg")
    );
    assert!(validation::validate_image(Some("application/pdf"), 10).is_err());
    assert!(validation::validate_image(None, 10).is_err());
    assert!(validation::validate_image(Some("image/png"), 0).is_err());
    assert!(
        validation::validate_image(Some("image/png"), validation::IMAGE_MAX_BYTES + 1).is_err()
    );
}
