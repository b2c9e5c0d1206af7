use chrono::{Duration, Utc};
use edu_portal::{
    enrollment,
    error::AppError,
    lifecycle,
    models::{Course, RegistrationState},
    validation::NewCourse,
};
use uuid::Uuid;

fn course() -> Course {
    let fields = NewCourse {
        title: "Networks".to_string(),
        subtitle: String::new(),
        description: String::new(),
        tags: Vec::new(),
    };
    lifecycle::new_course(Uuid::new_v4(), fields, Utc::now())
}

#[test]
fn test_new_registration_is_requested() {
    let course = course();
    let user = Uuid::new_v4();
    let now = Utc::now();

    let reg = enrollment::new_registration(&course, user, now).unwrap();

    assert_eq!(reg.user_id, user);
    assert_eq!(reg.state, RegistrationState::Requested);
    assert_eq!(
        serde_json::to_value(reg.state).unwrap(),
        serde_json::json!("REQUESTED")
    );
    assert_eq!(reg.requested_at, now);
    assert!(reg.accepted_at.is_none());
}

#[test]
fn test_second_registration_for_same_user_is_rejected() {
    let mut course = course();
    let user = Uuid::new_v4();
    let reg = enrollment::new_registration(&course, user, Utc::now()).unwrap();
    course.registrations.push(reg);

    assert_eq!(
        enrollment::new_registration(&course, user, Utc::now()),
        Err(AppError::AlreadyEnrolled)
    );
    // A different user is unaffected.
    assert!(enrollment::new_registration(&course, Uuid::new_v4(), Utc::now()).is_ok());
}

#[test]
fn test_registration_to_remove() {
    let mut course = course();
    let user = Uuid::new_v4();
    assert_eq!(
        enrollment::registration_to_remove(&course, user),
        Err(AppError::NotEnrolled)
    );

    let reg = enrollment::new_registration(&course, user, Utc::now()).unwrap();
    let id = reg.id;
    course.registrations.push(reg);
    assert_eq!(enrollment::registration_to_remove(&course, user), Ok(id));
}

#[test]
fn test_advance_is_forward_only() {
    use RegistrationState::*;
    let cases = [
        (Requested, Accepted, true),
        (Requested, Rejected, true),
        (Requested, Discontinued, false),
        (Accepted, Discontinued, true),
        (Accepted, Rejected, false),
        (Accepted, Requested, false),
        (Rejected, Accepted, false),
        (Discontinued, Accepted, false),
    ];
    for (from, to, allowed) in cases {
        assert_eq!(enrollment::can_advance(from, to), allowed, "{from} -> {to}");
    }
}

#[test]
fn test_advance_stamps_matching_timestamp() {
    let course = course();
    let mut reg = enrollment::new_registration(&course, Uuid::new_v4(), Utc::now()).unwrap();

    let accepted = Utc::now() + Duration::minutes(5);
    enrollment::advance(&mut reg, RegistrationState::Accepted, accepted).unwrap();
    assert_eq!(reg.state, RegistrationState::Accepted);
    assert_eq!(reg.accepted_at, Some(accepted));
    assert!(reg.rejected_at.is_none());

    let left = accepted + Duration::days(30);
    enrollment::advance(&mut reg, RegistrationState::Discontinued, left).unwrap();
    assert_eq!(reg.discontinued_at, Some(left));
    assert_eq!(reg.accepted_at, Some(accepted));
}

#[test]
fn test_illegal_advance_leaves_registration_untouched() {
    let course = course();
    let mut reg = enrollment::new_registration(&course, Uuid::new_v4(), Utc::now()).unwrap();
    let before = reg.clone();

    let err = enrollment::advance(&mut reg, RegistrationState::Discontinued, Utc::now())
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InvalidTransition {
            entity: "registration",
            ..
        }
    ));
    assert_eq!(reg, before);
}

#[test]
fn test_feedback_requires_accepted_registration() {
    let course = course();
    let mut reg = enrollment::new_registration(&course, Uuid::new_v4(), Utc::now()).unwrap();

    let err = enrollment::new_feedback(&reg, 4, None, Utc::now()).unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    enrollment::advance(&mut reg, RegistrationState::Accepted, Utc::now()).unwrap();
    let feedback = enrollment::new_feedback(&reg, 4, Some("good".into()), Utc::now()).unwrap();
    assert_eq!(feedback.score, 4);
}

#[test]
fn test_average_rating() {
    let mut course = course();
    assert_eq!(enrollment::average_rating(&course), 0.0);

    for scores in [vec![5, 4], vec![3]] {
        let mut reg =
            enrollment::new_registration(&course, Uuid::new_v4(), Utc::now()).unwrap();
        enrollment::advance(&mut reg, RegistrationState::Accepted, Utc::now()).unwrap();
        for score in scores {
            let fb = enrollment::new_feedback(&reg, score, None, Utc::now()).unwrap();
            reg.feedback.push(fb);
        }
        course.registrations.push(reg);
    }

    assert!((enrollment::average_rating(&course) - 4.0).abs() < f64::EPSILON);
}
