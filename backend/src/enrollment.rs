//! Enrollment ledger.
//!
//! Registrations are owned by their course. Uniqueness per (course, user) is checked
//! here by scanning the course's registrations; the repository additionally refuses
//! a second insert for the same pair.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Course, Feedback, Registration, RegistrationState},
};

/// Forward-only moves for a registration. REQUESTED is only ever entered on enroll.
pub const REGISTRATION_TRANSITIONS: &[(RegistrationState, &[RegistrationState])] = &[
    (
        RegistrationState::Requested,
        &[RegistrationState::Accepted, RegistrationState::Rejected],
    ),
    (RegistrationState::Accepted, &[RegistrationState::Discontinued]),
    (RegistrationState::Rejected, &[]),
    (RegistrationState::Discontinued, &[]),
];

pub fn find_registration(course: &Course, user_id: Uuid) -> Option<&Registration> {
    course.registrations.iter().find(|r| r.user_id == user_id)
}

/// Creates the REQUESTED registration for `user_id`, or fails if one already exists.
pub fn new_registration(
    course: &Course,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Registration, AppError> {
    if find_registration(course, user_id).is_some() {
        return Err(AppError::AlreadyEnrolled);
    }

    Ok(Registration {
        id: Uuid::new_v4(),
        user_id,
        state: RegistrationState::Requested,
        requested_at: now,
        accepted_at: None,
        rejected_at: None,
        discontinued_at: None,
        feedback: Vec::new(),
    })
}

/// Returns the id of the registration to hard-delete on unenroll.
pub fn registration_to_remove(course: &Course, user_id: Uuid) -> Result<Uuid, AppError> {
    find_registration(course, user_id)
        .map(|r| r.id)
        .ok_or(AppError::NotEnrolled)
}

pub fn can_advance(from: RegistrationState, to: RegistrationState) -> bool {
    REGISTRATION_TRANSITIONS
        .iter()
        .find(|(state, _)| *state == from)
        .is_some_and(|(_, next)| next.contains(&to))
}

/// advance
///
/// Administrative move of a registration to a later state, stamping the timestamp
/// that belongs to the new state.
pub fn advance(
    registration: &mut Registration,
    next: RegistrationState,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if !can_advance(registration.state, next) {
        return Err(AppError::InvalidTransition {
            entity: "registration",
            from: registration.state.to_string(),
            to: next.to_string(),
        });
    }

    match next {
        RegistrationState::Accepted => registration.accepted_at = Some(now),
        RegistrationState::Rejected => registration.rejected_at = Some(now),
        RegistrationState::Discontinued => registration.discontinued_at = Some(now),
        RegistrationState::Requested => {}
    }
    registration.state = next;
    Ok(())
}

/// Feedback may only be left on an ACCEPTED registration.
pub fn new_feedback(
    registration: &Registration,
    score: i16,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<Feedback, AppError> {
    if registration.state != RegistrationState::Accepted {
        return Err(AppError::conflict(
            "feedback requires an accepted registration",
        ));
    }
    Ok(Feedback {
        id: Uuid::new_v4(),
        score,
        comment,
        given_at: now,
    })
}

/// Mean of every feedback score on the course, 0.0 when there is none.
pub fn average_rating(course: &Course) -> f64 {
    let (sum, count) = course
        .registrations
        .iter()
        .flat_map(|r| r.feedback.iter())
        .fold((0i64, 0u32), |(sum, count), f| {
            (sum + i64::from(f.score), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum as f64 / f64::from(count)
    }
}
