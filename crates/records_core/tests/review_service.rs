mod common;

use common::{open_conn, seed_employee};
use records_core::{
    RepoError, ReviewRepository, ReviewRevision, ReviewService, ReviewValidationError,
    SqliteReviewRepository,
};
use std::rc::Rc;

#[test]
fn service_records_and_lists_reviews() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Ana");
    let repo = SqliteReviewRepository::try_new(&conn).unwrap();
    repo.create_table().unwrap();
    let service = ReviewService::new(repo);

    let recorded = service.record_review(2023, "Great performance", employee).unwrap();
    let id = recorded.borrow().id().unwrap();

    let fetched = service.get_review(id).unwrap().unwrap();
    assert!(Rc::ptr_eq(&recorded, &fetched));
    assert_eq!(service.list_reviews().unwrap().len(), 1);
}

#[test]
fn revise_review_applies_partial_changes() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Bo");
    let repo = SqliteReviewRepository::try_new(&conn).unwrap();
    repo.create_table().unwrap();
    let service = ReviewService::new(repo);
    let review = service.record_review(2022, "Good", employee).unwrap();
    let id = review.borrow().id().unwrap();

    let revision = ReviewRevision {
        summary: Some("Outstanding".to_string()),
        ..ReviewRevision::default()
    };
    service.revise_review(id, &revision).unwrap();

    service.repository().reset_session();
    let stored = service.get_review(id).unwrap().unwrap();
    assert_eq!(stored.borrow().year(), 2022);
    assert_eq!(stored.borrow().summary(), "Outstanding");
}

#[test]
fn rejected_revision_leaves_review_untouched() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Cy");
    let repo = SqliteReviewRepository::try_new(&conn).unwrap();
    repo.create_table().unwrap();
    let service = ReviewService::new(repo);
    let review = service.record_review(2022, "Good", employee).unwrap();
    let id = review.borrow().id().unwrap();

    let revision = ReviewRevision {
        year: Some(2025),
        summary: Some(String::new()),
    };
    let err = service.revise_review(id, &revision).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::EmptySummary)
    ));
    assert_eq!(review.borrow().year(), 2022);
    assert_eq!(review.borrow().summary(), "Good");
}

#[test]
fn revise_missing_review_is_not_found() {
    let conn = open_conn();
    let repo = SqliteReviewRepository::try_new(&conn).unwrap();
    repo.create_table().unwrap();
    let service = ReviewService::new(repo);

    let err = service
        .revise_review(8, &ReviewRevision::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(8)));
}

#[test]
fn retract_review_deletes_once() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Di");
    let repo = SqliteReviewRepository::try_new(&conn).unwrap();
    repo.create_table().unwrap();
    let service = ReviewService::new(repo);
    let review = service.record_review(2024, "Promoted", employee).unwrap();
    let id = review.borrow().id().unwrap();

    assert!(service.retract_review(id).unwrap());
    assert!(!service.retract_review(id).unwrap());
    assert_eq!(review.borrow().id(), None);
    assert!(service.get_review(id).unwrap().is_none());
}

#[test]
fn failed_write_restores_previous_values() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Eve");
    let repo = SqliteReviewRepository::try_new(&conn).unwrap();
    repo.create_table().unwrap();
    let service = ReviewService::new(repo);
    let review = service.record_review(2022, "Good", employee).unwrap();
    let id = review.borrow().id().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reviews_frozen BEFORE UPDATE ON reviews
         BEGIN
            SELECT RAISE(ABORT, 'reviews are frozen');
         END;",
    )
    .unwrap();

    let revision = ReviewRevision {
        year: Some(2025),
        summary: Some("Outstanding".to_string()),
    };
    let err = service.revise_review(id, &revision).unwrap_err();

    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(review.borrow().year(), 2022);
    assert_eq!(review.borrow().summary(), "Good");
}
