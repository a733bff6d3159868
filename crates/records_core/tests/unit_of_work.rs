mod common;

use common::{open_conn, review_row_count, seed_employee};
use records_core::{
    RepoError, RepoResult, ReviewRepository, ReviewValidationError, SqliteReviewRepository,
};
use rusqlite::Connection;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

fn ready_repo(conn: &Connection) -> SqliteReviewRepository<'_> {
    let repo = SqliteReviewRepository::try_new(conn).unwrap();
    repo.create_table().unwrap();
    repo
}

#[test]
fn committed_unit_keeps_rows_and_cache() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Ira");
    let repo = ready_repo(&conn);

    let (first, second) = repo
        .unit_of_work(|repo| {
            let first = repo.create(2022, "first", employee)?;
            let second = repo.create(2023, "second", employee)?;
            Ok((first, second))
        })
        .unwrap();

    assert_eq!(review_row_count(&conn), 2);
    assert!(Rc::ptr_eq(
        &first,
        &repo.find_by_id(first.borrow().id().unwrap()).unwrap().unwrap()
    ));
    assert!(repo.is_cached(second.borrow().id().unwrap()));
}

#[test]
fn failed_unit_rolls_back_rows_and_identity_map() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Eli");
    let repo = ready_repo(&conn);
    let kept = repo.create(2021, "kept", employee).unwrap();
    let kept_id = kept.borrow().id().unwrap();

    let staged = repo.new_review(2022, "staged", employee).unwrap();
    let err = repo
        .unit_of_work(|repo| {
            repo.save(&staged)?;
            repo.delete(&kept)?;
            repo.create(1999, "too early", employee)
        })
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::YearOutOfRange { year: 1999 })
    ));
    assert_eq!(staged.borrow().id(), None);
    assert_eq!(kept.borrow().id(), Some(kept_id));
    assert_eq!(repo.cached_ids(), vec![kept_id]);
    assert_eq!(review_row_count(&conn), 1);
    assert!(Rc::ptr_eq(&kept, &repo.find_by_id(kept_id).unwrap().unwrap()));
}

#[test]
fn nested_unit_is_rejected() {
    let conn = open_conn();
    let repo = ready_repo(&conn);

    let err = repo
        .unit_of_work(|repo| repo.unit_of_work(|_| Ok(())))
        .unwrap_err();
    assert!(matches!(err, RepoError::UnitOfWorkActive));

    repo.unit_of_work(|_| Ok(())).unwrap();
}

#[test]
fn writes_outside_a_unit_auto_commit() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Ren");
    let repo = ready_repo(&conn);

    repo.create(2023, "auto", employee).unwrap();
    assert!(conn.is_autocommit());
    assert_eq!(review_row_count(&conn), 1);
}

#[test]
fn sessions_keep_separate_identity_maps() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Tao");
    let first_session = ready_repo(&conn);
    let created = first_session.create(2023, "shared row", employee).unwrap();
    let id = created.borrow().id().unwrap();

    let second_session = SqliteReviewRepository::try_new(&conn).unwrap();
    let loaded = second_session.find_by_id(id).unwrap().unwrap();

    assert!(!Rc::ptr_eq(&created, &loaded));
    assert_eq!(*created.borrow(), *loaded.borrow());

    first_session.reset_session();
    assert!(first_session.cached_ids().is_empty());
    assert!(second_session.is_cached(id));
}

#[test]
fn panicking_unit_rolls_back_and_frees_the_session() {
    let conn = open_conn();
    let employee = seed_employee(&conn, "Pia");
    let repo = ready_repo(&conn);
    let staged = repo.new_review(2023, "never committed", employee).unwrap();

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        repo.unit_of_work(|repo| -> RepoResult<()> {
            repo.save(&staged)?;
            panic!("work failed mid-unit");
        })
    }));
    assert!(outcome.is_err());

    assert_eq!(staged.borrow().id(), None);
    assert!(repo.cached_ids().is_empty());
    assert_eq!(review_row_count(&conn), 0);
    assert!(conn.is_autocommit());

    let created = repo
        .unit_of_work(|repo| repo.create(2024, "after panic", employee))
        .unwrap();
    assert_eq!(created.borrow().id(), Some(1));
}
