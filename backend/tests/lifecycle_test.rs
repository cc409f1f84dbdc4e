mod common;

use chrono::{Duration, Utc};

use cleanvit::db::requests;
use cleanvit::models::{NewCleaningRequest, RequestStatus};
use cleanvit::services::{ErrorKind, LifecycleError, LifecyclePolicy, RequestLifecycle};

fn lifecycle(pool: &sqlx::SqlitePool) -> RequestLifecycle {
    RequestLifecycle::new(pool.clone(), LifecyclePolicy::default())
}

#[tokio::test]
async fn test_create_starts_pending_with_secret() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;

    let created = lc
        .create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();

    let stored = requests::find_request_by_id(&pool, &created.request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert!(stored.cleaner_id.is_none());
    assert!(stored.accepted_at.is_none());
    assert_eq!(stored.completion_secret.len(), 32);
    assert_eq!(stored.completion_secret, created.completion_secret);
    assert_eq!(stored.kind, "room_cleaning");
    assert_eq!(stored.block, "A");
}

#[tokio::test]
async fn test_create_rejects_second_active_and_foreign_group() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;
    let (other, _) = common::student(&pool, "b@vitstudent.ac.in", "A", "102").await;
    let (_, roommate) = common::student(&pool, "c@vitstudent.ac.in", "A", "101").await;
    let (_, cleaner) = common::cleaner(&pool, "EMP1", &["A"]).await;

    lc.create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();

    let dup = lc
        .create_request(&roommate, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await;
    assert!(matches!(dup, Err(LifecycleError::DuplicateActive)));

    let foreign = lc
        .create_request(&actor, &other.group_id, NewCleaningRequest::default(), Utc::now())
        .await;
    assert!(matches!(foreign, Err(LifecycleError::Unauthorized)));

    let by_cleaner = lc
        .create_request(&cleaner, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await;
    assert!(matches!(by_cleaner, Err(LifecycleError::Unauthorized)));
}

#[tokio::test]
async fn test_concurrent_accept_has_one_winner() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "B", "201").await;
    let (_, first) = common::cleaner(&pool, "EMP1", &["B"]).await;
    let (_, second) = common::cleaner(&pool, "EMP2", &["B"]).await;

    let created = lc
        .create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();
    let id = created.request.id.clone();

    let (a, b) = tokio::join!(
        lc.accept_request(&first, &id, Utc::now()),
        lc.accept_request(&second, &id, Utc::now()),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);
    let loser = if a.is_ok() { b } else { a };
    let err = loser.unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyAccepted));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_accept_outside_blocks_is_rejected() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;
    let (_, cleaner) = common::cleaner(&pool, "EMP1", &["C"]).await;

    let created = lc
        .create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();

    let result = lc.accept_request(&cleaner, &created.request.id, Utc::now()).await;
    assert!(matches!(result, Err(LifecycleError::ScopeMismatch)));

    let missing = lc.accept_request(&cleaner, "no-such-id", Utc::now()).await;
    assert!(matches!(missing, Err(LifecycleError::NotFound)));

    let by_student = lc.accept_request(&actor, &created.request.id, Utc::now()).await;
    assert!(matches!(by_student, Err(LifecycleError::Unauthorized)));
}

#[tokio::test]
async fn test_wrong_secret_changes_nothing() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;
    let (_, cleaner) = common::cleaner(&pool, "EMP1", &["A"]).await;

    let created = lc
        .create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();
    lc.accept_request(&cleaner, &created.request.id, Utc::now())
        .await
        .unwrap();
    let before = requests::find_request_by_id(&pool, &created.request.id)
        .await
        .unwrap()
        .unwrap();

    let wrong = lc
        .complete_request(&cleaner, &created.request.id, "not-the-code", Utc::now())
        .await;
    assert!(matches!(wrong, Err(LifecycleError::SecretMismatch)));

    let after = requests::find_request_by_id(&pool, &created.request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, RequestStatus::InProgress);
    assert_eq!(after.cleaner_id, before.cleaner_id);
    assert_eq!(after.accepted_at, before.accepted_at);
    assert!(after.completed_at.is_none());

    let done = lc
        .complete_request(&cleaner, &created.request.id, &created.completion_secret, Utc::now())
        .await
        .unwrap();
    assert_eq!(done.status, RequestStatus::Completed);
    assert!(done.completed_at.is_some());

    let twice = lc
        .complete_request(&cleaner, &created.request.id, &created.completion_secret, Utc::now())
        .await;
    assert!(matches!(twice, Err(LifecycleError::NotInProgress)));
}

#[tokio::test]
async fn test_rate_guards() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;
    let (_, outsider) = common::student(&pool, "z@vitstudent.ac.in", "D", "404").await;
    let (_, cleaner) = common::cleaner(&pool, "EMP1", &["A"]).await;

    let created = lc
        .create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();
    let id = created.request.id.clone();

    let pending = lc.rate_request(&actor, &id, 5, None).await;
    assert!(matches!(pending, Err(LifecycleError::NotCompleted)));

    lc.accept_request(&cleaner, &id, Utc::now()).await.unwrap();
    let in_progress = lc.rate_request(&actor, &id, 5, None).await.unwrap_err();
    assert!(matches!(in_progress, LifecycleError::NotCompleted));
    assert_eq!(in_progress.kind(), ErrorKind::InvalidState);

    lc.complete_request(&cleaner, &id, &created.completion_secret, Utc::now())
        .await
        .unwrap();

    let out_of_range = lc.rate_request(&actor, &id, 6, None).await;
    assert!(matches!(out_of_range, Err(LifecycleError::Validation(_))));

    let not_owner = lc.rate_request(&outsider, &id, 3, None).await;
    assert!(matches!(not_owner, Err(LifecycleError::NotOwner)));

    let rated = lc
        .rate_request(&actor, &id, 4, Some("  spotless ".to_string()))
        .await
        .unwrap();
    assert_eq!(rated.rating, Some(4));
    assert_eq!(rated.feedback.as_deref(), Some("spotless"));

    let again = lc.rate_request(&actor, &id, 1, None).await;
    assert!(matches!(again, Err(LifecycleError::AlreadyRated)));
}

#[tokio::test]
async fn test_timeout_revert_single_request() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;
    let (_, cleaner) = common::cleaner(&pool, "EMP1", &["A"]).await;

    let t = Utc::now();
    let created = lc
        .create_request(&actor, &student.group_id, NewCleaningRequest::default(), t)
        .await
        .unwrap();
    let id = created.request.id.clone();

    let pending = lc.timeout_revert(&id, t).await;
    assert!(matches!(pending, Err(LifecycleError::NotInProgress)));

    lc.accept_request(&cleaner, &id, t).await.unwrap();

    let early = lc.timeout_revert(&id, t + Duration::hours(3)).await;
    assert!(matches!(early, Err(LifecycleError::NotStale)));

    let reverted = lc
        .timeout_revert(&id, t + Duration::hours(3) + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(reverted.status, RequestStatus::Pending);
    assert!(reverted.cleaner_id.is_none());
    assert!(reverted.accepted_at.is_none());
}

#[tokio::test]
async fn test_history_is_completed_only_newest_first() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;
    let (other, other_actor) = common::student(&pool, "b@vitstudent.ac.in", "A", "102").await;
    let (_, cleaner) = common::cleaner(&pool, "EMP1", &["A"]).await;

    let base = Utc::now() - Duration::days(1);
    let mut codes = Vec::new();
    for i in 0..3 {
        let at = base + Duration::hours(i);
        let created = lc
            .create_request(&actor, &student.group_id, NewCleaningRequest::default(), at)
            .await
            .unwrap();
        lc.accept_request(&cleaner, &created.request.id, at).await.unwrap();
        lc.complete_request(
            &cleaner,
            &created.request.id,
            &created.completion_secret,
            at + Duration::minutes(30),
        )
        .await
        .unwrap();
        codes.push(created.request.request_code);
    }

    // open request in the same group and a completed one elsewhere
    lc.create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();
    let elsewhere = lc
        .create_request(&other_actor, &other.group_id, NewCleaningRequest::default(), base)
        .await
        .unwrap();
    lc.accept_request(&cleaner, &elsewhere.request.id, base).await.unwrap();
    lc.complete_request(&cleaner, &elsewhere.request.id, &elsewhere.completion_secret, base)
        .await
        .unwrap();

    let history = lc.list_history_for_group(&student.group_id, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].request_code, codes[2]);
    assert_eq!(history[1].request_code, codes[1]);
    assert!(history.iter().all(|r| r.status == RequestStatus::Completed));
    assert!(history.iter().all(|r| r.group_id == student.group_id));

    let clamped = lc.list_history_for_group(&student.group_id, 1000).await.unwrap();
    assert_eq!(clamped.len(), 3);
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "Q", "12").await;
    let (cleaner, cleaner_actor) = common::cleaner(&pool, "EMP9", &["Q"]).await;

    let created = lc
        .create_request(
            &actor,
            &student.group_id,
            NewCleaningRequest {
                kind: Some("bathroom".to_string()),
                instructions: Some("please mop".to_string()),
            },
            Utc::now(),
        )
        .await
        .unwrap();
    let id = created.request.id.clone();

    let pending = lc.list_pending_for_block("Q").await.unwrap();
    assert!(pending.iter().any(|r| r.id == id));

    lc.accept_request(&cleaner_actor, &id, Utc::now()).await.unwrap();

    let pending = lc.list_pending_for_block("Q").await.unwrap();
    assert!(pending.iter().all(|r| r.id != id));
    let active = lc.list_active_for_cleaner(&cleaner.id, Utc::now()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, id);
    assert_eq!(active[0].status, RequestStatus::InProgress);

    let wrong = lc
        .complete_request(&cleaner_actor, &id, "guess", Utc::now())
        .await;
    assert!(matches!(wrong, Err(LifecycleError::SecretMismatch)));
    let unchanged = requests::find_request_by_id(&pool, &id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, RequestStatus::InProgress);

    lc.complete_request(&cleaner_actor, &id, &created.completion_secret, Utc::now())
        .await
        .unwrap();

    let history = lc.list_history_for_group(&student.group_id, 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, id);
    assert_eq!(history[0].kind, "bathroom");

    let active = lc.list_active_for_cleaner(&cleaner.id, Utc::now()).await.unwrap();
    assert!(active.is_empty());
    assert!(lc.active_for_group(&actor).await.unwrap().is_none());
}

#[tokio::test]
async fn test_history_honours_zero_and_rejects_negative_limit() {
    let pool = common::setup_db().await;
    let lc = lifecycle(&pool);
    let (student, actor) = common::student(&pool, "a@vitstudent.ac.in", "A", "101").await;
    let (_, cleaner) = common::cleaner(&pool, "EMP1", &["A"]).await;

    let created = lc
        .create_request(&actor, &student.group_id, NewCleaningRequest::default(), Utc::now())
        .await
        .unwrap();
    lc.accept_request(&cleaner, &created.request.id, Utc::now())
        .await
        .unwrap();
    lc.complete_request(&cleaner, &created.request.id, &created.completion_secret, Utc::now())
        .await
        .unwrap();

    let none = lc.list_history_for_group(&student.group_id, 0).await.unwrap();
    assert!(none.is_empty());

    let negative = lc.list_history_for_group(&student.group_id, -1).await;
    assert!(matches!(negative, Err(LifecycleError::Validation(_))));

    let one = lc.list_history_for_group(&student.group_id, 1).await.unwrap();
    assert_eq!(one.len(), 1);
}
