use std::sync::Arc;

use atelier_core::prelude::*;
use atelier_core::testing::test_config;
use atelier_core::workflow::store::DbSubmissionStore;

fn actor(id: &str, roles: Vec<Role>) -> Actor {
    Actor::new(id, id, format!("{id}@example.com"), roles)
}

fn article_by(author_id: &str, status: InitialStatus) -> ContentItem {
    let draft = ContentDraft {
        title: "Case study".to_string(),
        body: String::new(),
        category: None,
        tags: vec![],
        attributes: serde_json::json!({}),
    };
    ContentItem::new(ContentType::Article, draft, author_id, status)
}

fn create_article() -> ActionRequest {
    ActionRequest {
        content_type: ContentType::Article,
        action: Action::Create,
        target: None,
        payload: serde_json::json!({ "title": "Case study" }),
    }
}

fn memory_gateway() -> (ApprovalGateway, Arc<InMemorySubmissionStore>) {
    let store = Arc::new(InMemorySubmissionStore::new());
    let gateway = ApprovalGateway::new(Arc::new(Policy::default()), store.clone());
    (gateway, store)
}

async fn queue_one(gateway: &ApprovalGateway) -> String {
    let author = actor("author-1", vec![Role::Author]);
    match gateway.evaluate(&author, create_article()).await.unwrap() {
        Decision::Queued { submission_id } => submission_id,
        Decision::Direct => panic!("author create should be queued"),
    }
}

// ═══ evaluate ═══

#[tokio::test]
async fn test_admin_creates_directly() {
    let (gateway, store) = memory_gateway();
    let admin = actor("admin-1", vec![Role::Admin]);

    let decision = gateway.evaluate(&admin, create_article()).await.unwrap();

    assert_eq!(decision, Decision::Direct);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_editor_delete_is_queued() {
    let (gateway, store) = memory_gateway();
    let editor = actor("editor-1", vec![Role::Editor]);
    let target = article_by("author-9", InitialStatus::Published);
    let target_id = target.id.clone();

    let decision = gateway
        .evaluate(
            &editor,
            ActionRequest {
                content_type: ContentType::Article,
                action: Action::Delete,
                target: Some(target),
                payload: serde_json::json!({}),
            },
        )
        .await
        .unwrap();

    let Decision::Queued { submission_id } = decision else {
        panic!("expected a queued decision");
    };
    let stored = store.get(&submission_id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Pending);
    assert_eq!(stored.action, Action::Delete);
    assert_eq!(stored.target_id.as_deref(), Some(target_id.as_str()));
    assert_eq!(stored.submitter.id, "editor-1");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_viewer_cannot_submit() {
    let (gateway, store) = memory_gateway();
    let viewer = actor("viewer-1", vec![Role::Viewer]);

    let err = gateway.evaluate(&viewer, create_article()).await.unwrap_err();

    assert!(matches!(err, AtelierError::Unauthorized(_)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_author_cannot_queue_changes_to_foreign_item() {
    let (gateway, store) = memory_gateway();
    let author = actor("author-1", vec![Role::Author]);
    let request = ActionRequest {
        content_type: ContentType::Article,
        action: Action::Update,
        target: Some(article_by("author-2", InitialStatus::Published)),
        payload: serde_json::json!({ "title": "Hijacked" }),
    };

    let err = gateway.evaluate(&author, request).await.unwrap_err();

    assert!(matches!(err, AtelierError::Unauthorized(_)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_update_without_target_is_bad_request() {
    let (gateway, _) = memory_gateway();
    let admin = actor("admin-1", vec![Role::Admin]);
    let request = ActionRequest {
        action: Action::Update,
        ..create_article()
    };
    let err = gateway.evaluate(&admin, request).await.unwrap_err();
    assert!(matches!(err, AtelierError::BadRequest(_)));
}

#[tokio::test]
async fn test_type_grant_is_direct_for_its_type_only() {
    let (gateway, _) = memory_gateway();
    let moderator = actor("mod-1", vec![Role::Moderator]);

    let testimonial = ActionRequest {
        content_type: ContentType::Testimonial,
        ..create_article()
    };
    assert_eq!(
        gateway.evaluate(&moderator, testimonial).await.unwrap(),
        Decision::Direct
    );

    // Moderators hold no submit permission, so other types are refused.
    let err = gateway.evaluate(&moderator, create_article()).await.unwrap_err();
    assert!(matches!(err, AtelierError::Unauthorized(_)));
}

#[tokio::test]
async fn test_custom_rule_makes_editor_direct() {
    let mut policy = Policy::default();
    policy
        .approvals
        .set(ContentType::Article, Action::Delete, ["edit_others_content"]);
    let gateway = ApprovalGateway::new(Arc::new(policy), Arc::new(InMemorySubmissionStore::new()));
    let editor = actor("editor-1", vec![Role::Editor]);

    let decision = gateway
        .evaluate(
            &editor,
            ActionRequest {
                content_type: ContentType::Article,
                action: Action::Delete,
                target: Some(article_by("author-9", InitialStatus::Published)),
                payload: serde_json::json!({}),
            },
        )
        .await
        .unwrap();
    assert_eq!(decision, Decision::Direct);
}

// ═══ decide ═══

#[tokio::test]
async fn test_approve_releases_mutation() {
    let (gateway, _) = memory_gateway();
    let id = queue_one(&gateway).await;
    let reviewer = actor("mod-1", vec![Role::Moderator]);

    let decided = gateway
        .decide(&id, ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap();

    assert_eq!(decided.request.status, SubmissionStatus::Approved);
    assert_eq!(decided.request.reviewer_id.as_deref(), Some("mod-1"));
    assert!(decided.request.decided_at.is_some());
    let mutation = decided.pending_mutation.expect("approval carries the mutation");
    assert_eq!(mutation.action, Action::Create);
    assert_eq!(mutation.submitter.id, "author-1");
}

/// Content store whose backing storage is down.
struct UnavailableContentStore;

#[async_trait::async_trait]
impl ContentStore for UnavailableContentStore {
    async fn insert(&self, _item: ContentItem) -> Result<ContentItem, AtelierError> {
        Err(AtelierError::Storage("connection refused".to_string()))
    }

    async fn get(&self, _content_type: ContentType, _id: &str) -> Result<ContentItem, AtelierError> {
        Err(AtelierError::Storage("connection refused".to_string()))
    }

    async fn list(&self, _filter: &ContentFilter) -> Result<Vec<ContentItem>, AtelierError> {
        Err(AtelierError::Storage("connection refused".to_string()))
    }

    async fn replace(
        &self,
        _item: ContentItem,
        _expected: ContentStatus,
    ) -> Result<ContentItem, AtelierError> {
        Err(AtelierError::Storage("connection refused".to_string()))
    }

    async fn delete(&self, _content_type: ContentType, _id: &str) -> Result<(), AtelierError> {
        Err(AtelierError::Storage("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_failed_apply_is_recorded_on_the_approved_request() {
    let (gateway, store) = memory_gateway();
    let id = queue_one(&gateway).await;
    let reviewer = actor("mod-1", vec![Role::Moderator]);
    let resources = ResourceController::new(Arc::new(UnavailableContentStore));

    let decided = gateway
        .decide(&id, ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap();
    let mutation = decided.pending_mutation.unwrap();

    let err = resources
        .apply_approved(&gateway, &id, mutation)
        .await
        .unwrap_err();
    assert!(err.status_code().is_server_error());

    let stored = store.get(&id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Approved);
    assert_eq!(stored.decided_at, decided.request.decided_at);
    // Storage details stay out of the record.
    assert_eq!(stored.apply_error.as_deref(), Some("Storage error"));
}

#[tokio::test]
async fn test_successful_apply_leaves_no_error() {
    let (gateway, store) = memory_gateway();
    let id = queue_one(&gateway).await;
    let reviewer = actor("mod-1", vec![Role::Moderator]);
    let resources = ResourceController::new(Arc::new(InMemoryContentStore::new()));

    let decided = gateway
        .decide(&id, ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap();
    let applied = resources
        .apply_approved(&gateway, &id, decided.pending_mutation.unwrap())
        .await
        .unwrap();

    assert!(matches!(applied, Applied::Created { .. }));
    assert!(store.get(&id).await.unwrap().apply_error.is_none());
}

#[tokio::test]
async fn test_second_decision_fails_and_keeps_first() {
    let (gateway, store) = memory_gateway();
    let id = queue_one(&gateway).await;
    let reviewer = actor("mod-1", vec![Role::Moderator]);

    let first = gateway
        .decide(&id, ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap();
    let err = gateway
        .decide(&id, ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AtelierError::AlreadyDecided(_)));

    let err = gateway
        .decide(&id, ReviewDecision::Reject, &reviewer, Some("changed my mind"))
        .await
        .unwrap_err();
    assert!(matches!(err, AtelierError::AlreadyDecided(_)));

    let stored = store.get(&id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Approved);
    assert_eq!(stored.decided_at, first.request.decided_at);
    assert!(stored.reviewer_note.is_none());
}

#[tokio::test]
async fn test_reject_requires_note() {
    let (gateway, store) = memory_gateway();
    let id = queue_one(&gateway).await;
    let reviewer = actor("mod-1", vec![Role::Moderator]);

    for note in [None, Some(""), Some("   "), Some("\n\t ")] {
        let err = gateway
            .decide(&id, ReviewDecision::Reject, &reviewer, note)
            .await
            .unwrap_err();
        assert!(matches!(err, AtelierError::MissingReason), "note {:?}", note);
    }
    assert_eq!(store.get(&id).await.unwrap().status, SubmissionStatus::Pending);

    let decided = gateway
        .decide(&id, ReviewDecision::Reject, &reviewer, Some("  Off brand. "))
        .await
        .unwrap();
    assert_eq!(decided.request.status, SubmissionStatus::Rejected);
    assert_eq!(decided.request.reviewer_note.as_deref(), Some("Off brand."));
    assert!(decided.pending_mutation.is_none());
}

#[tokio::test]
async fn test_author_cannot_decide() {
    let (gateway, store) = memory_gateway();
    let id = queue_one(&gateway).await;
    let author = actor("author-1", vec![Role::Author]);

    let err = gateway
        .decide(&id, ReviewDecision::Approve, &author, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AtelierError::Unauthorized(_)));
    assert_eq!(store.get(&id).await.unwrap().status, SubmissionStatus::Pending);
}

#[tokio::test]
async fn test_decide_unknown_id_is_not_found() {
    let (gateway, _) = memory_gateway();
    let reviewer = actor("mod-1", vec![Role::Moderator]);
    let err = gateway
        .decide("missing", ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AtelierError::NotFound(_)));
}

#[tokio::test]
async fn test_claimed_request_can_still_be_decided() {
    let (gateway, _) = memory_gateway();
    let id = queue_one(&gateway).await;
    let reviewer = actor("mod-1", vec![Role::Moderator]);

    let claimed = gateway.claim(&id, &reviewer).await.unwrap();
    assert_eq!(claimed.status, SubmissionStatus::InReview);
    assert!(matches!(
        gateway.claim(&id, &reviewer).await.unwrap_err(),
        AtelierError::AlreadyDecided(_)
    ));

    let decided = gateway
        .decide(&id, ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap();
    assert_eq!(decided.request.status, SubmissionStatus::Approved);
}

// ═══ Listing and visibility ═══

#[tokio::test]
async fn test_pending_queue_is_oldest_first() {
    let (gateway, _) = memory_gateway();
    let first = queue_one(&gateway).await;
    let second = queue_one(&gateway).await;
    let third = queue_one(&gateway).await;
    let reviewer = actor("mod-1", vec![Role::Moderator]);
    gateway
        .decide(&second, ReviewDecision::Approve, &reviewer, None)
        .await
        .unwrap();

    let pending = gateway
        .list_pending(&reviewer, &SubmissionFilter::default())
        .await
        .unwrap();
    let ids: Vec<_> = pending.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![first, third]);

    let author = actor("author-1", vec![Role::Author]);
    assert!(gateway
        .list_pending(&author, &SubmissionFilter::default())
        .await
        .is_err());
}

#[tokio::test]
async fn test_get_for_hides_foreign_requests() {
    let (gateway, _) = memory_gateway();
    let id = queue_one(&gateway).await;

    let submitter = actor("author-1", vec![Role::Author]);
    let stranger = actor("author-2", vec![Role::Author]);
    let reviewer = actor("mod-1", vec![Role::Moderator]);

    assert!(gateway.get_for(&submitter, &id).await.is_ok());
    assert!(gateway.get_for(&reviewer, &id).await.is_ok());
    assert!(matches!(
        gateway.get_for(&stranger, &id).await.unwrap_err(),
        AtelierError::NotFound(_)
    ));

    let mine = gateway.mine(&stranger, SubmissionFilter::default()).await.unwrap();
    assert!(mine.is_empty());
}

// ═══ Concurrent decisions ═══

async fn race_once(gateway: ApprovalGateway) {
    let id = queue_one(&gateway).await;
    let approver = actor("mod-1", vec![Role::Moderator]);
    let rejecter = actor("mod-2", vec![Role::Moderator]);

    let a = {
        let gateway = gateway.clone();
        let id = id.clone();
        tokio::spawn(async move {
            gateway
                .decide(&id, ReviewDecision::Approve, &approver, None)
                .await
        })
    };
    let b = {
        let gateway = gateway.clone();
        let id = id.clone();
        tokio::spawn(async move {
            gateway
                .decide(&id, ReviewDecision::Reject, &rejecter, Some("duplicate"))
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(losers.len(), 1);
    assert!(matches!(losers[0], AtelierError::AlreadyDecided(_)));

    let winner = winners[0];
    assert!(matches!(
        winner.request.status,
        SubmissionStatus::Approved | SubmissionStatus::Rejected
    ));
    let reviewer = actor("mod-3", vec![Role::Moderator]);
    let stored = gateway.get_for(&reviewer, &id).await.unwrap();
    assert_eq!(stored.status, winner.request.status);
    assert_eq!(stored.reviewer_id, winner.request.reviewer_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_decisions_in_memory() {
    let (gateway, _) = memory_gateway();
    for _ in 0..25 {
        race_once(gateway.clone()).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_decisions_in_database() {
    let db = atelier_core::db::connect(&test_config()).await.unwrap();
    atelier_core::app::run_migrations(&db).await.unwrap();
    let gateway = ApprovalGateway::new(
        Arc::new(Policy::default()),
        Arc::new(DbSubmissionStore::new(db)),
    );
    for _ in 0..10 {
        race_once(gateway.clone()).await;
    }
}
