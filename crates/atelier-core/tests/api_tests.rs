use atelier_core::prelude::*;
use atelier_core::testing::test_config;
use atelier_core::TestApp;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

async fn post_article(app: &TestApp, token: &str, title: &str) -> atelier_core::TestResponse {
    app.client
        .post_with_auth(
            &app.url("/api/content/article"),
            token,
            &json!({ "title": title, "body": "Text", "tags": ["news"] }).to_string(),
        )
        .await
}

// ═══ Service endpoints ═══

#[tokio::test]
async fn test_health_reports_modules() {
    let app = TestApp::new().await;
    let res = app.client.get(&app.url("/health")).await;
    assert_eq!(res.status, 200);
    let data = res.data();
    assert_eq!(data["status"], "ok");
    assert_eq!(data["modules"]["content"], "ok");
    assert_eq!(data["modules"]["submissions"], "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new().await;
    let res = app.client.get(&app.url("/api-docs/openapi.json")).await;
    assert_eq!(res.status, 200);
    let json = res.json();
    assert!(json["paths"].get("/api/content/{type}").is_some());
    assert!(json["paths"].get("/api/submissions/{id}/approve").is_some());
}

#[tokio::test]
async fn test_router_oneshot_health() {
    let app = App::with_config(test_config()).await.unwrap();
    let res = app
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
}

// ═══ Authentication ═══

#[tokio::test]
async fn test_mutation_requires_token() {
    let app = TestApp::new().await;
    let res = app
        .client
        .post(&app.url("/api/content/article"), &json!({ "title": "x" }).to_string())
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.error_code().as_deref(), Some("UNAUTHENTICATED"));
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = TestApp::new().await;
    let res = app
        .client
        .get_with_auth(&app.url("/api/content/article"), "not-a-jwt")
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for("ghost");
    let res = post_article(&app, &token, "Boo").await;
    assert_eq!(res.status, 401);
}

// ═══ Direct and queued creates ═══

#[tokio::test]
async fn test_admin_create_is_published_immediately() {
    let app = TestApp::new().await;
    let (token, admin_id) = app.create_user("Ada", "ada@example.com", &[Role::Admin]).await;

    let res = post_article(&app, &token, "Hello").await;

    assert_eq!(res.status, 201);
    let item = &res.data()["item"];
    assert_eq!(item["status"], "published");
    assert_eq!(item["author_id"], admin_id.as_str());
    assert_eq!(res.data()["queued"], false);

    let listed = app.client.get(&app.url("/api/content/article")).await;
    assert_eq!(listed.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_author_create_waits_for_approval() {
    let app = TestApp::new().await;
    let (author, author_id) = app.create_user("Ana", "ana@example.com", &[Role::Author]).await;
    let (moderator, _) = app.create_user("Mo", "mo@example.com", &[Role::Moderator]).await;

    let res = post_article(&app, &author, "Pitch").await;
    assert_eq!(res.status, 202);
    assert_eq!(res.data()["queued"], true);
    let submission_id = res.data()["submission_id"].as_str().unwrap().to_string();

    // Nothing is public until the approval lands.
    let listed = app.client.get(&app.url("/api/content/article")).await;
    assert!(listed.data().as_array().unwrap().is_empty());

    let queue = app
        .client
        .get_with_auth(&app.url("/api/submissions"), &moderator)
        .await;
    assert_eq!(queue.status, 200);
    assert_eq!(queue.data()[0]["id"], submission_id.as_str());
    assert_eq!(queue.data()[0]["status"], "pending");

    let approved = app
        .client
        .patch_empty_with_auth(
            &app.url(&format!("/api/submissions/{submission_id}/approve")),
            &moderator,
        )
        .await;
    assert_eq!(approved.status, 200);
    let data = approved.data();
    assert_eq!(data["submission"]["status"], "approved");
    assert_eq!(data["applied"]["kind"], "created");
    assert_eq!(data["applied"]["item"]["status"], "published");
    assert_eq!(data["applied"]["item"]["author_id"], author_id.as_str());

    let listed = app.client.get(&app.url("/api/content/article")).await;
    assert_eq!(listed.data()[0]["title"], "Pitch");

    let again = app
        .client
        .patch_empty_with_auth(
            &app.url(&format!("/api/submissions/{submission_id}/approve")),
            &moderator,
        )
        .await;
    assert_eq!(again.status, 409);
    assert_eq!(again.error_code().as_deref(), Some("ALREADY_DECIDED"));
}

#[tokio::test]
async fn test_viewer_cannot_create() {
    let app = TestApp::new().await;
    let (viewer, _) = app.create_user("Vic", "vic@example.com", &[Role::Viewer]).await;
    let res = post_article(&app, &viewer, "Nope").await;
    assert_eq!(res.status, 403);
    assert_eq!(res.error_code().as_deref(), Some("UNAUTHORIZED"));
}

#[tokio::test]
async fn test_invalid_input_is_unprocessable() {
    let app = TestApp::new().await;
    let (token, _) = app.create_user("Ada", "ada@example.com", &[Role::Admin]).await;

    let res = app
        .client
        .post_with_auth(&app.url("/api/content/article"), &token, "{not json")
        .await;
    assert_eq!(res.status, 422);

    let res = post_article(&app, &token, "").await;
    assert_eq!(res.status, 422);
    assert_eq!(res.error_code().as_deref(), Some("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_unknown_content_type_is_bad_request() {
    let app = TestApp::new().await;
    let res = app.client.get(&app.url("/api/content/recipes")).await;
    assert_eq!(res.status, 400);
}

// ═══ Review decisions ═══

#[tokio::test]
async fn test_reject_needs_a_note() {
    let app = TestApp::new().await;
    let (author, _) = app.create_user("Ana", "ana@example.com", &[Role::Author]).await;
    let (moderator, _) = app.create_user("Mo", "mo@example.com", &[Role::Moderator]).await;
    let res = post_article(&app, &author, "Draft pitch").await;
    let id = res.data()["submission_id"].as_str().unwrap().to_string();
    let url = app.url(&format!("/api/submissions/{id}/reject"));

    for body in [json!({}), json!({ "note": "" }), json!({ "note": "   " })] {
        let res = app
            .client
            .patch_with_auth(&url, &moderator, &body.to_string())
            .await;
        assert_eq!(res.status, 422, "body {body}");
        assert_eq!(res.error_code().as_deref(), Some("MISSING_REASON"));
    }

    let res = app
        .client
        .patch_with_auth(&url, &moderator, &json!({ "note": "Off topic" }).to_string())
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["submission"]["status"], "rejected");
    assert_eq!(res.data()["submission"]["reviewer_note"], "Off topic");
    assert!(res.data()["applied"].is_null());

    let mine = app
        .client
        .get_with_auth(&app.url("/api/submissions/mine"), &author)
        .await;
    assert_eq!(mine.data()[0]["status"], "rejected");
}

#[tokio::test]
async fn test_author_cannot_review() {
    let app = TestApp::new().await;
    let (author, _) = app.create_user("Ana", "ana@example.com", &[Role::Author]).await;
    let res = post_article(&app, &author, "Self approval").await;
    let id = res.data()["submission_id"].as_str().unwrap().to_string();

    let res = app
        .client
        .patch_empty_with_auth(&app.url(&format!("/api/submissions/{id}/approve")), &author)
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .client
        .get_with_auth(&app.url("/api/submissions"), &author)
        .await;
    assert_eq!(res.status, 403);

    // The submitter can still read their own request.
    let res = app
        .client
        .get_with_auth(&app.url(&format!("/api/submissions/{id}")), &author)
        .await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn test_editor_delete_is_queued_then_applied() {
    let app = TestApp::new().await;
    let (admin, _) = app.create_user("Ada", "ada@example.com", &[Role::Admin]).await;
    let (editor, _) = app.create_user("Eli", "eli@example.com", &[Role::Editor]).await;
    let created = post_article(&app, &admin, "Old news").await;
    let item_id = created.data()["item"]["id"].as_str().unwrap().to_string();
    let item_url = app.url(&format!("/api/content/article/{item_id}"));

    let res = app.client.delete_with_auth(&item_url, &editor).await;
    assert_eq!(res.status, 202);
    let submission_id = res.data()["submission_id"].as_str().unwrap().to_string();
    assert_eq!(app.client.get(&item_url).await.status, 200);

    let res = app
        .client
        .patch_with_auth(
            &app.url(&format!("/api/submissions/{submission_id}/approve")),
            &admin,
            &json!({ "note": "ok" }).to_string(),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["applied"]["kind"], "deleted");
    assert_eq!(app.client.get(&item_url).await.status, 404);
}

#[tokio::test]
async fn test_stale_approval_reports_apply_error() {
    let app = TestApp::new().await;
    let (admin, _) = app.create_user("Ada", "ada@example.com", &[Role::Admin]).await;
    let (editor, _) = app.create_user("Eli", "eli@example.com", &[Role::Editor]).await;
    let created = post_article(&app, &admin, "Short lived").await;
    let item_id = created.data()["item"]["id"].as_str().unwrap().to_string();
    let item_url = app.url(&format!("/api/content/article/{item_id}"));

    let queued = app
        .client
        .put_with_auth(&item_url, &editor, &json!({ "title": "Better title" }).to_string())
        .await;
    assert_eq!(queued.status, 202);
    let submission_id = queued.data()["submission_id"].as_str().unwrap().to_string();

    assert_eq!(app.client.delete_with_auth(&item_url, &admin).await.status, 200);

    let res = app
        .client
        .patch_empty_with_auth(
            &app.url(&format!("/api/submissions/{submission_id}/approve")),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["submission"]["status"], "approved");
    assert!(res.data()["applied"].is_null());
    assert!(res.data()["apply_error"].as_str().is_some());

    let stored = app
        .client
        .get_with_auth(&app.url(&format!("/api/submissions/{submission_id}")), &admin)
        .await;
    assert_eq!(stored.status, 200);
    assert_eq!(stored.data()["status"], "approved");
    assert_eq!(stored.data()["apply_error"], res.data()["apply_error"]);
}

// ═══ Drafts and transitions ═══

#[tokio::test]
async fn test_draft_workflow_over_http() {
    let app = TestApp::new().await;
    let (author, _) = app.create_user("Ana", "ana@example.com", &[Role::Author]).await;
    let (moderator, _) = app.create_user("Mo", "mo@example.com", &[Role::Moderator]).await;

    let res = app
        .client
        .post_with_auth(
            &app.url("/api/content/article/drafts"),
            &author,
            &json!({ "title": "Work in progress" }).to_string(),
        )
        .await;
    assert_eq!(res.status, 201);
    assert_eq!(res.data()["status"], "draft");
    let id = res.data()["id"].as_str().unwrap().to_string();
    let item_url = app.url(&format!("/api/content/article/{id}"));
    let transitions = app.url(&format!("/api/content/article/{id}/transitions"));

    // Drafts are private to their author and reviewers.
    assert_eq!(app.client.get(&item_url).await.status, 404);
    assert_eq!(app.client.get_with_auth(&item_url, &author).await.status, 200);

    // Authors edit their own drafts without review.
    let res = app
        .client
        .put_with_auth(&item_url, &author, &json!({ "title": "Ready" }).to_string())
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["item"]["title"], "Ready");

    let res = app
        .client
        .post_with_auth(&transitions, &author, &json!({ "to": "pending_approval" }).to_string())
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["status"], "pending_approval");

    let res = app
        .client
        .post_with_auth(&transitions, &author, &json!({ "to": "published" }).to_string())
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .client
        .post_with_auth(&transitions, &moderator, &json!({ "to": "rejected" }).to_string())
        .await;
    assert_eq!(res.status, 422);

    let res = app
        .client
        .post_with_auth(&transitions, &moderator, &json!({ "to": "published" }).to_string())
        .await;
    assert_eq!(res.status, 200);

    let res = app
        .client
        .post_with_auth(&transitions, &moderator, &json!({ "to": "draft" }).to_string())
        .await;
    assert_eq!(res.status, 409);
    assert_eq!(res.error_code().as_deref(), Some("INVALID_TRANSITION"));

    let history = app
        .client
        .get(&app.url(&format!("/api/content/article/{id}/history")))
        .await;
    assert_eq!(history.status, 200);
    let entries = history.data();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[1]["to"], "published");
}

#[tokio::test]
async fn test_author_edit_of_published_item_is_queued() {
    let app = TestApp::new().await;
    let (admin, _) = app.create_user("Ada", "ada@example.com", &[Role::Admin]).await;
    let (author, author_id) = app.create_user("Ana", "ana@example.com", &[Role::Author]).await;

    // Publish an item on the author's behalf through the approval path.
    let queued = post_article(&app, &author, "Live piece").await;
    let submission_id = queued.data()["submission_id"].as_str().unwrap().to_string();
    let approved = app
        .client
        .patch_empty_with_auth(
            &app.url(&format!("/api/submissions/{submission_id}/approve")),
            &admin,
        )
        .await;
    let item_id = approved.data()["applied"]["item"]["id"].as_str().unwrap().to_string();
    assert_eq!(approved.data()["applied"]["item"]["author_id"], author_id.as_str());

    let res = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/content/article/{item_id}")),
            &author,
            &json!({ "body": "Revised" }).to_string(),
        )
        .await;
    assert_eq!(res.status, 202);
    assert_eq!(res.data()["queued"], true);
}

#[tokio::test]
async fn test_listing_visibility() {
    let app = TestApp::new().await;
    let (admin, _) = app.create_user("Ada", "ada@example.com", &[Role::Admin]).await;
    let (author, _) = app.create_user("Ana", "ana@example.com", &[Role::Author]).await;

    post_article(&app, &admin, "Public").await;
    app.client
        .post_with_auth(
            &app.url("/api/content/article/drafts"),
            &author,
            &json!({ "title": "Mine" }).to_string(),
        )
        .await;
    app.client
        .post_with_auth(
            &app.url("/api/content/article/drafts"),
            &admin,
            &json!({ "title": "Admin draft" }).to_string(),
        )
        .await;

    let anonymous = app
        .client
        .get(&app.url("/api/content/article?status=draft"))
        .await;
    let titles: Vec<_> = anonymous.data().as_array().unwrap().iter().map(|i| i["title"].clone()).collect();
    assert_eq!(titles, vec![json!("Public")]);

    let own = app
        .client
        .get_with_auth(&app.url("/api/content/article?status=draft"), &author)
        .await;
    let titles: Vec<_> = own.data().as_array().unwrap().iter().map(|i| i["title"].clone()).collect();
    assert_eq!(titles, vec![json!("Mine")]);

    let editorial = app
        .client
        .get_with_auth(&app.url("/api/content/article?status=draft"), &admin)
        .await;
    assert_eq!(editorial.data().as_array().unwrap().len(), 2);
}
