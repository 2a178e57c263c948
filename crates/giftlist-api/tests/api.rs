//! End-to-end tests of the HTTP surface against an in-memory database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use giftlist_api::{AppStateInner, router};
use giftlist_db::Database;

struct TestApp {
    router: Router,
}

struct Reply {
    status: StatusCode,
    body: Value,
    session: Option<String>,
    headers: axum::http::HeaderMap,
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let state = Arc::new(AppStateInner::new(db));
        Self { router: router(state) }
    }

    async fn request(&self, method: &str, uri: &str, session: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, session);
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> Reply {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let session = headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, body, session, headers }
    }

    async fn register(&self, username: &str) -> (String, Value) {
        let reply = self
            .request(
                "POST",
                "/api/register",
                None,
                Some(json!({ "username": username, "password": "tajnehaslo" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        (reply.session.expect("session cookie"), reply.body)
    }

    async fn add_recipient(&self, session: &str, name: &str) -> i64 {
        let reply = self
            .request("POST", "/api/recipients", Some(session), Some(json!({ "name": name })))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.body["id"].as_i64().unwrap()
    }

    async fn add_present(&self, session: &str, recipient_id: i64, title: &str) -> i64 {
        let reply = self
            .request(
                "POST",
                "/api/presents",
                Some(session),
                Some(json!({ "title": title, "recipient_id": recipient_id })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = TestApp::new();

    let reply = app.request("GET", "/api/recipients", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Musisz być zalogowany");

    let reply = app
        .request("GET", "/api/recipients", Some("giftlist_session=forged"), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.request("GET", "/api/version", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], "giftlist");
}

#[tokio::test]
async fn register_login_logout_cycle() {
    let app = TestApp::new();
    let (session, body) = app.register("anna").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "anna");

    let reply = app.request("GET", "/api/auth", Some(&session), None).await;
    assert_eq!(reply.body["authenticated"], true);
    assert_eq!(reply.body["user"]["username"], "anna");

    let dup = app
        .request("POST", "/api/register", None, Some(json!({ "username": "Anna", "password": "tajnehaslo" })))
        .await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let short = app
        .request("POST", "/api/register", None, Some(json!({ "username": "ab", "password": "tajnehaslo" })))
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let wrong = app
        .request("POST", "/api/login", None, Some(json!({ "username": "anna", "password": "zlehaslo1" })))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let login = app
        .request("POST", "/api/login", None, Some(json!({ "username": "anna", "password": "tajnehaslo" })))
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let second = login.session.unwrap();

    let out = app.request("POST", "/api/logout", Some(&session), None).await;
    assert_eq!(out.status, StatusCode::OK);

    let reply = app.request("GET", "/api/auth", Some(&session), None).await;
    assert_eq!(reply.body["authenticated"], false);
    let reply = app.request("GET", "/api/recipients", Some(&second), None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_recipient_name_conflicts() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    app.add_recipient(&session, "Ola").await;

    let reply = app
        .request("POST", "/api/recipients", Some(&session), Some(json!({ "name": "ola" })))
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let list = app.request("GET", "/api/recipients", Some(&session), None).await;
    assert_eq!(list.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn identification_is_exclusive() {
    let app = TestApp::new();
    let (anna, _) = app.register("anna").await;
    let (marek, _) = app.register("marek").await;
    let ola = app.add_recipient(&anna, "Ola").await;
    let uri = format!("/api/recipients/{ola}/identify");

    let first = app.request("POST", &uri, Some(&anna), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["is_me"], true);

    let again = app.request("POST", &uri, Some(&anna), None).await;
    assert_eq!(again.status, StatusCode::OK);

    let other = app.request("POST", &uri, Some(&marek), None).await;
    assert_eq!(other.status, StatusCode::CONFLICT);

    let release = app.request("DELETE", &uri, Some(&marek), None).await;
    assert_eq!(release.status, StatusCode::FORBIDDEN);

    let rename = app
        .request("PUT", &format!("/api/recipients/{ola}"), Some(&marek), Some(json!({ "name": "Olka" })))
        .await;
    assert_eq!(rename.status, StatusCode::FORBIDDEN);

    let release = app.request("DELETE", &uri, Some(&anna), None).await;
    assert_eq!(release.status, StatusCode::OK);
    assert_eq!(release.body["identified_by"], Value::Null);

    let missing = app.request("POST", "/api/recipients/999/identify", Some(&marek), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn check_toggles_and_is_listed() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    let ola = app.add_recipient(&session, "Ola").await;
    let gift = app.add_present(&session, ola, "Rower").await;
    let uri = format!("/api/presents/{gift}/check");

    let reply = app.request("PUT", &uri, Some(&session), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["is_checked"], true);

    let list = app.request("GET", "/api/presents", Some(&session), None).await;
    assert_eq!(list.body[0]["is_checked"], true);

    let reply = app.request("PUT", &uri, Some(&session), None).await;
    assert_eq!(reply.body["is_checked"], false);

    let reply = app
        .request("PUT", &uri, Some(&session), Some(json!({ "is_checked": true })))
        .await;
    assert_eq!(reply.body["is_checked"], true);
    let reply = app
        .request("PUT", &uri, Some(&session), Some(json!({ "is_checked": true })))
        .await;
    assert_eq!(reply.body["is_checked"], true);
}

#[tokio::test]
async fn deleting_recipient_removes_presents() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    let ola = app.add_recipient(&session, "Ola").await;
    let ela = app.add_recipient(&session, "Ela").await;
    app.add_present(&session, ola, "Rower").await;
    app.add_present(&session, ela, "Lalka").await;

    let reply = app
        .request("DELETE", &format!("/api/recipients/{ola}"), Some(&session), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let list = app.request("GET", "/api/recipients", Some(&session), None).await;
    let names: Vec<&str> = list.body.as_array().unwrap().iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ela"]);

    let presents = app.request("GET", "/api/presents", Some(&session), None).await;
    let titles: Vec<&str> = presents.body.as_array().unwrap().iter().map(|p| p["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Lalka"]);

    let again = app
        .request("DELETE", &format!("/api/recipients/{ola}"), Some(&session), None)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn updates_since_returns_newer_entries_in_order() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    let ola = app.add_recipient(&session, "Ola").await;

    let head = app.request("GET", "/api/updates", Some(&session), None).await;
    assert_eq!(head.body["hasUpdates"], false);
    let cursor = head.body["timestamp"].as_i64().unwrap();
    assert!(cursor > 0);

    let gift = app.add_present(&session, ola, "Rower").await;
    app.request("POST", &format!("/api/presents/{gift}/reserve"), Some(&session), None).await;

    let reply = app
        .request("GET", &format!("/api/updates?since={cursor}"), Some(&session), None)
        .await;
    assert_eq!(reply.body["hasUpdates"], true);
    let updates = reply.body["updates"].as_array().unwrap();
    let kinds: Vec<&str> = updates.iter().map(|u| u["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["present_added", "present_reserved"]);
    assert_eq!(updates[0]["payload"]["presentTitle"], "Rower");
    assert_eq!(updates[0]["payload"]["recipientName"], "Ola");
    assert!(updates[0]["createdAt"].as_i64().unwrap() > cursor);

    let next = reply.body["timestamp"].as_i64().unwrap();
    assert_eq!(next, updates[1]["createdAt"].as_i64().unwrap());

    let idle = app
        .request("GET", &format!("/api/updates?since={next}"), Some(&session), None)
        .await;
    assert_eq!(idle.body["hasUpdates"], false);
    assert_eq!(idle.body["timestamp"].as_i64().unwrap(), next);
}

#[tokio::test]
async fn concurrent_reservations_have_one_winner() {
    let app = TestApp::new();
    let (anna, _) = app.register("anna").await;
    let (marek, _) = app.register("marek").await;
    let ola = app.add_recipient(&anna, "Ola").await;
    let gift = app.add_present(&anna, ola, "Rower").await;
    let uri = format!("/api/presents/{gift}/reserve");

    let (a, b) = tokio::join!(
        app.request("POST", &uri, Some(&anna), None),
        app.request("POST", &uri, Some(&marek), None),
    );

    let mut statuses = vec![a.status, b.status];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let loser = if a.status == StatusCode::OK { &marek } else { &anna };
    let cancel = app.request("DELETE", &uri, Some(loser), None).await;
    assert_eq!(cancel.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn identified_user_sees_counts_but_not_gifts() {
    let app = TestApp::new();
    let (marek, _) = app.register("Marek").await;
    let anna_recipient = app.add_recipient(&marek, "Anna").await;

    let (anna, body) = app.register("Anna").await;
    assert_eq!(body["user"]["identified_recipient_id"], anna_recipient);

    let gift = app.add_present(&marek, anna_recipient, "Książka").await;

    let seen_by_marek = app.request("GET", "/api/presents", Some(&marek), None).await;
    let presents = seen_by_marek.body.as_array().unwrap();
    assert_eq!(presents.len(), 1);
    assert_eq!(presents[0]["id"], gift);
    assert_eq!(presents[0]["reserved_by"], Value::Null);

    let seen_by_anna = app.request("GET", "/api/presents", Some(&anna), None).await;
    assert!(seen_by_anna.body.as_array().unwrap().is_empty());
    let all_for_anna = app.request("GET", "/api/presents/all", Some(&anna), None).await;
    assert!(all_for_anna.body.as_array().unwrap().is_empty());

    let recipients = app.request("GET", "/api/recipients", Some(&anna), None).await;
    let me = &recipients.body[0];
    assert_eq!(me["is_me"], true);
    assert_eq!(me["present_count"], 1);

    // The feed does not spoil the surprise either.
    let feed = app.request("GET", "/api/updates?since=0", Some(&anna), None).await;
    let kinds: Vec<&str> = feed.body["updates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["type"].as_str().unwrap())
        .collect();
    assert!(!kinds.contains(&"present_added"));
    assert!(kinds.contains(&"recipient_identified"));
}

#[tokio::test]
async fn only_the_author_edits_a_present() {
    let app = TestApp::new();
    let (anna, _) = app.register("anna").await;
    let (marek, _) = app.register("marek").await;
    let ola = app.add_recipient(&anna, "Ola").await;
    let gift = app.add_present(&anna, ola, "Rower").await;
    let uri = format!("/api/presents/{gift}");

    let edit = app
        .request("PUT", &uri, Some(&marek), Some(json!({ "title": "Hulajnoga" })))
        .await;
    assert_eq!(edit.status, StatusCode::FORBIDDEN);
    let delete = app.request("DELETE", &uri, Some(&marek), None).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    let edit = app
        .request("PUT", &uri, Some(&anna), Some(json!({ "title": "Hulajnoga", "comments": "  czerwona " })))
        .await;
    assert_eq!(edit.status, StatusCode::OK);
    assert_eq!(edit.body["title"], "Hulajnoga");
    assert_eq!(edit.body["comments"], "czerwona");

    let moved = app
        .request("PUT", &uri, Some(&anna), Some(json!({ "title": "Hulajnoga", "recipient_id": 999 })))
        .await;
    assert_eq!(moved.status, StatusCode::NOT_FOUND);

    let delete = app.request("DELETE", &uri, Some(&anna), None).await;
    assert_eq!(delete.status, StatusCode::OK);
}

#[tokio::test]
async fn notification_read_state_is_per_user() {
    let app = TestApp::new();
    let (anna, _) = app.register("anna").await;
    let (marek, _) = app.register("marek").await;
    app.add_recipient(&anna, "Ola").await;
    app.add_recipient(&anna, "Ela").await;

    let page = app.request("GET", "/api/notifications", Some(&marek), None).await;
    assert_eq!(page.body["total"], 2);
    assert_eq!(page.body["unread"], 2);
    let newest = &page.body["notifications"][0];
    assert_eq!(newest["type"], "recipient_added");
    assert_eq!(newest["payload"]["recipientName"], "Ela");
    assert_eq!(newest["isRead"], false);
    assert_eq!(newest["message"], "anna: dodano osobę Ela");

    let id = newest["id"].as_i64().unwrap();
    let read = app
        .request("POST", &format!("/api/notifications/{id}/read"), Some(&marek), None)
        .await;
    assert_eq!(read.status, StatusCode::OK);

    let count = app.request("GET", "/api/notifications/unread-count", Some(&marek), None).await;
    assert_eq!(count.body["count"], 1);
    let count = app.request("GET", "/api/notifications/unread-count", Some(&anna), None).await;
    assert_eq!(count.body["count"], 2);

    let all = app.request("POST", "/api/notifications/read-all", Some(&anna), None).await;
    assert_eq!(all.body["marked"], 2);
    let count = app.request("GET", "/api/notifications/unread-count", Some(&marek), None).await;
    assert_eq!(count.body["count"], 1);

    let missing = app.request("POST", "/api/notifications/999/read", Some(&anna), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let paged = app
        .request("GET", "/api/notifications?limit=1&offset=1", Some(&anna), None)
        .await;
    assert_eq!(paged.body["notifications"].as_array().unwrap().len(), 1);
    assert_eq!(paged.body["notifications"][0]["payload"]["recipientName"], "Ola");
}

#[tokio::test]
async fn profile_picture_upload_and_fetch() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    let ola = app.add_recipient(&session, "Ola").await;
    let uri = format!("/api/recipients/{ola}/profile-picture");

    let missing = app.request("GET", &uri, Some(&session), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let png = vec![0x89, b'P', b'N', b'G', 1, 2, 3];
    let req = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(header::COOKIE, &session)
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(png.clone()))
        .unwrap();
    let uploaded = app.send(req).await;
    assert_eq!(uploaded.status, StatusCode::OK);
    assert_eq!(uploaded.body["has_picture"], true);

    let req = Request::builder()
        .method("GET")
        .uri(&uri)
        .header(header::COOKIE, &session)
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(resp.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.to_vec(), png);

    let linked = app
        .request("POST", &uri, Some(&session), Some(json!({ "url": "https://example.org/ola.jpg" })))
        .await;
    assert_eq!(linked.status, StatusCode::OK);
    let redirect = app.request("GET", &uri, Some(&session), None).await;
    assert_eq!(redirect.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(redirect.headers[header::LOCATION], "https://example.org/ola.jpg");

    let bad = app
        .request("POST", &uri, Some(&session), Some(json!({ "url": "javascript:alert(1)" })))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(header::COOKIE, &session)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    assert_eq!(app.send(req).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn content_hash_tracks_changes() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    let ola = app.add_recipient(&session, "Ola").await;

    let before = app.request("GET", "/api/recipients-hash", Some(&session), None).await;
    let same = app.request("GET", "/api/recipients-hash", Some(&session), None).await;
    assert_eq!(before.body["hash"], same.body["hash"]);

    app.add_present(&session, ola, "Rower").await;
    let after = app.request("GET", "/api/recipients-hash", Some(&session), None).await;
    assert_ne!(before.body["hash"], after.body["hash"]);
}

#[tokio::test]
async fn hidden_gifts_cannot_be_touched_by_their_recipient() {
    let app = TestApp::new();
    let (marek, _) = app.register("Marek").await;
    let anna_recipient = app.add_recipient(&marek, "Anna").await;
    let (anna, _) = app.register("Anna").await;
    let gift = app.add_present(&marek, anna_recipient, "Sekretny rower").await;

    let attempts = [
        ("POST", format!("/api/presents/{gift}/reserve"), None),
        ("DELETE", format!("/api/presents/{gift}/reserve"), None),
        ("PUT", format!("/api/presents/{gift}/check"), None),
        ("PUT", format!("/api/presents/{gift}"), Some(json!({ "title": "Nic" }))),
        ("DELETE", format!("/api/presents/{gift}"), None),
    ];
    for (method, uri, body) in attempts {
        let reply = app.request(method, &uri, Some(&anna), body).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert!(!reply.body.to_string().contains("Sekretny"));
    }

    let seen_by_marek = app.request("GET", "/api/presents", Some(&marek), None).await;
    assert_eq!(seen_by_marek.body[0]["title"], "Sekretny rower");
    assert_eq!(seen_by_marek.body[0]["reserved_by"], Value::Null);
    assert_eq!(seen_by_marek.body[0]["is_checked"], false);

    let feed = app.request("GET", "/api/updates?since=0", Some(&anna), None).await;
    assert!(!feed.body.to_string().contains("Sekretny"));

    // Gifts Anna adds to her own list stay hers to manage.
    let own = app.add_present(&anna, anna_recipient, "Skarpetki").await;
    let reply = app
        .request("PUT", &format!("/api/presents/{own}/check"), Some(&anna), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn only_raster_pictures_are_accepted() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    let ola = app.add_recipient(&session, "Ola").await;
    let uri = format!("/api/recipients/{ola}/profile-picture");

    let req = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(header::COOKIE, &session)
        .header(header::CONTENT_TYPE, "image/svg+xml")
        .body(Body::from("<svg><script>alert(document.cookie)</script></svg>"))
        .unwrap();
    let reply = app.send(req).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].is_string());

    let missing = app.request("GET", &uri, Some(&session), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_pictures_get_a_json_413() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    let ola = app.add_recipient(&session, "Ola").await;
    let uri = format!("/api/recipients/{ola}/profile-picture");

    // Just over the picture limit, and past the request body limit.
    for size in [5 * 1024 * 1024 + 1, 7 * 1024 * 1024] {
        let req = Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::COOKIE, &session)
            .header(header::CONTENT_TYPE, "image/png")
            .body(Body::from(vec![0u8; size]))
            .unwrap();
        let reply = app.send(req).await;
        assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE, "{size} bytes");
        assert_eq!(reply.body["error"], "Plik jest za duży");
    }
}

#[tokio::test]
async fn updates_are_paged_at_200() {
    let app = TestApp::new();
    let (session, _) = app.register("marek").await;
    for i in 0..205 {
        app.add_recipient(&session, &format!("Osoba {i:03}")).await;
    }

    let first = app.request("GET", "/api/updates?since=0", Some(&session), None).await;
    let updates = first.body["updates"].as_array().unwrap();
    assert_eq!(updates.len(), 200);
    assert_eq!(updates[0]["payload"]["recipientName"], "Osoba 000");
    let cursor = first.body["timestamp"].as_i64().unwrap();
    assert_eq!(cursor, updates[199]["createdAt"].as_i64().unwrap());

    let rest = app
        .request("GET", &format!("/api/updates?since={cursor}"), Some(&session), None)
        .await;
    let names: Vec<&str> = rest.body["updates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["payload"]["recipientName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Osoba 200", "Osoba 201", "Osoba 202", "Osoba 203", "Osoba 204"]);
}
