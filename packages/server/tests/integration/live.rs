use std::collections::BTreeSet;
use std::time::Duration;

use axum::body::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Value, json};

use crate::common::{TestApp, routes};

/// One parsed server-sent event.
struct LiveEvent {
    name: String,
    data: Value,
}

/// Reads named events off an open SSE response.
struct EventReader {
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: String,
}

impl EventReader {
    async fn open(app: &TestApp, token: &str) -> Self {
        let res = app
            .client
            .get(app.url(&format!("{}?access_token={token}", routes::LIVE)))
            .send()
            .await
            .expect("Failed to open live stream");
        assert_eq!(res.status().as_u16(), 200);
        assert!(
            res.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );
        Self {
            stream: res.bytes_stream().boxed(),
            buffer: String::new(),
        }
    }

    /// Next named event, skipping keep-alive comments.
    async fn next(&mut self) -> LiveEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                while let Some(end) = self.buffer.find("\n\n") {
                    let block: String = self.buffer.drain(..end + 2).collect();
                    let mut name = None;
                    let mut data = String::new();
                    for line in block.lines() {
                        if let Some(v) = line.strip_prefix("event:") {
                            name = Some(v.trim().to_string());
                        } else if let Some(v) = line.strip_prefix("data:") {
                            data.push_str(v.trim_start());
                        }
                    }
                    if let Some(name) = name {
                        let data = serde_json::from_str(&data).expect("event data is JSON");
                        return LiveEvent { name, data };
                    }
                }
                let chunk = self
                    .stream
                    .next()
                    .await
                    .expect("live stream ended")
                    .expect("live stream errored");
                self.buffer.push_str(&String::from_utf8_lossy(&chunk));
            }
        })
        .await
        .expect("timed out waiting for a live event")
    }

    /// Read until the server ends the stream.
    async fn wait_closed(&mut self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(chunk) = self.stream.next().await {
                if chunk.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("live stream stayed open");
    }

    /// Skip events until one for `name` satisfies `pred`.
    async fn wait_for(&mut self, name: &str, pred: impl Fn(&Value) -> bool) -> Value {
        loop {
            let event = self.next().await;
            if event.name == name && pred(&event.data) {
                return event.data;
            }
        }
    }
}

fn item_count(data: &Value) -> usize {
    data["items"].as_array().map(Vec::len).unwrap_or_default()
}

#[tokio::test]
async fn admin_receives_every_collection_on_connect() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let mut reader = EventReader::open(&app, &admin).await;
    let mut names = BTreeSet::new();
    while names.len() < 5 {
        let event = reader.next().await;
        assert!(event.data["version"].as_u64().unwrap() >= 1);
        names.insert(event.name);
    }

    let expected: BTreeSet<String> = ["admins", "customers", "donations", "repairs", "technicians"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn student_receives_only_shared_collections() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let (_, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;

    let mut reader = EventReader::open(&app, &bob).await;
    let mut names = BTreeSet::new();
    while names.len() < 3 {
        names.insert(reader.next().await.name);
    }

    let expected: BTreeSet<String> = ["customers", "repairs", "technicians"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn writes_publish_a_newer_snapshot() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let mut reader = EventReader::open(&app, &admin).await;
    let initial = reader.wait_for("customers", |_| true).await;
    let initial_version = initial["version"].as_u64().unwrap();

    app.create_customer(&admin, "Ann Lee", "ann@example.com").await;

    let updated = reader.wait_for("customers", |d| item_count(d) == 1).await;
    assert!(updated["version"].as_u64().unwrap() > initial_version);
    assert_eq!(updated["items"][0]["full_name"], "Ann Lee");
}

#[tokio::test]
async fn student_snapshot_hides_other_technicians_repairs() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let (_, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;
    let carol = app.create_technician(&admin, "Carol", "carol@example.com").await;
    let carol_id = carol["technician"]["id"].as_i64().unwrap();
    let customer = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
    app.create_repair(&admin, customer, json!({"technician_id": carol_id}))
        .await;
    let mine = app.create_repair(&bob, customer, json!({})).await;

    let mut reader = EventReader::open(&app, &bob).await;
    let repairs = reader.wait_for("repairs", |d| item_count(d) > 0).await;

    assert_eq!(item_count(&repairs), 1);
    assert_eq!(repairs["items"][0]["id"], mine["id"]);
}

#[tokio::test]
async fn renamed_student_sees_repairs_under_the_new_name() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let (bob_id, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;
    let customer = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
    let repair = app.create_repair(&admin, customer, json!({})).await;
    let repair_id = repair["id"].as_i64().unwrap() as i32;
    app.put_with_token(
        &routes::repair_assignee(repair_id),
        &json!({"name": "Robert"}),
        &admin,
    )
    .await;

    let mut reader = EventReader::open(&app, &bob).await;
    let initial = reader.wait_for("repairs", |_| true).await;
    assert_eq!(item_count(&initial), 0);

    let res = app
        .patch_with_token(&routes::technician(bob_id), &json!({"name": "Robert"}), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let updated = reader.wait_for("repairs", |d| item_count(d) == 1).await;
    assert_eq!(updated["items"][0]["id"], repair_id);
}

#[tokio::test]
async fn deleting_the_technician_ends_their_stream() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let (bob_id, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;

    let mut reader = EventReader::open(&app, &bob).await;
    reader.wait_for("repairs", |_| true).await;

    let res = app.delete_with_token(&routes::technician(bob_id), &admin).await;
    assert_eq!(res.status, 204);

    reader.wait_closed().await;
}

#[tokio::test]
async fn live_stream_requires_a_token() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::LIVE).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn closing_the_stream_unsubscribes() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let mut reader = EventReader::open(&app, &admin).await;
    reader.next().await;
    assert_eq!(app.state.live.subscriber_count(), 5);
    drop(reader);

    // The server notices the closed connection on its next keep-alive.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while app.state.live.subscriber_count() > 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "subscriptions were not released"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
