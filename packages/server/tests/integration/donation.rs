use serde_json::json;

use crate::common::{ADMIN_EMAIL, TestApp, routes};

#[tokio::test]
async fn donation_records_donor_and_receiver() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let customer = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;

    let res = app
        .post_with_token(
            routes::DONATIONS,
            &json!({"customer_id": customer, "device_type": "Laptop", "brand": "Dell", "model": "E6440"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["customer_name"], "Ann Lee");
    assert_eq!(res.body["received_by"], ADMIN_EMAIL);
    assert_eq!(res.body["notes"], "");
}

#[tokio::test]
async fn donor_must_exist() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::DONATIONS,
            &json!({"customer_id": 42, "device_type": "Laptop", "brand": "Dell", "model": "E6440"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn device_fields_are_required() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let customer = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;

    let res = app
        .post_with_token(
            routes::DONATIONS,
            &json!({"customer_id": customer, "device_type": "Laptop", "brand": " ", "model": "E6440"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn list_is_newest_first() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let customer = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
    for model in ["First", "Second"] {
        let res = app
            .post_with_token(
                routes::DONATIONS,
                &json!({"customer_id": customer, "device_type": "Phone", "brand": "Moto", "model": model}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 201);
    }

    let res = app.get_with_token(routes::DONATIONS, &admin).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body[0]["model"], "Second");
    assert_eq!(res.body[1]["model"], "First");
}

#[tokio::test]
async fn students_cannot_see_donations() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let (_, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;

    let res = app.get_with_token(routes::DONATIONS, &bob).await;

    assert_eq!(res.status, 403);
}
