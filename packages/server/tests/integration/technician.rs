use serde_json::json;

use crate::common::{TestApp, routes};

mod manage {
    use super::*;

    #[tokio::test]
    async fn created_technician_must_change_password() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let created = app.create_technician(&admin, "Bob", "Bob@Example.com").await;

        assert_eq!(created["technician"]["email"], "bob@example.com");
        assert_eq!(created["technician"]["force_password_change"], true);
        let temp = created["onboarding"]["temporary_password"].as_str().unwrap();
        assert!(temp.len() >= 8);

        let login = app.login("bob@example.com", temp, "Student").await;
        assert_eq!(login.status, 200, "{}", login.text);
        assert_eq!(login.body["force_password_change"], true);
    }

    #[tokio::test]
    async fn email_must_be_unique_ignoring_case() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_technician(&admin, "Bob", "bob@example.com").await;

        let res = app
            .post_with_token(
                routes::TECHNICIANS,
                &json!({"name": "Other Bob", "email": "BOB@example.com"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::TECHNICIANS,
                &json!({"name": "Bob", "email": "not-an-email"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn list_is_ordered_by_name_and_visible_to_students() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_technician(&admin, "Zed", "zed@example.com").await;
        let (_, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;

        let res = app.get_with_token(routes::TECHNICIANS, &bob).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let names: Vec<_> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Bob", "Zed"]);
        assert!(res.body[0].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn students_cannot_create_technicians() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (_, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;

        let res = app
            .post_with_token(
                routes::TECHNICIANS,
                &json!({"name": "Eve", "email": "eve@example.com"}),
                &bob,
            )
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn update_rechecks_email_and_can_clear_phone() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_technician(&admin, "Bob", "bob@example.com").await;
        let carol = app
            .post_with_token(
                routes::TECHNICIANS,
                &json!({"name": "Carol", "email": "carol@example.com", "phone": "555-0111"}),
                &admin,
            )
            .await;
        let id = carol.body["technician"]["id"].as_i64().unwrap() as i32;

        let taken = app
            .patch_with_token(&routes::technician(id), &json!({"email": "bob@example.com"}), &admin)
            .await;
        assert_eq!(taken.status, 409);
        assert_eq!(taken.body["code"], "EMAIL_TAKEN");

        let res = app
            .patch_with_token(
                &routes::technician(id),
                &json!({"name": "Carol Diaz", "phone": null}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Carol Diaz");
        assert_eq!(res.body["email"], "carol@example.com");
        assert!(res.body["phone"].is_null());
    }

    #[tokio::test]
    async fn reset_password_forces_a_new_change() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (id, _) = app.create_student(&admin, "Bob", "bob@example.com").await;

        let res = app
            .post_with_token(&routes::technician_reset(id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let temp = res.body["temporary_password"].as_str().unwrap();

        let login = app.login("bob@example.com", temp, "Student").await;
        assert_eq!(login.status, 200);
        assert_eq!(login.body["force_password_change"], true);
    }

    #[tokio::test]
    async fn delete_leaves_assigned_repairs_in_place() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let bob = app.create_technician(&admin, "Bob", "bob@example.com").await;
        let bob_id = bob["technician"]["id"].as_i64().unwrap() as i32;
        let customer = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
        let repair = app
            .create_repair(&admin, customer, json!({"technician_id": bob_id}))
            .await;

        let res = app.delete_with_token(&routes::technician(bob_id), &admin).await;
        assert_eq!(res.status, 204);

        let missing = app.delete_with_token(&routes::technician(bob_id), &admin).await;
        assert_eq!(missing.status, 404);

        let kept = app
            .get_with_token(&routes::repair(repair["id"].as_i64().unwrap() as i32), &admin)
            .await;
        assert_eq!(kept.body["assigned_to_name"], "Bob");
    }
}

mod import {
    use super::*;

    #[tokio::test]
    async fn each_added_technician_gets_an_onboarding_grant() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_technician(&admin, "Bob", "bob@example.com").await;

        let text = "Carol,carol@example.com,555-0112\nDan,dan@example.com\nBob Again,BOB@example.com\nbroken line\nEve,not-an-email";
        let res = app
            .post_with_token(routes::TECHNICIANS_IMPORT, &json!({"text": text}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["added"], 2);
        assert_eq!(res.body["duplicates"], 1);
        assert_eq!(res.body["skipped"], 2);
        let grants = res.body["onboarding"].as_array().unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0]["email"], "carol@example.com");
        assert_eq!(grants[1]["email"], "dan@example.com");
    }

    #[tokio::test]
    async fn blank_import_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(routes::TECHNICIANS_IMPORT, &json!({"text": ""}), &admin)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn deleted_technician_token_stops_working() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (id, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;
        let customer = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;

        let res = app.delete_with_token(&routes::technician(id), &admin).await;
        assert_eq!(res.status, 204);

        let list = app.get_with_token(routes::REPAIRS, &bob).await;
        assert_eq!(list.status, 401);
        assert_eq!(list.body["code"], "TOKEN_INVALID");

        let intake = app
            .post_with_token(
                routes::REPAIRS,
                &json!({
                    "customer_id": customer,
                    "device_type": "Laptop",
                    "brand": "Dell",
                    "model": "XPS",
                    "problem_notes": "Cracked hinge",
                    "signature": "Ann Lee",
                }),
                &bob,
            )
            .await;
        assert_eq!(intake.status, 401);
    }

    #[tokio::test]
    async fn password_reset_revokes_open_sessions() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (id, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;
        assert_eq!(app.get_with_token(routes::REPAIRS, &bob).await.status, 200);

        let reset = app
            .post_with_token(&routes::technician_reset(id), &json!({}), &admin)
            .await;
        assert_eq!(reset.status, 200, "{}", reset.text);

        let res = app.get_with_token(routes::REPAIRS, &bob).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
