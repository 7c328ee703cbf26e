use serde_json::json;

use crate::common::{ADMIN_EMAIL, TestApp, routes};

mod manage {
    use super::*;

    #[tokio::test]
    async fn new_admin_gets_onboarding_grant() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(routes::ADMINS, &json!({"email": " Owner@Example.com "}), &admin)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["admin"]["email"], "owner@example.com");
        assert_eq!(res.body["admin"]["force_password_change"], true);
        let temp = res.body["onboarding"]["temporary_password"].as_str().unwrap();

        let login = app.login("owner@example.com", temp, "Admin").await;
        assert_eq!(login.status, 200, "{}", login.text);
    }

    #[tokio::test]
    async fn duplicate_admin_email_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(routes::ADMINS, &json!({"email": "ADMIN@example.com"}), &admin)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn list_is_ordered_by_email() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.post_with_token(routes::ADMINS, &json!({"email": "zoe@example.com"}), &admin)
            .await;
        app.post_with_token(routes::ADMINS, &json!({"email": "abe@example.com"}), &admin)
            .await;

        let res = app.get_with_token(routes::ADMINS, &admin).await;

        let emails: Vec<_> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["email"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(emails, vec!["abe@example.com", ADMIN_EMAIL, "zoe@example.com"]);
    }

    #[tokio::test]
    async fn update_changes_email() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let created = app
            .post_with_token(routes::ADMINS, &json!({"email": "owner@example.com"}), &admin)
            .await;
        let id = created.body["admin"]["id"].as_i64().unwrap() as i32;

        let taken = app
            .patch_with_token(&routes::admin(id), &json!({"email": ADMIN_EMAIL}), &admin)
            .await;
        assert_eq!(taken.status, 409);

        let res = app
            .patch_with_token(&routes::admin(id), &json!({"email": "boss@example.com"}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["email"], "boss@example.com");
    }

    #[tokio::test]
    async fn reset_password_issues_new_temporary_password() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let created = app
            .post_with_token(routes::ADMINS, &json!({"email": "owner@example.com"}), &admin)
            .await;
        let id = created.body["admin"]["id"].as_i64().unwrap() as i32;
        let first = created.body["onboarding"]["temporary_password"]
            .as_str()
            .unwrap()
            .to_string();

        let res = app
            .post_with_token(&routes::admin_reset(id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let second = res.body["temporary_password"].as_str().unwrap();

        assert_eq!(app.login("owner@example.com", &first, "Admin").await.status, 401);
        assert_eq!(app.login("owner@example.com", second, "Admin").await.status, 200);
    }

    #[tokio::test]
    async fn students_cannot_list_admins() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (_, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;

        let res = app.get_with_token(routes::ADMINS, &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod last_admin {
    use super::*;

    #[tokio::test]
    async fn the_only_admin_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let me = app.get_with_token(routes::ME, &admin).await;
        let my_id = me.body["id"].as_i64().unwrap() as i32;

        let res = app.delete_with_token(&routes::admin(my_id), &admin).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "LAST_ADMIN");
        let still = app.get_with_token(routes::ADMINS, &admin).await;
        assert_eq!(still.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_of_two_admins_can_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let created = app
            .post_with_token(routes::ADMINS, &json!({"email": "owner@example.com"}), &admin)
            .await;
        let id = created.body["admin"]["id"].as_i64().unwrap() as i32;

        let res = app.delete_with_token(&routes::admin(id), &admin).await;
        assert_eq!(res.status, 204);

        let me = app.get_with_token(routes::ME, &admin).await;
        let my_id = me.body["id"].as_i64().unwrap() as i32;
        let res = app.delete_with_token(&routes::admin(my_id), &admin).await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn two_admins_deleting_each_other_leave_one() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let me = app.get_with_token(routes::ME, &admin).await;
        let my_id = me.body["id"].as_i64().unwrap() as i32;
        let created = app
            .post_with_token(routes::ADMINS, &json!({"email": "owner@example.com"}), &admin)
            .await;
        let owner_id = created.body["admin"]["id"].as_i64().unwrap() as i32;
        let temp = created.body["onboarding"]["temporary_password"].as_str().unwrap();
        let login = app.login("owner@example.com", temp, "Admin").await;
        let owner = app.change_password(&login.token(), "owner-pass-1").await;

        let owner_route = routes::admin(owner_id);
        let my_route = routes::admin(my_id);
        let (a, b) = tokio::join!(
            app.delete_with_token(&owner_route, &admin),
            app.delete_with_token(&my_route, &owner),
        );

        let deleted = [a.status, b.status].iter().filter(|s| **s == 204).count();
        assert_eq!(deleted, 1, "{} / {}", a.text, b.text);

        let survivor = if a.status == 204 { &admin } else { &owner };
        let left = app.get_with_token(routes::ADMINS, survivor).await;
        assert_eq!(left.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_admin_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app.delete_with_token(&routes::admin(999), &admin).await;

        assert_eq!(res.status, 404);
    }
}

mod sessions {
    use super::*;

    async fn second_admin(app: &TestApp, admin: &str) -> (i32, String) {
        let created = app
            .post_with_token(routes::ADMINS, &json!({"email": "owner@example.com"}), admin)
            .await;
        let id = created.body["admin"]["id"].as_i64().unwrap() as i32;
        let temp = created.body["onboarding"]["temporary_password"].as_str().unwrap();
        let login = app.login("owner@example.com", temp, "Admin").await;
        let token = app.change_password(&login.token(), "owner-pass-1").await;
        (id, token)
    }

    #[tokio::test]
    async fn deleted_admin_token_stops_working() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (id, owner) = second_admin(&app, &admin).await;
        assert_eq!(app.get_with_token(routes::ADMINS, &owner).await.status, 200);

        let res = app.delete_with_token(&routes::admin(id), &admin).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(routes::ADMINS, &owner).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
        assert_eq!(app.get_with_token(routes::ME, &owner).await.status, 401);
    }

    #[tokio::test]
    async fn password_reset_revokes_open_sessions() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (id, owner) = second_admin(&app, &admin).await;

        let reset = app
            .post_with_token(&routes::admin_reset(id), &json!({}), &admin)
            .await;
        assert_eq!(reset.status, 200, "{}", reset.text);

        let res = app.get_with_token(routes::ADMINS, &owner).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn changing_password_retires_the_previous_token() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (_, owner) = second_admin(&app, &admin).await;

        let fresh = app.change_password(&owner, "owner-pass-2").await;

        assert_eq!(app.get_with_token(routes::ADMINS, &owner).await.status, 401);
        assert_eq!(app.get_with_token(routes::ADMINS, &fresh).await.status, 200);
    }
}
