use serde_json::json;

use crate::common::{TestApp, routes};

mod crud {
    use super::*;

    #[tokio::test]
    async fn phone_only_customer_is_accepted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::CUSTOMERS,
                &json!({"full_name": "  Ann Lee ", "phone": "555-0100"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["full_name"], "Ann Lee");
        assert_eq!(res.body["email"], "");
    }

    #[tokio::test]
    async fn customer_needs_a_way_to_be_reached() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(routes::CUSTOMERS, &json!({"full_name": "Ann Lee"}), &admin)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn update_validates_the_merged_record() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let res = app
            .post_with_token(
                routes::CUSTOMERS,
                &json!({"full_name": "Ann Lee", "email": "ann@example.com"}),
                &admin,
            )
            .await;
        let id = res.id();

        let cleared = app
            .patch_with_token(&routes::customer(id), &json!({"email": ""}), &admin)
            .await;
        assert_eq!(cleared.status, 400);

        let renamed = app
            .patch_with_token(&routes::customer(id), &json!({"full_name": "Ann Park"}), &admin)
            .await;
        assert_eq!(renamed.status, 200, "{}", renamed.text);
        assert_eq!(renamed.body["full_name"], "Ann Park");
        assert_eq!(renamed.body["email"], "ann@example.com");
    }

    #[tokio::test]
    async fn search_matches_name_email_and_phone() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
        app.post_with_token(
            routes::CUSTOMERS,
            &json!({"full_name": "Bo Chen", "email": "bo@shop.org", "phone": "777-4242"}),
            &admin,
        )
        .await;

        let by_name = app
            .get_with_token(&format!("{}?search=ANN", routes::CUSTOMERS), &admin)
            .await;
        assert_eq!(by_name.body.as_array().unwrap().len(), 1);
        assert_eq!(by_name.body[0]["full_name"], "Ann Lee");

        let by_email = app
            .get_with_token(&format!("{}?search=shop.org", routes::CUSTOMERS), &admin)
            .await;
        assert_eq!(by_email.body[0]["full_name"], "Bo Chen");

        let by_phone = app
            .get_with_token(&format!("{}?search=4242", routes::CUSTOMERS), &admin)
            .await;
        assert_eq!(by_phone.body.as_array().unwrap().len(), 1);

        let all = app.get_with_token(routes::CUSTOMERS, &admin).await;
        let names: Vec<_> = all
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["full_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Ann Lee", "Bo Chen"]);
    }

    #[tokio::test]
    async fn detail_lists_repairs_newest_first() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let id = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
        let older = app.create_repair(&admin, id, json!({})).await;
        let newer = app.create_repair(&admin, id, json!({})).await;

        let res = app.get_with_token(&routes::customer(id), &admin).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["full_name"], "Ann Lee");
        assert_eq!(res.body["repairs"][0]["id"], newer["id"]);
        assert_eq!(res.body["repairs"][1]["id"], older["id"]);
    }

    #[tokio::test]
    async fn deleting_a_customer_keeps_their_repairs() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let id = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
        let repair = app.create_repair(&admin, id, json!({})).await;

        let res = app.delete_with_token(&routes::customer(id), &admin).await;
        assert_eq!(res.status, 204);

        let gone = app.get_with_token(&routes::customer(id), &admin).await;
        assert_eq!(gone.status, 404);

        let kept = app
            .get_with_token(&routes::repair(repair["id"].as_i64().unwrap() as i32), &admin)
            .await;
        assert_eq!(kept.status, 200);
        assert_eq!(kept.body["customer_name"], "Ann Lee");
    }

    #[tokio::test]
    async fn students_cannot_delete_customers() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let (_, bob) = app.create_student(&admin, "Bob", "bob@example.com").await;
        let id = app.create_customer(&bob, "Ann Lee", "ann@example.com").await;

        let res = app.delete_with_token(&routes::customer(id), &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn bulk_delete_removes_all_given_ids() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
        let b = app.create_customer(&admin, "Bo Chen", "bo@example.com").await;
        let c = app.create_customer(&admin, "Cy Diaz", "cy@example.com").await;

        let res = app
            .post_with_token(routes::CUSTOMERS_BULK_DELETE, &json!({"ids": [a, c]}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["deleted"], 2);
        let left = app.get_with_token(routes::CUSTOMERS, &admin).await;
        let ids: Vec<_> = left.body.as_array().unwrap().iter().map(|c| c["id"].clone()).collect();
        assert_eq!(ids, vec![json!(b)]);
    }

    #[tokio::test]
    async fn contact_qr_requires_a_phone() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let with_phone = app.create_customer(&admin, "Ann Lee", "ann@example.com").await;
        let without = app
            .post_with_token(
                routes::CUSTOMERS,
                &json!({"full_name": "Bo Chen", "email": "bo@example.com"}),
                &admin,
            )
            .await
            .id();

        let ok = app.get_with_token(&routes::customer_qr(with_phone), &admin).await;
        assert_eq!(ok.status, 200);
        assert!(ok.text.contains("<svg"));

        let missing = app.get_with_token(&routes::customer_qr(without), &admin).await;
        assert_eq!(missing.status, 400);
    }
}

mod import {
    use super::*;

    #[tokio::test]
    async fn duplicate_emails_are_reported_not_added() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_customer(&admin, "Ann Lee", "ann@example.com").await;

        let text = "Ann Again,ANN@example.com\n\
                    Bo Chen,bo@example.com,555-0101\n\
                    Bo Twice,bo@example.com\n\
                    just a name";
        let res = app
            .post_with_token(routes::CUSTOMERS_IMPORT, &json!({"text": text}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["added"], 1);
        assert_eq!(res.body["duplicates"], 2);
        assert_eq!(res.body["skipped"], 1);
        assert_eq!(res.body["failed"], 0);
        assert_eq!(
            res.body["duplicate_emails"],
            json!(["ANN@example.com", "bo@example.com"])
        );

        let all = app.get_with_token(routes::CUSTOMERS, &admin).await;
        assert_eq!(all.body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_import_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(routes::CUSTOMERS_IMPORT, &json!({"text": "  \n  "}), &admin)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn imported_phone_is_stored() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        app.post_with_token(
            routes::CUSTOMERS_IMPORT,
            &json!({"text": "Cy Diaz, cy@example.com , 555-0199"}),
            &admin,
        )
        .await;

        let all = app.get_with_token(routes::CUSTOMERS, &admin).await;
        assert_eq!(all.body[0]["email"], "cy@example.com");
        assert_eq!(all.body[0]["phone"], "555-0199");
    }
}
