mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

async fn client_price_rows(t: &TestApp, admin: &str, user_id: i64) -> Vec<Value> {
    let (status, body) = t.get(&format!("/api/client-prices?user_id={user_id}"), admin).await;
    assert_eq!(status, StatusCode::OK);
    body.as_array().unwrap().clone()
}

#[tokio::test]
async fn bulk_adjust_ten_percent_on_base_100_gives_110() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;
    let product = t.create_product(&admin, "BASE-100", 100.0).await;

    let (status, body) = t
        .post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": client.id, "percentage": 10 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["updated"], 1);
    assert_eq!(body["errors"], json!([]));

    let rows = client_price_rows(&t, &admin, client.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["product_id"], product);
    assert_eq!(rows[0]["custom_price_usd"], 110.0);
    assert_eq!(rows[0]["discount_percentage"], Value::Null);

    let (_, history) = t.get(&format!("/api/price-history?user_id={}&change_type=bulk_adjust", client.id), &admin).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["old_price_usd"], 100.0);
    assert_eq!(history[0]["new_price_usd"], 110.0);
}

#[tokio::test]
async fn bulk_adjust_skips_below_floor_and_never_persists_them() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;

    let plain = t.create_product(&admin, "PLAIN", 100.0).await;
    let premium = t.create_product(&admin, "PREMIUM", 50.0).await;
    let (status, _) = t
        .post(
            "/api/client-prices",
            &admin,
            json!({ "user_id": client.id, "product_id": premium, "custom_price_usd": 80.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = t
        .post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": client.id, "percentage": -20 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["updated"], 1);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("PLAIN"), "{errors:?}");

    let rows = client_price_rows(&t, &admin, client.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["product_id"], premium);
    assert_eq!(rows[0]["custom_price_usd"], 64.0);
    assert!(rows.iter().all(|r| r["product_id"] != plain));
}

#[tokio::test]
async fn bulk_adjust_fails_when_nothing_is_updated() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;
    t.create_product(&admin, "ONE", 10.0).await;
    t.create_product(&admin, "TWO", 20.0).await;

    let (status, body) = t
        .post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": client.id, "percentage": -5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
    assert!(client_price_rows(&t, &admin, client.id).await.is_empty());
}

#[tokio::test]
async fn bulk_adjust_validates_input() {
    let t = TestApp::new();
    let (admin_user, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;
    t.create_product(&admin, "ONE", 10.0).await;

    let (status, _) = t
        .post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": client.id, "percentage": "ten" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": client.id, "percentage": -100 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": 9999, "percentage": 5 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": admin_user.id, "percentage": 5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_bulk_adjustments_never_go_below_base() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;

    let bases = [12.34, 99.99, 250.0, 7.5];
    for (i, base) in bases.iter().enumerate() {
        t.create_product(&admin, &format!("P-{i}"), *base).await;
    }

    for pct in [15.0, -7.5, 3.3, -12.0, 40.0, -30.0, -1.0] {
        t.post("/api/client-prices/bulk-adjust", &admin, json!({ "user_id": client.id, "percentage": pct }))
            .await;

        let (_, products) = t.get("/api/products", &admin).await;
        for row in client_price_rows(&t, &admin, client.id).await {
            let product = products
                .as_array()
                .unwrap()
                .iter()
                .find(|p| p["id"] == row["product_id"])
                .unwrap();
            let custom = row["custom_price_usd"].as_f64().unwrap();
            let base = product["base_price_usd"].as_f64().unwrap();
            assert!(custom >= base, "after {pct}%: {custom} < {base}");
        }
    }
}

#[tokio::test]
async fn custom_price_below_base_is_rejected() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;
    let product = t.create_product(&admin, "FLOOR", 100.0).await;

    let (status, body) = t
        .post(
            "/api/client-prices",
            &admin,
            json!({ "user_id": client.id, "product_id": product, "custom_price_usd": 99.99 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("below the base price"));
}

#[tokio::test]
async fn markup_is_converted_to_custom_price() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;
    let product = t.create_product(&admin, "MARKUP", 80.0).await;

    let (status, created) = t
        .post(
            "/api/client-prices",
            &admin,
            json!({ "user_id": client.id, "product_id": product, "markup_percentage": 12.5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["custom_price_usd"], 90.0);
    assert_eq!(created["markup_percentage"], 12.5);

    let (status, _) = t
        .post(
            "/api/client-prices",
            &admin,
            json!({ "user_id": client.id, "product_id": product, "custom_price_usd": 95.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "second price for same pair");

    let id = created["id"].as_i64().unwrap();
    let (status, updated) = t
        .put(&format!("/api/client-prices/{id}"), &admin, json!({ "custom_price_usd": 95.0 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["custom_price_usd"], 95.0);
    assert_eq!(updated["markup_percentage"], Value::Null);

    let (_, history) = t
        .get(&format!("/api/price-history?product_id={product}&change_type=client_price"), &admin)
        .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    // newest first
    assert_eq!(history[0]["old_price_usd"], 90.0);
    assert_eq!(history[0]["new_price_usd"], 95.0);
}

#[tokio::test]
async fn clients_only_see_their_own_prices_and_history() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (alice, alice_token) = t.client("alice@acme.test").await;
    let (bob, _) = t.client("bob@other.test").await;
    let product = t.create_product(&admin, "SHARED", 10.0).await;

    for (user, price) in [(alice.id, 11.0), (bob.id, 12.0)] {
        let (status, _) = t
            .post(
                "/api/client-prices",
                &admin,
                json!({ "user_id": user, "product_id": product, "custom_price_usd": price }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // Asking for bob's rows still only yields alice's
    let (status, rows) = t.get(&format!("/api/client-prices?user_id={}", bob.id), &alice_token).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], alice.id);

    let bob_row = client_price_rows(&t, &admin, bob.id).await[0]["id"].as_i64().unwrap();
    let (status, _) = t.get(&format!("/api/client-prices/{bob_row}"), &alice_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = t.get(&format!("/api/price-history?user_id={}", bob.id), &alice_token).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["user_id"], alice.id);
}

#[tokio::test]
async fn delete_client_price() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;
    let (client, _) = t.client("buyer@acme.test").await;
    let product = t.create_product(&admin, "DEL", 10.0).await;
    let (_, created) = t
        .post(
            "/api/client-prices",
            &admin,
            json!({ "user_id": client.id, "product_id": product, "custom_price_usd": 15.0 }),
        )
        .await;
    let uri = format!("/api/client-prices/{}", created["id"]);

    let (status, _) = t.request(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t.request(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
