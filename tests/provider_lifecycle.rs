//! End-to-end provider tests: configure against a mock API, then drive
//! resources and data sources the way the host does.

use serde_json::{json, Value};
use starbucks_provider::testing::{
    assert_plan_no_changes, assert_plan_updates_in_place, ProviderTester, TestError,
};
use starbucks_provider::{ProviderError, ProviderService, StarbucksProvider};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{any, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn configured(server: &MockServer) -> ProviderTester<StarbucksProvider> {
    let tester = ProviderTester::new(StarbucksProvider::new("test").with_api_key_fallback(None));
    tester
        .configure(json!({"api_key": "test-key", "endpoint": server.uri()}))
        .await
        .expect("configure should succeed");
    tester
}

fn store_config(name: &str) -> Value {
    json!({
        "name": name,
        "store_number": "SB-1912",
        "address": "1912 Pike Place",
        "city": "Seattle",
        "state": "WA",
        "zip_code": "98101",
        "phone_number": "+1-206-555-0100",
    })
}

#[tokio::test]
async fn test_store_crud_lifecycle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "s-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stores/s-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "s-1", "status": "active"})),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/stores/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/stores/s-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let state = assert_ok!(
        tester
            .lifecycle_crud(
                "starbucks_store",
                store_config("Pike Place"),
                store_config("Pike Place Original"),
            )
            .await
    );

    assert_eq!(state["id"], "s-1");
    assert_eq!(state["name"], "Pike Place Original");
    assert_eq!(state["status"], "active");
    assert_eq!(state["capacity"], 50);
}

#[tokio::test]
async fn test_create_sends_defaults_and_sets_status() {
    let server = MockServer::start().await;

    let mut expected = store_config("Pike Place");
    expected["has_drive_thru"] = json!(false);
    expected["has_wifi"] = json!(true);
    expected["has_mobile_order"] = json!(true);
    expected["capacity"] = json!(50);

    Mock::given(method("POST"))
        .and(path("/stores"))
        .and(body_json(expected))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "s-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let plan = tester
        .plan_create("starbucks_store", store_config("Pike Place"))
        .await
        .unwrap();
    let state = tester
        .create("starbucks_store", plan.planned_state)
        .await
        .unwrap();

    assert_eq!(state["id"], "s-1");
    assert_eq!(state["status"], "active");
}

#[tokio::test]
async fn test_create_fills_optional_computed_from_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/menu_items"))
        .and(body_json(json!({"name": "Flat White", "price": 4.75})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "m-1",
            "is_available": true,
            "is_seasonal": false,
        })))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let plan = tester
        .plan_create("starbucks_menu_item", json!({"name": "Flat White", "price": 4.75}))
        .await
        .unwrap();
    let state = tester
        .create("starbucks_menu_item", plan.planned_state)
        .await
        .unwrap();

    assert_eq!(state["id"], "m-1");
    assert_eq!(state["is_available"], true);
    assert_eq!(state["is_seasonal"], false);
}

#[tokio::test]
async fn test_create_without_id_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/promotions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "Happy Hour"})))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let err = assert_err!(
        tester
            .create("starbucks_promotion", json!({"name": "Happy Hour"}))
            .await
    );

    let diag = err.to_diagnostic();
    assert_eq!(diag.summary, "Parse Error");
    assert!(diag.detail.unwrap().starts_with("Unable to parse response:"));
}

#[tokio::test]
async fn test_update_sends_full_mutable_payload() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/promotions/p-1"))
        .and(body_json(json!({
            "name": "BOGO",
            "description": "Buy one, get one",
            "start_date": null,
            "end_date": null,
            "active": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let prior = json!({"id": "p-1", "name": "Happy Hour", "active": true});
    let plan = tester
        .plan_update(
            "starbucks_promotion",
            prior.clone(),
            json!({"name": "BOGO", "description": "Buy one, get one"}),
        )
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);

    let state = tester
        .update("starbucks_promotion", prior, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(state["id"], "p-1");
    assert_eq!(state["name"], "BOGO");
}

#[tokio::test]
async fn test_read_is_idempotent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/inventory/i-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "i-1",
            "store_id": "s-1",
            "item_sku": "SKU-1",
            "quantity": 12,
        })))
        .expect(2)
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let current = json!({"id": "i-1", "store_id": "s-1", "item_sku": "SKU-1", "quantity": 10});

    let first = tester.read("starbucks_inventory", current).await.unwrap();
    let second = tester
        .read("starbucks_inventory", first.clone())
        .await
        .unwrap();

    assert_eq!(first["quantity"], 12);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_read_not_found_surfaces_client_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/employees/e-404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("employee not found"))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let err = assert_err!(
        tester
            .read("starbucks_employee", json!({"id": "e-404"}))
            .await
    );

    let diag = err.to_diagnostic();
    assert_eq!(diag.summary, "Client Error");
    assert_eq!(
        diag.detail.as_deref(),
        Some("Unable to read employee: API error (status 404): employee not found")
    );
}

#[tokio::test]
async fn test_missing_credential_sends_no_requests() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tester = ProviderTester::new(StarbucksProvider::new("test").with_api_key_fallback(None));
    let err = tester
        .configure(json!({"endpoint": server.uri()}))
        .await
        .unwrap_err();
    assert!(matches!(err, TestError::Provider(ProviderError::MissingApiKey)));

    let err = assert_err!(
        tester
            .create("starbucks_promotion", json!({"name": "Happy Hour"}))
            .await
    );
    assert!(matches!(err, ProviderError::FailedPrecondition(_)));
}

#[tokio::test]
async fn test_stores_data_source_projects_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s-1", "name": "Pike Place", "city": "Seattle", "capacity": 40},
            {"id": "s-2", "name": "Reserve Roastery", "city": "Chicago"},
        ])))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let state = tester
        .read_data_source("starbucks_stores", json!({}))
        .await
        .unwrap();

    assert_eq!(
        state,
        json!({"stores": [
            {"id": "s-1", "name": "Pike Place", "city": "Seattle"},
            {"id": "s-2", "name": "Reserve Roastery", "city": "Chicago"},
        ]})
    );
}

#[tokio::test]
async fn test_stores_data_source_rejects_non_array() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stores": []})))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let err = assert_err!(tester.read_data_source("starbucks_stores", json!({})).await);
    assert_eq!(err.to_diagnostic().summary, "Parse Error");
}

#[tokio::test]
async fn test_store_data_source_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stores/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s-1",
            "name": "Pike Place",
            "city": "Seattle",
        })))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let state = tester
        .read_data_source("starbucks_store", json!({"id": "s-1"}))
        .await
        .unwrap();

    assert_eq!(
        state,
        json!({"id": "s-1", "name": "Pike Place", "city": "Seattle", "state": null})
    );
}

#[tokio::test]
async fn test_import_then_read() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/promotions/p-9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "p-9", "active": false})),
        )
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let imported = tester
        .import_resource("starbucks_promotion", "p-9")
        .await
        .unwrap();
    let state = tester
        .read("starbucks_promotion", imported[0].state.clone())
        .await
        .unwrap();

    assert_eq!(state, json!({"id": "p-9", "active": false}));
    assert!(tester.provider().is_configured());
    tester.provider().stop().await.unwrap();
    assert!(tester.provider().is_stopped());
}

#[tokio::test]
async fn test_imported_store_plans_no_changes_for_matching_config() {
    let server = MockServer::start().await;

    let mut remote = store_config("Pike Place");
    remote["id"] = json!("s-9");
    remote["status"] = json!("active");
    remote["has_drive_thru"] = json!(false);
    remote["has_wifi"] = json!(true);
    remote["has_mobile_order"] = json!(true);
    remote["capacity"] = json!(50);

    Mock::given(method("GET"))
        .and(path("/stores/s-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let imported = tester
        .import_resource("starbucks_store", "s-9")
        .await
        .unwrap();
    let state = tester
        .read("starbucks_store", imported[0].state.clone())
        .await
        .unwrap();

    assert_eq!(state["store_number"], "SB-1912");
    assert_eq!(state["capacity"], 50);

    let plan = tester
        .plan_update("starbucks_store", state, store_config("Pike Place"))
        .await
        .unwrap();
    assert!(!plan.requires_replace);
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_imported_inventory_keeps_identity() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/inventory/i-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "i-3",
            "store_id": "s-1",
            "item_sku": "SKU-1",
            "quantity": 7,
        })))
        .mount(&server)
        .await;

    let tester = configured(&server).await;
    let imported = tester
        .import_resource("starbucks_inventory", "i-3")
        .await
        .unwrap();
    let state = tester
        .read("starbucks_inventory", imported[0].state.clone())
        .await
        .unwrap();

    let plan = tester
        .plan_update(
            "starbucks_inventory",
            state,
            json!({"store_id": "s-1", "item_sku": "SKU-1", "quantity": 9}),
        )
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_eq!(plan.changes.len(), 1);
}
