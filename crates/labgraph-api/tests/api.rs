//! End-to-end tests through the router against an in-memory graph.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{app, get, post, seeded_store};
use labgraph_core::EntityType;

fn using_payload() -> serde_json::Value {
    json!({
        "object": "relationships",
        "relationships": [{
            "relationshipType": "USING",
            "sourceEntityType": "Researcher",
            "sourceEntityId": "7",
            "destinationEntityType": "Product",
            "destinationEntityId": "2"
        }]
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let store = seeded_store();
    let (status, body) = get(app(&store), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn properties_update_succeeds() {
    let store = seeded_store();
    let (status, body) = post(
        app(&store),
        "/entity/lab/3",
        json!({
            "object": "properties",
            "entityType": "Lab",
            "entityId": "3",
            "properties": { "labName": "Optics Lab" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entityId"], "3");
    let lab = store.entity(EntityType::Lab, "3").unwrap().unwrap();
    assert_eq!(lab["labName"], "Optics Lab");
}

#[tokio::test]
async fn properties_with_mismatched_id_are_rejected() {
    let store = seeded_store();
    let (status, body) = post(
        app(&store),
        "/entity/lab/3",
        json!({
            "object": "properties",
            "entityType": "Lab",
            "entityId": "4",
            "properties": { "labName": "Optics Lab" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("entity id does not match route's entity id"));
    let lab = store.entity(EntityType::Lab, "3").unwrap().unwrap();
    assert_eq!(lab["labName"], "Photonics");
}

#[tokio::test]
async fn duplicate_relationship_is_rejected() {
    let store = seeded_store();

    let (status, body) = post(app(&store), "/entity/researcher/7", using_payload()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["relationshipsCreated"], 1);

    let (status, body) = post(app(&store), "/entity/researcher/7", using_payload()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
    assert_eq!(store.relationship_count().unwrap(), 1);
}

#[tokio::test]
async fn repeated_relationship_in_one_request_is_rejected() {
    let store = seeded_store();
    let mut payload = using_payload();
    let edge = payload["relationships"][0].clone();
    payload["relationships"] = json!([edge.clone(), edge]);

    let (status, body) = post(app(&store), "/entity/researcher/7", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
    assert_eq!(store.relationship_count().unwrap(), 0);
}

#[tokio::test]
async fn repeated_relationship_of_new_entity_is_rejected() {
    let store = seeded_store();
    let part_of = json!({
        "relationshipType": "PART_OF",
        "sourceEntityType": "Lab",
        "sourceEntityId": "-1",
        "destinationEntityType": "Faculty",
        "destinationEntityId": "1"
    });
    let (status, body) = post(
        app(&store),
        "/entity/lab",
        json!({
            "object": "entity",
            "entityType": "Lab",
            "entityId": -1,
            "properties": { "labName": "Quantum Lab" },
            "relationships": [part_of.clone(), part_of]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
    assert!(store.entity(EntityType::Lab, "4").unwrap().is_none());
    assert_eq!(store.relationship_count().unwrap(), 0);
}

#[tokio::test]
async fn relationship_can_be_posted_from_either_endpoint() {
    let store = seeded_store();
    let (status, _) = post(app(&store), "/entity/product/2", using_payload()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, page) = get(app(&store), "/entity/product/2").await;
    assert_eq!(page["Researchers"][0]["researcherId"], "7");
}

#[tokio::test]
async fn reversed_direction_is_rejected() {
    let store = seeded_store();
    let (status, body) = post(
        app(&store),
        "/entity/researcher/7",
        json!({
            "object": "relationships",
            "relationships": [{
                "relationshipType": "using",
                "sourceEntityType": "Product",
                "sourceEntityId": "2",
                "destinationEntityType": "Researcher",
                "destinationEntityId": "7"
            }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("reversed"));
    assert_eq!(store.relationship_count().unwrap(), 0);
}

#[tokio::test]
async fn self_loop_is_rejected() {
    let store = seeded_store();
    store
        .insert_entity(EntityType::Researcher, "8", json!({}))
        .unwrap();
    let (status, _) = post(
        app(&store),
        "/entity/researcher/7",
        json!({
            "object": "relationships",
            "relationships": [{
                "relationshipType": "USING",
                "sourceEntityType": "Researcher",
                "sourceEntityId": "7",
                "destinationEntityType": "Researcher",
                "destinationEntityId": "8"
            }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_property_is_rejected() {
    let store = seeded_store();
    let (status, body) = post(
        app(&store),
        "/entity/lab/3",
        json!({
            "object": "properties",
            "entityType": "Lab",
            "entityId": "3",
            "properties": { "labBudget": "1000000" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("labBudget"));
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let store = seeded_store();
    for body in [
        json!({ "object": "teleport" }),
        json!({ "entityType": "Lab" }),
        json!([1, 2, 3]),
    ] {
        let (status, response) = post(app(&store), "/entity/lab/3", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["status"], 400);
    }
}

#[tokio::test]
async fn unknown_entity_type_is_not_found_everywhere() {
    let store = seeded_store();
    for uri in [
        "/scheme/Widget",
        "/entity/Widget",
        "/entity/Widget/1",
        "/search/Widget?q=a",
    ] {
        let (status, body) = get(app(&store), uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body["message"].as_str().unwrap().contains("Widget"));
    }

    let (status, _) = post(
        app(&store),
        "/entity/Widget",
        json!({ "object": "entity", "entityType": "Widget", "entityId": "-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(app(&store), "/entity/Widget/1", using_payload()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entity_creation_assigns_next_id_and_links() {
    let store = seeded_store();
    let (status, body) = post(
        app(&store),
        "/entity/lab",
        json!({
            "object": "entity",
            "entityType": "Lab",
            "entityId": -1,
            "properties": { "labName": "Quantum Lab" },
            "relationships": [{
                "relationshipType": "PART_OF",
                "sourceEntityType": "Lab",
                "sourceEntityId": "-1",
                "destinationEntityType": "Faculty",
                "destinationEntityId": "1"
            }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["entityId"], "4");
    assert_eq!(body["relationshipsCreated"], 1);

    let (status, page) = get(app(&store), "/entity/lab/4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["Lab"]["labName"], "Quantum Lab");
    assert_eq!(page["Faculty"][0]["facultyName"], "Physics");
}

#[tokio::test]
async fn page_document_groups_recommendations() {
    let store = seeded_store();
    let (status, page) = get(app(&store), "/entity/researcher/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["Researcher"]["researcherName"], "Ada Lovelace");
    assert!(page["recommendations"].is_object());

    let (status, body) = get(app(&store), "/entity/researcher/70").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Researcher with id 70 not found");
}

#[tokio::test]
async fn list_and_search() {
    let store = seeded_store();
    let (status, all) = get(app(&store), "/entity/PRODUCT").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, hits) = get(app(&store), "/search/researcher?q=love").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["researcherId"], "7");

    let (_, none) = get(app(&store), "/search/researcher?q=turing").await;
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn schemes_are_served() {
    let store = seeded_store();
    let (status, schemes) = get(app(&store), "/scheme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schemes.as_array().unwrap().len(), 8);

    let (status, lab) = get(app(&store), "/scheme/lab").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lab["idField"], "labId");
    assert_eq!(lab["entityType"], "Lab");
}
