mod support;

async fn create_match(body: serde_json::Value) -> reqwest::Response {
    let base_url = support::ensure_server();
    reqwest::Client::new()
        .post(format!("{base_url}/matches"))
        .json(&body)
        .send()
        .await
        .expect("request should succeed")
}

#[tokio::test]
async fn when_match_is_created_then_its_id_is_echoed() {
    let match_id = format!("test-{}", uuid::Uuid::new_v4());

    let res = create_match(serde_json::json!({ "match_id": match_id })).await;

    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["match_id"], match_id);
}

#[tokio::test]
async fn when_match_id_is_blank_then_one_is_generated() {
    let res = create_match(serde_json::json!({ "match_id": "   " })).await;

    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("json body");
    let generated = body["match_id"].as_str().expect("match id string");
    assert!(generated.starts_with("m-"));
}

#[tokio::test]
async fn when_match_id_is_taken_then_conflict_is_returned() {
    let match_id = format!("test-{}", uuid::Uuid::new_v4());
    let first = create_match(serde_json::json!({ "match_id": match_id })).await;
    assert_eq!(first.status(), reqwest::StatusCode::CREATED);

    let second = create_match(serde_json::json!({ "match_id": match_id })).await;

    assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
    let body: serde_json::Value = second.json().await.expect("json body");
    assert_eq!(body["error"], "match already exists");
}
