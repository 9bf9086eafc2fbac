//! End-to-end credential rotation: the concrete alice scenario, salt replay
//! rejection, session requirements, and resilience to aborted uploads.

mod common;

use common::TestServer;
use filedock::auth::{derive_verifier, SrpParameters};

async fn login(
    client: &reqwest::Client,
    api: &str,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{api}/login"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn alice_rotates_her_password() {
    let server = TestServer::spawn(|_| {}).await;
    let params = SrpParameters::default();

    // Authenticate with the current password.
    let client = common::client();
    let res = login(&client, &server.api, "alice", "oldpw").await;
    assert_eq!(res.status(), 200);

    // Client-side derivation; the new password never goes on the wire.
    let record = derive_verifier(&params, "alice", "NewPass1!");
    let res = client
        .post(format!("{}/change_my_srp", server.api))
        .json(&serde_json::json!({
            "salt": hex::encode(&record.salt),
            "verifier": record.verifier,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // The old password is dead, the new one works.
    let old = login(&common::client(), &server.api, "alice", "oldpw").await;
    assert_eq!(old.status(), 401);
    let new = login(&common::client(), &server.api, "alice", "NewPass1!").await;
    assert_eq!(new.status(), 200);
}

#[tokio::test]
async fn rotation_requires_a_session() {
    let server = TestServer::spawn(|_| {}).await;
    let params = SrpParameters::default();

    let record = derive_verifier(&params, "alice", "NewPass1!");
    let res = common::client()
        .post(format!("{}/change_my_srp", server.api))
        .json(&serde_json::json!({
            "salt": hex::encode(&record.salt),
            "verifier": record.verifier,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "session expired");

    // The account is untouched.
    let res = login(&common::client(), &server.api, "alice", "oldpw").await;
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn replayed_salt_is_rejected() {
    let server = TestServer::spawn(|_| {}).await;
    let params = SrpParameters::default();

    let client = common::client();
    assert_eq!(login(&client, &server.api, "alice", "oldpw").await.status(), 200);

    let record = derive_verifier(&params, "alice", "NewPass1!");
    let payload = serde_json::json!({
        "salt": hex::encode(&record.salt),
        "verifier": record.verifier,
    });

    let first = client
        .post(format!("{}/change_my_srp", server.api))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    // Same salt again: a captured derivation must not be replayable.
    let replay = client
        .post(format!("{}/change_my_srp", server.api))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 409);
    let body: serde_json::Value = replay.json().await.unwrap();
    assert_eq!(body["error"], "salt reuse rejected");

    // Still exactly one usable credential: the rotated one.
    assert_eq!(login(&common::client(), &server.api, "alice", "NewPass1!").await.status(), 200);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let server = TestServer::spawn(|_| {}).await;
    let params = SrpParameters::default();
    let client = common::client();

    assert_eq!(login(&client, &server.api, "alice", "oldpw").await.status(), 200);
    let res = client.post(format!("{}/logout", server.api)).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let record = derive_verifier(&params, "alice", "NewPass1!");
    let res = client
        .post(format!("{}/change_my_srp", server.api))
        .json(&serde_json::json!({
            "salt": hex::encode(&record.salt),
            "verifier": record.verifier,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn aborted_upload_leaves_the_server_serving() {
    use tokio::io::AsyncWriteExt;

    let server = TestServer::spawn(|_| {}).await;

    // Announce a large body, send a fragment, vanish.
    let mut socket = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    let head = format!(
        "POST {}/login HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: 100000\r\n\r\n",
        server.config.api.prefix, server.addr
    );
    socket.write_all(head.as_bytes()).await.unwrap();
    socket.write_all(b"{\"user").await.unwrap();
    drop(socket);

    // A benign fault, not an incident: the server keeps accepting requests.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let res = common::client()
        .get(format!("{}/get_status", server.api))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn status_reports_identity_after_login() {
    let server = TestServer::spawn(|_| {}).await;
    let client = common::client();

    let anonymous: serde_json::Value = client
        .get(format!("{}/get_status", server.api))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(anonymous["username"].is_null());

    assert_eq!(login(&client, &server.api, "alice", "oldpw").await.status(), 200);
    let named: serde_json::Value = client
        .get(format!("{}/get_status", server.api))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(named["username"], "alice");
}
