//! HTTP contract tests: the router is served on an ephemeral port and driven
//! with a real client, so status codes, response bodies and header handling
//! are exercised exactly as a caller would see them.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tempfile::TempDir;

use rollcall::config::SecretKey;
use rollcall::identity::{Authenticator, TokenCodec};
use rollcall::roster::RosterStore;
use rollcall::server::{router, AppState};

struct TestServer {
    base: String,
    client: reqwest::Client,
    _tmp: TempDir,
}

impl TestServer {
    async fn spawn() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let store = Arc::new(RosterStore::open(tmp.path())?);
        let codec = TokenCodec::new(&SecretKey::generate()?, 60);
        let auth = Arc::new(Authenticator::new(codec, store.clone()));
        let app = router(AppState { store, auth });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server error: {e:?}");
            }
        });

        Ok(Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            _tmp: tmp,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<(u16, Value)> {
        let resp = self.client.post(format!("{}{}", self.base, path)).json(&body).send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await.context("response body is not JSON")?))
    }

    async fn get_with(&self, path: &str, token: Option<&str>) -> Result<(u16, Value)> {
        let mut req = self.client.get(format!("{}{}", self.base, path));
        if let Some(t) = token {
            req = req.header("Authorization", t);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await.context("response body is not JSON")?))
    }

    async fn put_with(&self, path: &str, token: Option<&str>) -> Result<(u16, Value)> {
        let mut req = self.client.put(format!("{}{}", self.base, path));
        if let Some(t) = token {
            req = req.header("Authorization", t);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await.context("response body is not JSON")?))
    }

    async fn delete_with(&self, path: &str, token: Option<&str>) -> Result<(u16, Value)> {
        let mut req = self.client.delete(format!("{}{}", self.base, path));
        if let Some(t) = token {
            req = req.header("Authorization", t);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await.context("response body is not JSON")?))
    }

    /// Register the falcons group plus one scout and one leader, and return
    /// their login tokens.
    async fn seed_and_login(&self) -> Result<(String, String)> {
        let (status, _) = self.post("/group", json!({"name": "falcons"})).await?;
        assert_eq!(status, 200);

        let scout = json!({
            "name": "Ada", "email": "ada@example.org",
            "password_hash": "a".repeat(64), "age": 12, "group": "falcons"
        });
        let (status, _) = self.post("/scout", scout).await?;
        assert_eq!(status, 200);

        let leader = json!({
            "name": "Grace", "email": "grace@example.org",
            "password_hash": "b".repeat(64), "group": "falcons"
        });
        let (status, _) = self.post("/leader", leader).await?;
        assert_eq!(status, 200);

        let creds = json!({"email": "ada@example.org", "password_hash": "a".repeat(64)});
        let (status, body) = self.post("/login?role=scout", creds).await?;
        assert_eq!(status, 200);
        let scout_token = body["token"].as_str().context("missing scout token")?.to_string();

        let creds = json!({"email": "grace@example.org", "password_hash": "b".repeat(64)});
        let (status, body) = self.post("/login?role=leader", creds).await?;
        assert_eq!(status, 200);
        let leader_token = body["token"].as_str().context("missing leader token")?.to_string();

        Ok((scout_token, leader_token))
    }
}

#[tokio::test]
async fn register_login_and_read_own_record() -> Result<()> {
    let srv = TestServer::spawn().await?;
    let (scout_token, leader_token) = srv.seed_and_login().await?;

    let (status, body) = srv.get_with("/scout/name", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Ada");

    let (status, body) = srv.get_with("/scout/group", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(body["group"], "falcons");

    let (status, body) = srv.get_with("/leader/name", Some(&leader_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Grace");
    Ok(())
}

#[tokio::test]
async fn login_rejections_share_one_body() -> Result<()> {
    let srv = TestServer::spawn().await?;
    srv.seed_and_login().await?;

    let unknown = json!({"email": "ghost@example.org", "password_hash": "a".repeat(64)});
    let wrong_pwd = json!({"email": "ada@example.org", "password_hash": "x".repeat(64)});
    let wrong_role = json!({"email": "ada@example.org", "password_hash": "a".repeat(64)});

    let (s1, b1) = srv.post("/login?role=scout", unknown).await?;
    let (s2, b2) = srv.post("/login?role=scout", wrong_pwd).await?;
    let (s3, b3) = srv.post("/login?role=leader", wrong_role).await?;

    assert_eq!(s1, 403);
    assert_eq!(s2, 403);
    assert_eq!(s3, 403);
    assert_eq!(b1, b2);
    assert_eq!(b2, b3);
    Ok(())
}

#[tokio::test]
async fn protected_routes_deny_uniformly() -> Result<()> {
    let srv = TestServer::spawn().await?;
    let (scout_token, _) = srv.seed_and_login().await?;

    // Missing token, garbage token and a wrong-role token all produce the
    // same 403 body as a failed login.
    let (s1, b1) = srv.get_with("/scout/name", None).await?;
    let (s2, b2) = srv.get_with("/scout/name", Some("not-a-token")).await?;
    let (s3, b3) = srv.get_with("/leader/name", Some(&scout_token)).await?;

    assert_eq!(s1, 403);
    assert_eq!(s2, 403);
    assert_eq!(s3, 403);
    assert_eq!(b1, b2);
    assert_eq!(b2, b3);
    assert_eq!(b1["code"], "access_denied");
    Ok(())
}

#[tokio::test]
async fn group_routes_gate_on_current_group() -> Result<()> {
    let srv = TestServer::spawn().await?;
    let (_, leader_token) = srv.seed_and_login().await?;
    let (status, _) = srv.post("/group", json!({"name": "otters"})).await?;
    assert_eq!(status, 200);

    // falcons is group 1, otters is group 2; Grace leads falcons.
    let (status, body) = srv.get_with("/group/1/scouts", Some(&leader_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(body["scouts"], json!([1]));

    let (status, body) = srv.get_with("/group/2/scouts", Some(&leader_token)).await?;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "access_denied");

    // Reassign Grace to otters; the same token now opens group 2, not 1.
    let (status, _) = srv.put_with("/leader/group?group=otters", Some(&leader_token)).await?;
    assert_eq!(status, 200);
    let (status, _) = srv.get_with("/group/2/leaders", Some(&leader_token)).await?;
    assert_eq!(status, 200);
    let (status, _) = srv.get_with("/group/1/leaders", Some(&leader_token)).await?;
    assert_eq!(status, 403);
    Ok(())
}

#[tokio::test]
async fn subject_comes_from_the_token_not_the_request() -> Result<()> {
    let srv = TestServer::spawn().await?;
    let (scout_token, _) = srv.seed_and_login().await?;

    let other = json!({
        "name": "Bea", "email": "bea@example.org",
        "password_hash": "c".repeat(64), "age": 13, "group": "falcons"
    });
    let (status, _) = srv.post("/scout", other).await?;
    assert_eq!(status, 200);

    // A rename through Ada's token touches Ada's record only; there is no
    // way to address Bea's record with it.
    let (status, _) = srv.put_with("/scout/name?name=Renamed", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    let (status, body) = srv.get_with("/scout/name", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Renamed");

    let creds = json!({"email": "bea@example.org", "password_hash": "c".repeat(64)});
    let (_, body) = srv.post("/login?role=scout", creds).await?;
    let bea_token = body["token"].as_str().context("missing token")?.to_string();
    let (status, body) = srv.get_with("/scout/name", Some(&bea_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Bea");
    Ok(())
}

#[tokio::test]
async fn badges_are_managed_through_the_scout_token() -> Result<()> {
    let srv = TestServer::spawn().await?;
    let (scout_token, leader_token) = srv.seed_and_login().await?;

    let (status, body) = srv.get_with("/scout/mb", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(body["badges"], json!([]));

    let (status, _) = srv.put_with("/scout/mb?name=First%20Aid", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    let (status, _) = srv.put_with("/scout/mb?name=Camping", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    let (_, body) = srv.get_with("/scout/mb", Some(&scout_token)).await?;
    assert_eq!(body["badges"], json!(["First Aid", "Camping"]));

    let (status, _) = srv.delete_with("/scout/mb?name=First%20Aid", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    let (_, body) = srv.get_with("/scout/mb", Some(&scout_token)).await?;
    assert_eq!(body["badges"], json!(["Camping"]));

    // Removing a badge the scout does not hold is a 400, missing the name
    // parameter likewise, and a leader token does not open the route.
    let (status, _) = srv.delete_with("/scout/mb?name=Swimming", Some(&scout_token)).await?;
    assert_eq!(status, 400);
    let (status, _) = srv.put_with("/scout/mb", Some(&scout_token)).await?;
    assert_eq!(status, 400);
    let (status, body) = srv.get_with("/scout/mb", Some(&leader_token)).await?;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "access_denied");
    Ok(())
}

#[tokio::test]
async fn requirements_carry_their_rank() -> Result<()> {
    let srv = TestServer::spawn().await?;
    let (scout_token, _) = srv.seed_and_login().await?;

    let (status, _) = srv.put_with("/scout/req?name=Knots&rank=Tenderfoot", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    let (status, _) = srv.put_with("/scout/req?name=Knots&rank=Second%20Class", Some(&scout_token)).await?;
    assert_eq!(status, 200);

    let (status, body) = srv.get_with("/scout/req", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    assert_eq!(
        body["requirements"],
        json!([
            {"name": "Knots", "rank": "Tenderfoot"},
            {"name": "Knots", "rank": "Second Class"}
        ])
    );

    // Removal is keyed on the (name, rank) pair.
    let (status, _) = srv.delete_with("/scout/req?name=Knots&rank=Tenderfoot", Some(&scout_token)).await?;
    assert_eq!(status, 200);
    let (status, _) = srv.delete_with("/scout/req?name=Knots&rank=Tenderfoot", Some(&scout_token)).await?;
    assert_eq!(status, 400);
    let (_, body) = srv.get_with("/scout/req", Some(&scout_token)).await?;
    assert_eq!(body["requirements"], json!([{"name": "Knots", "rank": "Second Class"}]));

    // The rank parameter is mandatory.
    let (status, _) = srv.put_with("/scout/req?name=Knots", Some(&scout_token)).await?;
    assert_eq!(status, 400);
    Ok(())
}

#[tokio::test]
async fn malformed_requests_get_400() -> Result<()> {
    let srv = TestServer::spawn().await?;
    srv.seed_and_login().await?;

    // Bad role selector.
    let creds = json!({"email": "ada@example.org", "password_hash": "a".repeat(64)});
    let (status, _) = srv.post("/login?role=admin", creds.clone()).await?;
    assert_eq!(status, 400);
    let (status, _) = srv.post("/login", creds).await?;
    assert_eq!(status, 400);

    // Missing field.
    let (status, body) = srv.post("/login?role=scout", json!({"email": "ada@example.org"})).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "bad_request");

    // Validation failures on registration.
    let bad_hash = json!({
        "name": "Eve", "email": "eve@example.org",
        "password_hash": "short", "age": 12, "group": "falcons"
    });
    let (status, _) = srv.post("/scout", bad_hash).await?;
    assert_eq!(status, 400);

    let bad_age = json!({
        "name": "Eve", "email": "eve@example.org",
        "password_hash": "e".repeat(64), "age": 42, "group": "falcons"
    });
    let (status, _) = srv.post("/scout", bad_age).await?;
    assert_eq!(status, 400);

    // Unknown group on registration maps to 400 as well.
    let no_group = json!({
        "name": "Eve", "email": "eve@example.org",
        "password_hash": "e".repeat(64), "age": 12, "group": "nowhere"
    });
    let (status, _) = srv.post("/scout", no_group).await?;
    assert_eq!(status, 400);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected_across_roles() -> Result<()> {
    let srv = TestServer::spawn().await?;
    srv.seed_and_login().await?;

    // ada@example.org is a scout; a leader with the same email is refused.
    let leader = json!({
        "name": "Imposter", "email": "ada@example.org",
        "password_hash": "z".repeat(64), "group": "falcons"
    });
    let (status, body) = srv.post("/leader", leader).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "bad_request");
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_share_one_server() -> Result<()> {
    let srv = TestServer::spawn().await?;
    let (scout_token, leader_token) = srv.seed_and_login().await?;

    let reads = (0..16).map(|i| {
        let token = if i % 2 == 0 { scout_token.clone() } else { leader_token.clone() };
        let path = if i % 2 == 0 { "/scout/name" } else { "/leader/name" };
        let srv = &srv;
        async move { srv.get_with(path, Some(&token)).await }
    });
    for result in futures::future::join_all(reads).await {
        let (status, _) = result?;
        assert_eq!(status, 200);
    }
    Ok(())
}
