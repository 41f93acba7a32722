// tests/api_tests.rs

use std::sync::Arc;

use forum::{
    config::Config,
    models::user::{NewUser, Provider},
    routes,
    state::AppState,
    store::{ForumStore, MemoryStore},
    utils::{hash::hash_password, jwt::Claims},
};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};

const ADMIN_EMAIL: &str = "admin@forum.test";
const PASSWORD: &str = "password123";
const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let store = Arc::new(MemoryStore::new());

    // Seed an admin account directly in the store
    store
        .create_user(NewUser {
            username: "admin".to_string(),
            email: Some(ADMIN_EMAIL.to_string()),
            password_hash: Some(hash_password(PASSWORD).unwrap()),
            provider: Provider::Local,
            provider_id: None,
            role: "admin".to_string(),
            avatar_url: None,
        })
        .await
        .unwrap();

    let config = Config {
        database_url: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        admin_username: None,
        admin_email: None,
        admin_password: None,
    };

    let state = AppState { store, config };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a fresh user and returns (username, token).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let email = format!("{}@forum.test", username);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "username": username, "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    (username, login(client, address, &email).await)
}

async fn login(client: &reqwest::Client, address: &str, email: &str) -> String {
    let body: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    body["token"].as_str().expect("Token not found").to_string()
}

async fn create_post(client: &reqwest::Client, address: &str, token: &str, title: &str) -> String {
    let body: Value = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(token)
        .json(&json!({ "title": title, "content": "<p>Patch notes discussion</p>" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    body["slug"].as_str().expect("slug missing").to_string()
}

async fn comment(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    slug: &str,
    content: &str,
    parent_id: Option<&str>,
) -> reqwest::Response {
    client
        .post(format!("{}/api/posts/{}/comments", address, slug))
        .bearer_auth(token)
        .json(&json!({ "content": content, "parent_id": parent_id }))
        .send()
        .await
        .unwrap()
}

async fn comment_id(response: reqwest::Response) -> String {
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["comment"]["id"].as_str().unwrap().to_string()
}

async fn list_comments(
    client: &reqwest::Client,
    address: &str,
    token: Option<&str>,
    slug: &str,
) -> Value {
    let mut request = client.get(format!("{}/api/posts/{}/comments", address, slug));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Username too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "username": "yo", "email": "yo@forum.test", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let payload = json!({ "username": "speedrunner", "email": "sr@forum.test", "password": PASSWORD });
    let first = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);
    let user: Value = first.json().await.unwrap();
    assert!(user.get("password_hash").is_none());

    let second = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_wrong_password_and_me_needs_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "nope-nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let anonymous = client
        .get(format!("{}/api/auth/me", address))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let token = login(&client, &address, ADMIN_EMAIL).await;
    let me: Value = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], "admin");
    assert_eq!(me["role"], "admin");
}

#[tokio::test]
async fn comment_tree_with_reactions() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice) = register_and_login(&client, &address).await;
    let (_, bob) = register_and_login(&client, &address).await;

    let slug = create_post(&client, &address, &alice, "Best builds this season").await;
    assert_eq!(slug, "best-builds-this-season");

    let c1 = comment_id(comment(&client, &address, &alice, &slug, "first!", None).await).await;
    let c2 = comment_id(comment(&client, &address, &bob, &slug, "reply", Some(&c1)).await).await;
    let c3 = comment_id(comment(&client, &address, &alice, &slug, "second root", None).await).await;

    // Bob likes c1, Alice dislikes it
    for (token, kind) in [(&bob, "like"), (&alice, "dislike")] {
        let response = client
            .post(format!("{}/api/comments/{}/reaction", address, c1))
            .bearer_auth(token)
            .json(&json!({ "type": kind }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["action"], "added");
    }

    let as_alice = list_comments(&client, &address, Some(&alice), &slug).await;
    let roots = as_alice["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], c1.as_str());
    assert_eq!(roots[1]["id"], c3.as_str());
    assert_eq!(roots[0]["like_count"], 1);
    assert_eq!(roots[0]["dislike_count"], 1);
    assert_eq!(roots[0]["liked_by_me"], false);
    assert_eq!(roots[0]["disliked_by_me"], true);
    assert!(as_alice["me"].is_string());

    let replies = roots[0]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], c2.as_str());
    assert_eq!(replies[0]["like_count"], 0);

    let anonymous = list_comments(&client, &address, None, &slug).await;
    assert!(anonymous["me"].is_null());
    assert_eq!(anonymous["comments"][0]["like_count"], 1);
    assert_eq!(anonymous["comments"][0]["disliked_by_me"], false);
}

#[tokio::test]
async fn comment_rules() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice) = register_and_login(&client, &address).await;
    let (_, bob) = register_and_login(&client, &address).await;

    let first = create_post(&client, &address, &alice, "Raid night").await;
    let second = create_post(&client, &address, &alice, "Raid night").await;
    assert_eq!(second, "raid-night-1");

    // Anonymous writes are rejected
    let response = client
        .post(format!("{}/api/posts/{}/comments", address, first))
        .json(&json!({ "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Empty content
    let response = comment(&client, &address, &alice, &first, "   ", None).await;
    assert_eq!(response.status().as_u16(), 400);

    // Parent from another post
    let foreign = comment_id(comment(&client, &address, &alice, &second, "elsewhere", None).await).await;
    let response = comment(&client, &address, &bob, &first, "reply", Some(&foreign)).await;
    assert_eq!(response.status().as_u16(), 400);

    // Unknown post
    let response = comment(&client, &address, &bob, "no-such-post", "hello", None).await;
    assert_eq!(response.status().as_u16(), 404);

    // Delete permissions; the reply survives as a root
    let root = comment_id(comment(&client, &address, &alice, &first, "root", None).await).await;
    let reply = comment_id(comment(&client, &address, &bob, &first, "reply", Some(&root)).await).await;

    let response = client
        .delete(format!("{}/api/comments/{}", address, root))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .delete(format!("{}/api/comments/{}", address, root))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let listing = list_comments(&client, &address, None, &first).await;
    let roots = listing["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], reply.as_str());

    // Unknown reaction type
    let response = client
        .post(format!("{}/api/comments/{}/reaction", address, reply))
        .bearer_auth(&alice)
        .json(&json!({ "type": "love" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn post_reaction_toggle_cycle() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice) = register_and_login(&client, &address).await;
    let slug = create_post(&client, &address, &alice, "Tier list").await;

    let react = |kind: &'static str| {
        let client = client.clone();
        let url = format!("{}/api/posts/{}/reaction", address, slug);
        let token = alice.clone();
        async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "type": kind }))
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    };

    let added = react("like").await;
    assert_eq!(added["action"], "added");
    assert_eq!(added["like_count"], 1);
    assert_eq!(added["liked_by_me"], true);

    let updated = react("dislike").await;
    assert_eq!(updated["action"], "updated");
    assert_eq!(updated["like_count"], 0);
    assert_eq!(updated["dislike_count"], 1);
    assert_eq!(updated["disliked_by_me"], true);

    let removed = react("dislike").await;
    assert_eq!(removed["action"], "removed");
    assert_eq!(removed["dislike_count"], 0);

    // Legacy like toggle
    let liked: Value = client
        .post(format!("{}/api/posts/{}/like", address, slug))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(liked["liked"], true);

    let detail: Value = client
        .get(format!("{}/api/posts/{}", address, slug))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["post"]["title"], "Tier list");
    assert_eq!(detail["reactions"]["like_count"], 1);
    assert_eq!(detail["reactions"]["liked_by_me"], true);
}

#[tokio::test]
async fn categories_and_tags() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice) = register_and_login(&client, &address).await;
    let admin = login(&client, &address, ADMIN_EMAIL).await;

    // Regular users cannot create categories
    let response = client
        .post(format!("{}/api/forum/categories", address))
        .bearer_auth(&alice)
        .json(&json!({ "title": "Shooters" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let category: Value = client
        .post(format!("{}/api/forum/categories", address))
        .bearer_auth(&admin)
        .json(&json!({ "title": "Шутеры", "description": "FPS talk" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(category["slug"], "shutery");

    let tag: Value = client
        .post(format!("{}/api/forum/tags", address))
        .bearer_auth(&admin)
        .json(&json!({ "name": "guide" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(&alice)
        .json(&json!({
            "title": "Recoil control",
            "content": "<p>Pull down</p><script>alert(1)</script>",
            "category_id": category["id"],
            "tag_ids": [tag["id"]],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    create_post(&client, &address, &alice, "Off topic").await;

    let listing: Value = client
        .get(format!("{}/api/posts?category=shutery", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let posts = listing["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "Recoil control");
    assert_eq!(posts[0]["content"], "<p>Pull down</p>");
    assert_eq!(posts[0]["category"]["title"], "Шутеры");
    assert_eq!(posts[0]["tags"][0]["name"], "guide");

    let all: Value = client
        .get(format!("{}/api/posts", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all["posts"].as_array().unwrap().len(), 2);

    let detail: Value = client
        .get(format!("{}/api/forum/categories/shutery", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["title"], "Шутеры");
    assert_eq!(detail["posts"].as_array().unwrap().len(), 1);

    let missing = client
        .get(format!("{}/api/forum/categories/nope", address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_writes_check_the_stored_role() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice) = register_and_login(&client, &address).await;

    let me: Value = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Token still says admin, the account does not
    let claims = Claims {
        sub: me["id"].as_str().unwrap().to_string(),
        role: "admin".to_string(),
        email: None,
        exp: usize::MAX / 2,
    };
    let stale = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let category = client
        .post(format!("{}/api/forum/categories", address))
        .bearer_auth(&stale)
        .json(&json!({ "title": "Speedruns" }))
        .send()
        .await
        .unwrap();
    assert_eq!(category.status().as_u16(), 403);

    let tag = client
        .post(format!("{}/api/forum/tags", address))
        .bearer_auth(&stale)
        .json(&json!({ "name": "any%" }))
        .send()
        .await
        .unwrap();
    assert_eq!(tag.status().as_u16(), 403);
}

#[tokio::test]
async fn long_cyrillic_titles_get_bounded_slugs() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice) = register_and_login(&client, &address).await;
    let title = "щ".repeat(200);

    let first = create_post(&client, &address, &alice, &title).await;
    let second = create_post(&client, &address, &alice, &title).await;

    assert_eq!(first.len(), 210);
    assert!(first.starts_with("schsch"));
    assert_eq!(second, format!("{}-1", first));
}

#[tokio::test]
async fn simultaneous_reactions_toggle_instead_of_conflicting() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice) = register_and_login(&client, &address).await;
    let slug = create_post(&client, &address, &alice, "Double click").await;

    let url = format!("{}/api/posts/{}/reaction", address, slug);
    let send = || {
        client
            .post(&url)
            .bearer_auth(&alice)
            .json(&json!({ "type": "like" }))
            .send()
    };
    let (a, b) = tokio::join!(send(), send());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.status().as_u16(), 200);
    assert_eq!(b.status().as_u16(), 200);

    let a: Value = a.json().await.unwrap();
    let b: Value = b.json().await.unwrap();
    let mut actions = vec![
        a["action"].as_str().unwrap().to_string(),
        b["action"].as_str().unwrap().to_string(),
    ];
    actions.sort();
    assert_eq!(actions, vec!["added", "removed"]);
}

