//! API integration tests
//!
//! These run against a live server with a seeded admin staff account
//! (ADMIN_EMAIL / ADMIN_PASSWORD below). Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";
const ADMIN_EMAIL: &str = "admin@openshelf.org";
const ADMIN_PASSWORD: &str = "admin-password";

/// Log in as the seeded admin and return the bearer token
async fn admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a fresh member and return (id, email, token)
async fn register_member(client: &Client) -> (String, String, String) {
    let email = format!("member-{}@example.org", Uuid::new_v4());
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "first_name": "Test",
            "last_name": "Member",
            "email": email,
            "password": "correct horse battery"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let id = body["data"]["id"].as_str().expect("No id").to_string();
    let token = body["token"].as_str().expect("No token").to_string();
    (id, email, token)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let client = Client::new();
    let (_, email, _) = register_member(&client).await;

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "correct horse battery"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["data"]["email"], email.as_str());
}

#[tokio::test]
#[ignore]
async fn test_login_wrong_password() {
    let client = Client::new();
    let (_, email, _) = register_member(&client).await;

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "not the password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
#[ignore]
async fn test_login_unknown_email_is_indistinguishable() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "nobody@example.org",
            "password": "whatever else"
        }))
        .send()
        .await
        .expect("Failed to send request");

    // Same status and code as a wrong password.
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_conflicts() {
    let client = Client::new();
    let (_, email, _) = register_member(&client).await;

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "first_name": "Other",
            "last_name": "Member",
            "email": email,
            "password": "another password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "EMAIL_ALREADY_EXISTS");
}

#[tokio::test]
#[ignore]
async fn test_me_with_bearer_token() {
    let client = Client::new();
    let (id, email, token) = register_member(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["email"], email.as_str());
}

#[tokio::test]
#[ignore]
async fn test_me_without_credentials() {
    let client = Client::new();

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "NOT_AUTHENTICATED");
}

#[tokio::test]
#[ignore]
async fn test_session_cookie_authenticates() {
    let client = Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client");
    let (_, email, _) = register_member(&client).await;

    // Login sets the session cookie on this client.
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "correct horse battery" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // No Authorization header: the cookie alone must resolve.
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Logout destroys the server-side session.
    let response = client
        .post(format!("{}/auth/logout", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_password_change_invalidates_old_token() {
    let client = Client::new();
    let (_, email, token) = register_member(&client).await;

    let response = client
        .put(format!("{}/auth/password", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "current_password": "correct horse battery",
            "new_password": "an entirely new one"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // The pre-change token must stop working.
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    // The new password logs in.
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "an entirely new one" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_forgot_password_never_discloses() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/forgot-password", BASE_URL))
        .json(&json!({ "email": "nobody@example.org" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_list_users() {
    let client = Client::new();
    let (_, _, token) = register_member(&client).await;

    let response = client
        .get(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "STAFF_REQUIRED");
}

#[tokio::test]
#[ignore]
async fn test_library_card_is_immutable() {
    let client = Client::new();
    let (id, _, token) = register_member(&client).await;

    let response = client
        .put(format!("{}/users/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "library_card": "LIB2600001" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "IMMUTABLE_FIELD");
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, _, _) = register_member(&client).await;
    let book_id = Uuid::new_v4();

    // Issue with the default loan period.
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower_id": member_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "active");
    let loan_id = body["id"].as_str().expect("No loan id").to_string();

    // The same book cannot be lent again while open.
    let (other_member, _, _) = register_member(&client).await;
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower_id": other_member, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "BOOK_UNAVAILABLE");

    // Return it.
    let response = client
        .put(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["result"], "returned");

    // A second return reports the no-op instead of failing.
    let response = client
        .put(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["result"], "already_returned");

    // Once returned the book is lendable again.
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower_id": other_member, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_overdue_status_is_derived() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, _, _) = register_member(&client).await;

    // Issue already past due.
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "borrower_id": member_id,
            "book_id": Uuid::new_v4(),
            "due_at": "2020-01-01T00:00:00Z"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "overdue");
    let loan_id = body["id"].as_str().expect("No loan id").to_string();

    // It shows up in the overdue listing.
    let response = client
        .get(format!("{}/loans/overdue", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let ids: Vec<&str> = body
        .as_array()
        .expect("Expected array")
        .iter()
        .filter_map(|l| l["id"].as_str())
        .collect();
    assert!(ids.contains(&loan_id.as_str()));
}

#[tokio::test]
#[ignore]
async fn test_borrowing_limit_enforced() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, _, _) = register_member(&client).await;

    // Regular tier allows 5 open loans.
    for _ in 0..5 {
        let response = client
            .post(format!("{}/loans", BASE_URL))
            .header("Authorization", format!("Bearer {}", admin))
            .json(&json!({ "borrower_id": member_id, "book_id": Uuid::new_v4() }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 201);
    }

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower_id": member_id, "book_id": Uuid::new_v4() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "BORROWING_LIMIT_REACHED");
}

#[tokio::test]
#[ignore]
async fn test_concurrent_issues_for_same_book() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let client = client.clone();
        let admin = admin.clone();
        let (member_id, _, _) = register_member(&client).await;
        handles.push(tokio::spawn(async move {
            client
                .post(format!("{}/loans", BASE_URL))
                .header("Authorization", format!("Bearer {}", admin))
                .json(&json!({ "borrower_id": member_id, "book_id": book_id }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.expect("task panicked") == 201 {
            created += 1;
        }
    }
    // Exactly one of the racing issues may win.
    assert_eq!(created, 1);
}

#[tokio::test]
#[ignore]
async fn test_delete_member_with_returned_history() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, _, _) = register_member(&client).await;

    // Issue and return a loan so the member has lending history.
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower_id": member_id, "book_id": Uuid::new_v4() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_str().expect("No loan id").to_string();

    let response = client
        .put(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Returned history must not block deletion.
    let response = client
        .delete(format!("{}/users/{}", BASE_URL, member_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/users/{}", BASE_URL, member_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_delete_member_with_open_loan_requires_force() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, _, _) = register_member(&client).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower_id": member_id, "book_id": Uuid::new_v4() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // An open loan refuses the delete.
    let response = client
        .delete(format!("{}/users/{}", BASE_URL, member_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error_code"], "USER_HAS_ACTIVE_LOANS");

    // The admin override removes the member and their loans together.
    let response = client
        .delete(format!("{}/users/{}?force=true", BASE_URL, member_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_registrations_draw_distinct_cards() {
    let client = Client::new();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let email = format!("member-{}@example.org", Uuid::new_v4());
            let response = client
                .post(format!("{}/auth/register", BASE_URL))
                .json(&json!({
                    "first_name": "Race",
                    "last_name": "Member",
                    "email": email,
                    "password": "correct horse battery"
                }))
                .send()
                .await
                .expect("Failed to send request");
            assert_eq!(response.status(), 201);
            let body: Value = response.json().await.expect("Failed to parse response");
            body["data"]["library_card"]
                .as_str()
                .expect("No library card")
                .to_string()
        }));
    }

    let mut cards = std::collections::HashSet::new();
    for handle in handles {
        cards.insert(handle.await.expect("task panicked"));
    }
    // Every concurrent registration must draw a distinct card.
    assert_eq!(cards.len(), 8);
}

#[tokio::test]
#[ignore]
async fn test_login_resolves_across_both_collections() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, email, _) = register_member(&client).await;

    // A staff account sharing the member's email, with its own password.
    let response = client
        .post(format!("{}/staff", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "first_name": "Shared",
            "last_name": "Email",
            "email": email,
            "password": "the staff password",
            "position": "Librarian"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Whichever credential verifies decides the account.
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "the staff password" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["kind"], "staff");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "correct horse battery" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["kind"], "user");
}

#[tokio::test]
#[ignore]
async fn test_book_lending_history() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, _, _) = register_member(&client).await;
    let book_id = Uuid::new_v4();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "borrower_id": member_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_str().expect("No loan id").to_string();

    let response = client
        .get(format!("{}/loans/book/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let loans = body.as_array().expect("Expected array");
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["id"], loan_id.as_str());
}
