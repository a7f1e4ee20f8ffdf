use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

// Shared test context
struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

impl TestContext {
    fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .unwrap(),
            base_url: "http://127.0.0.1:8000".to_string(),
        }
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn register_form(username: &str) -> reqwest::multipart::Form {
        reqwest::multipart::Form::new()
            .text("full_name", "Test User")
            .text("username", username.to_string())
            .text("email", format!("{}@example.com", username))
            .text("password", "SecurePass123!@#")
            .part(
                "avatar",
                reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a])
                    .file_name("avatar.png")
                    .mime_str("image/png")
                    .unwrap(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    #[ignore = "requires a running server with Postgres and Redis"]
    async fn test_registration_login_and_session_rotation() {
        let context = TestContext::new();
        let timestamp = TestContext::get_timestamp();
        let username = format!("testuser_{}", timestamp);

        // Step 1: User Registration
        let reg_response = context
            .client
            .post(format!("{}/api/v1/auth/register", context.base_url))
            .multipart(TestContext::register_form(&username))
            .send()
            .await
            .unwrap();

        assert_eq!(reg_response.status().as_u16(), 201, "Registration failed");
        let reg_body: Value = reg_response.json().await.unwrap();
        assert_eq!(reg_body["user"]["username"], username);
        assert!(reg_body["access_token"].is_string());
        let first_session = reg_body["session_token"].as_str().unwrap().to_string();

        // Step 2: Login
        let login_response = context
            .client
            .post(format!("{}/api/v1/auth/login", context.base_url))
            .json(&json!({
                "username": username,
                "password": "SecurePass123!@#"
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(login_response.status().as_u16(), 200, "Login failed");
        let login_body: Value = login_response.json().await.unwrap();
        let login_session = login_body["session_token"].as_str().unwrap().to_string();
        assert_ne!(login_session, first_session);

        // Step 3: Refresh rotates the session token
        let refresh_response = context
            .client
            .post(format!("{}/api/v1/auth/refresh", context.base_url))
            .send()
            .await
            .unwrap();

        assert_eq!(refresh_response.status().as_u16(), 200, "Refresh failed");
        let refresh_body: Value = refresh_response.json().await.unwrap();
        let rotated_session = refresh_body["session_token"].as_str().unwrap().to_string();
        assert_ne!(rotated_session, login_session);

        // Step 4: Replaying the superseded token is rejected
        let replay_response = reqwest::Client::new()
            .post(format!("{}/api/v1/auth/refresh", context.base_url))
            .json(&json!({ "session_token": login_session }))
            .send()
            .await
            .unwrap();

        assert_eq!(replay_response.status().as_u16(), 401, "Replay must fail");

        // Step 5: Authenticated profile fetch
        let me_response = context
            .client
            .get(format!("{}/api/v1/users/me", context.base_url))
            .send()
            .await
            .unwrap();

        assert_eq!(me_response.status().as_u16(), 200);
        let me_body: Value = me_response.json().await.unwrap();
        assert_eq!(me_body["username"], username);

        // Step 6: Logout, then refresh with the revoked session fails
        let logout_response = context
            .client
            .post(format!("{}/api/v1/auth/logout", context.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(logout_response.status().as_u16(), 200);

        let dead_refresh = reqwest::Client::new()
            .post(format!("{}/api/v1/auth/refresh", context.base_url))
            .json(&json!({ "session_token": rotated_session }))
            .send()
            .await
            .unwrap();
        assert_eq!(dead_refresh.status().as_u16(), 401);
    }

    #[tokio::test]
    #[ignore = "requires a running server with Postgres and Redis"]
    async fn test_mutating_another_users_tweet_is_forbidden() {
        let timestamp = TestContext::get_timestamp();

        let owner = TestContext::new();
        let owner_name = format!("owner_{}", timestamp);
        let reg = owner
            .client
            .post(format!("{}/api/v1/auth/register", owner.base_url))
            .multipart(TestContext::register_form(&owner_name))
            .send()
            .await
            .unwrap();
        assert_eq!(reg.status().as_u16(), 201);

        let tweet_response = owner
            .client
            .post(format!("{}/api/v1/tweets", owner.base_url))
            .json(&json!({ "content": "first post" }))
            .send()
            .await
            .unwrap();
        assert_eq!(tweet_response.status().as_u16(), 201);
        let tweet: Value = tweet_response.json().await.unwrap();
        let tweet_id = tweet["id"].as_str().unwrap();

        let intruder = TestContext::new();
        let intruder_name = format!("intruder_{}", timestamp);
        let reg = intruder
            .client
            .post(format!("{}/api/v1/auth/register", intruder.base_url))
            .multipart(TestContext::register_form(&intruder_name))
            .send()
            .await
            .unwrap();
        assert_eq!(reg.status().as_u16(), 201);

        let edit_response = intruder
            .client
            .patch(format!("{}/api/v1/tweets/{}", intruder.base_url, tweet_id))
            .json(&json!({ "content": "hijacked" }))
            .send()
            .await
            .unwrap();

        assert_eq!(edit_response.status().as_u16(), 403, "Edit must be forbidden");

        let delete_response = intruder
            .client
            .delete(format!("{}/api/v1/tweets/{}", intruder.base_url, tweet_id))
            .send()
            .await
            .unwrap();
        assert_eq!(delete_response.status().as_u16(), 403, "Delete must be forbidden");

        // The owner can delete; a second delete finds nothing.
        let delete_response = owner
            .client
            .delete(format!("{}/api/v1/tweets/{}", owner.base_url, tweet_id))
            .send()
            .await
            .unwrap();
        assert_eq!(delete_response.status().as_u16(), 204);

        let delete_again = owner
            .client
            .delete(format!("{}/api/v1/tweets/{}", owner.base_url, tweet_id))
            .send()
            .await
            .unwrap();
        assert_eq!(delete_again.status().as_u16(), 404);
    }
}
