use serde_json::json;
use skyra_core::backend::{Backend, SessionManager, SignedIn, User, UserUpdate};
use skyra_core::favorites::{FAVORITES_TABLE, Favorites};
use skyra_core::preferences::{PREFERENCES_TABLE, Preferences, SaveOutcome, ThemeName};
use skyra_core::store::{FAVORITES_KEY, SESSION_KEY};
use skyra_core::{BackendConfig, FavoritesRepository, LocalStore, PreferencesRepository, TemperatureUnit};
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_partial_json, header, headers, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> Backend {
    Backend::new(&BackendConfig {
        url: server.uri(),
        anon_key: "anon".to_string(),
    })
}

fn store() -> (TempDir, LocalStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path());
    (dir, store)
}

fn signed_in() -> SignedIn {
    SignedIn {
        user: User {
            id: "u1".to_string(),
            email: Some("sam@example.com".to_string()),
            user_metadata: json!({"name": "Sam"}),
        },
        access_token: "user-token".to_string(),
    }
}

fn session_json(access_token: &str, expires_at: i64) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": expires_at,
        "user": {"id": "u1", "email": "sam@example.com", "user_metadata": {"name": "Sam"}}
    })
}

#[tokio::test]
async fn sign_in_persists_session() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon"))
        .and(body_json(json!({"email": "sam@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("tok", 4_000_000_000)))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    let session = sessions.sign_in("sam@example.com", "hunter22").await.unwrap();
    assert_eq!(session.user.id, "u1");

    let current = sessions.signed_in().await.unwrap().unwrap();
    assert_eq!(current.access_token, "tok");
    assert_eq!(current.user.name(), Some("Sam"));
}

#[tokio::test]
async fn bad_credentials_surface_server_message() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    let err = sessions.sign_in("sam@example.com", "nope").await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid login credentials");
    assert!(sessions.signed_in().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_up_pending_confirmation_has_no_session() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(json!({"data": {"name": "Sam"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "sam@example.com",
            "user_metadata": {"name": "Sam"}
        })))
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    let outcome = sessions
        .sign_up("sam@example.com", "hunter22", Some("Sam"))
        .await
        .unwrap();

    assert_eq!(outcome.user.id, "u1");
    assert!(outcome.session.is_none());
    assert_eq!(store.get(SESSION_KEY).unwrap(), None);
}

#[tokio::test]
async fn expired_session_is_refreshed() {
    let server = MockServer::start().await;
    let (_dir, store) = store();
    store.set(SESSION_KEY, &session_json("old", 1).to_string()).unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("new", 4_000_000_000)))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    let current = sessions.signed_in().await.unwrap().unwrap();
    assert_eq!(current.access_token, "new");

    // Stored copy is the refreshed one, so no second refresh happens.
    let again = sessions.signed_in().await.unwrap().unwrap();
    assert_eq!(again.access_token, "new");
}

#[tokio::test]
async fn failed_refresh_signs_out_locally() {
    let server = MockServer::start().await;
    let (_dir, store) = store();
    store.set(SESSION_KEY, &session_json("old", 1).to_string()).unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"msg": "Invalid Refresh Token"})))
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    assert!(sessions.signed_in().await.unwrap().is_none());
    assert_eq!(store.get(SESSION_KEY).unwrap(), None);
}

#[tokio::test]
async fn refresh_outage_keeps_stored_session() {
    let server = MockServer::start().await;
    let (_dir, store) = store();
    let stored = session_json("old", 1).to_string();
    store.set(SESSION_KEY, &stored).unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    assert!(sessions.signed_in().await.unwrap().is_none());
    assert_eq!(store.get(SESSION_KEY).unwrap(), Some(stored));
}

#[tokio::test]
async fn sign_out_clears_session_even_if_server_fails() {
    let server = MockServer::start().await;
    let (_dir, store) = store();
    store.set(SESSION_KEY, &session_json("tok", 4_000_000_000).to_string()).unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    sessions.sign_out().await.unwrap();
    assert_eq!(store.get(SESSION_KEY).unwrap(), None);
}

#[tokio::test]
async fn profile_update_refreshes_stored_user() {
    let server = MockServer::start().await;
    let (_dir, store) = store();
    store.set(SESSION_KEY, &session_json("tok", 4_000_000_000).to_string()).unwrap();

    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", "Bearer tok"))
        .and(body_json(json!({"data": {"name": "Samantha"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "sam@example.com",
            "user_metadata": {"name": "Samantha"}
        })))
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store.clone());
    let update = UserUpdate {
        name: Some("Samantha".to_string()),
        ..Default::default()
    };
    let user = sessions.update_profile(&update).await.unwrap();
    assert_eq!(user.name(), Some("Samantha"));

    let current = sessions.signed_in().await.unwrap().unwrap();
    assert_eq!(current.user.name(), Some("Samantha"));
}

#[tokio::test]
async fn password_reset_posts_email() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .and(body_json(json!({"email": "sam@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = SessionManager::new(backend(&server).auth(), store);
    sessions.reset_password("sam@example.com").await.unwrap();
}

#[tokio::test]
async fn signed_in_favorites_come_from_backend() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_favorites"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("select", "city_name"))
        .and(query_param("order", "created_at.desc"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"city_name": "Paris"},
            {"city_name": "Oslo"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/user_favorites"))
        .and(query_param("user_id", "eq.u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/user_favorites"))
        .and(body_json(json!([
            {"user_id": "u1", "city_name": "Paris"},
            {"user_id": "u1", "city_name": "Oslo"},
            {"user_id": "u1", "city_name": "Rome"}
        ])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FavoritesRepository::new(store.clone(), Some(backend(&server).table(FAVORITES_TABLE)));
    let user = signed_in();

    // Already present: nothing is written.
    let (_, changed) = repo.add_city(Some(&user), "Paris").await.unwrap();
    assert!(!changed);

    let (favorites, changed) = repo.add_city(Some(&user), "Rome").await.unwrap();
    assert!(changed);
    assert_eq!(favorites.len(), 3);

    // Device copy untouched while the backend works.
    assert_eq!(store.get(FAVORITES_KEY).unwrap(), None);
}

#[tokio::test]
async fn backend_failure_falls_back_to_device() {
    let server = MockServer::start().await;
    let (_dir, store) = store();
    store.set_json(FAVORITES_KEY, &vec!["Lisbon"]).unwrap();

    Mock::given(path("/rest/v1/user_favorites"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let repo = FavoritesRepository::new(store.clone(), Some(backend(&server).table(FAVORITES_TABLE)));
    let user = signed_in();

    let loaded = repo.load(Some(&user)).await.unwrap();
    assert_eq!(loaded, Favorites::new(vec!["Lisbon".to_string()]));

    repo.add_city(Some(&user), "Porto").await.unwrap();
    let on_device: Vec<String> = store.get_json(FAVORITES_KEY).unwrap().unwrap();
    assert_eq!(on_device, vec!["Lisbon", "Porto"]);
}

#[tokio::test]
async fn missing_preferences_row_gets_defaults() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_preferences"))
        .and(query_param("id", "eq.u1"))
        .and(header("Accept", "application/vnd.pgrst.object+json"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "details": "The result contains 0 rows",
            "message": "JSON object requested, multiple (or no) rows returned"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/user_preferences"))
        .and(body_json(json!({"id": "u1", "temp_unit": "F", "wind_unit": "mph", "theme": "system"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let repo = PreferencesRepository::new(store.clone(), Some(backend(&server).table(PREFERENCES_TABLE)));
    let prefs = repo.load(Some(&signed_in())).await.unwrap();

    assert_eq!(prefs, Preferences::account_defaults());
    assert_eq!(repo.load_local().unwrap(), Preferences::account_defaults());
}

#[tokio::test]
async fn preference_change_upserts_whole_row() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "temp_unit": "C", "wind_unit": "kph", "theme": "dark"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/user_preferences"))
        .and(headers("Prefer", vec!["resolution=merge-duplicates", "return=minimal"]))
        .and(body_json(json!({"id": "u1", "temp_unit": "F", "wind_unit": "kph", "theme": "dark"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let repo = PreferencesRepository::new(store.clone(), Some(backend(&server).table(PREFERENCES_TABLE)));
    let (prefs, outcome) = repo
        .update(Some(&signed_in()), |p| p.temp_unit = TemperatureUnit::Fahrenheit)
        .await
        .unwrap();

    assert_eq!(outcome, SaveOutcome::SavedRemote);
    assert_eq!(prefs.theme, ThemeName::Dark);
}

#[tokio::test]
async fn failed_preference_upsert_is_reported_but_kept_locally() {
    let server = MockServer::start().await;
    let (_dir, store) = store();

    Mock::given(method("POST"))
        .and(path("/rest/v1/user_preferences"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .mount(&server)
        .await;

    let repo = PreferencesRepository::new(store.clone(), Some(backend(&server).table(PREFERENCES_TABLE)));
    let prefs = Preferences {
        theme: ThemeName::Light,
        ..Default::default()
    };
    let outcome = repo.save(Some(&signed_in()), &prefs).await.unwrap();

    assert_eq!(outcome, SaveOutcome::RemoteFailed("db down".to_string()));
    assert_eq!(repo.load_local().unwrap().theme, ThemeName::Light);
}
