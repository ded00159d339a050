mod support;

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use innkeep_api::app::{build_app, services::AppServices};
use innkeep_auth::{hash_password, JwtClaims, Role};
use innkeep_core::{FixedClock, GuestId, Money};
use innkeep_hotels::{Guest, Hotel, Membership, RoomService, Service};
use innkeep_hotels::schedule::NO_TIMES_MESSAGE;
use innkeep_infra::{GuestAccounts, HotelDirectory, InMemoryStore, MembershipRegistry, RoomServiceDesk, Store};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

const SECRET: &str = "test-secret";
const STAFF_EMAIL: &str = "staff@grand.example";
const STAFF_PASSWORD: &str = "front-desk-42";

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-18T12:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

struct Seed {
    grand: Hotel,
    other: Hotel,
    spa: Service,
    gym: Service,
    towels: RoomService,
    staff: GuestId,
}

struct TestServer {
    base_url: String,
    seed: Seed,
    store: Arc<dyn Store>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(Arc::new(InMemoryStore::new()), now()).await
    }

    async fn spawn_with(store: Arc<dyn Store>, at: DateTime<Utc>) -> Self {
        let mut services = AppServices::in_memory(SECRET, Arc::new(FixedClock(at)));
        services.store = store.clone();

        let grand = Hotel::new("Grand".into(), "By the sea".into(), "Tbilisi".into()).unwrap();
        let other = Hotel::new("Other".into(), String::new(), "Batumi".into()).unwrap();
        store.insert_hotel(grand.clone()).await.unwrap();
        store.insert_hotel(other.clone()).await.unwrap();

        let spa = Service::new(grand.id, "Spa".into(), "Sauna and pool".into(), Money::from_cents(5000)).unwrap();
        let gym = Service::new(other.id, "Gym".into(), String::new(), Money::from_cents(1500)).unwrap();
        store.insert_service(spa.clone()).await.unwrap();
        store.insert_service(gym.clone()).await.unwrap();

        let towels = RoomService::new(grand.id, "Fresh towels".into()).unwrap();
        store.insert_room_service(towels.clone()).await.unwrap();

        store
            .insert_membership(Membership::new(grand.id, "01001012345".into(), "ann@example.com".into()).unwrap())
            .await
            .unwrap();

        let mut staff = Guest::new(
            STAFF_EMAIL.into(),
            "99000000000".into(),
            hash_password(STAFF_PASSWORD).unwrap(),
            now(),
        )
        .unwrap();
        staff.is_staff = true;
        let staff_id = staff.id;
        store.insert_guest(staff).await.unwrap();

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            seed: Seed {
                grand,
                other,
                spa,
                gym,
                towels,
                staff: staff_id,
            },
            store,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(self.client.post(self.url(path)), token, body).await
    }

    async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(self.client.put(self.url(path)), token, body).await
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> StatusCode {
        let mut req = self.client.delete(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap().status()
    }

    async fn send(
        &self,
        mut req: reqwest::RequestBuilder,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// Registers the seeded member and returns their token.
    async fn register_member(&self) -> String {
        let (status, body) = self
            .post(
                "/register",
                None,
                json!({
                    "private_number": "01001012345",
                    "email": "Ann@Example.com",
                    "password1": "sea-breeze-77",
                    "password2": "sea-breeze-77",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post("/login", None, json!({ "email": email, "password": password }))
            .await
    }

    async fn staff_token(&self) -> String {
        let (status, body) = self.login(STAFF_EMAIL, STAFF_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(roles: Vec<Role>, issued_at: DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = JwtClaims {
        sub: GuestId::new(),
        roles,
        jti: uuid::Uuid::now_v7(),
        issued_at,
        expires_at: issued_at + ttl,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn().await;
    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn home_lists_every_hotel() {
    let server = TestServer::spawn().await;

    let (status, body) = server.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["hotels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Grand".to_string()));
    assert!(names.contains(&"Other".to_string()));
}

#[tokio::test]
async fn hotel_detail_reports_registration() {
    let server = TestServer::spawn().await;
    let grand = format!("/hotels/{}", server.seed.grand.id);

    let (status, body) = server.get(&grand, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_registered"], json!(false));
    assert_eq!(body["services"][0]["name"], json!("Spa"));
    assert_eq!(body["room_services"][0]["name"], json!("Fresh towels"));

    let token = server.register_member().await;
    let (_, body) = server.get(&grand, Some(&token)).await;
    assert_eq!(body["is_registered"], json!(true));

    let (_, body) = server
        .get(&format!("/hotels/{}", server.seed.other.id), Some(&token))
        .await;
    assert_eq!(body["is_registered"], json!(false));

    let (status, _) = server.get(&format!("/hotels/{}", GuestId::new()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_requires_a_membership() {
    let server = TestServer::spawn().await;

    let (status, body) = server
        .post(
            "/register",
            None,
            json!({
                "private_number": "55555555555",
                "email": "stranger@example.com",
                "password1": "sea-breeze-77",
                "password2": "sea-breeze-77",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("not_a_member"));
    assert_eq!(
        body["message"],
        json!("Private number and email not found in the database.")
    );
}

#[tokio::test]
async fn registration_reports_field_errors() {
    let server = TestServer::spawn().await;

    let (status, body) = server
        .post(
            "/register",
            None,
            json!({
                "private_number": "01001012345",
                "email": "ann@example.com",
                "password1": "sea-breeze-77",
                "password2": "sea-breeze-78",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_form"));
    assert_eq!(body["message"], json!("Please correct the error below."));
    assert_eq!(
        body["fields"]["password2"][0],
        json!("The two password fields didn't match.")
    );

    server.register_member().await;
    let (status, body) = server
        .post(
            "/register",
            None,
            json!({
                "private_number": "01001012345",
                "email": "ann@example.com",
                "password1": "sea-breeze-77",
                "password2": "sea-breeze-77",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["email"][0], json!("Guest with this Email already exists."));
}

#[tokio::test]
async fn registration_signs_the_guest_in() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;

    let (status, body) = server.get("/reservations", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservations"], json!([]));
}

#[tokio::test]
async fn login_redirects_back_to_the_hotel() {
    let server = TestServer::spawn().await;
    server.register_member().await;

    let (status, body) = server
        .post(
            &format!("/login?hotel_id={}", server.seed.grand.id),
            None,
            json!({ "email": "ann@example.com", "password": "sea-breeze-77" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect_to"], json!(format!("/hotels/{}", server.seed.grand.id)));
    assert!(body["token"].as_str().is_some());

    let (status, body) = server.login("ann@example.com", "sea-breeze-77").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect_to"], json!("/"));

    let (status, body) = server.login("ann@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("invalid_credentials"));
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;

    let (status, body) = server.post("/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect_to"], json!("/"));

    let (status, _) = server.get("/reservations", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn guest_pages_require_a_token() {
    let server = TestServer::spawn().await;

    for path in [
        "/reservations".to_string(),
        "/room_service_requests".to_string(),
        format!("/reserve/{}", server.seed.spa.id),
    ] {
        let (status, body) = server.get(&path, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["error"], json!("unauthenticated"));
    }
}

#[tokio::test]
async fn expired_and_forged_tokens_are_rejected() {
    let server = TestServer::spawn().await;

    let expired = mint_jwt(vec![Role::GUEST], now() - ChronoDuration::hours(2), ChronoDuration::hours(1));
    let (status, _) = server.get("/reservations", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server.get("/reservations", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn other_hotels_are_gated_by_membership() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;

    let (status, body) = server
        .get(&format!("/reserve/{}", server.seed.gym.id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("not_registered"));
    assert_eq!(body["message"], json!("You are not registered at this hotel."));
    assert_eq!(body["redirect_to"], json!(format!("/hotels/{}", server.seed.other.id)));
}

#[tokio::test]
async fn reserve_page_lists_remaining_slots() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;

    let (status, body) = server
        .get(&format!("/reserve/{}", server.seed.spa.id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let times = body["available_times"].as_array().unwrap();
    assert_eq!(times.len(), 9);
    assert_eq!(times[0], json!("2026-10-18 13:00:00"));
    assert_eq!(times[8], json!("2026-10-18 21:00:00"));
    assert_eq!(body["no_times_message"], Value::Null);
}

#[tokio::test]
async fn reserving_prices_and_blocks_slots() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;
    let reserve = format!("/reserve/{}", server.seed.spa.id);

    let (status, body) = server
        .post(
            &reserve,
            Some(&token),
            json!({ "reservation_times": ["2026-10-18 14:00:00", "2026-10-18 15:00:00"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["total_price"], json!("100.00"));
    assert_eq!(body["discounted_price"], json!("80.00"));
    assert_eq!(body["message"], json!("Service reserved successfully. Total cost: $80.00"));
    assert_eq!(body["reservations"].as_array().unwrap().len(), 2);
    assert_eq!(body["redirect_to"], json!(reserve));

    let (_, body) = server.get(&reserve, Some(&token)).await;
    let times = body["available_times"].as_array().unwrap();
    assert_eq!(times.len(), 7);
    assert!(!times.contains(&json!("2026-10-18 14:00:00")));

    let (status, body) = server
        .post(&reserve, Some(&token), json!({ "reservation_times": ["2026-10-18 15:00:00"] }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("times_reserved"));
    assert!(body["message"].as_str().unwrap().contains("2026-10-18 15:00"));

    let (status, body) = server.get("/reservations", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let mine = body["reservations"].as_array().unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0]["service"]["name"], json!("Spa"));
}

#[tokio::test]
async fn reserving_rejects_bad_selections() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;
    let reserve = format!("/reserve/{}", server.seed.spa.id);

    let cases = [
        (json!({ "reservation_times": [] }), StatusCode::BAD_REQUEST, "no_times_selected"),
        (
            json!({ "reservation_times": ["2026-10-18 11:00:00"] }),
            StatusCode::BAD_REQUEST,
            "times_in_past",
        ),
        (
            json!({ "reservation_times": ["tomorrow at noon"] }),
            StatusCode::BAD_REQUEST,
            "invalid_time",
        ),
        (
            json!({ "reservation_times": ["2026-10-19 14:00:00"] }),
            StatusCode::BAD_REQUEST,
            "times_not_offered",
        ),
    ];
    for (payload, expected_status, expected_code) in cases {
        let (status, body) = server.post(&reserve, Some(&token), payload).await;
        assert_eq!(status, expected_status, "{body}");
        assert_eq!(body["error"], json!(expected_code));
    }

    let (_, body) = server.get("/reservations", Some(&token)).await;
    assert_eq!(body["reservations"], json!([]));
}

#[tokio::test]
async fn room_service_request_is_recorded() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;
    let path = format!("/room_service_request/{}", server.seed.towels.id);

    let (status, body) = server.get(&path, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_service"]["name"], json!("Fresh towels"));

    let (status, body) = server.post(&path, Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["request"]["status"], json!("Pending"));
    assert_eq!(body["redirect_to"], json!(format!("/hotels/{}", server.seed.grand.id)));

    let (status, body) = server.get("/room_service_requests", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let requests = body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["room_service"]["name"], json!("Fresh towels"));
}

#[tokio::test]
async fn admin_is_staff_only() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;

    let (status, body) = server.get("/admin/hotels", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("forbidden"));
}

#[tokio::test]
async fn staff_manage_hotels() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;

    let (status, created) = server
        .post(
            "/admin/hotels",
            Some(&token),
            json!({ "name": "Harbour", "location": "Poti" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = server.get("/admin/hotels", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);

    let (status, body) = server
        .put(
            &format!("/admin/hotels/{id}"),
            Some(&token),
            json!({ "name": "Harbour Inn", "description": "Renovated", "location": "Poti" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("Harbour Inn"));

    let (status, body) = server
        .post("/admin/hotels", Some(&token), json!({ "name": "", "location": "Poti" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    assert_eq!(server.delete(&format!("/admin/hotels/{id}"), Some(&token)).await, StatusCode::NO_CONTENT);
    let (status, _) = server.get(&format!("/admin/hotels/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn staff_memberships_enable_registration() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;
    let membership = json!({
        "hotel_id": server.seed.other.id.to_string(),
        "private_number": "77700000000",
        "email": "carol@example.com",
    });

    let (status, body) = server.post("/admin/memberships", Some(&token), membership.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = server.post("/admin/memberships", Some(&token), membership).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = server
        .post(
            "/register",
            None,
            json!({
                "private_number": "77700000000",
                "email": "carol@example.com",
                "password1": "mountain-air-9",
                "password2": "mountain-air-9",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let carol = body["token"].as_str().unwrap().to_string();

    let (status, _) = server
        .get(&format!("/reserve/{}", server.seed.gym.id), Some(&carol))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server
        .get(&format!("/reserve/{}", server.seed.spa.id), Some(&carol))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = server.get("/admin/memberships", Some(&token)).await;
    let hotels: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["hotel"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(hotels.len(), 2);
    assert!(hotels.contains(&"Other".to_string()));
}

#[tokio::test]
async fn staff_guest_accounts_need_a_password() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;

    let (status, _) = server
        .post(
            "/admin/guests",
            Some(&token),
            json!({ "email": "bob@example.com", "private_number": "12312312312" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post(
            "/admin/guests",
            Some(&token),
            json!({
                "email": "bob@example.com",
                "private_number": "12312312312",
                "password": "bob-the-builder",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body.get("password_hash").is_none());

    let (status, _) = server.login("bob@example.com", "bob-the-builder").await;
    assert_eq!(status, StatusCode::OK);
}

fn parse_instant(value: &Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

fn item_named<'a>(body: &'a Value, key: &str, name: &str) -> &'a Value {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item[key] == json!(name))
        .unwrap_or_else(|| panic!("no item with {key} = {name} in {body}"))
}

#[tokio::test]
async fn staff_access_follows_the_current_account() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;
    let (status, _) = server.get("/admin/hotels", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let mut staff = server.store.get_guest(server.seed.staff).await.unwrap().unwrap();
    staff.is_staff = false;
    server.store.update_guest(staff).await.unwrap();

    let (status, body) = server.get("/admin/hotels", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(body["error"], json!("forbidden"));

    server.store.delete_guest(server.seed.staff).await.unwrap();

    let (status, body) = server
        .post("/admin/hotels", Some(&token), json!({ "name": "Ghost", "location": "Nowhere" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
    assert_eq!(body["error"], json!("unauthenticated"));
    assert_eq!(server.store.list_hotels().await.unwrap().len(), 2);
}

#[tokio::test]
async fn staff_manage_services() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;

    let (status, created) = server
        .post(
            "/admin/services",
            Some(&token),
            json!({ "hotel_id": server.seed.grand.id.to_string(), "name": "Massage", "price": "20.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["available"], json!(true));
    let id = created["id"].as_str().unwrap().to_string();

    let (_, body) = server.get("/admin/services", Some(&token)).await;
    let row = item_named(&body, "name", "Massage");
    assert_eq!(row["hotel"], json!("Grand"));
    assert_eq!(row["price"], json!("20.00"));
    assert_eq!(row["available"], json!(true));

    let (status, body) = server
        .put(
            &format!("/admin/services/{id}"),
            Some(&token),
            json!({
                "hotel_id": server.seed.other.id.to_string(),
                "name": "Massage",
                "price": "25.50",
                "available": false,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, body) = server.get("/admin/services", Some(&token)).await;
    let row = item_named(&body, "name", "Massage");
    assert_eq!(row["hotel"], json!("Other"));
    assert_eq!(row["price"], json!("25.50"));
    assert_eq!(row["available"], json!(false));

    assert_eq!(server.delete(&format!("/admin/services/{id}"), Some(&token)).await, StatusCode::NO_CONTENT);
    let (_, body) = server.get("/admin/services", Some(&token)).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn staff_manage_available_times() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;
    let spa = server.seed.spa.id.to_string();

    let (status, body) = server
        .post(
            "/admin/available_times",
            Some(&token),
            json!({ "service_id": spa, "start_time": "2026-10-19T10:00:00Z", "end_time": "2026-10-19T10:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, created) = server
        .post(
            "/admin/available_times",
            Some(&token),
            json!({ "service_id": spa, "start_time": "2026-10-19T10:00:00Z", "end_time": "2026-10-19T11:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["is_reserved"], json!(false));
    let id = created["id"].as_str().unwrap().to_string();

    let (_, body) = server.get("/admin/available_times", Some(&token)).await;
    let row = item_named(&body, "id", &id);
    assert_eq!(row["service"], json!("Spa"));
    assert_eq!(parse_instant(&row["start_time"]), parse_instant(&json!("2026-10-19T10:00:00Z")));
    assert_eq!(parse_instant(&row["end_time"]), parse_instant(&json!("2026-10-19T11:00:00Z")));

    let (status, body) = server
        .put(
            &format!("/admin/available_times/{id}"),
            Some(&token),
            json!({
                "service_id": spa,
                "start_time": "2026-10-19T10:00:00Z",
                "end_time": "2026-10-19T11:00:00Z",
                "is_reserved": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["is_reserved"], json!(true));

    assert_eq!(
        server.delete(&format!("/admin/available_times/{id}"), Some(&token)).await,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn staff_manage_reservations() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;

    let (_, slot) = server
        .post(
            "/admin/available_times",
            Some(&token),
            json!({
                "service_id": server.seed.spa.id.to_string(),
                "start_time": "2026-10-19T10:00:00Z",
                "end_time": "2026-10-19T11:00:00Z",
            }),
        )
        .await;
    let slot_id = slot["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .post(
            "/admin/reservations",
            Some(&token),
            json!({
                "guest_id": server.seed.staff.to_string(),
                "service_id": server.seed.gym.id.to_string(),
                "reserved_for": slot_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], json!("validation_error"));

    let (status, created) = server
        .post(
            "/admin/reservations",
            Some(&token),
            json!({
                "guest_id": server.seed.staff.to_string(),
                "service_id": server.seed.spa.id.to_string(),
                "reserved_for": slot_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(parse_instant(&created["reservation_date"]), now());
    let id = created["id"].as_str().unwrap().to_string();

    let (_, body) = server.get("/admin/reservations", Some(&token)).await;
    let row = item_named(&body, "id", &id);
    assert_eq!(row["user"], json!("99000000000"));
    assert_eq!(row["service"], json!("Spa"));
    assert_eq!(parse_instant(&row["reservation_date"]), now());
    assert_eq!(
        row["reserved_for"],
        json!("Spa from 2026-10-19 10:00:00 UTC to 2026-10-19 11:00:00 UTC")
    );

    let (status, body) = server
        .put(
            &format!("/admin/reservations/{id}"),
            Some(&token),
            json!({
                "guest_id": server.seed.staff.to_string(),
                "service_id": server.seed.gym.id.to_string(),
                "reserved_for": slot_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    assert_eq!(server.delete(&format!("/admin/reservations/{id}"), Some(&token)).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn staff_manage_room_services() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;

    let (status, created) = server
        .post(
            "/admin/room_services",
            Some(&token),
            json!({ "hotel_id": server.seed.other.id.to_string(), "name": "Ironing" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap().to_string();

    let (_, body) = server.get("/admin/room_services", Some(&token)).await;
    assert_eq!(item_named(&body, "name", "Ironing")["hotel"], json!("Other"));

    let (status, body) = server
        .put(
            &format!("/admin/room_services/{id}"),
            Some(&token),
            json!({ "hotel_id": server.seed.other.id.to_string(), "name": "Ironing and pressing" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], json!("Ironing and pressing"));

    let (status, body) = server
        .post("/admin/room_services", Some(&token), json!({ "hotel_id": GuestId::new().to_string(), "name": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    assert_eq!(server.delete(&format!("/admin/room_services/{id}"), Some(&token)).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn staff_manage_room_service_requests() {
    let server = TestServer::spawn().await;
    let token = server.staff_token().await;
    let input = |status: &str| {
        json!({
            "guest_id": server.seed.staff.to_string(),
            "room_service_id": server.seed.towels.id.to_string(),
            "status": status,
        })
    };

    let (status, created) = server
        .post(
            "/admin/room_service_requests",
            Some(&token),
            json!({
                "guest_id": server.seed.staff.to_string(),
                "room_service_id": server.seed.towels.id.to_string(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], json!("Pending"));
    assert_eq!(parse_instant(&created["request_date"]), now());
    let id = created["id"].as_str().unwrap().to_string();

    let (_, body) = server.get("/admin/room_service_requests", Some(&token)).await;
    let row = item_named(&body, "id", &id);
    assert_eq!(row["user"], json!("99000000000"));
    assert_eq!(row["room_service"], json!("Fresh towels"));
    assert_eq!(row["status"], json!("Pending"));
    assert_eq!(parse_instant(&row["request_date"]), now());

    let (status, body) = server
        .put(&format!("/admin/room_service_requests/{id}"), Some(&token), input("Completed"))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], json!("Completed"));
    assert_eq!(parse_instant(&body["request_date"]), now());

    let (status, body) = server
        .post("/admin/room_service_requests", Some(&token), input("Lost"))
        .await;
    assert!(status.is_client_error(), "{body}");

    assert_eq!(
        server.delete(&format!("/admin/room_service_requests/{id}"), Some(&token)).await,
        StatusCode::NO_CONTENT
    );
    assert!(server.store.list_requests(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unavailable_services_cannot_be_reserved() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;

    let mut spa = server.seed.spa.clone();
    spa.available = false;
    server.store.update_service(spa).await.unwrap();

    let (status, body) = server
        .post(
            &format!("/reserve/{}", server.seed.spa.id),
            Some(&token),
            json!({ "reservation_times": ["2026-10-18 14:00:00"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["error"], json!("service_unavailable"));

    let (_, body) = server.get("/reservations", Some(&token)).await;
    assert_eq!(body["reservations"], json!([]));
}

#[tokio::test]
async fn late_evening_shows_the_no_times_message() {
    let late = DateTime::parse_from_rfc3339("2026-10-18T22:30:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let server = TestServer::spawn_with(Arc::new(InMemoryStore::new()), late).await;
    let token = server.register_member().await;

    let (status, body) = server
        .get(&format!("/reserve/{}", server.seed.spa.id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["available_times"], json!([]));
    assert_eq!(body["no_times_message"], json!(NO_TIMES_MESSAGE));
    assert_eq!(body["no_times_message"], json!("All available times for today are reserved."));
}

#[tokio::test]
async fn room_service_request_rejects_another_hotels_service() {
    let server = TestServer::spawn().await;
    let token = server.register_member().await;

    let laundry = RoomService::new(server.seed.other.id, "Laundry".into()).unwrap();
    server.store.insert_room_service(laundry.clone()).await.unwrap();

    let (status, body) = server
        .post(
            &format!("/room_service_request/{}", server.seed.towels.id),
            Some(&token),
            json!({ "room_service": laundry.id.to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], json!("validation_error"));

    let (_, body) = server.get("/room_service_requests", Some(&token)).await;
    assert_eq!(body["requests"], json!([]));
}

#[tokio::test]
async fn losing_a_booking_race_names_the_taken_times() {
    let store: Arc<dyn Store> = Arc::new(support::StaleReads::default());
    let server = TestServer::spawn_with(store, now()).await;
    let token = server.register_member().await;
    let reserve = format!("/reserve/{}", server.seed.spa.id);

    let (status, body) = server
        .post(&reserve, Some(&token), json!({ "reservation_times": ["2026-10-18 14:00:00"] }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    // The page read misses the reservation above, so only the booking write sees it.
    let (status, body) = server
        .post(
            &reserve,
            Some(&token),
            json!({ "reservation_times": ["2026-10-18 15:00:00", "2026-10-18 14:00:00"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["error"], json!("times_reserved"));
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("2026-10-18 14:00"), "{message}");
    assert!(!message.contains("15:00"), "{message}");

    let (_, body) = server.get("/reservations", Some(&token)).await;
    assert_eq!(body["reservations"].as_array().unwrap().len(), 1);
}
