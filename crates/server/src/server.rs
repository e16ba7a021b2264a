use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use std::sync::Arc;

use crate::{ServerError, categories, expenses, statistics, user};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolve `Authorization: Bearer <access token>` into an [`engine::User`]
/// request extension.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(EngineError::InvalidCredentials.into());
    };
    if bearer.token().is_empty() {
        return Err(EngineError::InvalidCredentials.into());
    }

    let user = state.engine.user_for_access_token(bearer.token()).await?;
    tracing::debug!(username = %user.username, "authenticated request");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/auth/profile", get(user::profile))
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::replace)
                .patch(categories::update)
                .delete(categories::delete),
        )
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route("/expenses/history", get(expenses::history))
        .route("/expenses/stats", get(statistics::get_stats))
        .route(
            "/expenses/{id}",
            get(expenses::get)
                .put(expenses::replace)
                .patch(expenses::update)
                .delete(expenses::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login))
        .route("/auth/refresh", post(user::refresh))
        .merge(protected)
        .with_state(state)
}

pub async fn run(engine: Engine, bind: &str, port: u16) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    run_with_listener(engine, listener).await
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use engine::RegisterUserCmd;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::Database;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn test_router() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db)
            .password_cost(4)
            .build()
            .await
            .unwrap();
        for username in ["alice", "bob"] {
            engine
                .register_user(RegisterUserCmd {
                    username: username.to_string(),
                    email: String::new(),
                    first_name: None,
                    last_name: None,
                    password: "correct horse".to_string(),
                    password_confirm: "correct horse".to_string(),
                })
                .await
                .unwrap();
        }
        router(ServerState {
            engine: Arc::new(engine),
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router, username: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": username, "password": "correct horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["access"].as_str().unwrap().to_string()
    }

    async fn create_category(app: &Router, token: &str, name: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/categories",
            Some(token),
            Some(json!({"name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_expense(
        app: &Router,
        token: &str,
        category: &str,
        name: &str,
        amount: &str,
        date: &str,
    ) -> Value {
        let (status, body) = send(
            app,
            Method::POST,
            "/expenses",
            Some(token),
            Some(json!({
                "name": name,
                "amount": amount,
                "date": date,
                "category": category,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn protected_routes_require_a_bearer_token() {
        let app = test_router().await;

        let (status, body) = send(&app, Method::GET, "/expenses/history", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, Method::GET, "/expenses/stats", Some("nope"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_login_refresh_and_profile() {
        let app = test_router().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "carol",
                "email": "carol@example.com",
                "password": "long enough",
                "password_confirm": "long enough",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "carol");
        assert!(body.get("password_hash").is_none());

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "dave",
                "password": "long enough",
                "password_confirm": "different",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("match"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "carol", "password": "long enough"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "carol@example.com");
        let refresh = body["refresh"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = body["access"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "carol");

        let (status, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "carol", "password": "wrong password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn history_filters_and_stats() {
        let app = test_router().await;
        let alice = login(&app, "alice").await;
        let bob = login(&app, "bob").await;

        let food = create_category(&app, &alice, "Food").await;
        let travel = create_category(&app, &alice, "Travel").await;
        create_expense(&app, &alice, &food, "A", "10", "2024-01-05").await;
        create_expense(&app, &alice, &food, "B", "5.00", "2024-01-31").await;
        create_expense(&app, &alice, &travel, "C", "20", "2024-02-01").await;
        create_expense(&app, &bob, &travel, "Bob's trip", "99.99", "2024-01-10").await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/expenses/history?start_date=2024-01-01&end_date=2024-01-31&sort_by=amount",
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(body[0]["amount"], "5.00");
        assert_eq!(body[0]["category_name"], "Food");

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/expenses/history?category={travel}"),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(&app, Method::GET, "/expenses/stats", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "total_count": 3,
                "total_amount": "35.00",
                "categories": {
                    "Food": {"count": 2, "amount": "15.00"},
                    "Travel": {"count": 1, "amount": "20.00"},
                },
            })
        );
    }

    #[tokio::test]
    async fn bad_query_parameters() {
        let app = test_router().await;
        let alice = login(&app, "alice").await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/expenses/history?start_date=01/02/2024",
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("start_date"));

        let (status, body) = send(
            &app,
            Method::GET,
            "/expenses/history?sort_by=password&category=42",
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn expenses_of_other_users_are_not_found() {
        let app = test_router().await;
        let alice = login(&app, "alice").await;
        let bob = login(&app, "bob").await;
        let food = create_category(&app, &alice, "Food").await;
        let expense = create_expense(&app, &alice, &food, "Lunch", "12.50", "2024-01-05").await;
        assert_eq!(expense["user"], "alice");
        let uri = format!("/expenses/{}", expense["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&alice),
            Some(json!({"amount": "13", "description": "with dessert"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["amount"], "13.00");
        assert_eq!(body["description"], "with dessert");

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn category_in_use_cannot_be_deleted() {
        let app = test_router().await;
        let alice = login(&app, "alice").await;
        let food = create_category(&app, &alice, "Food").await;
        create_expense(&app, &alice, &food, "Lunch", "12.50", "2024-01-05").await;

        let uri = format!("/categories/{food}");
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            Method::POST,
            "/categories",
            Some(&alice),
            Some(json!({"name": "FOOD"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/expenses",
            Some(&alice),
            Some(json!({
                "name": "Refund",
                "amount": "-3",
                "date": "2024-01-05",
                "category": food,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, body) = send(
            &app,
            Method::POST,
            "/expenses",
            Some(&alice),
            Some(json!({
                "name": "Island",
                "amount": "50000000000000000.00",
                "date": "2024-01-05",
                "category": food,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, body) = send(&app, Method::GET, "/expenses/stats", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["total_amount"], "12.50");
    }
}
