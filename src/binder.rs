use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    routing::{delete, get, patch, post, put, MethodRouter},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::{EndpointSpec, HttpMethod};
use crate::dispatch::BoundEndpoint;
use crate::error::BindError;
use crate::handler::{handler, method_not_allowed, not_found, EndpointHandler};
use crate::route::PathTemplate;
use crate::store::Store;

/// Validates a single endpoint definition.
pub fn bind_endpoint(spec: &EndpointSpec) -> Result<BoundEndpoint, BindError> {
    let method = spec
        .method
        .parse::<HttpMethod>()
        .map_err(|method| BindError::InvalidMethod {
            method,
            path: spec.path.clone(),
        })?;

    let status = StatusCode::from_u16(spec.status).map_err(|_| BindError::InvalidStatus {
        status: spec.status,
        path: spec.path.clone(),
    })?;

    if !spec.path.starts_with('/') {
        return Err(BindError::InvalidPath {
            path: spec.path.clone(),
        });
    }

    Ok(BoundEndpoint {
        method,
        template: PathTemplate::new(&spec.path),
        status,
    })
}

/// Endpoints that share one route: their templates differ at most in parameter names
/// and a trailing slash.
struct ShapeRoutes {
    template: PathTemplate,
    endpoints: Vec<BoundEndpoint>,
}

/// Builds the mock router for every configured endpoint.
///
/// All endpoints are validated before anything is registered, so a single bad entry fails
/// the whole set. GET collection endpoints (paths ending in `/`) start out as empty lists.
/// Each template answers with and without a trailing slash. When two endpoints match the
/// same requests with the same method, the first one wins.
pub fn build_router(endpoints: &[EndpointSpec], store: &Store) -> Result<Router, BindError> {
    let bound = endpoints
        .iter()
        .map(bind_endpoint)
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_shape: BTreeMap<String, ShapeRoutes> = BTreeMap::new();
    for endpoint in bound {
        if endpoint.method == HttpMethod::GET && endpoint.template.as_str().ends_with('/') {
            store.init_collection(endpoint.template.as_str());
        }

        let group = by_shape
            .entry(endpoint.template.shape())
            .or_insert_with(|| ShapeRoutes {
                template: endpoint.template.clone(),
                endpoints: Vec::new(),
            });
        if let Some(first) = group.endpoints.iter().find(|r| r.method == endpoint.method) {
            warn!(
                "Skipping endpoint {} {}; {} {} already matches the same requests",
                endpoint.method,
                endpoint.template.as_str(),
                first.method,
                first.template.as_str()
            );
            continue;
        }

        info!(
            "Bound {} {} (collection {}, status {})",
            endpoint.method,
            endpoint.template.as_str(),
            endpoint.template.collection_key(),
            endpoint.status.as_u16()
        );
        group.endpoints.push(endpoint);
    }

    let mut endpoint_routes: Router = Router::new();
    for group in by_shape.into_values() {
        let mut method_router: MethodRouter = MethodRouter::new();
        for endpoint in group.endpoints {
            let method = endpoint.method;
            let endpoint_handler = EndpointHandler {
                endpoint,
                store: store.clone(),
            };
            let func = match method {
                HttpMethod::GET => get(handler).with_state(endpoint_handler),
                HttpMethod::POST => post(handler).with_state(endpoint_handler),
                HttpMethod::PUT => put(handler).with_state(endpoint_handler),
                HttpMethod::PATCH => patch(handler).with_state(endpoint_handler),
                HttpMethod::DELETE => delete(handler).with_state(endpoint_handler),
            };
            method_router = method_router.merge(func);
        }

        let method_router = method_router.fallback(method_not_allowed);
        for path in group.template.route_paths() {
            endpoint_routes = endpoint_routes.route(&path, method_router.clone());
        }
    }

    Ok(endpoint_routes
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn spec(method: &str, path: &str, status: u16) -> EndpointSpec {
        EndpointSpec {
            path: path.to_string(),
            method: method.to_string(),
            status,
        }
    }

    fn items_config() -> Vec<EndpointSpec> {
        vec![
            spec("GET", "/items/", 200),
            spec("post", "/items/", 201),
            spec("Get", "/items/:id", 200),
            spec("PUT", "/items/:id", 200),
            spec("DELETE", "/items/:id", 200),
            spec("PATCH", "/items/:id", 200),
        ]
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_invalid_method_fails_binding() {
        let store = Store::new();
        let endpoints = vec![spec("GET", "/items/", 200), spec("FETCH", "/items/", 200)];

        let result = build_router(&endpoints, &store);
        assert_eq!(
            result.err(),
            Some(BindError::InvalidMethod {
                method: "fetch".to_string(),
                path: "/items/".to_string(),
            })
        );
        // Nothing is initialized when any endpoint is rejected.
        assert_eq!(store.snapshot("/items/"), None);
    }

    #[test]
    fn test_invalid_status_and_path_fail_binding() {
        assert_eq!(
            bind_endpoint(&spec("GET", "/items/", 42)),
            Err(BindError::InvalidStatus {
                status: 42,
                path: "/items/".to_string(),
            })
        );
        assert_eq!(
            bind_endpoint(&spec("GET", "items/", 200)),
            Err(BindError::InvalidPath {
                path: "items/".to_string(),
            })
        );
    }

    #[test]
    fn test_get_collections_are_preinitialized() {
        let store = Store::new();
        let endpoints = vec![
            spec("GET", "/items/", 200),
            spec("POST", "/users/", 201),
            spec("GET", "/orders", 200),
        ];

        build_router(&endpoints, &store).unwrap();

        assert_eq!(store.snapshot("/items/"), Some(vec![]));
        assert_eq!(store.snapshot("/users/"), None);
        assert_eq!(store.snapshot("/orders"), None);
    }

    #[tokio::test]
    async fn test_create_then_fetch_through_router() {
        let store = Store::new();
        let router = build_router(&items_config(), &store).unwrap();

        let (status, body) = send(&router, "GET", "/items/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = send(&router, "POST", "/items/", Some(json!({"name": "a"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"name": "a", "id": 1}));

        let (status, body) = send(&router, "GET", "/items/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"name": "a", "id": 1}));

        let (status, body) = send(&router, "PUT", "/items/1", Some(json!({"done": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"name": "a", "id": 1, "done": true}));

        let (status, body) = send(&router, "DELETE", "/items/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"name": "a", "id": 1, "done": true}));

        let (status, body) = send(&router, "GET", "/items/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn test_unconfigured_verb_is_method_not_allowed() {
        let store = Store::new();
        let router = build_router(&[spec("GET", "/items/", 200)], &store).unwrap();

        let (status, body) = send(&router, "POST", "/items/", Some(json!({"name": "a"}))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Method not allowed"}));
        assert_eq!(store.snapshot("/items/"), Some(vec![]));
    }

    #[tokio::test]
    async fn test_configured_patch_is_method_not_allowed() {
        let store = Store::new();
        let router = build_router(&items_config(), &store).unwrap();
        send(&router, "POST", "/items/", Some(json!({"name": "a"}))).await;

        let (status, body) = send(&router, "PATCH", "/items/1", Some(json!({"name": "b"}))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let store = Store::new();
        let router = build_router(&items_config(), &store).unwrap();

        let (status, body) = send(&router, "GET", "/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn test_duplicate_endpoint_keeps_first_definition() {
        let store = Store::new();
        let endpoints = vec![spec("POST", "/items/", 201), spec("post", "/items/", 202)];
        let router = build_router(&endpoints, &store).unwrap();

        let (status, _) = send(&router, "POST", "/items/", Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_templates_differing_in_parameter_name_share_a_route() {
        let store = Store::new();
        let endpoints = vec![
            spec("GET", "/a/:id", 200),
            spec("POST", "/a/:name", 201),
            spec("DELETE", "/a/:name", 200),
            spec("GET", "/a/:other", 299),
        ];
        let router = build_router(&endpoints, &store).unwrap();

        let (status, body) = send(&router, "POST", "/a/anything", Some(json!({"v": 1}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"v": 1, "id": 1}));

        let (status, body) = send(&router, "GET", "/a/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"v": 1, "id": 1}));

        // `DELETE /a/:name` has no `id` parameter, so it never finds an item.
        let (status, _) = send(&router, "DELETE", "/a/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(store.snapshot("/a/").map(|d| d.len()), Some(1));
    }

    #[tokio::test]
    async fn test_trailing_slash_is_optional() {
        let store = Store::new();
        let router = build_router(&items_config(), &store).unwrap();

        let (status, body) = send(&router, "POST", "/items", Some(json!({"name": "a"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"name": "a", "id": 1}));

        let (status, body) = send(&router, "GET", "/items", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"name": "a", "id": 1}]));

        let (status, body) = send(&router, "GET", "/items/1/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"name": "a", "id": 1}));

        let (status, body) = send(&router, "PATCH", "/items", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn test_slash_variants_of_one_path_keep_their_own_collections() {
        let store = Store::new();
        let endpoints = vec![spec("GET", "/items/", 200), spec("POST", "/items", 201)];
        let router = build_router(&endpoints, &store).unwrap();

        let (status, _) = send(&router, "POST", "/items/", Some(json!({"name": "a"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(store.snapshot("/items").map(|d| d.len()), Some(1));

        let (_, body) = send(&router, "GET", "/items", None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_cors_headers_are_added() {
        let store = Store::new();
        let router = build_router(&items_config(), &store).unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/items/")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_live_server_round_trip() {
        let store = Store::new();
        let router = build_router(&items_config(), &store).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = reqwest::Client::new();
        let created = client
            .post(format!("http://{}/items/", addr))
            .json(&json!({"name": "live"}))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status().as_u16(), 201);
        assert_eq!(
            created.json::<Value>().await.unwrap(),
            json!({"name": "live", "id": 1})
        );

        let listed = client
            .get(format!("http://{}/items/", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(listed.status().as_u16(), 200);
        assert_eq!(
            listed.json::<Value>().await.unwrap(),
            json!([{"name": "live", "id": 1}])
        );
    }
}
