//! Integration tests for route matching and upstream URI construction.

use std::collections::HashMap;

use axum::http::Uri;
use tollgate::config::model::{Defaults, Route};
use tollgate::proxy::routing::{match_route, strip_wildcard_prefix};
use tollgate::proxy::upstream_uri;

fn make_route(path: &str, methods: &[&str]) -> Route {
    Route {
        path: path.into(),
        methods: methods.iter().map(|s| (*s).to_string()).collect(),
        upstream: "http://localhost:8080".into(),
        strip_prefix: false,
        timeout: None,
    }
}

#[test]
fn specificity_ordering_comprehensive() {
    let routes = vec![
        make_route("/*", &["*"]),             // catch-all (specificity 0)
        make_route("/api/*", &["*"]),         // prefix wildcard (specificity 10)
        make_route("/api/users/:id", &["*"]), // parameterized (specificity 15)
        make_route("/api/users/me", &["*"]),  // exact (specificity 20)
    ];

    let (idx, _) = match_route(&routes, "/api/users/me", "GET").unwrap();
    assert_eq!(idx, 3);

    let (idx, params) = match_route(&routes, "/api/users/42", "GET").unwrap();
    assert_eq!(idx, 2);
    assert_eq!(params.get("id").unwrap(), "42");

    let (idx, _) = match_route(&routes, "/api/other/deep/path", "GET").unwrap();
    assert_eq!(idx, 1);

    let (idx, _) = match_route(&routes, "/something/else", "GET").unwrap();
    assert_eq!(idx, 0);
}

#[test]
fn method_filtering_restricts_matches() {
    let routes = vec![make_route("/orders", &["GET", "POST"])];

    assert!(match_route(&routes, "/orders", "get").is_some());
    assert!(match_route(&routes, "/orders", "POST").is_some());
    assert!(match_route(&routes, "/orders", "DELETE").is_none());
}

#[test]
fn longest_prefix_wins_between_backends() {
    let routes = vec![
        make_route("/api/*", &["*"]),
        make_route("/api/python/*", &["*"]),
        make_route("/api/nodejs/*", &["*"]),
    ];

    let (idx, _) = match_route(&routes, "/api/python/users", "GET").unwrap();
    assert_eq!(idx, 1);
    let (idx, _) = match_route(&routes, "/api/nodejs", "GET").unwrap();
    assert_eq!(idx, 2);
    let (idx, _) = match_route(&routes, "/api/dotnet/orders", "GET").unwrap();
    assert_eq!(idx, 0);
}

#[test]
fn prefix_is_only_stripped_on_segment_boundaries() {
    assert_eq!(strip_wildcard_prefix("/api/python/*", "/api/python/users"), "/users");
    assert_eq!(strip_wildcard_prefix("/api/python/*", "/api/python"), "/");
    assert_eq!(strip_wildcard_prefix("/api/python/*", "/api/pythonic"), "/api/pythonic");
    assert_eq!(strip_wildcard_prefix("/api/exact", "/api/exact"), "/api/exact");
}

#[test]
fn stripped_route_builds_upstream_uri() {
    let mut route = make_route("/api/dotnet/*", &["*"]);
    route.upstream = "http://localhost:5000/v1".into();
    route.strip_prefix = true;

    let inbound: Uri = "/api/dotnet/orders/7?expand=lines".parse().unwrap();
    let uri = upstream_uri(&route, &HashMap::new(), &inbound).unwrap();
    assert_eq!(uri, "http://localhost:5000/v1/orders/7?expand=lines");
}

#[test]
fn multi_segment_params() {
    let routes = vec![make_route(
        "/users/:user_id/orders/:order_id/items/:item_id",
        &["*"],
    )];

    let (_, params) = match_route(&routes, "/users/1/orders/2/items/3", "GET").unwrap();
    assert_eq!(params.len(), 3);
    assert_eq!(params["user_id"], "1");
    assert_eq!(params["order_id"], "2");
    assert_eq!(params["item_id"], "3");
}

#[test]
fn empty_routes_returns_none() {
    let routes: Vec<Route> = vec![];
    assert!(match_route(&routes, "/anything", "GET").is_none());
}

#[test]
fn defaults_are_sensible() {
    let defaults = Defaults::default();
    assert_eq!(defaults.timeout, 30_000);
    assert!(defaults.strip_hop_by_hop);
}
