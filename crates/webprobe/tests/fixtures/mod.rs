//! Shared test fixtures.

#![allow(dead_code)]

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use webprobe::{HttpConfiguration, WebProbe};
use webprobe_host::{
    ActionContext, ActionResult, AppBuilder, HandlerError, Request, Response, ResponseExt, Startup,
};

/// Body returned by `POST /json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseModel {
    pub integer_value: i32,
    pub string_value: String,
}

impl ResponseModel {
    pub fn sample() -> Self {
        Self {
            integer_value: 1,
            string_value: "Test".to_string(),
        }
    }
}

/// Route configuration used as the global configuration.
pub fn routes() -> HttpConfiguration {
    HttpConfiguration::new()
        .route(
            Method::POST,
            "api/NoAttributes/WithParameter/{id}",
            |ctx: ActionContext| async move {
                let id: i32 = ctx.param("id")?;
                ActionResult::ok(&id)
            },
        )
        .route(Method::GET, "api/models/{id}", |ctx: ActionContext| async move {
            let id: i32 = ctx.param("id")?;
            if id <= 0 {
                return Err(HandlerError::NotFound(format!("no model {id}")));
            }
            ActionResult::ok(&ResponseModel {
                integer_value: id,
                string_value: format!("Model {id}"),
            })
        })
        .route(Method::POST, "api/echo", |ctx: ActionContext| async move {
            let body = ctx.body().clone();
            let content_type = ctx.header("content-type").unwrap_or("text/plain").to_string();
            Ok::<_, HandlerError>(ActionResult::content(StatusCode::OK, content_type, body))
        })
        .route(Method::GET, "api/headers", |ctx: ActionContext| async move {
            let headers: serde_json::Map<String, serde_json::Value> = ctx
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), serde_json::Value::from(v)))
                })
                .collect();
            let query = ctx.uri().query().unwrap_or("").to_string();
            ActionResult::ok(&serde_json::json!({ "headers": headers, "query": query }))
        })
        .route(Method::GET, "api/fail", |_ctx: ActionContext| async move {
            Err::<ActionResult, _>(HandlerError::internal("storage offline"))
        })
        .route(Method::GET, "api/explode", |_ctx: ActionContext| async move {
            explode()
        })
}

fn explode() -> Result<ActionResult, HandlerError> {
    panic!("action exploded")
}

/// Startup answering a handful of fixed requests.
///
/// - any request with `CustomHeader: CustomValue` gets `200`
/// - `POST /test` redirects
/// - `POST /json` returns [`ResponseModel::sample`]
/// - `POST /nomodel` returns `{"id":1}`
/// - everything else is `404`
#[derive(Debug, Default)]
pub struct CustomStartup;

impl Startup for CustomStartup {
    fn configuration(&self, app: &mut AppBuilder) {
        app.use_fn("custom-header", |request, next| {
            Box::pin(async move {
                let marked = request
                    .headers()
                    .get("CustomHeader")
                    .is_some_and(|value| value == "CustomValue");
                if marked {
                    Response::empty(StatusCode::OK)
                } else {
                    next.run(request).await
                }
            })
        })
        .use_fn("fixed-posts", |request, next| {
            Box::pin(async move {
                match fixed_post(&request) {
                    Some(response) => response,
                    None => next.run(request).await,
                }
            })
        });
    }
}

fn fixed_post(request: &Request) -> Option<Response> {
    if request.method() != Method::POST {
        return None;
    }
    match request.uri().path() {
        "/test" => Some(ActionResult::redirect("/").into_response()),
        "/json" => {
            let model = serde_json::to_value(ResponseModel::sample()).ok()?;
            Some(Response::json(StatusCode::OK, &model))
        }
        "/nomodel" => Some(Response::json(StatusCode::OK, &serde_json::json!({ "id": 1 }))),
        _ => None,
    }
}

/// Startup mounting [`routes`] behind a request-id middleware.
#[derive(Debug, Default)]
pub struct ApiStartup;

impl Startup for ApiStartup {
    fn configuration(&self, app: &mut AppBuilder) {
        app.use_fn("request-id", |request, next| {
            Box::pin(async move {
                let mut response = next.run(request).await;
                response
                    .headers_mut()
                    .insert("x-request-id", http::HeaderValue::from_static("fixture"));
                response
            })
        })
        .use_web_api(&routes());
    }
}

/// Stops global servers and restores the global configuration.
pub fn reset() {
    webprobe::logging::init_test_logging();
    WebProbe::server().stops();
    WebProbe::is_using(Some(routes()));
}
