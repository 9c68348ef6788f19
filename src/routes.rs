//! Liveness routes and CORS wiring.

use crate::config::Settings;
use crate::error::ConfigError;
use crate::state::AppState;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

#[derive(Serialize)]
struct GreetingBody {
    greetings: &'static str,
}

#[derive(Serialize)]
struct PingBody {
    ping: &'static str,
}

async fn root() -> Json<GreetingBody> {
    Json(GreetingBody {
        greetings: "Hey you! hit /ping to see the api is alive",
    })
}

async fn ping() -> Json<PingBody> {
    Json(PingBody { ping: "pong!" })
}

fn is_wildcard(list: &[String]) -> bool {
    list.len() == 1 && list[0] == "*"
}

/// CORS layer from the configured policy. A `*` entry in a list maps to the
/// permissive wildcard; anything unparseable is a startup error.
pub fn cors_layer(settings: &Settings) -> Result<CorsLayer, ConfigError> {
    if settings.cors_credentials
        && (is_wildcard(&settings.cors_origins)
            || is_wildcard(&settings.cors_methods)
            || is_wildcard(&settings.cors_headers))
    {
        return Err(ConfigError::invalid(
            "CORS_CREDENTIALS",
            "credentials cannot be combined with a '*' allow-list",
        ));
    }
    let origins = if is_wildcard(&settings.cors_origins) {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            settings
                .cors_origins
                .iter()
                .map(|o| {
                    o.parse::<HeaderValue>().map_err(|_| {
                        ConfigError::invalid("CORS_ORIGINS", format!("bad origin '{}'", o))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        )
    };
    let methods = if is_wildcard(&settings.cors_methods) {
        AllowMethods::any()
    } else {
        AllowMethods::list(
            settings
                .cors_methods
                .iter()
                .map(|m| {
                    m.parse::<Method>().map_err(|_| {
                        ConfigError::invalid("CORS_METHODS", format!("bad method '{}'", m))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        )
    };
    let headers = if is_wildcard(&settings.cors_headers) {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(
            settings
                .cors_headers
                .iter()
                .map(|h| {
                    h.parse::<HeaderName>().map_err(|_| {
                        ConfigError::invalid("CORS_HEADERS", format!("bad header '{}'", h))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    let mut layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers);
    if settings.cors_credentials {
        layer = layer.allow_credentials(true);
    }
    Ok(layer)
}

/// Assemble the application router: liveness endpoints plus the global CORS
/// layer. Resource routers built on the CRUD engine merge in here.
pub fn app_router(state: AppState) -> Result<Router, ConfigError> {
    let cors = cors_layer(&state.settings)?;
    Ok(Router::new()
        .route("/", get(root))
        .route("/ping", get(ping))
        .layer(cors)
        .with_state(state))
}
