use callgate_config::CorsConfig;
use http::{HeaderName, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    // Origins
    layer = if config.any_origin() {
        layer.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<_> = config.allow_origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer.allow_origin(origins)
    };

    // Headers
    let mut headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
    headers.extend(
        config
            .allow_headers
            .iter()
            .filter_map(|h| h.parse::<HeaderName>().ok()),
    );
    layer = layer.allow_headers(headers);

    if config.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    if let Some(max_age) = config.max_age {
        layer = layer.max_age(max_age);
    }

    layer
}
