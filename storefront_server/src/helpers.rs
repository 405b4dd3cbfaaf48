use actix_web::HttpRequest;
use log::trace;
use storefront_engine::db_types::RequestContext;

use crate::errors::ServerError;

/// Builds the tenant/user context from the identity headers the upstream proxy sets on every request.
/// All three headers are required; a request without them never reaches the order engine.
pub fn request_context(req: &HttpRequest) -> Result<RequestContext, ServerError> {
    let user_id = header_value(req, "SF-User-Id")?;
    let app_id = header_value(req, "SF-App-Id")?;
    let developer_id = header_value(req, "SF-Developer-Id")?;
    trace!("💻️ Request context: user {user_id}, app {app_id}, developer {developer_id}");
    Ok(RequestContext::new(user_id, app_id, developer_id))
}

fn header_value<'a>(req: &'a HttpRequest, name: &'static str) -> Result<&'a str, ServerError> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ServerError::MissingIdentityHeader(name))
}
