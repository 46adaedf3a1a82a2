use actix_web::HttpResponse;

/// `GET /health_check`
///
/// Never behind a realm; also usable as a liveness probe.
///
/// Note: viewing http response requires `curl -v`
pub async fn health_check() -> HttpResponse { HttpResponse::Ok().finish() }
