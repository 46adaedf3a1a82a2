use actix_web::http::header::ContentType;
use actix_web::web;
use actix_web::HttpResponse;

use crate::authentication::AuthenticatedUser;

/// `GET /<realm path>`
///
/// Only reachable through `require_basic_auth`, which is what puts the
/// `AuthenticatedUser` in the request.
#[tracing::instrument(name = "Welcoming user", skip_all)]
pub async fn welcome(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    let user = user.into_inner();
    let realm = user.realm().map(|r| r.as_ref()).unwrap_or("this realm");
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(format!("Welcome to {realm}, {}", user.as_ref()))
}
