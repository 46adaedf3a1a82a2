use actix_web::body::MessageBody;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web;
use actix_web::HttpMessage;
use actix_web_lab::middleware::Next;

use super::HttpAuthorizer;
use crate::configuration::RealmSettings;
use crate::realm::RealmName;
use crate::utils::error_500;

/// Username of an authorized request, stored in the request extensions by
/// `require_basic_auth`. Extract it in handlers with
/// `web::ReqData<AuthenticatedUser>`.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    username: String,
    realm: Option<RealmName>,
}

impl AuthenticatedUser {
    pub(crate) fn new(username: String) -> Self {
        Self {
            username,
            realm: None,
        }
    }

    /// Realm the user was authorized for, if known
    pub fn realm(&self) -> Option<&RealmName> { self.realm.as_ref() }
}

impl AsRef<str> for AuthenticatedUser {
    fn as_ref(&self) -> &str { &self.username }
}

/// Every realm the server protects, as configured
#[derive(Clone, Debug)]
pub struct ProtectedRealms(Vec<RealmSettings>);

impl ProtectedRealms {
    pub fn new(realms: Vec<RealmSettings>) -> Self { Self(realms) }

    /// The realm guarding `path`; the longest matching prefix wins
    pub fn for_path(
        &self,
        path: &str,
    ) -> Option<&RealmSettings> {
        self.0
            .iter()
            .filter(|realm| realm.covers(path))
            .max_by_key(|realm| realm.path.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RealmSettings> { self.0.iter() }
}

/// Guards a scope with HTTP Basic authentication. The realm (and so, the
/// password file) is looked up from the request path in `ProtectedRealms`.
///
/// On success, the `AuthenticatedUser` is embedded in the request, and the
/// reference to the realm's password file is held until the inner service has
/// produced its response (or the request is dropped). On failure, the request
/// never reaches the inner service, and the client gets a 401 with the realm's
/// challenge.
///
/// For more details, refer to the documentation for
/// `actix_web_lab::middleware::from_fn`
pub async fn require_basic_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let authorizer = req
        .app_data::<web::Data<HttpAuthorizer>>()
        .cloned()
        .ok_or_else(|| error_500("No HttpAuthorizer registered"))?;
    let realm = req
        .app_data::<web::Data<ProtectedRealms>>()
        .and_then(|realms| realms.for_path(req.path()).cloned())
        .ok_or_else(|| error_500(format!("No realm protects {}", req.path())))?;

    let authorized = authorizer.authorize(
        req.headers().get(AUTHORIZATION).map(|v| v.as_bytes()),
        &realm.realm,
        &realm.password_file,
    )?;

    let mut user = authorized.user().clone();
    user.realm = Some(realm.realm.clone());
    req.extensions_mut().insert(user);

    let resp = next.call(req).await;
    // releases this request's reference to the password file
    drop(authorized);
    resp
}
