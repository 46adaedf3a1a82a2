use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::App;
use actix_web::HttpServer;
use actix_web_lab::middleware::from_fn;
use tracing_actix_web::TracingLogger;

use crate::authentication::require_basic_auth;
use crate::authentication::HttpAuthorizer;
use crate::authentication::ProtectedRealms;
use crate::configuration::Settings;
use crate::routes::health_check;
use crate::routes::welcome;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
///
/// Owns the `HttpAuthorizer` for the lifetime of the server: it is created in
/// `build`, and shut down by `run_until_stopped` once the server exits.
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
    authorizer: web::Data<HttpAuthorizer>,
}

impl Application {
    /// Bind the listener, create the password file cache, and build the
    /// `Server` (which does not start until awaited)
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;

        // port 0 means the OS picked one; this is the one we got
        let port = listener.local_addr()?.port();

        let authorizer = web::Data::new(HttpAuthorizer::init(cfg.authorization.cache_ttl()));
        let realms = ProtectedRealms::new(cfg.authorization.realms);
        for realm in realms.iter() {
            tracing::info!(
                path = %realm.path,
                realm = %realm.realm,
                password_file = %realm.password_file,
                "Protecting scope"
            );
        }

        let server = run(listener, authorizer.clone(), realms)?;

        Ok(Self {
            port,
            server,
            authorizer,
        })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`). The authorizer is shut down however the
    /// server exits.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let outcome = self.server.await;
        self.authorizer.shutdown();
        outcome
    }
}

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints: `/health_check` is open, and each configured
/// realm's path is guarded by `require_basic_auth`.
pub fn run(
    listener: TcpListener,
    authorizer: web::Data<HttpAuthorizer>,
    realms: ProtectedRealms,
) -> Result<Server, anyhow::Error> {
    let realms = web::Data::new(realms);

    // note the closure; actix-web spins up one worker per core, each with its
    // own copy of `App`. `Data` is an `Arc`, so every worker shares the same
    // authorizer (and so, the same password file cache)
    let server = HttpServer::new(move || {
        let mut app = App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .app_data(authorizer.clone())
            .app_data(realms.clone());

        for realm in realms.iter() {
            app = app.service(
                web::scope(&realm.path)
                    .wrap(from_fn(require_basic_auth))
                    .route("", web::get().to(welcome))
                    .route("/", web::get().to(welcome)),
            );
        }
        app
    })
    .listen(listener)?
    .run();

    Ok(server)
}
