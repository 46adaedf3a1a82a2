use std::path::PathBuf;

use once_cell::sync::Lazy;
use realm_auth::configuration::get_configuration;
use realm_auth::configuration::RealmSettings;
use realm_auth::realm::RealmName;
use realm_auth::startup::Application;
use realm_auth::telemetry::get_subscriber;
use realm_auth::telemetry::init_subscriber;
use uuid::Uuid;

/// Init the tracing subscriber once only.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    // the two sinks have different (closure) types, hence the match arms
    match std::env::var("TEST_LOG") {
        Ok(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::stdout);
            init_subscriber(subscriber).unwrap();
        }
        Err(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::sink);
            init_subscriber(subscriber).unwrap();
        }
    };
});

/// Password file in the system temp dir, removed on drop
pub struct PasswordFile(PathBuf);

impl PasswordFile {
    pub fn new(contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("realm-auth-test-{}.passwd", Uuid::new_v4()));
        std::fs::write(&path, contents).expect("write password file");
        Self(path)
    }

    pub fn overwrite(
        &self,
        contents: &str,
    ) {
        std::fs::write(&self.0, contents).expect("overwrite password file");
    }

    fn key(&self) -> String { self.0.to_string_lossy().into_owned() }
}

impl Drop for PasswordFile {
    fn drop(&mut self) { let _ = std::fs::remove_file(&self.0); }
}

pub struct TestApp {
    pub addr: String,
    pub api_client: reqwest::Client,
    /// Backs `/secure` ("Secure Area"): alice/s3cret, bob/hunter2
    pub secure_area: PasswordFile,
    /// Backs `/staff` ("Staff Only"): carol/c0ffee
    pub staff_only: PasswordFile,
    /// Backs `/broken` ("Broken"), which never loads
    pub broken: PasswordFile,
}

impl TestApp {
    /// `GET {path}`, with `authorization` as the raw `Authorization` header
    pub async fn get_with_header(
        &self,
        path: &str,
        authorization: Option<&str>,
    ) -> reqwest::Response {
        let mut req = self.api_client.get(format!("{}{path}", self.addr));
        if let Some(value) = authorization {
            req = req.header("Authorization", value);
        }
        req.send().await.expect("execute request")
    }

    /// `GET {path}` with proper Basic credentials
    pub async fn get_as(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> reqwest::Response {
        self.api_client
            .get(format!("{}{path}", self.addr))
            .basic_auth(username, Some(password))
            .send()
            .await
            .expect("execute request")
    }
}

fn realm(
    path: &str,
    name: &str,
    file: &PasswordFile,
) -> RealmSettings {
    RealmSettings {
        path: path.to_string(),
        realm: RealmName::parse(name.to_string()).unwrap(),
        password_file: file.key(),
    }
}

/// Spawn a `TestApp` with three realms, each backed by its own temporary
/// password file. The default cache TTL (60 s) is kept, so edits to a
/// password file are not seen within a test.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let secure_area = PasswordFile::new("# test users\nalice = s3cret\nbob = hunter2\n");
    let staff_only = PasswordFile::new("carol = c0ffee\n");
    let broken = PasswordFile::new("alice = s3cret\nthis is not a pair\n");

    let cfg = {
        let mut cfg = get_configuration().unwrap();
        // port 0 is reserved by the OS; the server will be spawned on a random
        // available port
        cfg.application.port = 0;
        cfg.authorization.realms = vec![
            realm("/secure", "Secure Area", &secure_area),
            realm("/staff", "Staff Only", &staff_only),
            realm("/broken", "Broken", &broken),
        ];
        cfg
    };

    let app = Application::build(cfg).await.unwrap();
    let port = app.get_port();
    let addr = format!("http://localhost:{port}");
    tokio::spawn(app.run_until_stopped());

    TestApp {
        addr,
        api_client: reqwest::Client::new(),
        secure_area,
        staff_only,
        broken,
    }
}
