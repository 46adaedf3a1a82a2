use base64::engine::general_purpose;
use base64::Engine;
use fake::faker::internet::en::Password;
use fake::faker::internet::en::Username;
use fake::Fake;

use crate::helpers::spawn_app;

fn assert_challenged(
    resp: &reqwest::Response,
    realm: &str,
) {
    assert_eq!(resp.status().as_u16(), 401);
    let challenges: Vec<_> = resp.headers().get_all("WWW-Authenticate").iter().collect();
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0], format!(r#"Basic realm="{realm}""#).as_str());
}

#[tokio::test]
async fn correct_credentials_are_welcomed() {
    let app = spawn_app().await;

    let resp = app.get_as("/secure", "alice", "s3cret").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.headers().get("WWW-Authenticate").is_none());
    assert_eq!(resp.text().await.unwrap(), "Welcome to Secure Area, alice");

    let resp = app.get_as("/secure/", "bob", "hunter2").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "Welcome to Secure Area, bob");
}

#[tokio::test]
async fn wrong_password_is_challenged() {
    let app = spawn_app().await;
    let resp = app.get_as("/secure", "alice", "wrong").await;
    assert_challenged(&resp, "Secure Area");
    assert_eq!(resp.content_length().unwrap(), 0); // no detail, no body
}

#[tokio::test]
async fn unknown_user_is_challenged() {
    let app = spawn_app().await;
    let resp = app.get_as("/secure", "mallory", "s3cret").await;
    assert_challenged(&resp, "Secure Area");

    let username: String = Username().fake();
    let password: String = Password(8..20).fake();
    let resp = app.get_as("/secure", &username, &password).await;
    assert_challenged(&resp, "Secure Area");
}

#[tokio::test]
async fn malformed_headers_are_challenged() {
    let app = spawn_app().await;

    let no_colon = format!("Basic {}", general_purpose::STANDARD.encode("alices3cret"));
    let lowercase_scheme = format!("basic {}", general_purpose::STANDARD.encode("alice:s3cret"));
    let cases = [
        (None, "no header"),
        (Some("Bearer xyz"), "wrong scheme"),
        (Some(lowercase_scheme.as_str()), "scheme is case-sensitive"),
        (Some("Basic"), "no payload"),
        (Some("Basic %%%"), "not base64"),
        (Some(no_colon.as_str()), "no separator"),
    ];

    for (header, msg) in cases {
        let resp = app.get_with_header("/secure", header).await;
        assert_eq!(resp.status().as_u16(), 401, "{msg}");
        assert_challenged(&resp, "Secure Area");
    }
}

#[tokio::test]
async fn realms_do_not_share_credentials() {
    let app = spawn_app().await;

    let resp = app.get_as("/staff", "alice", "s3cret").await;
    assert_challenged(&resp, "Staff Only");

    let resp = app.get_as("/staff", "carol", "c0ffee").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "Welcome to Staff Only, carol");

    let resp = app.get_as("/secure", "carol", "c0ffee").await;
    assert_challenged(&resp, "Secure Area");
}

#[tokio::test]
async fn broken_password_file_denies_everyone() {
    let app = spawn_app().await;
    let resp = app.get_as("/broken", "alice", "s3cret").await;
    assert_challenged(&resp, "Broken");

    // failed loads are not cached: once fixed on disk, the next request loads
    // the file again
    app.broken.overwrite("alice = s3cret\n");
    let resp = app.get_as("/broken", "alice", "s3cret").await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn password_file_is_cached() {
    let app = spawn_app().await;
    let resp = app.get_as("/secure", "alice", "s3cret").await;
    assert_eq!(resp.status().as_u16(), 200);

    // within the TTL, the parsed file keeps being served
    app.secure_area.overwrite("bob = hunter2\n");
    let resp = app.get_as("/secure", "alice", "s3cret").await;
    assert_eq!(resp.status().as_u16(), 200);

    // the realm that was never requested is read fresh
    app.staff_only.overwrite("dave = d4ve\n");
    let resp = app.get_as("/staff", "dave", "d4ve").await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn unprotected_paths_are_not_found() {
    let app = spawn_app().await;
    let resp = app.get_with_header("/securely", None).await;
    assert_eq!(resp.status().as_u16(), 404);
    assert!(resp.headers().get("WWW-Authenticate").is_none());
}
