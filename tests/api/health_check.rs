use crate::helpers::spawn_app;

#[tokio::test]
async fn health_check_is_never_protected() {
    let app = spawn_app().await; // spawn the server in background (not async)

    let resp = app
        .api_client
        .get(format!("{}/health_check", app.addr))
        .send()
        .await
        .expect("execute request");
    assert!(resp.status().is_success());
    assert!(resp.headers().get("WWW-Authenticate").is_none());
    assert_eq!(resp.content_length().unwrap(), 0); // empty body
}
