//! A fake PESU Academy served by wiremock.

#![allow(dead_code)]

use anyhow::{bail, Result};
use pesuauth::portal::{AuthenticationClient, MetricsCollector, PortalConfig};
use std::{net::TcpListener, sync::Arc};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const LOGIN_PAGE_PATH: &str = "/Academy/";
pub const LOGIN_PATH: &str = "/Academy/j_spring_security_check";
pub const PROFILE_PATH: &str = "/Academy/s/studentProfilePESUAdmin";

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn login_page(token: &str) -> String {
    format!(
        r#"<html><head><meta name="csrf-token" content="{token}"></head>
        <body><div class="login-form"><form></form></div></body></html>"#
    )
}

pub fn home_page() -> String {
    r#"<html><head><meta name="csrf-token" content="after-login"></head>
    <body><div class="dashboard">Welcome</div></body></html>"#
        .to_string()
}

pub fn bad_credentials_page() -> String {
    r#"<html><head><meta name="csrf-token" content="again"></head>
    <body><div class="login-form"><span class="error">Bad credentials</span></div></body></html>"#
        .to_string()
}

pub fn profile_page() -> String {
    r#"<html><body>
    <div class="elem-info-wrapper">
      <div class="form-group"><label class="lbl-title-light">Name</label><label>John Doe</label></div>
      <div class="form-group"><label class="lbl-title-light">PESU Id</label><label>PES1201800001</label></div>
      <div class="form-group"><label class="lbl-title-light">SRN</label><label>PES1UG20CS001</label></div>
      <div class="form-group"><label class="lbl-title-light">Program</label><label>Bachelor of Technology</label></div>
      <div class="form-group"><label class="lbl-title-light">Branch</label><label>Computer Science and Engineering</label></div>
      <div class="form-group"><label class="lbl-title-light">Semester</label><label>Sem-2</label></div>
      <div class="form-group"><label class="lbl-title-light">Section</label><label>Section C</label></div>
    </div>
    <input type="email" id="updateMail" value="johndoe@gmail.com">
    <input type="text" id="updateContact" value="1234567890">
    </body></html>"#
        .to_string()
}

/// Serve the login page with a session cookie.
pub async fn mount_login_page(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(LOGIN_PAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "JSESSIONID=abc123; Path=/")
                .set_body_string(login_page(token)),
        )
        .mount(server)
        .await;
}

pub async fn mount_login_response(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

pub fn client(server: &MockServer) -> Result<(Arc<AuthenticationClient>, Arc<MetricsCollector>)> {
    Ok(client_with(PortalConfig::for_origin(&server.uri())?))
}

pub fn client_with(config: PortalConfig) -> (Arc<AuthenticationClient>, Arc<MetricsCollector>) {
    let metrics = Arc::new(MetricsCollector::new());
    let client = Arc::new(AuthenticationClient::new(config, Arc::clone(&metrics)));
    (client, metrics)
}

pub async fn requests_to(server: &MockServer, http_method: &str, request_path: &str) -> Result<usize> {
    let Some(requests) = server.received_requests().await else {
        bail!("wiremock request recording is disabled");
    };
    Ok(requests
        .iter()
        .filter(|request| {
            request.method.as_str() == http_method && request.url.path() == request_path
        })
        .count())
}
