//! Sign-in flow: drive the platform login form and capture session cookies.
//!
//! The flow is a plain HTTP round-trip rather than a browser session: GET
//! the sign-in page, carry its hidden inputs (authenticity token) into a
//! credentialed POST, then confirm the session by looking for the
//! logged-in marker on the home page. A short-lived client with its own
//! cookie jar exists only for the duration of the attempt.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;

use super::Session;

/// Path of the platform sign-in page, relative to the base origin.
const SIGN_IN_PATH: &str = "/sign_in";

/// Marker substring present on the home page only for authenticated
/// sessions. Its absence is the sole login-failure signal; there is no
/// expiry handling.
pub const LOGGED_IN_MARKER: &str = "logged_in";

/// Upper bound on each login request, mirroring the bounded navigation
/// wait of the original sign-in flow.
const LOGIN_TIMEOUT_SECS: u64 = 10;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex")
});

#[allow(clippy::expect_used)]
static FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("static selector"));

#[allow(clippy::expect_used)]
static EMAIL_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#user_email").expect("static selector"));

#[allow(clippy::expect_used)]
static PASSWORD_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#user_password").expect("static selector"));

#[allow(clippy::expect_used)]
static HIDDEN_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type='hidden']").expect("static selector"));

/// The sign-in form as scraped from the sign-in page.
#[derive(Debug)]
struct SignInForm {
    /// Form `action` attribute, relative to the sign-in page.
    action: Option<String>,
    /// `name` of the email input.
    email_field: String,
    /// `name` of the password input.
    password_field: String,
    /// Hidden inputs carried through the submission (CSRF token et al.).
    hidden: Vec<(String, String)>,
}

/// Logs in with the given credentials and returns the captured [`Session`].
///
/// The email is syntax-checked before any network activity. The form
/// submission itself is advanced on completion or timeout, whichever comes
/// first. Only the post-check decides success: one authenticated request
/// to the platform root must contain [`LOGGED_IN_MARKER`].
///
/// # Errors
///
/// - [`Error::InvalidEmail`] for a malformed email (no network use).
/// - [`Error::AuthenticationFailed`] when the sign-in form is missing or
///   the post-check marker is absent.
/// - [`Error::Request`] for network failures outside the form submission.
#[instrument(skip(password), fields(base = %base))]
pub async fn attempt_login(base: &Url, email: &str, password: &str) -> Result<Session> {
    if !EMAIL_RE.is_match(email) {
        return Err(Error::invalid_email(email));
    }

    let jar = Arc::new(Jar::default());
    #[allow(clippy::expect_used)]
    let client = Client::builder()
        .cookie_provider(Arc::clone(&jar))
        .timeout(Duration::from_secs(LOGIN_TIMEOUT_SECS))
        .build()
        .expect("failed to build HTTP client with static configuration");

    let sign_in_url = base
        .join(SIGN_IN_PATH)
        .map_err(|_| Error::invalid_url(SIGN_IN_PATH))?;

    let page = client
        .get(sign_in_url.clone())
        .send()
        .await
        .map_err(|e| Error::request(sign_in_url.as_str(), e))?
        .text()
        .await
        .map_err(|e| Error::request(sign_in_url.as_str(), e))?;

    let form = parse_sign_in_form(&page)?;
    let action_url = match form.action.as_deref() {
        Some(action) => sign_in_url
            .join(action)
            .map_err(|_| Error::invalid_url(action))?,
        None => sign_in_url.clone(),
    };

    let mut fields = form.hidden;
    fields.push((form.email_field, email.to_string()));
    fields.push((form.password_field, password.to_string()));

    // Submission completion (success, failure, or timeout) only advances to
    // the post-check; the marker below is what decides the outcome.
    if let Err(e) = client.post(action_url).form(&fields).send().await {
        debug!(error = %e, "sign-in submission did not complete cleanly");
    }

    let session = Session::new(serialize_cookies(jar.as_ref(), base));
    let fetcher = Fetcher::new(base.clone(), session.clone());
    let home = fetcher.fetch_raw("/").await?;
    if !home.contains(LOGGED_IN_MARKER) {
        return Err(Error::auth_failed("no logged-in marker on home page"));
    }

    debug!("login post-check passed");
    Ok(session)
}

/// Serializes every cookie the jar holds for the platform origin into a
/// `Cookie` header value (`name=value` pairs joined by `; `).
fn serialize_cookies(jar: &Jar, base: &Url) -> String {
    jar.cookies(base)
        .and_then(|value| value.to_str().map(str::to_string).ok())
        .unwrap_or_default()
}

/// Finds the form holding the email/password inputs and collects what a
/// submission needs: field names, hidden inputs, and the form action.
fn parse_sign_in_form(html: &str) -> Result<SignInForm> {
    let document = Html::parse_document(html);
    for form in document.select(&FORM) {
        let Some(email_input) = form.select(&EMAIL_INPUT).next() else {
            continue;
        };
        let Some(password_input) = form.select(&PASSWORD_INPUT).next() else {
            continue;
        };

        return Ok(SignInForm {
            action: form.attr("action").map(str::to_string),
            email_field: input_name(email_input, "user[email]"),
            password_field: input_name(password_input, "user[password]"),
            hidden: form
                .select(&HIDDEN_INPUT)
                .filter_map(|input| {
                    let name = input.attr("name")?;
                    Some((name.to_string(), input.attr("value").unwrap_or("").to_string()))
                })
                .collect(),
        });
    }
    Err(Error::auth_failed("sign-in form not found on sign-in page"))
}

fn input_name(input: ElementRef<'_>, default: &str) -> String {
    input.attr("name").unwrap_or(default).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::ErrorKind;

    use super::*;

    const SIGN_IN_PAGE: &str = r#"
        <html><body>
          <form action="/sign_in" method="post">
            <input type="hidden" name="authenticity_token" value="tok123">
            <input id="user_email" name="user[email]" type="email">
            <input id="user_password" name="user[password]" type="password">
            <button type="submit">Sign in</button>
          </form>
        </body></html>
    "#;

    #[tokio::test]
    async fn test_invalid_email_rejected_before_network() {
        // Unroutable base URL: reaching the network would error differently.
        let base = Url::parse("http://127.0.0.1:1").unwrap();
        let error = attempt_login(&base, "not-an-email", "pw")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_parse_sign_in_form_extracts_fields_and_token() {
        let form = parse_sign_in_form(SIGN_IN_PAGE).unwrap();
        assert_eq!(form.action.as_deref(), Some("/sign_in"));
        assert_eq!(form.email_field, "user[email]");
        assert_eq!(form.password_field, "user[password]");
        assert_eq!(
            form.hidden,
            vec![("authenticity_token".to_string(), "tok123".to_string())]
        );
    }

    #[test]
    fn test_parse_sign_in_form_ignores_unrelated_forms() {
        let html = r#"
            <form action="/search"><input name="q"></form>
            <form action="/login">
              <input id="user_email" name="email">
              <input id="user_password" name="password">
            </form>
        "#;
        let form = parse_sign_in_form(html).unwrap();
        assert_eq!(form.action.as_deref(), Some("/login"));
        assert_eq!(form.email_field, "email");
        assert_eq!(form.password_field, "password");
    }

    #[test]
    fn test_parse_sign_in_form_missing_form_fails() {
        let error = parse_sign_in_form("<html><body>maintenance</body></html>").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthenticationFailed);
    }

    #[tokio::test]
    async fn test_attempt_login_captures_cookies_and_passes_post_check() {
        let server = MockServer::start().await;
        let base = Url::parse(&server.uri()).unwrap();

        Mock::given(method("GET"))
            .and(path("/sign_in"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SIGN_IN_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sign_in"))
            .and(body_string_contains("authenticity_token=tok123"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "_session=abc123; Path=/"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("cookie", "_session=abc123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<body class=\"logged_in\"></body>"),
            )
            .mount(&server)
            .await;

        let session = attempt_login(&base, "me@example.com", "hunter2")
            .await
            .unwrap();
        assert!(session.cookie_header().contains("_session=abc123"));
    }

    #[tokio::test]
    async fn test_attempt_login_without_marker_fails() {
        let server = MockServer::start().await;
        let base = Url::parse(&server.uri()).unwrap();

        Mock::given(method("GET"))
            .and(path("/sign_in"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SIGN_IN_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sign_in"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<body>Sign in</body>"))
            .mount(&server)
            .await;

        let error = attempt_login(&base, "me@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthenticationFailed);
    }
}
