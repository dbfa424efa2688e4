/// Signup, login and logout
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::{base_context, redirect, render_html};
use crate::error::Result;
use crate::forms::{safe_next, FormErrors, LoginForm, SignupForm};
use crate::middleware::AuthUser;
use crate::models::User;
use crate::security::SESSION_COOKIE;
use crate::services::FormOutcome;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn session_cookie(state: &AppState, user: &User) -> Result<Cookie<'static>> {
    let token = state.session_keys.issue(user)?;
    Ok(Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .max_age(CookieDuration::seconds(
            state.session_keys.ttl().num_seconds(),
        ))
        .finish())
}

/// Redirect that also logs the user in
fn login_redirect(state: &AppState, user: &User, location: &str) -> Result<HttpResponse> {
    let mut response = redirect(location);
    response.add_cookie(&session_cookie(state, user)?)?;
    Ok(response)
}

fn render_signup(
    user: Option<&AuthUser>,
    form: &SignupForm,
    errors: &FormErrors,
) -> Result<HttpResponse> {
    let mut context = base_context(user);
    context.insert("form", form);
    context.insert("errors", errors);
    render_html("users/signup.html", &context)
}

fn render_login(
    user: Option<&AuthUser>,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<HttpResponse> {
    let mut context = base_context(user);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("next", form.next.as_deref().unwrap_or(""));
    render_html("users/login.html", &context)
}

/// GET /auth/signup/
pub async fn signup_form(user: Option<AuthUser>) -> Result<HttpResponse> {
    render_signup(user.as_ref(), &SignupForm::default(), &FormErrors::new())
}

/// POST /auth/signup/
pub async fn signup(
    user: Option<AuthUser>,
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse> {
    let mut form = form.into_inner();
    match state.users.signup(&mut form).await? {
        FormOutcome::Saved(created) => login_redirect(&state, &created, "/"),
        FormOutcome::Invalid(errors) => render_signup(user.as_ref(), &form, &errors),
    }
}

/// GET /auth/login/
pub async fn login_form(
    user: Option<AuthUser>,
    query: web::Query<NextQuery>,
) -> Result<HttpResponse> {
    let form = LoginForm {
        next: query.into_inner().next,
        ..Default::default()
    };
    render_login(user.as_ref(), &form, &FormErrors::new())
}

/// POST /auth/login/
pub async fn login(
    user: Option<AuthUser>,
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse> {
    let mut form = form.into_inner();
    match state.users.authenticate(&mut form).await? {
        FormOutcome::Saved(logged_in) => {
            let next = safe_next(form.next.as_deref());
            login_redirect(&state, &logged_in, &next)
        }
        FormOutcome::Invalid(errors) => render_login(user.as_ref(), &form, &errors),
    }
}

/// GET|POST /auth/logout/
pub async fn logout() -> Result<HttpResponse> {
    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();

    let mut response = render_html("users/logged_out.html", &base_context(None))?;
    response.add_cookie(&removal)?;
    Ok(response)
}
