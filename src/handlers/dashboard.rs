use askama::Template;
use axum::{
  extract::{multipart::MultipartError, Multipart, Query, State},
  http::StatusCode,
  response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::{page_links, CatalogPage, FormErrors, NavContext, PageLink};
use crate::auth::AuthContext;
use crate::content::SectionView;
use crate::db::{self, LogOnError};
use crate::error::{AppError, AppResult};
use crate::filters;
use crate::flash::{self, FlashMessage};
use crate::media::{self, UploadError};
use crate::state::AppState;

/// Multipart field carrying the profile image
pub const PROFILE_IMAGE_FIELD: &str = "profile_image";

/// Full profile, shown with `?show_profile=1`
pub struct ProfileView {
  pub role: &'static str,
  pub full_name: String,
  pub contact_number: String,
  pub aadhar: String,
  pub date_of_birth: String,
  pub member_since: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
  pub nav: Option<NavContext>,
  pub messages: Vec<FlashMessage>,
  pub full_name: String,
  pub role_label: &'static str,
  pub pages: Vec<PageLink>,
  pub profile: Option<ProfileView>,
  pub profile_image_url: Option<String>,
  pub errors: FormErrors,
  pub max_upload_kib: usize,
}

#[derive(Template)]
#[template(path = "dashboard_page.html")]
pub struct DashboardPageTemplate {
  pub nav: Option<NavContext>,
  pub messages: Vec<FlashMessage>,
  pub title: String,
  pub intro: String,
  pub sections: Vec<SectionView>,
  pub pages: Vec<PageLink>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
  #[serde(default)]
  pub show_profile: Option<String>,
}

/// `show_profile` accepts 1, true or True
pub fn wants_profile(value: Option<&str>) -> bool {
  matches!(value, Some("1" | "true" | "True"))
}

fn profile_view(state: &AppState, auth: &AuthContext) -> ProfileView {
  let account = &auth.account;
  let aadhar = state
    .vault
    .open(&account.aadhar)
    .map(|number| number.masked())
    .log_warn("Failed to open sealed Aadhar number")
    .unwrap_or_else(|| "Unavailable".to_string());

  ProfileView {
    role: account.role.label(),
    full_name: account.full_name.clone(),
    contact_number: account.contact_number.to_string(),
    aadhar,
    date_of_birth: account.date_of_birth.format("%d %b %Y").to_string(),
    member_since: account.created_at.format("%d %b %Y").to_string(),
  }
}

fn render_dashboard(
  state: &AppState,
  auth: &AuthContext,
  messages: Vec<FlashMessage>,
  show_profile: bool,
  errors: FormErrors,
) -> Html<String> {
  let template = DashboardTemplate {
    nav: Some(auth.nav()),
    messages,
    full_name: auth.account.full_name.clone(),
    role_label: auth.account.role.label(),
    pages: page_links(&state.catalog),
    profile: show_profile.then(|| profile_view(state, auth)),
    profile_image_url: auth.account.profile_image_url(),
    errors,
    max_upload_kib: state.config.uploads.max_bytes / 1024,
  };
  Html(template.render().unwrap_or_default())
}

/// GET /dashboard/ - Greeting, quick links and (optionally) the full profile
pub async fn dashboard(
  State(state): State<AppState>,
  auth: AuthContext,
  Query(query): Query<DashboardQuery>,
  jar: CookieJar,
) -> (CookieJar, Html<String>) {
  let (jar, messages) = flash::take(jar);
  let show_profile = wants_profile(query.show_profile.as_deref());
  (jar, render_dashboard(&state, &auth, messages, show_profile, FormErrors::default()))
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> UploadError {
  if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
    UploadError::TooLarge { limit: max_bytes }
  } else {
    tracing::debug!("Unreadable multipart upload: {}", err);
    UploadError::Malformed
  }
}

/// Checkbox asking to remove the current image
pub const PROFILE_IMAGE_CLEAR_FIELD: &str = "profile_image-clear";

/// What the profile form asked for
#[derive(Debug, Default)]
struct ProfileSubmission {
  /// Image bytes; an empty file input counts as no image
  image: Option<Vec<u8>>,
  clear: bool,
}

async fn read_profile_form(multipart: &mut Multipart, max_bytes: usize) -> Result<ProfileSubmission, UploadError> {
  let mut submission = ProfileSubmission::default();
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| multipart_error(e, max_bytes))?
  {
    match field.name() {
      Some(PROFILE_IMAGE_FIELD) => {
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;
        if !bytes.is_empty() {
          submission.image = Some(bytes.to_vec());
        }
      }
      Some(PROFILE_IMAGE_CLEAR_FIELD) => {
        let value = field.text().await.map_err(|e| multipart_error(e, max_bytes))?;
        submission.clear = !value.is_empty();
      }
      _ => {}
    }
  }
  Ok(submission)
}

/// New image path for the account: `Some(Some(path))` to set, `Some(None)` to clear, `None` to leave as is
fn apply_submission(
  submission: ProfileSubmission,
  media_dir: &std::path::Path,
  max_bytes: usize,
) -> Result<Option<Option<String>>, UploadError> {
  match submission.image {
    Some(bytes) => media::store_profile_image(media_dir, &bytes, max_bytes).map(|path| Some(Some(path))),
    None if submission.clear => Ok(Some(None)),
    None => Ok(None),
  }
}

/// POST /dashboard/ - Replace, clear or keep the profile image
pub async fn upload_profile_image(
  State(state): State<AppState>,
  auth: AuthContext,
  jar: CookieJar,
  mut multipart: Multipart,
) -> AppResult<Response> {
  let max_bytes = state.config.uploads.max_bytes;
  let change = match read_profile_form(&mut multipart, max_bytes).await {
    Ok(submission) => apply_submission(submission, &state.media_dir, max_bytes),
    Err(e) => Err(e),
  };

  match change {
    Ok(change) => {
      if let Some(path) = change {
        let conn = db::try_lock(&state.db)?;
        if !db::set_profile_image(&conn, auth.account.id, path.as_deref())? {
          return Err(AppError::AccountMissing);
        }
        tracing::info!("Account {} updated profile image", auth.account.id);
      }
      let jar = flash::push(jar, FlashMessage::success("Profile updated."));
      Ok((jar, Redirect::to("/dashboard/")).into_response())
    }
    Err(e) if e.is_user_error() => {
      tracing::debug!("Rejected profile image for account {}: {}", auth.account.id, e);
      let (jar, messages) = flash::take(jar);
      let errors = FormErrors {
        profile_image: Some(e.to_string()),
        ..FormErrors::default()
      };
      Ok((jar, render_dashboard(&state, &auth, messages, false, errors)).into_response())
    }
    Err(e) => Err(e.into()),
  }
}

/// GET /dashboard/{page}/ - Catalog page. The slug is checked before the session.
pub async fn dashboard_page(
  CatalogPage(page): CatalogPage,
  auth: AuthContext,
  State(state): State<AppState>,
  jar: CookieJar,
) -> (CookieJar, Html<String>) {
  let (jar, messages) = flash::take(jar);
  let template = DashboardPageTemplate {
    nav: Some(auth.nav()),
    messages,
    intro: page.intro(),
    sections: page.section_views(),
    title: page.title,
    pages: page_links(&state.catalog),
  };
  (jar, Html(template.render().unwrap_or_default()))
}
