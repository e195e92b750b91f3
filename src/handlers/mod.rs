pub mod dashboard;
pub mod facilities;

use axum::{
  extract::FromRequestParts,
  http::{request::Parts, Uri},
  response::{IntoResponse, Redirect, Response},
};

use crate::content::{Facility, Page, PageCatalog};
use crate::domain::{Account, Field, ValidationErrors};
use crate::error::AppError;
use crate::state::AppState;

/// Signed-in user shown in the page header
#[derive(Debug, Clone)]
pub struct NavContext {
  pub full_name: String,
  pub role_label: &'static str,
}

impl From<&Account> for NavContext {
  fn from(account: &Account) -> Self {
    Self {
      full_name: account.full_name.clone(),
      role_label: account.role.label(),
    }
  }
}

/// Link to a dashboard sub-page
#[derive(Debug, Clone)]
pub struct PageLink {
  pub href: String,
  pub title: String,
}

pub fn page_links(catalog: &PageCatalog) -> Vec<PageLink> {
  catalog
    .pages()
    .iter()
    .map(|page| PageLink {
      href: format!("/dashboard/{}/", page.slug),
      title: page.title.clone(),
    })
    .collect()
}

/// Per-field messages for re-rendering a form
#[derive(Debug, Clone, Default)]
pub struct FormErrors {
  pub role: Option<String>,
  pub full_name: Option<String>,
  pub contact_number: Option<String>,
  pub aadhar_number: Option<String>,
  pub dob: Option<String>,
  pub password: Option<String>,
  pub profile_image: Option<String>,
}

impl From<&ValidationErrors> for FormErrors {
  fn from(errors: &ValidationErrors) -> Self {
    let get = |field: Field| errors.get(field).map(str::to_string);
    Self {
      role: get(Field::Role),
      full_name: get(Field::FullName),
      contact_number: get(Field::ContactNumber),
      aadhar_number: get(Field::AadharNumber),
      dob: get(Field::DateOfBirth),
      password: get(Field::Password),
      profile_image: get(Field::ProfileImage),
    }
  }
}

/// Dashboard page named by the `{page}` path segment; unknown slugs are 404
pub struct CatalogPage(pub Page);

impl FromRequestParts<AppState> for CatalogPage {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    let axum::extract::Path(slug) = axum::extract::Path::<String>::from_request_parts(parts, state)
      .await
      .map_err(|_| AppError::NotFound)?;
    state
      .catalog
      .page(&slug)
      .cloned()
      .map(CatalogPage)
      .ok_or(AppError::NotFound)
  }
}

/// Facility named by the `{facility}` path segment; unknown slugs are 404
pub struct CatalogFacility(pub Facility);

impl FromRequestParts<AppState> for CatalogFacility {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    let axum::extract::Path(slug) = axum::extract::Path::<String>::from_request_parts(parts, state)
      .await
      .map_err(|_| AppError::NotFound)?;
    state
      .catalog
      .facility(&slug)
      .cloned()
      .map(CatalogFacility)
      .ok_or(AppError::NotFound)
  }
}

/// GET / - Send visitors to the login page
pub async fn index() -> Redirect {
  Redirect::to("/login/")
}

/// Fallback: add a missing trailing slash, otherwise 404
pub async fn not_found(uri: Uri) -> Response {
  let path = uri.path();
  // "//host" would become a protocol-relative redirect
  if !path.ends_with('/') && !path.starts_with("//") {
    let target = match uri.query() {
      Some(query) => format!("{}/?{}", path, query),
      None => format!("{}/", path),
    };
    return Redirect::permanent(&target).into_response();
  }
  AppError::NotFound.into_response()
}

pub use dashboard::{dashboard, dashboard_page, upload_profile_image};
pub use facilities::{facility_detail, submit_facility_report};
