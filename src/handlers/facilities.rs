use askama::Template;
use axum::{
  extract::State,
  response::{Html, Redirect},
  Form,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::{page_links, CatalogFacility, NavContext, PageLink};
use crate::auth::OptionalAuth;
use crate::content::{ReportDefaults, SectionView};
use crate::filters;
use crate::flash::{self, FlashMessage};
use crate::state::AppState;

/// Flushing condition choices: (value, label)
const FLUSHING_CHOICES: [(&str, &str); 3] = [
  ("ok", "OK"),
  ("low", "Low pressure"),
  ("not_working", "Not working"),
];

pub struct FlushingOption {
  pub value: &'static str,
  pub label: &'static str,
  pub selected: bool,
}

/// Report form prefilled from the facility's defaults
pub struct ReportView {
  pub filter_water: u8,
  pub hot_water: u8,
  pub regular_water: u8,
  pub flushing: Vec<FlushingOption>,
}

impl From<&ReportDefaults> for ReportView {
  fn from(defaults: &ReportDefaults) -> Self {
    Self {
      filter_water: defaults.filter_water,
      hot_water: defaults.hot_water,
      regular_water: defaults.regular_water,
      flushing: FLUSHING_CHOICES
        .iter()
        .map(|&(value, label)| FlushingOption {
          value,
          label,
          selected: value == defaults.flushing,
        })
        .collect(),
    }
  }
}

#[derive(Template)]
#[template(path = "facility.html")]
pub struct FacilityTemplate {
  pub nav: Option<NavContext>,
  pub messages: Vec<FlashMessage>,
  pub slug: String,
  pub name: String,
  pub intro: Option<String>,
  pub report: Option<ReportView>,
  pub sections: Vec<SectionView>,
  pub pages: Vec<PageLink>,
}

/// Submitted facility report. Nothing is persisted.
#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
  #[serde(default)]
  pub filter_water: Option<String>,
  #[serde(default)]
  pub hot_water: Option<String>,
  #[serde(default)]
  pub flushing: Option<String>,
  #[serde(default)]
  pub regular_water: Option<String>,
}

/// Longest value echoed back per report field, in characters
const MAX_ECHO_CHARS: usize = 64;

fn or_na(value: &Option<String>) -> String {
  let value = value.as_deref().map(str::trim).unwrap_or_default();
  if value.is_empty() {
    return "N/A".to_string();
  }
  match value.char_indices().nth(MAX_ECHO_CHARS) {
    Some((cut, _)) => format!("{}…", &value[..cut]),
    None => value.to_string(),
  }
}

impl ReportForm {
  /// One-line echo of the submitted values
  pub fn summary(&self) -> String {
    format!(
      "Values: filter={}, hot={}, flushing={}, regular={}",
      or_na(&self.filter_water),
      or_na(&self.hot_water),
      or_na(&self.flushing),
      or_na(&self.regular_water)
    )
  }
}

/// GET /dashboard/facilities/{facility}/ - Open to visitors; the session only fills the header
pub async fn facility_detail(
  CatalogFacility(facility): CatalogFacility,
  auth: OptionalAuth,
  State(state): State<AppState>,
  jar: CookieJar,
) -> (CookieJar, Html<String>) {
  let (jar, messages) = flash::take(jar);
  let template = FacilityTemplate {
    nav: auth.nav(),
    messages,
    report: facility.report.as_ref().map(ReportView::from),
    sections: facility.section_views(),
    slug: facility.slug,
    name: facility.name,
    intro: facility.intro,
    pages: page_links(&state.catalog),
  };
  (jar, Html(template.render().unwrap_or_default()))
}

/// POST /dashboard/facilities/{facility}/ - Acknowledge a report and echo it back
pub async fn submit_facility_report(
  CatalogFacility(facility): CatalogFacility,
  auth: OptionalAuth,
  jar: CookieJar,
  Form(form): Form<ReportForm>,
) -> (CookieJar, Redirect) {
  let summary = form.summary();
  match &auth.0 {
    Some(ctx) => tracing::info!(
      "Facility report for {} from account {}: {}",
      facility.slug,
      ctx.account.id,
      summary
    ),
    None => tracing::info!("Anonymous facility report for {}: {}", facility.slug, summary),
  }

  let jar = flash::push(
    jar,
    FlashMessage::success(format!("Report submitted for {}.", facility.name)),
  );
  let jar = flash::push(jar, FlashMessage::info(summary));
  (jar, Redirect::to(&format!("/dashboard/facilities/{}/", facility.slug)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_summary_marks_blank_values() {
    let form = ReportForm {
      filter_water: Some("70".to_string()),
      hot_water: Some("  ".to_string()),
      flushing: Some("ok".to_string()),
      regular_water: None,
    };
    assert_eq!(form.summary(), "Values: filter=70, hot=N/A, flushing=ok, regular=N/A");
  }

  #[test]
  fn test_summary_truncates_long_values() {
    let form = ReportForm {
      filter_water: Some("x".repeat(5000)),
      hot_water: Some("é".repeat(MAX_ECHO_CHARS)),
      ..ReportForm::default()
    };
    let summary = form.summary();
    let expected_filter = format!("filter={}…,", "x".repeat(MAX_ECHO_CHARS));
    assert!(summary.contains(&expected_filter));
    assert!(summary.contains(&format!("hot={},", "é".repeat(MAX_ECHO_CHARS))));
    assert!(summary.chars().count() < 300);
  }

  #[test]
  fn test_report_view_selects_default_flushing() {
    let view = ReportView::from(&ReportDefaults {
      filter_water: 70,
      hot_water: 40,
      regular_water: 60,
      flushing: "ok".to_string(),
    });
    let selected: Vec<&str> = view
      .flushing
      .iter()
      .filter(|o| o.selected)
      .map(|o| o.value)
      .collect();
    assert_eq!(selected, vec!["ok"]);
    assert_eq!(view.hot_water, 40);
  }
}
