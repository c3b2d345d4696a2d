//! Localized landing pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Path,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::i18n::{self, Locale};

/// Link in the language switcher.
pub struct LocaleLink {
    pub code: &'static str,
    pub name: &'static str,
    pub current: bool,
}

/// Landing page template. All strings are resolved before rendering.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub lang: &'static str,
    pub site_name: String,
    pub description: String,
    pub title: String,
    pub subtitle: String,
    pub cta: String,
    pub features_heading: String,
    pub features: Vec<String>,
    pub newsletter_heading: String,
    pub newsletter_placeholder: String,
    pub newsletter_button: String,
    pub language_label: String,
    pub rights: String,
    pub locales: Vec<LocaleLink>,
}

impl HomeTemplate {
    fn new(locale: Locale) -> Self {
        Self {
            lang: locale.code(),
            site_name: locale.t("site.name"),
            description: locale.t("site.description"),
            title: locale.t("home.title"),
            subtitle: locale.t("home.subtitle"),
            cta: locale.t("home.cta"),
            features_heading: locale.t("home.features.heading"),
            features: ["curated", "shipping", "secure"]
                .iter()
                .map(|key| locale.t(&format!("home.features.{key}")))
                .collect(),
            newsletter_heading: locale.t("newsletter.heading"),
            newsletter_placeholder: locale.t("newsletter.placeholder"),
            newsletter_button: locale.t("newsletter.button"),
            language_label: locale.t("footer.language"),
            rights: locale.t("footer.rights"),
            locales: Locale::ALL
                .into_iter()
                .map(|other| LocaleLink {
                    code: other.code(),
                    name: other.native_name(),
                    current: other == locale,
                })
                .collect(),
        }
    }
}

/// Send visitors to the landing page in their preferred language.
#[instrument(skip(headers))]
pub async fn redirect_to_locale(headers: HeaderMap) -> impl IntoResponse {
    let accept_language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    let locale = i18n::negotiate(accept_language);

    (
        [(header::VARY, "Accept-Language")],
        Redirect::temporary(&format!("/{locale}")),
    )
}

/// Render the landing page for a locale.
#[instrument]
pub async fn landing(Path(locale): Path<String>) -> Result<HomeTemplate> {
    let locale = locale
        .parse::<Locale>()
        .map_err(|_| AppError::NotFound("Page not found".to_owned()))?;

    Ok(HomeTemplate::new(locale))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_home_template_renders_locale() {
        let html = HomeTemplate::new(Locale::Es).render().unwrap();

        assert!(html.contains("<html lang=\"es\">"));
        assert!(html.contains(&Locale::Es.t("home.title")));
        assert!(html.contains("href=\"/fr\""));
    }
}
