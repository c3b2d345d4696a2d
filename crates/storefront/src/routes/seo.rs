//! Crawler and install metadata: robots.txt, sitemap and web manifest.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::i18n::Locale;
use crate::state::AppState;

/// Serve robots.txt pointing crawlers at the sitemap.
pub async fn robots(State(state): State<AppState>) -> Response {
    let body = format!(
        "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {}/sitemap.xml\n",
        state.config().base_url
    );

    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// Serve the sitemap with one entry per locale.
pub async fn sitemap(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        build_sitemap(&state.config().base_url),
    )
        .into_response()
}

/// Build sitemap XML. Every landing page lists all its translations as
/// `hreflang` alternates, plus `x-default` for the default locale.
fn build_sitemap(base_url: &str) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" \
         xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n",
    );

    for locale in Locale::ALL {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{base_url}/{locale}</loc>\n"));
        for alternate in Locale::ALL {
            xml.push_str(&alternate_link(base_url, alternate.code(), alternate.code()));
        }
        xml.push_str(&alternate_link(base_url, "x-default", Locale::default().code()));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn alternate_link(base_url: &str, hreflang: &str, code: &str) -> String {
    format!("    <xhtml:link rel=\"alternate\" hreflang=\"{hreflang}\" href=\"{base_url}/{code}\"/>\n")
}

/// Serve the web app manifest.
pub async fn webmanifest() -> Response {
    let manifest = serde_json::json!({
        "name": Locale::default().t("site.name"),
        "short_name": "Bookstore",
        "description": Locale::default().t("site.description"),
        "start_url": "/",
        "icons": [
            {
                "src": "/static/icons/icon-192.png",
                "sizes": "192x192",
                "type": "image/png"
            },
            {
                "src": "/static/icons/icon-512.png",
                "sizes": "512x512",
                "type": "image/png"
            }
        ],
        "theme_color": "#5b3a29",
        "background_color": "#fbf8f3",
        "display": "standalone"
    });

    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        manifest.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sitemap_lists_every_locale() {
        let xml = build_sitemap("https://books.example.com");

        assert_eq!(xml.matches("<url>").count(), Locale::ALL.len());
        assert_eq!(
            xml.matches("<xhtml:link").count(),
            Locale::ALL.len() * (Locale::ALL.len() + 1)
        );
        assert_eq!(xml.lines().filter(|l| l.contains("<loc>")).count(), Locale::ALL.len());
        assert!(xml.contains("<loc>https://books.example.com/es</loc>"));
        assert!(xml.contains(
            "hreflang=\"fr\" href=\"https://books.example.com/fr\""
        ));
        assert!(xml.contains(
            "hreflang=\"x-default\" href=\"https://books.example.com/en\""
        ));
        assert!(xml.ends_with("</urlset>\n"));
    }
}
