//! Locales and message catalogs for the landing pages.
//!
//! Each supported locale has a flat JSON catalog of `key -> message` under
//! `crates/storefront/locales/`, embedded at compile time. Lookups fall back
//! to English, then to the key itself.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

type Catalog = HashMap<String, String>;

/// A supported interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Es,
    Fr,
}

impl Locale {
    /// Every supported locale, default first.
    pub const ALL: [Self; 3] = [Self::En, Self::Es, Self::Fr];

    /// Lowercase language code used in URLs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
        }
    }

    /// Name of the language in itself, for the language switcher.
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Español",
            Self::Fr => "Français",
        }
    }

    fn catalog(self) -> &'static Catalog {
        match self {
            Self::En => &EN,
            Self::Es => &ES,
            Self::Fr => &FR,
        }
    }

    /// Translate a message key.
    #[must_use]
    pub fn t(self, key: &str) -> String {
        self.catalog()
            .get(key)
            .or_else(|| Self::En.catalog().get(key))
            .map_or_else(|| key.to_owned(), Clone::clone)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error for an unsupported locale code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale: {0}")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|locale| locale.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLocale(s.to_owned()))
    }
}

static EN: LazyLock<Catalog> = LazyLock::new(|| load("en", include_str!("../locales/en.json")));
static ES: LazyLock<Catalog> = LazyLock::new(|| load("es", include_str!("../locales/es.json")));
static FR: LazyLock<Catalog> = LazyLock::new(|| load("fr", include_str!("../locales/fr.json")));

fn load(code: &str, source: &str) -> Catalog {
    serde_json::from_str(source).unwrap_or_else(|e| {
        tracing::error!(locale = code, error = %e, "Invalid message catalog");
        Catalog::new()
    })
}

/// Pick the best supported locale from an `Accept-Language` header.
///
/// Entries are ranked by quality (`q=`, default 1); ties keep header order.
/// Region subtags are ignored (`fr-CA` matches `fr`). Returns the default
/// locale when nothing matches.
#[must_use]
pub fn negotiate(accept_language: Option<&str>) -> Locale {
    let Some(header) = accept_language else {
        return Locale::default();
    };

    let mut candidates: Vec<(f32, usize, Locale)> = header
        .split(',')
        .enumerate()
        .filter_map(|(position, entry)| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            let quality = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .map_or(Some(1.0), |q| q.trim().parse::<f32>().ok())?;

            if quality <= 0.0 {
                return None;
            }

            let primary = tag.split('-').next()?;
            let locale = primary.parse::<Locale>().ok()?;
            Some((quality, position, locale))
        })
        .collect();

    candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

    candidates
        .first()
        .map_or_else(Locale::default, |(_, _, locale)| *locale)
}
