//! Default header storage.
//!
//! [`HeaderStore`] holds the headers a serializer applies to every request it
//! builds. Names compare case-insensitively, one value per name, and entries
//! are enumerated in insertion order.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Maximum number of preferred languages advertised in `Accept-Language`.
const MAX_LANGUAGES: usize = 6;

/// Platform-derived values used to seed default headers.
///
/// This is a snapshot taken once when a serializer is created; nothing is
/// read from the environment while requests are being serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDefaults {
    /// Preferred languages, most preferred first (e.g. `en-US`).
    pub preferred_languages: Vec<String>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            preferred_languages: vec!["en".to_string()],
            user_agent: default_user_agent(),
        }
    }
}

impl PlatformDefaults {
    /// Snapshot the locale from `LANGUAGE`, `LC_ALL` or `LANG`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Snapshot the locale from the first of `LANGUAGE`, `LC_ALL` or `LANG`
    /// that `lookup` resolves to a usable value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let languages = ["LANGUAGE", "LC_ALL", "LANG"]
            .into_iter()
            .filter_map(lookup)
            .map(|value| parse_locale_list(&value))
            .find(|languages| !languages.is_empty());

        Self {
            preferred_languages: languages.unwrap_or_else(|| vec!["en".to_string()]),
            ..Self::default()
        }
    }

    /// `Accept-Language` value with decreasing quality, e.g. `fr-FR;q=1, en;q=0.9`.
    #[must_use]
    pub fn accept_language(&self) -> String {
        self.preferred_languages
            .iter()
            .take(MAX_LANGUAGES)
            .enumerate()
            .map(|(index, language)| {
                if index == 0 {
                    format!("{language};q=1")
                } else {
                    format!("{language};q=0.{}", 10 - index)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn default_user_agent() -> String {
    format!(
        "{}/{} ({}; {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Parse `fr_FR.UTF-8:en_US` style locale lists into language tags.
fn parse_locale_list(value: &str) -> Vec<String> {
    value
        .split(':')
        .filter_map(|locale| {
            let tag = locale.split(['.', '@']).next().unwrap_or_default();
            match tag {
                "" | "C" | "POSIX" => None,
                tag => Some(tag.replace('_', "-")),
            }
        })
        .collect()
}

/// Case-insensitive, insertion-ordered header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: Vec<(String, String)>,
}

impl HeaderStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a store seeded with `Accept-Language` and `User-Agent`.
    #[must_use]
    pub fn with_defaults(defaults: &PlatformDefaults) -> Self {
        let mut store = Self::new();
        let accept_language = defaults.accept_language();
        if !accept_language.is_empty() {
            store.set("Accept-Language", accept_language);
        }
        store.set("User-Agent", defaults.user_agent.clone());
        store
    }

    /// Set a header, replacing any value stored under the same name.
    ///
    /// A replaced header keeps its position and original name spelling.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.1 = value;
                }
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Set a header, or remove it when `value` is `None`.
    pub fn set_optional(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match value {
            Some(value) => self.set(name, value),
            None => {
                self.remove(&name);
            }
        }
    }

    /// Value for a header name, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|index| self.entries.get(index))
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.position(name)?;
        Some(self.entries.remove(index).1)
    }

    /// Set `Authorization` to HTTP basic credentials.
    pub fn set_authorization_basic(&mut self, username: &str, password: &str) {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        self.set("Authorization", format!("Basic {encoded}"));
    }

    /// Remove the `Authorization` header.
    pub fn clear_authorization(&mut self) {
        self.remove("Authorization");
    }

    /// Headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no header is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderStore {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (name, value) in iter {
            store.set(name, value);
        }
        store
    }
}

impl<N: Into<String>, V: Into<String>> Extend<(N, V)> for HeaderStore {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}
