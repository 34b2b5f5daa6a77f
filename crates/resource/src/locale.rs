use std::fmt;

/// A language with an optional country, as used for bundle overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    language: String,
    country: Option<String>,
}

impl Locale {
    pub fn new(language: impl Into<String>, country: Option<&str>) -> Self {
        Self {
            language: language.into().to_ascii_lowercase(),
            country: country.map(|c| c.to_ascii_uppercase()),
        }
    }

    /// Parses tags like `en`, `en_US`, `en-US` or `en_US.UTF-8`.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.split(['.', '@']).next()?.trim();
        let mut parts = tag.split(['_', '-']);
        let language = parts.next().filter(|l| is_alpha(l))?;
        let country = parts.next().filter(|c| is_alpha(c));
        Some(Self::new(language, country))
    }

    /// The locale named by `LC_ALL` or `LANG`, ignoring the `C`/`POSIX` locales.
    pub fn from_env() -> Option<Self> {
        ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty() && v != "C" && v != "POSIX")
            .and_then(|v| Self::parse(&v))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Suffixes tried after the base bundle, least specific first.
    pub(crate) fn overlay_suffixes(&self) -> Vec<String> {
        let mut suffixes = vec![format!("_{}", self.language)];
        if let Some(country) = &self.country {
            suffixes.push(format!("_{}_{}", self.language, country));
        }
        suffixes
    }
}

fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}_{}", self.language, country),
            None => f.write_str(&self.language),
        }
    }
}
