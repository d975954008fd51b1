//! Localized message catalog.
//!
//! Bundles are embedded YAML maps keyed by message id. Messages may carry `{}`
//! placeholders filled positionally by [`MessageCatalog::format`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};

const EN_BUNDLE: &str = include_str!("../locales/en.yaml");
const FR_BUNDLE: &str = include_str!("../locales/fr.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    En,
    #[default]
    Fr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    fn bundle(self) -> &'static str {
        match self {
            Self::En => EN_BUNDLE,
            Self::Fr => FR_BUNDLE,
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            other => anyhow::bail!("unsupported language: {other}"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone)]
pub struct MessageCatalog {
    language: Language,
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn load(language: Language) -> Result<Self> {
        let messages: HashMap<String, String> = serde_yaml::from_str(language.bundle())
            .with_context(|| format!("failed to parse {language} message bundle"))?;
        Ok(Self { language, messages })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Raw message; unknown keys echo the key so a missing entry stays visible.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn format(&self, key: &str, args: &[&dyn fmt::Display]) -> String {
        let template = self.get(key);
        let mut out = String::with_capacity(template.len());
        let mut args = args.iter();
        let mut rest = template;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            match args.next() {
                Some(arg) => out.push_str(&arg.to_string()),
                None => out.push_str("{}"),
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }

    pub fn unknown(&self) -> &str {
        self.get("unknown")
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }
}
