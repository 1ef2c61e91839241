//! Recommendation Engine
//!
//! Threshold rules over a validated heart disease record and its predicted
//! label. Advisory text comes from per-language JSON catalogs named
//! `recommendations_<lang>.json`; unknown languages fall back to the
//! default language.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use thiserror::Error;

use crate::models::HeartInput;

/// Resting blood pressure above this is flagged (mm Hg)
pub const HIGH_BLOOD_PRESSURE: i64 = 140;
/// Serum cholesterol above this is flagged (mg/dl)
pub const HIGH_CHOLESTEROL: i64 = 240;

const FILE_PREFIX: &str = "recommendations_";
const FILE_SUFFIX: &str = ".json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    HighBloodPressure,
    HighCholesterol,
    HighFbs,
    HighRisk,
    LowRisk,
}

impl Category {
    pub fn key(&self) -> &'static str {
        match self {
            Category::HighBloodPressure => "high_blood_pressure",
            Category::HighCholesterol => "high_cholesterol",
            Category::HighFbs => "high_fbs",
            Category::HighRisk => "high_risk",
            Category::LowRisk => "low_risk",
        }
    }
}

/// Advisory text for every category in one language
#[derive(Debug, Clone, Deserialize)]
pub struct Messages {
    pub high_blood_pressure: String,
    pub high_cholesterol: String,
    pub high_fbs: String,
    pub high_risk: String,
    pub low_risk: String,
}

impl Messages {
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::HighBloodPressure => &self.high_blood_pressure,
            Category::HighCholesterol => &self.high_cholesterol,
            Category::HighFbs => &self.high_fbs,
            Category::HighRisk => &self.high_risk,
            Category::LowRisk => &self.low_risk,
        }
    }
}

/// Categories that apply to a record, in rule order
pub fn categories(input: &HeartInput, prediction: u8) -> Vec<Category> {
    let mut matched = Vec::with_capacity(4);

    if input.trestbps > HIGH_BLOOD_PRESSURE {
        matched.push(Category::HighBloodPressure);
    }
    if input.chol > HIGH_CHOLESTEROL {
        matched.push(Category::HighCholesterol);
    }
    // fbs == 1 means fasting blood sugar > 120 mg/dl
    if input.fbs == 1 {
        matched.push(Category::HighFbs);
    }
    matched.push(if prediction == 1 { Category::HighRisk } else { Category::LowRisk });

    matched
}

/// Category -> advisory text, serialized as a JSON object in rule order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecommendationSet(Vec<(Category, String)>);

impl RecommendationSet {
    pub fn build(input: &HeartInput, prediction: u8, messages: &Messages) -> Self {
        Self(
            categories(input, prediction)
                .into_iter()
                .map(|c| (c, messages.get(c).to_string()))
                .collect(),
        )
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().map(|(c, _)| *c)
    }

    pub fn get(&self, category: Category) -> Option<&str> {
        self.0.iter().find(|(c, _)| *c == category).map(|(_, text)| text.as_str())
    }
}

impl Serialize for RecommendationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, text) in &self.0 {
            map.serialize_entry(category.key(), text)?;
        }
        map.end()
    }
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read recommendations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no recommendations for default language '{0}'")]
    MissingDefault(String),
}

/// Messages for every available language
#[derive(Debug, Clone)]
pub struct RecommendationCatalog {
    default_lang: String,
    languages: HashMap<String, Messages>,
}

impl RecommendationCatalog {
    pub fn new(default_lang: impl Into<String>, languages: HashMap<String, Messages>) -> Result<Self, CatalogError> {
        let default_lang = default_lang.into();
        if !languages.contains_key(&default_lang) {
            return Err(CatalogError::MissingDefault(default_lang));
        }
        Ok(Self { default_lang, languages })
    }

    /// Load every `recommendations_<lang>.json` file in `dir`
    pub fn load_dir(dir: impl AsRef<Path>, default_lang: &str) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let io_err = |source| CatalogError::Io { path: dir.to_path_buf(), source };

        let mut languages = HashMap::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let Some(lang) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(FILE_PREFIX))
                .and_then(|n| n.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };

            let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let messages: Messages = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;

            tracing::debug!("Loaded recommendations for '{}' from {}", lang, path.display());
            languages.insert(lang.to_string(), messages);
        }

        let catalog = Self::new(default_lang, languages)?;
        tracing::info!("Recommendation catalog ready: {:?}", catalog.languages());
        Ok(catalog)
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    /// Sorted language codes
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    /// Messages for `lang`, or the default language when unsupported
    pub fn messages(&self, lang: &str) -> &Messages {
        match self.languages.get(lang) {
            Some(messages) => messages,
            None => {
                tracing::debug!("No recommendations for '{}', using '{}'", lang, self.default_lang);
                &self.languages[&self.default_lang]
            }
        }
    }

    pub fn recommend(&self, input: &HeartInput, prediction: u8, lang: &str) -> RecommendationSet {
        RecommendationSet::build(input, prediction, self.messages(lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages(prefix: &str) -> Messages {
        Messages {
            high_blood_pressure: format!("{} bp", prefix),
            high_cholesterol: format!("{} chol", prefix),
            high_fbs: format!("{} fbs", prefix),
            high_risk: format!("{} high", prefix),
            low_risk: format!("{} low", prefix),
        }
    }

    fn catalog() -> RecommendationCatalog {
        let languages = HashMap::from([
            ("en".to_string(), messages("en")),
            ("fr".to_string(), messages("fr")),
        ]);
        RecommendationCatalog::new("en", languages).unwrap()
    }

    fn input(trestbps: i64, chol: i64, fbs: i64) -> HeartInput {
        HeartInput {
            age: 60, sex: 0, cp: 2, trestbps, chol, fbs, restecg: 0,
            thalach: 140, exang: 0, oldpeak: 0.0, slope: 2, ca: 1, thal: 2,
        }
    }

    #[test]
    fn test_high_pressure_low_risk() {
        let set = catalog().recommend(&input(150, 200, 0), 0, "en");
        assert_eq!(
            set.categories().collect::<Vec<_>>(),
            vec![Category::HighBloodPressure, Category::LowRisk]
        );
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({"high_blood_pressure": "en bp", "low_risk": "en low"})
        );
    }

    #[test]
    fn test_every_rule_fires() {
        let found = categories(&input(141, 241, 1), 1);
        assert_eq!(
            found,
            vec![Category::HighBloodPressure, Category::HighCholesterol, Category::HighFbs, Category::HighRisk]
        );
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let found = categories(&input(140, 240, 0), 0);
        assert_eq!(found, vec![Category::LowRisk]);
    }

    #[test]
    fn test_language_selection_and_fallback() {
        let catalog = catalog();
        let record = input(120, 180, 0);

        let fr = catalog.recommend(&record, 1, "fr");
        assert_eq!(fr.get(Category::HighRisk), Some("fr high"));

        let fallback = catalog.recommend(&record, 1, "de");
        assert_eq!(fallback.get(Category::HighRisk), Some("en high"));
        assert_eq!(fallback.categories().count(), 1);
    }

    #[test]
    fn test_missing_default_language() {
        let languages = HashMap::from([("fr".to_string(), messages("fr"))]);
        assert!(matches!(
            RecommendationCatalog::new("en", languages),
            Err(CatalogError::MissingDefault(_))
        ));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({
            "high_blood_pressure": "a", "high_cholesterol": "b", "high_fbs": "c",
            "high_risk": "d", "low_risk": "e"
        });
        fs::write(dir.path().join("recommendations_en.json"), body.to_string()).unwrap();
        fs::write(dir.path().join("recommendations_es.json"), body.to_string()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = RecommendationCatalog::load_dir(dir.path(), "en").unwrap();
        assert_eq!(catalog.languages(), vec!["en", "es"]);
        assert_eq!(catalog.messages("es").low_risk, "e");
    }

    #[test]
    fn test_load_dir_rejects_incomplete_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("recommendations_en.json"), r#"{"high_risk": "x"}"#).unwrap();

        assert!(matches!(
            RecommendationCatalog::load_dir(dir.path(), "en"),
            Err(CatalogError::Parse { .. })
        ));
    }
}
