use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TriageError};
use crate::types::{ReferralPolicy, SpecialistCatalog, SpecialistProfile};

/// Top-level configuration for the triage service.
///
/// Loaded from `~/.triage/config.toml` by default. The `specialists` array
/// is ordered; its order decides which specialist wins when a message
/// mentions keywords from several scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub generative: GenerativeConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default = "default_specialists")]
    pub specialists: Vec<SpecialistProfile>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            dialogue: DialogueConfig::default(),
            generative: GenerativeConfig::default(),
            report: ReportConfig::default(),
            specialists: default_specialists(),
        }
    }
}

impl TriageConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TriageConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TriageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Build the validated, immutable specialist catalog.
    pub fn catalog(&self) -> Result<SpecialistCatalog> {
        SpecialistCatalog::new(self.specialists.clone(), &self.dialogue.default_specialty)
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database and API token.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.triage/data".to_string(),
            log_level: "info".to_string(),
            port: 3040,
        }
    }
}

/// Dialogue routing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// What to do when a message belongs to a different specialist.
    pub referral_policy: ReferralPolicy,
    /// Seed mixed into generic follow-up selection.
    pub fallback_seed: u64,
    /// Language the generated replies must use.
    pub response_language: String,
    /// Specialist used for unknown keys.
    pub default_specialty: String,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            referral_policy: ReferralPolicy::PreemptOnReferral,
            fallback_seed: 0,
            response_language: "English".to_string(),
            default_specialty: "general".to_string(),
        }
    }
}

/// External generative-text service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeConfig {
    /// Whether to call the generative service at all.
    pub enabled: bool,
    /// Base URL of the service API.
    pub endpoint: String,
    /// Model identifier.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 20,
        }
    }
}

impl GenerativeConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Prescription report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Clinic name printed in the report header.
    pub clinic_name: String,
    /// Emergency phone number printed in the instructions.
    pub emergency_number: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            clinic_name: "Rwanda Digital Health".to_string(),
            emergency_number: "912".to_string(),
        }
    }
}

/// The shipped specialist table, in matching order.
pub fn default_specialists() -> Vec<SpecialistProfile> {
    vec![
        SpecialistProfile::new(
            "general",
            "General Doctor",
            &[
                "heart", "blood pressure", "general", "wellness", "fever", "fatigue",
                "weakness", "tired", "sick", "temperature",
            ],
            &[
                "Paracetamol 500mg - Take 1 tablet every 6 hours",
                "Ibuprofen 400mg - Take 1 twice daily with food",
                "Vitamin C 1000mg - Take 1 daily",
            ],
        ),
        SpecialistProfile::new(
            "eye",
            "Eye Doctor",
            &[
                "eye", "vision", "sight", "blind", "blur", "red eye", "itchy eye", "watery",
                "conjunctivitis", "glasses", "cataract", "see", "eyes", "night",
            ],
            &[
                "Artificial Tears - Apply 1-2 drops 4 times daily",
                "Tobramycin drops - 1 drop 3 times daily for 7 days",
            ],
        ),
        SpecialistProfile::new(
            "orthopedic",
            "Bone Doctor",
            &[
                "bone", "joint", "muscle", "back", "spine", "knee", "shoulder", "fracture",
                "arthritis", "sprain", "ankle", "wrist", "hip", "leg", "arm",
            ],
            &[
                "Diclofenac 50mg - 1 tablet twice daily",
                "Calcium + Vitamin D - 1 tablet daily",
                "Ice pack 15 mins, 3 times daily",
            ],
        ),
        SpecialistProfile::new(
            "respiratory",
            "Lung Doctor",
            &[
                "cough", "breathing", "asthma", "bronchitis", "chest", "lung", "wheeze",
                "shortness of breath", "pneumonia", "cold", "flu", "breath",
            ],
            &[
                "Salbutamol inhaler - 2 puffs when needed",
                "Amoxicillin 500mg - 1 tablet 3 times daily",
            ],
        ),
        SpecialistProfile::new(
            "digestive",
            "Stomach Doctor",
            &[
                "stomach", "nausea", "vomit", "diarrhea", "constipation", "acid", "heartburn",
                "bloating", "appetite", "digestion", "ulcer", "eat", "food", "belly",
            ],
            &[
                "Omeprazole 20mg - 1 before breakfast",
                "Loperamide 2mg - 2 initially, 1 after each loose stool",
            ],
        ),
    ]
}
