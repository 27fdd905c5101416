//! Validation boundary in front of the settings store.
//!
//! The same allow-list that gates rendering also gates persistence:
//! a persisted-but-invalid creative must never have been accepted in
//! the first place. Errors here are operator-facing; end users never
//! see them, they simply see no ad for an invalid creative.

use crate::model::AdSettings;
use crate::store::SettingsStore;
use adgate_creative::{ContentValidator, Creative};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// Action requested at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationAction {
    Validate,
    ValidateAndSave,
}

/// `{ settings, action: "validate" | "validate_and_save" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub settings: AdSettings,
    pub action: ValidationAction,
}

/// Response shape depends on the action, matching the boundary contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationResponse {
    /// Response to `validate`.
    Checked { valid: bool, errors: Vec<String> },
    /// Response to `validate_and_save`.
    Saved {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        errors: Option<Vec<String>>,
    },
}

/// Handles validation-boundary requests against one settings store.
pub struct SettingsService {
    store: SettingsStore,
    validator: ContentValidator,
}

impl SettingsService {
    pub fn new(store: SettingsStore) -> Self {
        Self {
            store,
            validator: ContentValidator::new(),
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn handle(&self, request: &ValidationRequest) -> ValidationResponse {
        let errors = self.check(&request.settings);

        match request.action {
            ValidationAction::Validate => ValidationResponse::Checked {
                valid: errors.is_empty(),
                errors,
            },
            ValidationAction::ValidateAndSave => {
                if !errors.is_empty() {
                    warn!("settings save rejected ({} errors)", errors.len());
                    return ValidationResponse::Saved {
                        success: false,
                        errors: Some(errors),
                    };
                }
                match self.store.save(&request.settings) {
                    Ok(()) => {
                        debug!("settings validated and saved");
                        ValidationResponse::Saved {
                            success: true,
                            errors: None,
                        }
                    }
                    Err(e) => ValidationResponse::Saved {
                        success: false,
                        errors: Some(vec![e.to_string()]),
                    },
                }
            }
        }
    }

    /// Every contained creative must be acceptable to serve.
    fn check(&self, settings: &AdSettings) -> Vec<String> {
        let mut errors = Vec::new();

        for (placement, creative) in settings.creatives() {
            match creative {
                Creative::Markup { raw_html } => {
                    let result = self.validator.validate(raw_html);
                    if !result.valid {
                        let reason = result.reason.unwrap_or_else(|| "invalid markup".into());
                        errors.push(format!("{}: {}", placement, reason));
                    }
                }
                Creative::StaticImage { url, link_url } => {
                    for (what, value) in [("image url", url), ("link url", link_url)] {
                        match Url::parse(value) {
                            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                            Ok(parsed) => errors.push(format!(
                                "{}: {} scheme '{}' is not http(s)",
                                placement,
                                what,
                                parsed.scheme()
                            )),
                            Err(_) => {
                                errors.push(format!("{}: {} is not a valid URL", placement, what))
                            }
                        }
                    }
                }
                Creative::ProviderSlide { zone_id, .. } => {
                    if zone_id.is_empty() || !zone_id.chars().all(|c| c.is_ascii_alphanumeric()) {
                        errors.push(format!(
                            "{}: slide zone id must be alphanumeric, got '{}'",
                            placement, zone_id
                        ));
                    }
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgate_creative::SlideFormat;

    const ACCEPTED: &str = concat!(
        r#"<ins class="adsbygoogle" data-ad-client="ca-pub-1234567890" data-ad-slot="9876543210"></ins>"#,
        r#"<script>(adsbygoogle = window.adsbygoogle || []).push({});</script>"#
    );

    fn service_in(dir: &tempfile::TempDir) -> SettingsService {
        let store = SettingsStore::new(dir.path().join("ad-settings.json")).unwrap();
        SettingsService::new(store)
    }

    fn settings_with(placement: &str, creative: Creative) -> AdSettings {
        let mut settings = AdSettings::default();
        let slot = settings.placements.entry(placement.to_string()).or_default();
        match &creative {
            Creative::Markup { .. } => slot.markup = Some(creative),
            Creative::StaticImage { .. } => slot.fallback = Some(creative),
            Creative::ProviderSlide { .. } => slot.slide = Some(creative),
        }
        settings
    }

    #[test]
    fn test_validate_accepts_good_settings() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let request = ValidationRequest {
            settings: settings_with(
                "header",
                Creative::Markup {
                    raw_html: ACCEPTED.into(),
                },
            ),
            action: ValidationAction::Validate,
        };

        match service.handle(&request) {
            ValidationResponse::Checked { valid, errors } => {
                assert!(valid, "errors: {:?}", errors);
                assert!(errors.is_empty());
            }
            other => panic!("expected Checked, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_reports_placement_and_reason() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let request = ValidationRequest {
            settings: settings_with(
                "sidebar",
                Creative::Markup {
                    raw_html: "<script>alert(1)</script>".into(),
                },
            ),
            action: ValidationAction::Validate,
        };

        match service.handle(&request) {
            ValidationResponse::Checked { valid, errors } => {
                assert!(!valid);
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("sidebar:"));
                assert!(errors[0].contains("dangerous pattern"));
            }
            other => panic!("expected Checked, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_creative_blocks_the_save() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);
        let path = service.store().path().clone();

        let request = ValidationRequest {
            settings: settings_with(
                "header",
                Creative::Markup {
                    raw_html: r#"<iframe src="https://evil.example"></iframe>"#.into(),
                },
            ),
            action: ValidationAction::ValidateAndSave,
        };

        match service.handle(&request) {
            ValidationResponse::Saved { success, errors } => {
                assert!(!success);
                assert!(errors.unwrap()[0].contains("dangerous pattern"));
            }
            other => panic!("expected Saved, got {:?}", other),
        }
        // Nothing was written
        assert!(!path.exists());
    }

    #[test]
    fn test_valid_settings_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let settings = settings_with(
            "header",
            Creative::Markup {
                raw_html: ACCEPTED.into(),
            },
        );
        let request = ValidationRequest {
            settings: settings.clone(),
            action: ValidationAction::ValidateAndSave,
        };

        match service.handle(&request) {
            ValidationResponse::Saved { success, errors } => {
                assert!(success, "errors: {:?}", errors);
                assert!(errors.is_none());
            }
            other => panic!("expected Saved, got {:?}", other),
        }
        assert_eq!(service.store().load(), settings);
    }

    #[test]
    fn test_static_image_urls_must_be_http() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        for bad in [
            "javascript:alert(1)",
            "data:text/html;base64,xx",
            "not a url",
        ] {
            let request = ValidationRequest {
                settings: settings_with(
                    "header",
                    Creative::StaticImage {
                        url: bad.into(),
                        link_url: "https://example.com".into(),
                    },
                ),
                action: ValidationAction::Validate,
            };
            match service.handle(&request) {
                ValidationResponse::Checked { valid, .. } => {
                    assert!(!valid, "accepted: {}", bad)
                }
                other => panic!("expected Checked, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_slide_zone_must_be_alphanumeric() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let request = ValidationRequest {
            settings: settings_with(
                "sidebar",
                Creative::ProviderSlide {
                    zone_id: "zone/../7".into(),
                    format: SlideFormat::Leaderboard,
                },
            ),
            action: ValidationAction::Validate,
        };
        match service.handle(&request) {
            ValidationResponse::Checked { valid, errors } => {
                assert!(!valid);
                assert!(errors[0].contains("alphanumeric"));
            }
            other => panic!("expected Checked, got {:?}", other),
        }
    }

    #[test]
    fn test_response_wire_shapes() {
        let checked = ValidationResponse::Checked {
            valid: false,
            errors: vec!["header: dangerous pattern".into()],
        };
        let json = serde_json::to_string(&checked).unwrap();
        assert!(json.contains("\"valid\":false"));
        assert!(json.contains("\"errors\""));

        let saved = ValidationResponse::Saved {
            success: true,
            errors: None,
        };
        let json = serde_json::to_string(&saved).unwrap();
        assert_eq!(json, "{\"success\":true}");
    }

    #[test]
    fn test_request_wire_shape() {
        let raw = r#"{"settings":{},"action":"validate_and_save"}"#;
        let request: ValidationRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.action, ValidationAction::ValidateAndSave);
        assert_eq!(request.settings, AdSettings::default());
    }

    #[test]
    fn test_multiple_errors_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let mut settings = AdSettings::default();
        let slot = settings.placements.entry("header".into()).or_default();
        slot.markup = Some(Creative::Markup {
            raw_html: "<script>alert(1)</script>".into(),
        });
        slot.fallback = Some(Creative::StaticImage {
            url: "ftp://cdn.example.com/a.png".into(),
            link_url: "https://example.com".into(),
        });

        let request = ValidationRequest {
            settings,
            action: ValidationAction::Validate,
        };
        match service.handle(&request) {
            ValidationResponse::Checked { valid, errors } => {
                assert!(!valid);
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected Checked, got {:?}", other),
        }
    }
}
