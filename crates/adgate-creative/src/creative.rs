//! Creative variants.

use serde::{Deserialize, Serialize};

/// The renderable unit of an advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Creative {
    /// Operator-supplied image with a click-through link.
    StaticImage { url: String, link_url: String },
    /// Provider markup snippet. The only variant carrying executable
    /// content; must pass validation before every render.
    Markup { raw_html: String },
    /// Provider-hosted slide identified by zone.
    ProviderSlide { zone_id: String, format: SlideFormat },
}

impl Creative {
    /// Whether this creative must pass [`crate::ContentValidator`] before
    /// rendering.
    pub fn requires_validation(&self) -> bool {
        matches!(self, Creative::Markup { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Creative::StaticImage { .. } => "static_image",
            Creative::Markup { .. } => "markup",
            Creative::ProviderSlide { .. } => "provider_slide",
        }
    }
}

/// Inventory format of a provider slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideFormat {
    MediumRectangle,
    Leaderboard,
    MobileBanner,
}

impl SlideFormat {
    /// Pixel dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            SlideFormat::MediumRectangle => (300, 250),
            SlideFormat::Leaderboard => (728, 90),
            SlideFormat::MobileBanner => (320, 50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_markup_requires_validation() {
        let image = Creative::StaticImage {
            url: "https://cdn.example.com/banner.png".into(),
            link_url: "https://example.com".into(),
        };
        let markup = Creative::Markup {
            raw_html: "<ins></ins>".into(),
        };
        let slide = Creative::ProviderSlide {
            zone_id: "123456".into(),
            format: SlideFormat::MediumRectangle,
        };

        assert!(!image.requires_validation());
        assert!(markup.requires_validation());
        assert!(!slide.requires_validation());
    }

    #[test]
    fn test_serde_tagging() {
        let slide = Creative::ProviderSlide {
            zone_id: "42".into(),
            format: SlideFormat::Leaderboard,
        };
        let json = serde_json::to_string(&slide).unwrap();
        assert!(json.contains("\"type\":\"provider_slide\""));
        assert!(json.contains("\"leaderboard\""));

        let restored: Creative = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, slide);
    }

    #[test]
    fn test_slide_dimensions() {
        assert_eq!(SlideFormat::MediumRectangle.dimensions(), (300, 250));
        assert_eq!(SlideFormat::Leaderboard.dimensions(), (728, 90));
        assert_eq!(SlideFormat::MobileBanner.dimensions(), (320, 50));
    }
}
