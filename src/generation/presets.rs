//! Named output resolutions.

use crate::generation::types::Dimensions;
use serde::Serialize;
use std::fmt;

/// Grouping used when listing presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PresetCategory {
    /// Phones.
    Mobile,
    /// Tablets.
    Tablet,
    /// Laptop and desktop monitors.
    Desktop,
    /// Televisions and large displays.
    #[serde(rename = "TV")]
    Tv,
    /// Social media formats.
    Social,
    /// Print and high-resolution web formats.
    Print,
    /// Square canvases.
    Square,
}

impl PresetCategory {
    /// Every category in display order.
    pub const ALL: [PresetCategory; 7] = [
        Self::Mobile,
        Self::Tablet,
        Self::Desktop,
        Self::Tv,
        Self::Social,
        Self::Print,
        Self::Square,
    ];

    /// Returns the category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "Mobile",
            Self::Tablet => "Tablet",
            Self::Desktop => "Desktop",
            Self::Tv => "TV",
            Self::Social => "Social",
            Self::Print => "Print",
            Self::Square => "Square",
        }
    }

    /// Parses a category name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for PresetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionPreset {
    /// Unique display label.
    pub label: &'static str,
    /// Grouping.
    pub category: PresetCategory,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Devices or uses this size targets.
    pub description: &'static str,
}

impl DimensionPreset {
    /// Returns the preset size.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

const fn preset(
    label: &'static str,
    category: PresetCategory,
    width: u32,
    height: u32,
    description: &'static str,
) -> DimensionPreset {
    DimensionPreset {
        label,
        category,
        width,
        height,
        description,
    }
}

#[rustfmt::skip]
static PRESETS: &[DimensionPreset] = &[
    preset("Mobile Small", PresetCategory::Mobile, 360, 640, "Small mobile phones"),
    preset("iPhone SE/8", PresetCategory::Mobile, 375, 667, "iPhone SE, 6, 7, 8"),
    preset("iPhone 12/13", PresetCategory::Mobile, 390, 844, "iPhone 12, 13, 14"),
    preset("iPhone 14 Pro", PresetCategory::Mobile, 393, 852, "iPhone 14/15 Pro"),
    preset("iPhone 11/XR", PresetCategory::Mobile, 414, 896, "iPhone 11, XR, XS Max"),
    preset("iPhone 14 Plus", PresetCategory::Mobile, 428, 926, "iPhone 14/15 Plus"),
    preset("Android Standard", PresetCategory::Mobile, 360, 800, "Standard Android phones"),
    preset("Pixel 6/7", PresetCategory::Mobile, 412, 915, "Google Pixel 6, 7"),
    preset("iPad Portrait", PresetCategory::Tablet, 768, 1024, "iPad 9.7\" Portrait"),
    preset("iPad Landscape", PresetCategory::Tablet, 1024, 768, "iPad 9.7\" Landscape"),
    preset("iPad Air Portrait", PresetCategory::Tablet, 820, 1180, "iPad Air 10.9\" Portrait"),
    preset("iPad Air Landscape", PresetCategory::Tablet, 1180, 820, "iPad Air 10.9\" Landscape"),
    preset("iPad Pro 11\" Portrait", PresetCategory::Tablet, 834, 1194, "iPad Pro 11\" Portrait"),
    preset("iPad Pro 11\" Landscape", PresetCategory::Tablet, 1194, 834, "iPad Pro 11\" Landscape"),
    preset(
        "iPad Pro 12.9\" Portrait",
        PresetCategory::Tablet,
        1024,
        1366,
        "iPad Pro 12.9\" Portrait",
    ),
    preset(
        "iPad Pro 12.9\" Landscape",
        PresetCategory::Tablet,
        1366,
        1024,
        "iPad Pro 12.9\" Landscape",
    ),
    preset("Android Tablet Portrait", PresetCategory::Tablet, 800, 1280, "Standard Android tablet"),
    preset(
        "Android Tablet Landscape",
        PresetCategory::Tablet,
        1280,
        800,
        "Standard Android tablet",
    ),
    preset("Laptop HD", PresetCategory::Desktop, 1366, 768, "Standard laptop screen"),
    preset("MacBook Air 13\"", PresetCategory::Desktop, 1440, 900, "MacBook Air 13\" (2017-2020)"),
    preset("Laptop FHD+", PresetCategory::Desktop, 1536, 864, "High-res laptop"),
    preset("Desktop HD+", PresetCategory::Desktop, 1600, 900, "Desktop HD+ monitor"),
    preset("Desktop WSXGA+", PresetCategory::Desktop, 1680, 1050, "Widescreen desktop"),
    preset("Full HD Desktop", PresetCategory::Desktop, 1920, 1080, "Standard Full HD monitor"),
    preset("Desktop WUXGA", PresetCategory::Desktop, 1920, 1200, "Widescreen desktop"),
    preset("1440p Monitor", PresetCategory::Desktop, 2560, 1440, "QHD/2K monitor"),
    preset("MacBook Pro 13\"", PresetCategory::Desktop, 2560, 1600, "MacBook Pro 13\" Retina"),
    preset("MacBook Pro 14\"", PresetCategory::Desktop, 3008, 1692, "MacBook Pro 14\" (2021+)"),
    preset("MacBook Pro 16\"", PresetCategory::Desktop, 3456, 2234, "MacBook Pro 16\" (2021+)"),
    preset("4K Monitor", PresetCategory::Desktop, 3840, 2160, "Ultra HD 4K monitor"),
    preset("Full HD TV", PresetCategory::Tv, 1920, 1080, "1080p television"),
    preset("1440p TV", PresetCategory::Tv, 2560, 1440, "QHD television"),
    preset("4K TV", PresetCategory::Tv, 3840, 2160, "Ultra HD 4K TV"),
    preset("8K TV", PresetCategory::Tv, 7680, 4320, "Ultra HD 8K TV"),
    preset("5K Display", PresetCategory::Tv, 5120, 2880, "Apple Studio Display"),
    preset("Pro Display XDR", PresetCategory::Tv, 6016, 3384, "Apple Pro Display XDR"),
    preset("Instagram Square", PresetCategory::Social, 1080, 1080, "Instagram post"),
    preset("Instagram Portrait", PresetCategory::Social, 1080, 1350, "Instagram portrait post"),
    preset("Instagram Story", PresetCategory::Social, 1080, 1920, "Instagram/TikTok story"),
    preset("Facebook Cover", PresetCategory::Social, 1200, 630, "Facebook cover photo"),
    preset("YouTube Thumbnail", PresetCategory::Social, 1920, 1080, "YouTube video thumbnail"),
    preset("Twitter Header", PresetCategory::Social, 1500, 500, "Twitter/X header"),
    preset("LinkedIn Banner", PresetCategory::Social, 1128, 191, "LinkedIn profile banner"),
    preset("LinkedIn Post", PresetCategory::Social, 1080, 566, "LinkedIn post image"),
    preset("A4 Portrait", PresetCategory::Print, 2480, 3508, "A4 print portrait (300 DPI)"),
    preset("A4 Landscape", PresetCategory::Print, 3508, 2480, "A4 print landscape (300 DPI)"),
    preset("A3 Portrait", PresetCategory::Print, 3508, 4961, "A3 print portrait (300 DPI)"),
    preset("A3 Landscape", PresetCategory::Print, 4961, 3508, "A3 print landscape (300 DPI)"),
    preset("Web Banner", PresetCategory::Print, 1800, 1200, "Website banner"),
    preset("High-Res Web", PresetCategory::Print, 2400, 1600, "High-resolution web image"),
    preset("Square 512", PresetCategory::Square, 512, 512, "Small square format"),
    preset("Square 768", PresetCategory::Square, 768, 768, "Medium square format"),
    preset("Square 1024", PresetCategory::Square, 1024, 1024, "Large square format"),
    preset("Square 1536", PresetCategory::Square, 1536, 1536, "XL square format"),
    preset("Square 2048", PresetCategory::Square, 2048, 2048, "XXL square format"),
];

/// Label of the preset selected when none is given.
pub const DEFAULT_PRESET: &str = "Full HD Desktop";

/// Returns every preset in catalog order.
pub fn all() -> &'static [DimensionPreset] {
    PRESETS
}

/// Finds a preset by label, ignoring case.
pub fn find(label: &str) -> Option<&'static DimensionPreset> {
    PRESETS
        .iter()
        .find(|p| p.label.eq_ignore_ascii_case(label.trim()))
}

/// Returns the 1920x1080 default.
pub fn default_preset() -> &'static DimensionPreset {
    find(DEFAULT_PRESET).unwrap_or(&PRESETS[0])
}

/// Returns all presets in one category.
pub fn by_category(category: PresetCategory) -> impl Iterator<Item = &'static DimensionPreset> {
    PRESETS.iter().filter(move |p| p.category == category)
}

/// Case-insensitive search over label, description and category.
pub fn search(query: &str) -> Vec<&'static DimensionPreset> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return PRESETS.iter().collect();
    }
    PRESETS
        .iter()
        .filter(|p| {
            p.label.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
                || p.category.as_str().to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset() {
        let preset = default_preset();
        assert_eq!(preset.dimensions(), Dimensions::new(1920, 1080));
        assert_eq!(preset.category, PresetCategory::Desktop);
    }

    #[test]
    fn test_find_ignores_case() {
        let preset = find("instagram story").unwrap();
        assert_eq!((preset.width, preset.height), (1080, 1920));
        assert!(find("Polaroid").is_none());
    }

    #[test]
    fn test_all_presets_positive() {
        assert_eq!(all().len(), 55);
        assert!(all().iter().all(|p| p.dimensions().is_positive()));
    }

    #[test]
    fn test_category_filter_and_parse() {
        assert_eq!(PresetCategory::parse("tv"), Some(PresetCategory::Tv));
        let squares: Vec<_> = by_category(PresetCategory::Square).collect();
        assert_eq!(squares.len(), 5);
        assert!(squares.iter().all(|p| p.width == p.height));
    }

    #[test]
    fn test_search() {
        let ipads = search("ipad");
        assert!(ipads.len() >= 8);
        assert!(ipads.iter().all(|p| p.category == PresetCategory::Tablet));
        assert_eq!(search("").len(), all().len());
    }
}
