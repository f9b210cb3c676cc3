use crate::{config::LicensingConfig, fleet::types::LicenseInfo};

/// Decides which catalog SKUs belong to the cloud desktop product family.
///
/// A part number qualifies when it contains any configured pattern, ignoring case.
#[derive(Debug, Clone)]
pub struct SkuClassifier {
    patterns: Vec<String>,
}

impl SkuClassifier {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|pattern| pattern.as_ref().trim().to_lowercase())
                .filter(|pattern| !pattern.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &LicensingConfig) -> Self {
        Self::new(&config.sku_patterns)
    }

    pub fn is_product_sku(&self, sku_part_number: &str) -> bool {
        if sku_part_number.is_empty() {
            return false;
        }
        let normalized = sku_part_number.to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| normalized.contains(pattern.as_str()))
    }

    pub fn is_available(&self, license: &LicenseInfo) -> bool {
        self.is_product_sku(&license.sku_part_number) && license.available() > 0
    }

    /// First product SKU with free units, in catalog order.
    pub fn select_available<'a>(&self, catalog: &'a [LicenseInfo]) -> Option<&'a LicenseInfo> {
        catalog.iter().find(|license| self.is_available(license))
    }
}

impl Default for SkuClassifier {
    fn default() -> Self {
        Self::from_config(&LicensingConfig::default())
    }
}
