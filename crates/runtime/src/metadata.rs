use modhub_core::ModuleId;
use serde::{Deserialize, Serialize};

/// Ordered: `Basic < Pro < Enterprise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingTier {
    Basic,
    Pro,
    Enterprise,
}

/// Immutable descriptor of a module type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    pub id: ModuleId,
    pub name: String,
    pub version: String,
    pub category: String,
    pub industry: Vec<String>,
    pub description: String,
    pub icon: String,
    pub author: String,
    pub pricing_tier: PricingTier,
    pub features: Vec<String>,
    /// Ids of modules that must be installed alongside this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ModuleId>,
}

impl ModuleMetadata {
    pub fn new(id: ModuleId, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: "1.0.0".to_string(),
            category: category.into(),
            industry: Vec::new(),
            description: String::new(),
            icon: String::new(),
            author: String::new(),
            pricing_tier: PricingTier::Basic,
            features: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn industries<I, S>(mut self, industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.industry = industries.into_iter().map(Into::into).collect();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn tier(mut self, tier: PricingTier) -> Self {
        self.pricing_tier = tier;
        self
    }

    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on(mut self, module: ModuleId) -> Self {
        self.dependencies.push(module);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_tiers_are_ordered() {
        assert!(PricingTier::Basic < PricingTier::Pro);
        assert!(PricingTier::Pro < PricingTier::Enterprise);
    }

    #[test]
    fn metadata_serializes_with_host_field_names() {
        let meta = ModuleMetadata::new(ModuleId::new("fraud-detection").unwrap(), "Fraud", "finance")
            .industries(["finance"])
            .tier(PricingTier::Enterprise);
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["pricingTier"], "enterprise");
        assert_eq!(json["industry"], serde_json::json!(["finance"]));
        assert!(json.get("dependencies").is_none());
    }
}
