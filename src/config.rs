use crate::core::mapper::MapperOptions;
use crate::core::structure::StructureConfig;
use crate::core::writer::is_valid_tag_name;
use crate::error::ExportError;
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use serde_json::Value;

/// Hook configuration: the XML layout plus the delivery target.
///
/// ```yaml
/// xml:
///   root: InvoiceRegisters
///   date_format: "%Y-%m-%d"
///   structure:
///     Invoices:
///       Payable:
///         InvoiceNumber: document_id
///         Currency: currency
///         Details:
///           Detail:
///             - Amount: item_amount
/// webhook:
///   url: https://example.test/hook
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExportConfig {
    pub xml: XmlSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct XmlSettings {
    /// Name of the document element
    pub root: String,
    /// Raw structure, normalized by [`ExportConfig::structure`]
    pub structure: Value,
    #[serde(default)]
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WebhookSettings {
    #[serde(default)]
    pub url: Option<String>,
}

impl ExportConfig {
    pub fn from_json_value(value: &Value) -> Result<Self, ExportError> {
        let config = Self::deserialize(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ExportError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ExportError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if !is_valid_tag_name(&self.xml.root) {
            return Err(ExportError::Config(format!(
                "root tag {:?} is not a valid XML element name",
                self.xml.root
            )));
        }

        if let Some(format) = &self.xml.date_format {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(ExportError::Config(format!("unsupported date format {:?}", format)));
            }
        }

        Ok(())
    }

    pub fn structure(&self) -> StructureConfig {
        StructureConfig::from_value(&self.xml.structure)
    }

    pub fn mapper_options(&self) -> MapperOptions {
        MapperOptions {
            date_format: self.xml.date_format.clone(),
        }
    }

    /// Delivery target, ignoring blank urls
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
