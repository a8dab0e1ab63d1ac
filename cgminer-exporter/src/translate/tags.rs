//! The shared label set derived from the `version` response.

use serde_json::{Map, Value};

use crate::client::Command;
use crate::mapping::label_text;

use super::{TranslateError, field};

/// Mining firmware family reported by the `version` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    CgMiner,
    BmMiner,
    Unknown,
}

impl Vendor {
    /// Detect the vendor from the first `VERSION` element. CGMiner wins when
    /// both keys are present.
    pub fn detect(version: &Map<String, Value>) -> Self {
        if version.contains_key("CGMiner") {
            Vendor::CgMiner
        } else if version.contains_key("BMMiner") {
            Vendor::BmMiner
        } else {
            Vendor::Unknown
        }
    }

    /// The `VERSION` key and the label it is exported as.
    pub fn version_label(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Vendor::CgMiner => Some(("CGMiner", "cgminer_version")),
            Vendor::BmMiner => Some(("BMMiner", "bmminer_version")),
            Vendor::Unknown => None,
        }
    }
}

/// Ordered label set shared by every line of a scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    vendor: Vendor,
    labels: Vec<(String, String)>,
}

impl TagSet {
    /// Build the tag set for `instance` from the first `VERSION` element.
    ///
    /// `API`, `Type` and `Miner` are required.
    pub fn from_version(
        instance: &str,
        version: &Map<String, Value>,
    ) -> Result<Self, TranslateError> {
        let vendor = Vendor::detect(version);
        let mut labels = vec![("instance".to_string(), instance.to_string())];

        if let Some((key, label)) = vendor.version_label() {
            labels.push((label.to_string(), label_text(&version[key])));
        }

        for (key, label) in [("API", "api_version"), ("Type", "type"), ("Miner", "miner")] {
            let value = field(version, Command::Version, key)?;
            labels.push((label.to_string(), label_text(value)));
        }

        Ok(Self { vendor, labels })
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// Value of a label, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// A new set with per-line labels placed ahead of the shared ones.
    pub fn with_prefix<I, K, V>(&self, extra: I) -> TagSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut labels: Vec<(String, String)> = extra
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        labels.extend(self.labels.iter().cloned());

        TagSet {
            vendor: self.vendor,
            labels,
        }
    }
}
