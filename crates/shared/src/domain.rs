use std::{borrow::Borrow, collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{json_kind, DecodeError};

macro_rules! label_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

label_newtype!(SectionId);
label_newtype!(StepId);

/// Extracted value of a field or sub-field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Number(serde_json::Number),
    #[default]
    Missing,
}

impl FieldValue {
    pub fn display_text(&self) -> String {
        match self {
            FieldValue::Flag(flag) => flag.to_string(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(number) => number.to_string(),
            FieldValue::Missing => String::new(),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, FieldValue::Flag(true))
    }

    /// `false`, `""`, `0` and missing values count as blank.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Flag(flag) => *flag,
            FieldValue::Text(text) => !text.is_empty(),
            FieldValue::Number(number) => number.as_f64() != Some(0.0),
            FieldValue::Missing => false,
        }
    }
}

/// Values outside the model (arrays, objects) decode as `Missing` so one odd
/// field does not sink the rest of the form.
fn lenient_value<'de, D>(deserializer: D) -> Result<FieldValue, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let kind = json_kind(&raw);
    match serde_json::from_value(raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(found = kind, error = %err, "form: unsupported field value, treating as missing");
            Ok(FieldValue::Missing)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubField {
    pub label: String,
    #[serde(default, deserialize_with = "lenient_value")]
    pub value: FieldValue,
}

impl SubField {
    /// Only a literal boolean `true` selects an option.
    pub fn is_selected(&self) -> bool {
        self.value.is_true()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub label: String,
    #[serde(default, deserialize_with = "lenient_value")]
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_fields: Option<Vec<SubField>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Section {
    /// First field carrying `label`. Labels are not required to be unique.
    pub fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.label == label)
    }
}

/// Structured extraction result returned by the processing endpoint.
///
/// Top-level members whose value is not an object (the backend appends
/// `"status": "complete"`) are not sections and are dropped while decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormResult {
    pub sections: BTreeMap<SectionId, Section>,
}

impl FormResult {
    pub fn from_json_str(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let entries = match value {
            Value::Object(entries) => entries,
            other => {
                return Err(DecodeError::NotAnObject {
                    found: json_kind(&other),
                })
            }
        };

        let mut sections = BTreeMap::new();
        for (key, entry) in entries {
            if !entry.is_object() {
                continue;
            }
            let section = serde_json::from_value::<Section>(entry).map_err(|source| {
                DecodeError::Section {
                    section: key.clone(),
                    source,
                }
            })?;
            sections.insert(SectionId(key), section);
        }

        Ok(Self { sections })
    }

    pub fn section(&self, section: &str) -> Option<&Section> {
        self.sections.get(section)
    }

    pub fn field(&self, section: &str, label: &str) -> Option<&Field> {
        self.section(section)?.field(label)
    }

    /// Display text of a field, empty when the section or the field is absent.
    pub fn field_text(&self, section: &str, label: &str) -> String {
        self.field(section, label)
            .map(|field| field.value.display_text())
            .unwrap_or_default()
    }

    pub fn sub_fields(&self, section: &str, label: &str) -> Option<&[SubField]> {
        self.field(section, label)?.sub_fields.as_deref()
    }

    /// Label of the first selected option of a choice group.
    ///
    /// `None` when the group itself is absent, `Some("")` when it exists but
    /// nothing is selected.
    pub fn selected_option(&self, section: &str, label: &str) -> Option<String> {
        self.sub_fields(section, label).map(|options| {
            options
                .iter()
                .find(|option| option.is_selected())
                .map(|option| option.label.clone())
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
