//! Maps an extracted form onto the dashboard targets.

use serde_json::Value;
use shared::{
    domain::{FieldValue, FormResult},
    error::DecodeError,
};
use tracing::debug;

use crate::view::{DashboardTarget, ViewBindings};

/// Section and label that locate one extracted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub section: String,
    pub label: String,
}

impl FieldRef {
    pub fn new(section: &str, label: &str) -> Self {
        Self {
            section: section.to_string(),
            label: label.to_string(),
        }
    }

    fn text(&self, form: &FormResult) -> String {
        form.field_text(&self.section, &self.label)
    }

    fn value<'a>(&self, form: &'a FormResult) -> Option<&'a FieldValue> {
        form.field(&self.section, &self.label).map(|field| &field.value)
    }

    fn selected(&self, form: &FormResult) -> Option<String> {
        form.selected_option(&self.section, &self.label)
    }
}

/// Where each dashboard value lives in the extracted form. The defaults are
/// the labels the backend emits for the work-injury claim form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLabels {
    pub last_name: FieldRef,
    pub first_name: FieldRef,
    pub id_number: FieldRef,
    pub gender: FieldRef,
    pub landline: FieldRef,
    pub mobile: FieldRef,
    pub street: FieldRef,
    pub house_number: FieldRef,
    pub entrance: FieldRef,
    pub apartment: FieldRef,
    pub city: FieldRef,
    pub postal_code: FieldRef,
    pub injury_date: FieldRef,
    pub injury_time: FieldRef,
    pub workplace: FieldRef,
    pub injured_body_part: FieldRef,
    pub accident_location_type: FieldRef,
    pub accident_description: FieldRef,
    pub accident_address: FieldRef,
    pub health_fund: FieldRef,
    pub diagnoses: Vec<FieldRef>,
}

impl Default for FormLabels {
    fn default() -> Self {
        Self {
            last_name: FieldRef::new("section2", "שם משפחה"),
            first_name: FieldRef::new("section2", "שם פרטי"),
            id_number: FieldRef::new("section2", "ת.ז"),
            gender: FieldRef::new("section2", "מין"),
            landline: FieldRef::new("section2", "טלפון קווי"),
            mobile: FieldRef::new("section2", "טלפון נייד"),
            street: FieldRef::new("section2", "רחוב"),
            house_number: FieldRef::new("section2", "מס' בית"),
            entrance: FieldRef::new("section2", "כניסה"),
            apartment: FieldRef::new("section2", "דירה"),
            city: FieldRef::new("section2", "יישוב"),
            postal_code: FieldRef::new("section2", "מיקוד"),
            injury_date: FieldRef::new("section3", "בתאריך"),
            injury_time: FieldRef::new("section3", "בשעה"),
            workplace: FieldRef::new("section3", "כאשר עבדתי ב"),
            injured_body_part: FieldRef::new("section3", "האיבר שנפגע"),
            accident_location_type: FieldRef::new("section3", "מקום התאונה"),
            accident_description: FieldRef::new("section3", "נסיבות הפגיעה / תיאור התאונה"),
            accident_address: FieldRef::new("section3", "כתובת מקום התאונה"),
            health_fund: FieldRef::new("section5", "קופת חולים"),
            diagnoses: vec![
                FieldRef::new("section5", "אבחנה רפואית 1"),
                FieldRef::new("section5", "אבחנה רפואית 2"),
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardRenderer {
    labels: FormLabels,
}

impl DashboardRenderer {
    pub fn new(labels: FormLabels) -> Self {
        Self { labels }
    }

    /// Text for every target the form can fill.
    ///
    /// Choice groups missing from the form produce no entry, so their
    /// targets keep whatever they showed before.
    pub fn values(&self, form: &FormResult) -> Vec<(DashboardTarget, String)> {
        let labels = &self.labels;
        let mut values = vec![
            (DashboardTarget::LastName, labels.last_name.text(form)),
            (DashboardTarget::FirstName, labels.first_name.text(form)),
            (DashboardTarget::IdNumber, labels.id_number.text(form)),
        ];
        if let Some(gender) = labels.gender.selected(form) {
            values.push((DashboardTarget::Gender, gender));
        }
        values.extend([
            (DashboardTarget::Phone, labels.landline.text(form)),
            (DashboardTarget::Mobile, labels.mobile.text(form)),
            (
                DashboardTarget::Address,
                compose_address(
                    &labels.street.text(form),
                    &labels.house_number.text(form),
                    &labels.entrance.text(form),
                    &labels.apartment.text(form),
                    &labels.city.text(form),
                    &labels.postal_code.text(form),
                ),
            ),
            (DashboardTarget::InjuryDate, labels.injury_date.text(form)),
            (DashboardTarget::InjuryTime, labels.injury_time.text(form)),
            (DashboardTarget::AccidentLocation, labels.workplace.text(form)),
            (
                DashboardTarget::InjuredBodyPart,
                labels.injured_body_part.text(form),
            ),
        ]);
        if let Some(fund) = labels.health_fund.selected(form) {
            values.push((DashboardTarget::HealthFund, fund));
        }
        if let Some(nature) = labels.accident_location_type.selected(form) {
            values.push((DashboardTarget::AccidentNature, nature));
        }
        values.extend([
            (
                DashboardTarget::Diagnoses,
                join_diagnoses(
                    labels
                        .diagnoses
                        .iter()
                        .filter_map(|diagnosis| diagnosis.value(form))
                        .filter(|value| value.is_truthy())
                        .map(FieldValue::display_text),
                ),
            ),
            (
                DashboardTarget::AccidentDescription,
                labels.accident_description.text(form),
            ),
            (
                DashboardTarget::AccidentAddress,
                labels.accident_address.text(form),
            ),
        ]);
        values
    }

    /// Writes the form into `bindings` and returns how many targets were updated.
    pub fn render(&self, form: &FormResult, bindings: &ViewBindings) -> usize {
        let mut updated = 0;
        for (target, text) in self.values(form) {
            if bindings.update(target, &text) {
                updated += 1;
            } else {
                debug!(target = target.element_id(), "dashboard: no binding for target");
            }
        }
        updated
    }

    pub fn render_json(&self, raw: &str, bindings: &ViewBindings) -> Result<usize, DecodeError> {
        let form = FormResult::from_json_str(raw)?;
        Ok(self.render(&form, bindings))
    }

    pub fn render_value(&self, value: Value, bindings: &ViewBindings) -> Result<usize, DecodeError> {
        let form = FormResult::from_value(value)?;
        Ok(self.render(&form, bindings))
    }
}

/// Single-line postal address; blank parts are left out together with their
/// separators.
pub fn compose_address(
    street: &str,
    house_number: &str,
    entrance: &str,
    apartment: &str,
    city: &str,
    postal_code: &str,
) -> String {
    let entrance = entrance.trim();
    let apartment = apartment.trim();
    let segments = [
        join_words(&[street, house_number]),
        if entrance.is_empty() {
            String::new()
        } else {
            format!("Entrance {entrance}")
        },
        if apartment.is_empty() {
            String::new()
        } else {
            format!("Apt {apartment}")
        },
        join_words(&[city, postal_code]),
    ];

    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn join_diagnoses<I, S>(diagnoses: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    diagnoses
        .into_iter()
        .filter(|diagnosis| !diagnosis.as_ref().is_empty())
        .map(|diagnosis| diagnosis.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_words(words: &[&str]) -> String {
    words
        .iter()
        .map(|word| word.trim())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
