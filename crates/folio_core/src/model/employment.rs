//! Employment domain model: a job held over a dated period.

use super::address::{check_period, period_key, PeriodKey};
use super::date::{period_days, today};
use super::normalize::{fold_case, optional_text, required_text};
use super::record::{identity_semantics, Record};
use super::{type_mismatch, FieldValue, RecordField, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmploymentField {
    Start,
    End,
    Company,
    Supervisor,
    Address,
    Phone,
}

impl RecordField for EmploymentField {
    const ALL: &'static [Self] = &[
        Self::Start,
        Self::End,
        Self::Company,
        Self::Supervisor,
        Self::Address,
        Self::Phone,
    ];
    const RECORD: &'static str = "employment";

    fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Company => "company",
            Self::Supervisor => "supervisor",
            Self::Address => "address",
            Self::Phone => "phone",
        }
    }
}

/// Optional contact details of an [`Employment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmploymentContact {
    pub supervisor: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EmploymentFields")]
pub struct Employment {
    start: NaiveDate,
    end: Option<NaiveDate>,
    company: String,
    supervisor: Option<String>,
    address: Option<String>,
    phone: Option<String>,
}

impl Employment {
    /// # Errors
    /// - `Blank` for an empty company.
    /// - `PeriodReversed` when `end` precedes `start`.
    pub fn new(
        company: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        contact: &EmploymentContact,
    ) -> Result<Self, ValidationError> {
        check_period(start, end)?;
        Ok(Self {
            start,
            end,
            company: required_text("company", company)?,
            supervisor: optional_text(contact.supervisor.as_deref()),
            address: optional_text(contact.address.as_deref()),
            phone: optional_text(contact.phone.as_deref()),
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn supervisor(&self) -> Option<&str> {
        self.supervisor.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn duration_days_as_of(&self, as_of: NaiveDate) -> i64 {
        period_days(self.start, self.end, as_of)
    }

    pub fn ordering_fields_as_of(&self, as_of: NaiveDate) -> PeriodKey {
        period_key(self.start, self.end, as_of)
    }
}

#[derive(Deserialize)]
struct EmploymentFields {
    start: NaiveDate,
    #[serde(default)]
    end: Option<NaiveDate>,
    company: String,
    #[serde(default)]
    supervisor: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

impl TryFrom<EmploymentFields> for Employment {
    type Error = ValidationError;

    fn try_from(raw: EmploymentFields) -> Result<Self, Self::Error> {
        let contact = EmploymentContact {
            supervisor: raw.supervisor,
            address: raw.address,
            phone: raw.phone,
        };
        Employment::new(&raw.company, raw.start, raw.end, &contact)
    }
}

identity_semantics!(Employment);

impl Record for Employment {
    type Field = EmploymentField;
    type Identity = (String,);
    type Ordering = PeriodKey;
    /// A company may be rejoined; each stint starts on its own date.
    type UniqueKey = (String, NaiveDate);

    const KIND: &'static str = "employment";

    fn identity_fields(&self) -> Self::Identity {
        (fold_case(&self.company),)
    }

    fn ordering_fields(&self) -> PeriodKey {
        self.ordering_fields_as_of(today())
    }

    fn unique_key(&self) -> Self::UniqueKey {
        (fold_case(&self.company), self.start)
    }

    fn describe(&self) -> String {
        let end = self
            .end
            .map_or_else(|| "Present".to_string(), |end| end.to_string());
        let mut text = format!("{} ({} -> {end})", self.company, self.start);
        if let Some(supervisor) = &self.supervisor {
            text.push_str(&format!(", supervisor: {supervisor}"));
        }
        if let Some(phone) = &self.phone {
            text.push_str(&format!(", phone: {phone}"));
        }
        text
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_period(self.start, self.end)?;
        required_text("company", &self.company)?;
        Ok(())
    }

    fn field(&self, field: EmploymentField) -> FieldValue {
        match field {
            EmploymentField::Start => self.start.into(),
            EmploymentField::End => self.end.into(),
            EmploymentField::Company => self.company.clone().into(),
            EmploymentField::Supervisor => self.supervisor.clone().into(),
            EmploymentField::Address => self.address.clone().into(),
            EmploymentField::Phone => self.phone.clone().into(),
        }
    }

    fn set_field(
        &mut self,
        field: EmploymentField,
        value: FieldValue,
    ) -> Result<(), ValidationError> {
        let name = field.name();
        match (field, &value) {
            (EmploymentField::Start, FieldValue::Date(date)) => self.start = *date,
            (EmploymentField::End, FieldValue::Date(date)) => self.end = Some(*date),
            (EmploymentField::End, FieldValue::Null) => self.end = None,
            (EmploymentField::Start | EmploymentField::End, other) => {
                return Err(type_mismatch(name, "date", other));
            }
            (EmploymentField::Company, FieldValue::Text(text)) => {
                self.company = required_text(name, text)?;
            }
            (EmploymentField::Supervisor, _) => self.supervisor = optional(name, &value)?,
            (EmploymentField::Address, _) => self.address = optional(name, &value)?,
            (EmploymentField::Phone, _) => self.phone = optional(name, &value)?,
            (EmploymentField::Company, other) => return Err(type_mismatch(name, "text", other)),
        }
        Ok(())
    }
}

fn optional(field: &'static str, value: &FieldValue) -> Result<Option<String>, ValidationError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Text(text) => Ok(optional_text(Some(text.as_str()))),
        other => Err(type_mismatch(field, "text", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::{Employment, EmploymentContact, EmploymentField};
    use crate::model::record::{sort_records, Record};
    use crate::model::FieldValue;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn company_identity_is_case_insensitive() {
        let contact = EmploymentContact::default();
        let a = Employment::new("Acme", ymd(2010, 1, 1), Some(ymd(2011, 1, 1)), &contact).unwrap();
        let b = Employment::new("ACME", ymd(2015, 1, 1), None, &contact).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn longer_periods_sort_first() {
        let contact = EmploymentContact::default();
        let short = Employment::new("Short Co", ymd(2020, 1, 1), Some(ymd(2020, 2, 1)), &contact)
            .unwrap();
        let long = Employment::new("Long Co", ymd(2010, 1, 1), Some(ymd(2015, 1, 1)), &contact)
            .unwrap();
        let mut jobs = vec![short, long];
        sort_records(&mut jobs);
        assert_eq!(jobs[0].company(), "Long Co");
    }

    #[test]
    fn blank_supervisor_clears_value() {
        let contact = EmploymentContact {
            supervisor: Some("Pat".to_string()),
            ..EmploymentContact::default()
        };
        let mut job = Employment::new("Acme", ymd(2010, 1, 1), None, &contact).unwrap();
        job.set_field(EmploymentField::Supervisor, FieldValue::from("  "))
            .unwrap();
        assert_eq!(job.supervisor(), None);
    }
}
