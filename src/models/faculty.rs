//! Faculty profile record.

use serde::{Deserialize, Serialize};

use crate::models::FacultyField;

/// Semi-structured public profile of one faculty member.
///
/// Every field is optional; a record with nothing populated is considered
/// empty and dropped by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyRecord {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub email: Option<String>,
    pub qualifications: Vec<String>,
    pub research_interests: Vec<String>,
    pub specializations: Vec<String>,
    pub publications: Vec<String>,
    pub additional_info: Vec<String>,
}

impl FacultyRecord {
    /// Fields written first, one line each.
    pub const PRIORITY_FIELDS: [FacultyField; 3] =
        [FacultyField::Name, FacultyField::Designation, FacultyField::Email];

    /// List fields written under their own sub-header.
    pub const LIST_FIELDS: [FacultyField; 4] = [
        FacultyField::Qualifications,
        FacultyField::ResearchInterests,
        FacultyField::Specializations,
        FacultyField::Publications,
    ];

    /// Store a fragment in the given field.
    ///
    /// Single-valued fields keep their first value; a later fragment for an
    /// already-set field lands in `additional_info` so no text is lost.
    pub fn insert(&mut self, field: FacultyField, text: String) {
        let slot = match field {
            FacultyField::Name => &mut self.name,
            FacultyField::Designation => &mut self.designation,
            FacultyField::Email => &mut self.email,
            list_field => {
                self.list_mut(list_field).push(text);
                return;
            }
        };

        if slot.is_none() {
            *slot = Some(text);
        } else {
            self.additional_info.push(text);
        }
    }

    /// Value of a single-valued field.
    pub fn scalar(&self, field: FacultyField) -> Option<&str> {
        match field {
            FacultyField::Name => self.name.as_deref(),
            FacultyField::Designation => self.designation.as_deref(),
            FacultyField::Email => self.email.as_deref(),
            _ => None,
        }
    }

    /// Values of a list field (empty for single-valued fields).
    pub fn list(&self, field: FacultyField) -> &[String] {
        match field {
            FacultyField::Qualifications => &self.qualifications,
            FacultyField::ResearchInterests => &self.research_interests,
            FacultyField::Specializations => &self.specializations,
            FacultyField::Publications => &self.publications,
            FacultyField::AdditionalInfo => &self.additional_info,
            _ => &[],
        }
    }

    fn list_mut(&mut self, field: FacultyField) -> &mut Vec<String> {
        match field {
            FacultyField::Qualifications => &mut self.qualifications,
            FacultyField::ResearchInterests => &mut self.research_interests,
            FacultyField::Specializations => &mut self.specializations,
            FacultyField::Publications => &mut self.publications,
            _ => &mut self.additional_info,
        }
    }

    /// Whether no field has been populated.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.designation.is_none()
            && self.email.is_none()
            && self.qualifications.is_empty()
            && self.research_interests.is_empty()
            && self.specializations.is_empty()
            && self.publications.is_empty()
            && self.additional_info.is_empty()
    }

    /// Total number of stored fragments.
    pub fn fragment_count(&self) -> usize {
        [&self.name, &self.designation, &self.email]
            .iter()
            .filter(|v| v.is_some())
            .count()
            + self.qualifications.len()
            + self.research_interests.len()
            + self.specializations.len()
            + self.publications.len()
            + self.additional_info.len()
    }
}
