use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Document classification tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[default]
    #[serde(rename = "pay_slip")]
    PaySlip,
    #[serde(rename = "salary_slip")]
    SalarySlip,
    #[serde(rename = "form_16")]
    Form16,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::PaySlip => "pay_slip",
            FileType::SalarySlip => "salary_slip",
            FileType::Form16 => "form_16",
        }
    }
}

impl FromStr for FileType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pay_slip" => Ok(FileType::PaySlip),
            "salary_slip" => Ok(FileType::SalarySlip),
            "form_16" | "form16" => Ok(FileType::Form16),
            _ => Err(anyhow::anyhow!("Invalid file type: {}", s)),
        }
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Infer a file type from a user-supplied filename.
///
/// Form 16 markers win over "salary"; anything unrecognised is a pay slip.
pub fn classify_file_type(file_name: &str) -> FileType {
    let name = file_name.to_lowercase();

    if ["form16", "form_16", "form-16", "form 16"]
        .iter()
        .any(|marker| name.contains(marker))
    {
        FileType::Form16
    } else if name.contains("salary") {
        FileType::SalarySlip
    } else {
        FileType::PaySlip
    }
}

/// Metadata row for one uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub session_id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub file_type: FileType,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}

/// Insert payload; the id is assigned by the metadata store.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub session_id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub file_type: FileType,
    pub uploaded_at: DateTime<Utc>,
}

/// What upload and display callers get back. Serialized as camelCase JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHandle {
    pub document_id: i64,
    pub session_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub uploaded_at: DateTime<Utc>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_form16_variants() {
        for name in [
            "Form16_2024.pdf",
            "form_16.pdf",
            "my-FORM-16.pdf",
            "form 16 final.pdf",
        ] {
            assert_eq!(classify_file_type(name), FileType::Form16, "{name}");
        }
    }

    #[test]
    fn classifies_salary_slips() {
        assert_eq!(classify_file_type("Salary_March.pdf"), FileType::SalarySlip);
        assert_eq!(
            classify_file_type("salary-form16.pdf"),
            FileType::Form16
        );
    }

    #[test]
    fn defaults_to_pay_slip() {
        assert_eq!(classify_file_type("march.pdf"), FileType::PaySlip);
        assert_eq!(classify_file_type(""), FileType::PaySlip);
        assert_eq!(classify_file_type("form1.pdf"), FileType::PaySlip);
    }

    #[test]
    fn file_type_round_trips_through_str() {
        for ft in [FileType::PaySlip, FileType::SalarySlip, FileType::Form16] {
            assert_eq!(ft.as_str().parse::<FileType>().unwrap(), ft);
        }
        assert!("invoice".parse::<FileType>().is_err());
    }

    #[test]
    fn handle_serializes_camel_case() {
        let handle = DocumentHandle {
            document_id: 1,
            session_id: Uuid::nil(),
            file_name: "a.pdf".to_string(),
            file_type: FileType::Form16,
            uploaded_at: DateTime::from_timestamp_millis(0).unwrap(),
            url: "/documents/x/1".to_string(),
        };
        let json = serde_json::to_value(&handle).unwrap();
        assert_eq!(json["documentId"], 1);
        assert_eq!(json["fileType"], "form_16");
        assert_eq!(json["fileName"], "a.pdf");
        assert!(json.get("sessionId").is_some());
    }
}
