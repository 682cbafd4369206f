use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    #[serde(rename = "R&D")]
    RnD,
    #[serde(rename = "Office")]
    Office,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::RnD => "R&D",
            Scenario::Office => "Office",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "R&D" | "rnd" | "RnD" => Ok(Scenario::RnD),
            "Office" | "office" => Ok(Scenario::Office),
            other => Err(format!("unknown scenario: {other}")),
        }
    }
}

/// An uploaded regulation or policy document.
#[derive(Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc"];

impl Attachment {
    pub fn has_accepted_extension(&self) -> bool {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| {
                ACCEPTED_EXTENSIONS
                    .iter()
                    .any(|accepted| ext.eq_ignore_ascii_case(accepted))
            })
            .unwrap_or(false)
    }
}

/// Answers collected by the intake form. One instance per submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFields {
    pub system_name: String,
    pub data_subject: String,
    pub data_type: String,
    pub purpose: String,
    pub source: String,
    pub storage: String,
    pub recipients: String,
    pub cross_border: String,
    pub retention: String,
    pub security: String,
}

/// Form field names paired with their display labels, in form order.
pub const FIELD_LABELS: [(&str, &str); 10] = [
    ("system_name", "System/Process Name"),
    ("data_subject", "Data Subject"),
    ("data_type", "Data Type"),
    ("purpose", "Purpose"),
    ("source", "Data Source"),
    ("storage", "Storage Location"),
    ("recipients", "Recipients"),
    ("cross_border", "Cross-border Transfer?"),
    ("retention", "Retention Period"),
    ("security", "Security Measures"),
];

impl AssessmentFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "system_name" => &self.system_name,
            "data_subject" => &self.data_subject,
            "data_type" => &self.data_type,
            "purpose" => &self.purpose,
            "source" => &self.source,
            "storage" => &self.storage,
            "recipients" => &self.recipients,
            "cross_border" => &self.cross_border,
            "retention" => &self.retention,
            "security" => &self.security,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Returns false for unknown field names.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "system_name" => &mut self.system_name,
            "data_subject" => &mut self.data_subject,
            "data_type" => &mut self.data_type,
            "purpose" => &mut self.purpose,
            "source" => &mut self.source,
            "storage" => &mut self.storage,
            "recipients" => &mut self.recipients,
            "cross_border" => &mut self.cross_border,
            "retention" => &mut self.retention,
            "security" => &mut self.security,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Labels of fields left blank, in form order.
    pub fn missing(&self) -> Vec<&'static str> {
        FIELD_LABELS
            .iter()
            .filter(|(name, _)| self.get(name).is_none_or(|v| v.trim().is_empty()))
            .map(|(_, label)| *label)
            .collect()
    }

    pub fn demo(scenario: Scenario) -> Self {
        match scenario {
            Scenario::RnD => Self {
                system_name: "ADAS Data Logging Pilot (Frankfurt)".into(),
                data_subject: "Public road users (pedestrians, other drivers), Test drivers".into(),
                data_type: "Video footage (faces, license plates), GPS location, CAN bus data, Driver fatigue status".into(),
                purpose: "Validation of L2+ autonomous driving algorithms".into(),
                source: "Vehicle sensors (Camera, LiDAR) and Telematics Box".into(),
                storage: "Encrypted SSD on vehicle -> Upload to AWS Frankfurt (S3)".into(),
                recipients: "EU R&D (Algo Team), 3rd Party Labeling Vendor".into(),
                cross_border: "Metadata shared with HQ (China) for stats; Raw data stays in EU".into(),
                retention: "Raw data: 3 months; Anonymized data: 3 years".into(),
                security: "Disk encryption (LUKS), Access Control (IAM), No facial blurring on raw collection".into(),
            },
            Scenario::Office => Self {
                system_name: "Office Visitor Management System".into(),
                data_subject: "External Visitors, Interview Candidates".into(),
                data_type: "Name, Company, Phone, Email, Host Name, Time in/out".into(),
                purpose: "Physical security, Health & Safety compliance".into(),
                source: "iPad Kiosk at reception (Self-service)".into(),
                storage: "SaaS Vendor Cloud - Server in Ireland".into(),
                recipients: "Reception staff, HR (for interviews)".into(),
                cross_border: "Vendor support team access from USA (SCC signed)".into(),
                retention: "12 months".into(),
                security: "HTTPS, Password protected admin panel".into(),
            },
        }
    }
}

/// A submitted assessment: the ten answers plus attachments in upload order.
#[derive(Debug, Clone)]
pub struct AssessmentInput {
    pub fields: AssessmentFields,
    pub attachments: Vec<Attachment>,
}
