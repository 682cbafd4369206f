pub mod assessment;
pub mod report;

pub use assessment::{
    ACCEPTED_EXTENSIONS, AssessmentFields, AssessmentInput, Attachment, FIELD_LABELS, Scenario,
};
pub use report::{GeneratedReport, ReportSection, RiskLevel, UsageRecord};
