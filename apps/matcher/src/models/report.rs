use serde::{Deserialize, Serialize};

/// Response of `POST /docs/upload`: one report per submitted resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reports {
    #[serde(default)]
    pub reports: Vec<CandidateReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateReport {
    pub candidate_name: String,
    pub s3_files: ReportFiles,
}

/// Download links for the rendered report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFiles {
    pub docx: String,
    pub pdf: String,
}
