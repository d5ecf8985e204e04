//! Document endpoints: the matching upload and the diagnostics check.

use serde_json::{json, Value};
use tracing::info;

use crate::api_client::{ApiClient, ApiError, ApiRequest, MultipartBody};
use crate::errors::MatcherError;
use crate::models::{Reports, UserProfile};
use crate::upload::{PendingUpload, Submission};

pub const UPLOAD_PATH: &str = "/docs/upload";
pub const CHECK_TEST_PATH: &str = "/test/checkTest";

pub const JOB_DESCRIPTION_FIELD: &str = "jobDescription";
pub const RESUMES_FIELD: &str = "resumes";

#[derive(Clone)]
pub struct DocsService {
    client: ApiClient,
}

impl DocsService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Sends the job description and resumes for matching and returns one
    /// report per candidate.
    pub async fn upload(&self, submission: &Submission) -> Result<Reports, ApiError> {
        info!(
            "Uploading job description '{}' with {} resume(s)",
            submission.job_description.name,
            submission.resumes.len()
        );

        let reports: Reports = self
            .client
            .send(ApiRequest::post(UPLOAD_PATH).multipart(multipart_for(submission)))
            .await?
            .json()?;

        info!("Received {} report(s)", reports.reports.len());
        Ok(reports)
    }

    /// Uploads a complete selection and clears it once the backend accepts
    /// it. On any failure the selection is left as it was, ready to retry.
    pub async fn submit(&self, pending: &mut PendingUpload) -> Result<Reports, MatcherError> {
        let submission = pending.submission()?;
        let reports = self.upload(&submission).await?;
        pending.reset();
        Ok(reports)
    }

    /// Round-trips the current profile through the backend's test endpoint.
    pub async fn check_test(&self, user: &UserProfile) -> Result<Value, ApiError> {
        self.client
            .post_json(CHECK_TEST_PATH, &json!({ "user": user }))
            .await
    }
}

pub fn multipart_for(submission: &Submission) -> MultipartBody {
    submission.resumes.iter().fold(
        MultipartBody::new().file(JOB_DESCRIPTION_FIELD, &submission.job_description),
        |body, resume| body.file(RESUMES_FIELD, resume),
    )
}
