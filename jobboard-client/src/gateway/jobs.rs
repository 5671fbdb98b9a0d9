use shared::models::{CreateJobRequest, Job, JobApplication, JobApplicationRequest, Page};

use super::JobBoardClient;
use crate::error::GatewayResult;

impl JobBoardClient {
    /// One page of open job postings.
    ///
    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn list_jobs(&self, page: u32) -> GatewayResult<Page<Job>> {
        let url = self.api_url("jobs");
        self.send_page(self.http().get(url).query(&[("page", page)]))
            .await
    }

    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn get_job(&self, job_id: i64) -> GatewayResult<Job> {
        let url = self.api_url(&format!("jobs/{job_id}"));
        self.send_json(self.http().get(url)).await
    }

    /// Publish a job posting (employer accounts only).
    ///
    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn create_job(&self, request: &CreateJobRequest) -> GatewayResult<Job> {
        let url = self.api_url("jobs");
        self.send_json(self.http().post(url).json(request)).await
    }

    /// Submit an application for a job.
    ///
    /// # Errors
    /// Returns the classified gateway error when the request fails; a duplicate
    /// application is reported by the backend as a validation error.
    pub async fn apply_to_job(
        &self,
        request: &JobApplicationRequest,
    ) -> GatewayResult<JobApplication> {
        let url = self.api_url("job-application");
        self.send_json(self.http().post(url).json(request)).await
    }
}
