use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::Error,
    model::{Job, JobList},
    sites::ScraperKind,
    state::SharedAppState,
};

#[derive(serde::Deserialize, serde::Serialize, Debug, Validate)]
pub struct CreateJob {
    #[validate(url)]
    pub url: String,

    #[validate(custom(function = "validate_job_type"))]
    pub job_type: String,
}

fn validate_job_type(job_type: &str) -> Result<(), ValidationError> {
    job_type
        .parse::<ScraperKind>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_job_type"))
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct JobCreated {
    pub job_created: bool,
    pub job: Job,
}

#[tracing::instrument(name = "[POST] job", skip_all, fields(url = %payload.url, job_type = %payload.job_type))]
pub async fn store(
    State(app_state): State<SharedAppState>,
    Json(payload): Json<CreateJob>,
) -> Result<(StatusCode, Json<JobCreated>), Error> {
    payload.validate().map_err(Error::Validation)?;

    let kind: ScraperKind = payload
        .job_type
        .parse()
        .map_err(|e: crate::sites::ScrapeError| Error::Other(e.into()))?;
    if !app_state.scrapers.supports(kind.as_str()) {
        let mut errors = ValidationErrors::new();
        errors.add("job_type", ValidationError::new("unsupported_job_type"));
        return Err(Error::Validation(errors));
    }

    let job = app_state
        .jobs
        .submit_job(payload.url.trim(), kind.as_str())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(JobCreated {
            job_created: true,
            job,
        }),
    ))
}

#[tracing::instrument(name = "[GET] job", skip_all)]
pub async fn index(State(app_state): State<SharedAppState>) -> Result<Json<JobList>, Error> {
    let result = app_state.jobs.list_jobs().await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[GET] job/{id}", skip_all, fields(path.id = path.id))]
pub async fn show(
    State(app_state): State<SharedAppState>,
    Path(path): Path<UrlPath>,
) -> Result<Json<Job>, Error> {
    let result = app_state.jobs.get_job(path.id).await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[POST] job/{id}/retry", skip_all, fields(path.id = path.id))]
pub async fn retry(
    State(app_state): State<SharedAppState>,
    Path(path): Path<UrlPath>,
) -> Result<Json<Job>, Error> {
    let result = app_state.jobs.retry_job(path.id).await?;

    Ok(Json(result))
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct UrlPath {
    id: i64,
}
