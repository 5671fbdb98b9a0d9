use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use shared::{
    config::ClientConfig,
    models::{CreateJobRequest, Job, JobApplicationRequest, JobType},
};

use super::{authenticated_client, failed, or_dash};

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List open job offers
    List {
        #[arg(long, short, default_value_t = 1)]
        page: u32,
    },
    /// Show one job offer in full
    Show { job_id: i64 },
    /// Publish a job offer (employers)
    Create(CreateJobArgs),
    /// Apply to a job offer
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
pub struct CreateJobArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub location: Option<String>,
    /// full_time, part_time, internship, or freelance
    #[arg(long, value_parser = parse_job_type)]
    pub job_type: Option<JobType>,
    #[arg(long)]
    pub salary_range: Option<String>,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    pub job_id: i64,
    /// Cover letter text
    #[arg(long)]
    pub cover_letter: Option<String>,
    /// Reference to an uploaded CV
    #[arg(long)]
    pub cv: Option<String>,
}

fn parse_job_type(value: &str) -> Result<JobType, String> {
    value.parse().map_err(|err: &str| format!("{err}: `{value}`"))
}

pub async fn run(command: JobsCommand, config: &ClientConfig) -> Result<()> {
    let (client, _session) = authenticated_client(config)?;
    match command {
        JobsCommand::List { page } => {
            let page = client.list_jobs(page).await.map_err(failed("loading jobs"))?;
            if page.items.is_empty() {
                println!("No job offers right now.");
            }
            for job in &page.items {
                println!("{}", summary_line(job));
            }
            if page.has_more() {
                println!(
                    "page {} of {}; use --page {} for more",
                    page.current_page,
                    page.last_page,
                    page.current_page + 1
                );
            }
        }
        JobsCommand::Show { job_id } => {
            let job = client.get_job(job_id).await.map_err(failed("loading the job"))?;
            println!("{}", render_job(&job));
        }
        JobsCommand::Create(args) => {
            if args.title.trim().is_empty() || args.description.trim().is_empty() {
                bail!("title and description must not be empty");
            }
            let job = client
                .create_job(&CreateJobRequest {
                    title: args.title,
                    description: args.description,
                    location: args.location,
                    job_type: args.job_type,
                    salary_range: args.salary_range,
                })
                .await
                .map_err(failed("publishing the job"))?;
            println!("Published job #{}", job.id);
        }
        JobsCommand::Apply(args) => {
            let application = client
                .apply_to_job(&JobApplicationRequest {
                    job_id: args.job_id,
                    cover_letter: args.cover_letter,
                    cv_ref: args.cv,
                })
                .await
                .map_err(failed("applying"))?;
            println!(
                "Application #{} for job #{} submitted",
                application.id, application.job_id
            );
        }
    }
    Ok(())
}

fn summary_line(job: &Job) -> String {
    format!(
        "#{:<5} {} · {} · {}",
        job.id,
        job.title,
        or_dash(job.company_name.as_deref()),
        or_dash(job.location.as_deref())
    )
}

fn render_job(job: &Job) -> String {
    let job_type = job.job_type.map(|kind| kind.to_string());
    format!(
        "{}\ncompany:  {}\nlocation: {}\ntype:     {}\nsalary:   {}\nposted:   {}\n\n{}",
        job.title,
        or_dash(job.company_name.as_deref()),
        or_dash(job.location.as_deref()),
        or_dash(job_type.as_deref()),
        or_dash(job.salary_range.as_deref()),
        job.created_at.display_short(),
        job.description
    )
}
