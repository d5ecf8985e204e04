use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;

use matcher::auth::guard::{HOME_PATH, LOGIN_PATH, SETTING_PATH};
use matcher::auth::{resolve, AuthStore, Navigation};
use matcher::docs::DocsService;
use matcher::errors::MatcherError;
use matcher::models::Reports;
use matcher::upload::{format_file_size, PendingUpload, SelectedFile};

#[derive(Debug, Parser)]
#[command(name = "matcher", version, about = "Match resumes against a job description")]
pub struct Cli {
    /// Backend base URL (overrides MATCHER_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Credential file (overrides MATCHER_STORAGE_PATH)
    #[arg(long, global = true, value_name = "FILE")]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Upload a job description and up to three resumes for matching
    Upload {
        #[arg(long = "job", value_name = "FILE")]
        job: PathBuf,
        #[arg(long = "resume", value_name = "FILE", required = true)]
        resumes: Vec<PathBuf>,
    },
    /// Send the current profile to the backend's test endpoint
    Check,
    /// Show where a screen path leads for the current session
    Route { path: String },
}

impl Commands {
    /// Screen the command stands in for. `None` runs regardless of session.
    fn route_path(&self) -> Option<&'static str> {
        match self {
            Commands::Login { .. } => Some(LOGIN_PATH),
            Commands::Whoami | Commands::Upload { .. } => Some(HOME_PATH),
            Commands::Check => Some(SETTING_PATH),
            Commands::Logout | Commands::Route { .. } => None,
        }
    }
}

pub async fn run(
    command: Commands,
    auth: &AuthStore,
    docs: &DocsService,
) -> Result<(), MatcherError> {
    if let Some(path) = command.route_path() {
        let snapshot = auth.snapshot();
        match resolve(path, snapshot.is_authenticated()) {
            Navigation::Render(route) => debug!("Rendering {}", route.title()),
            Navigation::Redirect(LOGIN_PATH) => return Err(MatcherError::NotSignedIn),
            Navigation::Redirect(_) => {
                let name = snapshot
                    .user
                    .as_ref()
                    .map(|user| user.display_name().to_string())
                    .unwrap_or_default();
                println!("Already signed in as {name}. Run `matcher logout` first.");
                return Ok(());
            }
        }
    }

    let result = match command {
        Commands::Login { email, password } => login(auth, &email, &password).await,
        Commands::Logout => {
            auth.logout();
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => {
            whoami(auth);
            Ok(())
        }
        Commands::Upload { job, resumes } => upload(docs, &job, &resumes).await,
        Commands::Check => check(auth, docs).await,
        Commands::Route { path } => {
            route(auth, &path);
            Ok(())
        }
    };

    // The client wipes storage when the session expires; keep the state in step.
    if let Err(MatcherError::Api(e)) = &result {
        if e.is_session_expired() {
            auth.sync_from_store();
        }
    }
    result
}

fn route(auth: &AuthStore, path: &str) {
    match resolve(path, auth.snapshot().is_authenticated()) {
        Navigation::Render(route) => println!("{} ({})", route.title(), route.path()),
        Navigation::Redirect(target) => println!("Redirect to {target}"),
    }
}

async fn login(auth: &AuthStore, email: &str, password: &str) -> Result<(), MatcherError> {
    let snapshot = auth.login(email, password).await?;
    let name = snapshot
        .user
        .as_ref()
        .map(|user| user.display_name())
        .unwrap_or("unknown user");
    println!("Signed in as {name}.");
    Ok(())
}

fn whoami(auth: &AuthStore) {
    let snapshot = auth.snapshot();
    let Some(user) = snapshot.user else {
        println!("Signed in, but no profile is stored.");
        return;
    };
    println!("Name:   {}", user.name().unwrap_or("-"));
    println!("Email:  {}", user.email().unwrap_or("-"));
    match user.tenant_id() {
        Some(id) => println!("School: {id}"),
        None => println!("School: -"),
    }
}

fn select_files(job: &Path, resumes: &[PathBuf]) -> Result<PendingUpload, MatcherError> {
    let mut pending = PendingUpload::new();
    pending.select_job_description(vec![SelectedFile::from_path(job)?])?;

    let batch = resumes
        .iter()
        .map(|path| SelectedFile::from_path(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    pending.add_resumes(batch)?;
    Ok(pending)
}

async fn upload(docs: &DocsService, job: &Path, resumes: &[PathBuf]) -> Result<(), MatcherError> {
    let mut pending = select_files(job, resumes)?;

    if let Some(file) = pending.job_description() {
        println!("Job description: {} ({})", file.name, format_file_size(file.size));
    }
    println!("Resumes:");
    for (i, file) in pending.resumes().iter().enumerate() {
        println!("  {}. {} ({})", i + 1, file.name, format_file_size(file.size));
    }

    println!("Uploading...");
    let reports = docs.submit(&mut pending).await?;
    println!("Files uploaded successfully!");
    print_reports(&reports);
    Ok(())
}

fn print_reports(reports: &Reports) {
    if reports.reports.is_empty() {
        println!("No reports were generated.");
        return;
    }
    println!();
    println!("Generated Reports");
    for report in &reports.reports {
        println!("  {}", report.candidate_name);
        println!("    DOCX: {}", report.s3_files.docx);
        println!("    PDF:  {}", report.s3_files.pdf);
    }
}

async fn check(auth: &AuthStore, docs: &DocsService) -> Result<(), MatcherError> {
    let user = auth.snapshot().user.unwrap_or_default();
    let response = docs.check_test(&user).await?;
    println!("Test checked successfully");
    let rendered = serde_json::to_string_pretty(&response).map_err(anyhow::Error::from)?;
    println!("{rendered}");
    Ok(())
}
