//! `portal` command-line client for the healthcare portal API.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use portal_client::config::ClientSettings;
use portal_client::domain::{
    Conversation, DoctorCredentials, DoctorRegistration, DocumentResponder, FileUploadService,
    KeywordResponder,
    PDF_CONTENT_TYPE, PatientCredentials, PatientProfile, PatientRecordsService,
    PatientRegistration, RemoteResponder, Responder, SessionHolder, UploadCandidate, UploadQueue,
};
use portal_client::outbound::http::PortalHttpClient;

const OCTET_STREAM: &str = "application/octet-stream";

/// `portal` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "portal",
    about = "Sign in to the healthcare portal and work with patient records",
    version
)]
struct Cli {
    /// Backend API root. Overrides `PORTAL_BASE_URL`.
    #[arg(long = "base-url", value_name = "url", global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Restore the session from the backend and print it.
    Profile,
    /// Sign in as a doctor.
    DoctorLogin(DoctorArgs),
    /// Sign in as a patient.
    PatientLogin(PatientArgs),
    /// Register a doctor account.
    RegisterDoctor {
        /// Display name.
        #[arg(long)]
        name: String,
        #[command(flatten)]
        account: DoctorArgs,
        /// Extra registration field as `key=value`; JSON values are parsed.
        #[arg(long = "field", value_name = "key=value", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Register a patient account.
    RegisterPatient {
        /// Display name.
        #[arg(long)]
        name: String,
        #[command(flatten)]
        account: PatientArgs,
        /// Extra registration field as `key=value`; JSON values are parsed.
        #[arg(long = "field", value_name = "key=value", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Print a patient's visits, tests, medications and files.
    Overview(PatientArgs),
    /// Upload PDF documents for a patient.
    Upload {
        #[command(flatten)]
        account: PatientArgs,
        /// Files to upload; only PDFs are accepted.
        #[arg(required = true, value_name = "file")]
        files: Vec<PathBuf>,
    },
    /// Ask the health assistant a question.
    Ask {
        /// Patient phone number; required unless `--offline`.
        #[arg(long)]
        phone: Option<String>,
        /// Patient password; required unless `--offline`.
        #[arg(long)]
        password: Option<String>,
        /// Answer locally from canned guidance.
        #[arg(long)]
        offline: bool,
        /// Ask about this document; repeat to select several. Offline only.
        #[arg(long = "document", value_name = "name", requires = "offline")]
        documents: Vec<String>,
        /// The question.
        question: String,
    },
}

#[derive(Debug, Args)]
struct DoctorArgs {
    /// Account email.
    #[arg(long)]
    email: String,
    /// Account password.
    #[arg(long)]
    password: String,
}

#[derive(Debug, Args)]
struct PatientArgs {
    /// Account phone number.
    #[arg(long)]
    phone: String,
    /// Account password.
    #[arg(long)]
    password: String,
}

type Holder = SessionHolder<PortalHttpClient>;

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.base_url)?;
    let client = Arc::new(
        PortalHttpClient::with_options(settings.base_url()?, settings.http_options())
            .wrap_err("build portal HTTP client")?,
    );
    let holder = SessionHolder::new(Arc::clone(&client));

    match cli.command {
        Command::Profile => {
            holder.initialize().await;
            print_json(&holder.snapshot())
        }
        Command::DoctorLogin(account) => {
            let credentials = DoctorCredentials::try_from_parts(&account.email, &account.password)?;
            let profile = holder.doctor_login(&credentials).await?;
            print_json(&profile)
        }
        Command::PatientLogin(account) => {
            let profile = patient_login(&holder, &account).await?;
            print_json(&profile)
        }
        Command::RegisterDoctor {
            name,
            account,
            fields,
        } => {
            let registration = fields.into_iter().try_fold(
                DoctorRegistration::try_new(&name, &account.email, &account.password)?,
                |form, (key, value)| form.with_field(&key, value),
            )?;
            print_json(&holder.register_doctor(&registration).await?)
        }
        Command::RegisterPatient {
            name,
            account,
            fields,
        } => {
            let registration = fields.into_iter().try_fold(
                PatientRegistration::try_new(&name, &account.phone, &account.password)?,
                |form, (key, value)| form.with_field(&key, value),
            )?;
            print_json(&holder.register_patient(&registration).await?)
        }
        Command::Overview(account) => {
            patient_login(&holder, &account).await?;
            let records = PatientRecordsService::new(Arc::clone(&client));
            let overview = records.overview_for(&holder.session()).await;
            sign_out(&holder).await;
            print_json(&overview?)
        }
        Command::Upload { account, files } => {
            patient_login(&holder, &account).await?;
            let status = upload(Arc::clone(&client), &files).await;
            sign_out(&holder).await;
            print_json(&status?)
        }
        Command::Ask {
            phone,
            password,
            offline,
            documents,
            question,
        } => {
            if offline && !documents.is_empty() {
                return converse(document_responder(documents), &question).await;
            }
            if offline {
                return converse(KeywordResponder::default(), &question).await;
            }
            let (Some(phone), Some(password)) = (phone, password) else {
                return Err(eyre!("--phone and --password are required unless --offline is set"));
            };
            let profile = patient_login(&holder, &PatientArgs { phone, password }).await?;
            let responder = RemoteResponder::new(Arc::clone(&client), profile.id);
            let outcome = converse(responder, &question).await;
            sign_out(&holder).await;
            outcome
        }
    }
}

fn load_settings(base_url: Option<String>) -> Result<ClientSettings> {
    let mut settings = ClientSettings::load_from_iter([OsString::from("portal")])
        .map_err(|err| eyre!("failed to load client settings: {err}"))?;
    if let Some(base_url) = base_url {
        settings.base_url = base_url;
    }
    Ok(settings)
}

async fn patient_login(holder: &Holder, account: &PatientArgs) -> Result<PatientProfile> {
    let credentials = PatientCredentials::try_from_parts(&account.phone, &account.password)?;
    Ok(holder.patient_login(&credentials).await?)
}

async fn sign_out(holder: &Holder) {
    let outcome = holder.logout().await;
    if !outcome.is_confirmed() {
        warn!("backend did not confirm logout");
    }
}

async fn upload(client: Arc<PortalHttpClient>, paths: &[PathBuf]) -> Result<Value> {
    let mut candidates = Vec::with_capacity(paths.len());
    for path in paths {
        candidates.push(read_candidate(path).await?);
    }

    let mut queue = UploadQueue::new();
    let rejected = queue.add(candidates);
    for name in &rejected {
        warn!(file = %name, "skipping file that is not a PDF");
    }

    let service = FileUploadService::new(client, Arc::new(DefaultClock));
    let status = service.upload(&mut queue).await;
    Ok(json!({
        "result": status,
        "rejected": rejected,
        "uploaded": queue.uploaded(),
    }))
}

async fn read_candidate(path: &Path) -> Result<UploadCandidate> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );
    let is_pdf = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"));
    let content_type = if is_pdf { PDF_CONTENT_TYPE } else { OCTET_STREAM };
    Ok(UploadCandidate::new(file_name, content_type, bytes))
}

fn document_responder(documents: Vec<String>) -> DocumentResponder<KeywordResponder> {
    let mut responder = DocumentResponder::new(KeywordResponder::documents());
    for name in documents {
        responder.toggle(name);
    }
    responder
}

async fn converse<R: Responder>(responder: R, question: &str) -> Result<()> {
    let mut conversation = Conversation::new(responder, Arc::new(DefaultClock));
    if conversation.ask(question).await?.is_none() {
        return Err(eyre!("question must not be blank"));
    }
    print_json(&conversation.messages())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).wrap_err("write JSON output")?;
    writeln!(stdout).wrap_err("write JSON output")?;
    Ok(())
}

fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("field key must not be empty".to_owned());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}
