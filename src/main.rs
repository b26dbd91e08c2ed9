use std::path::Path;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use tenderdesk::chat::ChatClient;
use tenderdesk::error::{ApiError, SessionError};
use tenderdesk::live;
use tenderdesk::resources::spaces::SpaceRole;
use tenderdesk::resources::{analysis, automations, spaces, tenders, users};
use tenderdesk::{ApiClient, ClientConfig, SessionManager};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing credentials; pass --email/--password or set TENDER_EMAIL/TENDER_PASSWORD")]
    MissingCredentials,
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {path}: {message}")]
    ReadInput { path: String, message: String },
}

#[derive(Parser, Debug)]
#[command(name = "tender", about = "Tenderdesk API and analysis CLI")]
struct Cli {
    #[arg(long, env = "TENDER_BACKEND_URL", default_value = "http://127.0.0.1:8000")]
    backend_url: String,

    #[arg(long, env = "TENDER_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "TENDER_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and print the resulting profile.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print the authenticated user's profile.
    Me,
    Space(SpaceCommand),
    Tender(TenderCommand),
    Doc(DocCommand),
    Automation(AutomationCommand),
    Analysis(AnalysisCommand),
    /// Send one message to the workspace assistant.
    Chat { message: String },
}

#[derive(Args, Debug)]
struct SpaceCommand {
    #[command(subcommand)]
    command: SpaceSubcommand,
}

#[derive(Subcommand, Debug)]
enum SpaceSubcommand {
    List,
    Create {
        #[arg(long, default_value = "Untitled Space")]
        name: String,
    },
    Read {
        space_id: Uuid,
    },
    Rename {
        space_id: Uuid,
        #[arg(long)]
        name: String,
    },
    Delete {
        space_id: Uuid,
    },
    Members {
        space_id: Uuid,
    },
    Invite {
        space_id: Uuid,
        #[arg(long)]
        email: String,
        #[arg(long, value_parser = parse_role, default_value = "viewer")]
        role: SpaceRole,
    },
    SetRole {
        space_id: Uuid,
        user_id: Uuid,
        #[arg(long, value_parser = parse_role)]
        role: SpaceRole,
    },
    RemoveMember {
        space_id: Uuid,
        user_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct TenderCommand {
    #[command(subcommand)]
    command: TenderSubcommand,
}

#[derive(Subcommand, Debug)]
enum TenderSubcommand {
    List {
        space_id: Uuid,
    },
    Create {
        space_id: Uuid,
        #[arg(long)]
        title: String,
    },
    Read {
        tender_id: Uuid,
    },
    Delete {
        tender_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct DocCommand {
    #[command(subcommand)]
    command: DocSubcommand,
}

#[derive(Subcommand, Debug)]
enum DocSubcommand {
    Upload {
        tender_id: Uuid,
        #[arg(long)]
        file: String,
    },
    List {
        tender_id: Uuid,
    },
    Delete {
        document_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct AutomationCommand {
    #[command(subcommand)]
    command: AutomationSubcommand,
}

#[derive(Subcommand, Debug)]
enum AutomationSubcommand {
    List,
}

#[derive(Args, Debug)]
struct AnalysisCommand {
    #[command(subcommand)]
    command: AnalysisSubcommand,
}

#[derive(Subcommand, Debug)]
enum AnalysisSubcommand {
    Run {
        tender_id: Uuid,
        #[arg(long)]
        automation_id: Uuid,
    },
    List {
        tender_id: Uuid,
    },
    Read {
        analysis_id: Uuid,
    },
    /// Follow an analysis until it reaches a terminal status.
    Watch {
        analysis_id: Uuid,
    },
}

fn parse_role(raw: &str) -> Result<SpaceRole, String> {
    match raw {
        "owner" => Ok(SpaceRole::Owner),
        "editor" => Ok(SpaceRole::Editor),
        "viewer" => Ok(SpaceRole::Viewer),
        other => Err(format!("unknown role '{other}' (expected owner, editor or viewer)")),
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    config.base_url = cli.backend_url.trim_end_matches('/').to_owned();

    let session = SessionManager::new(config)?;
    let api = ApiClient::new(session.clone());

    let Cli { email: cli_email, password: cli_password, command, .. } = cli;

    match command {
        Command::Signup { name, email, password } => {
            session.signup(&name, &email, &password).await?;
            print_json(&users::me(&api).await?)
        }
        Command::Me => {
            login(cli_email.as_deref(), cli_password.as_deref(), &session).await?;
            print_json(&users::me(&api).await?)
        }
        Command::Space(space) => {
            login(cli_email.as_deref(), cli_password.as_deref(), &session).await?;
            run_space(&api, space).await
        }
        Command::Tender(tender) => {
            login(cli_email.as_deref(), cli_password.as_deref(), &session).await?;
            run_tender(&api, tender).await
        }
        Command::Doc(doc) => {
            login(cli_email.as_deref(), cli_password.as_deref(), &session).await?;
            run_doc(&api, doc).await
        }
        Command::Automation(automation) => {
            login(cli_email.as_deref(), cli_password.as_deref(), &session).await?;
            match automation.command {
                AutomationSubcommand::List => print_json(&automations::list(&api).await?),
            }
        }
        Command::Analysis(command) => {
            login(cli_email.as_deref(), cli_password.as_deref(), &session).await?;
            run_analysis(&api, command).await
        }
        Command::Chat { message } => {
            login(cli_email.as_deref(), cli_password.as_deref(), &session).await?;
            let chat = ChatClient::new(api);
            let reply = chat.send(&message).await?;
            println!("{reply}");
            Ok(())
        }
    }
}

async fn login(
    email: Option<&str>,
    password: Option<&str>,
    session: &SessionManager,
) -> Result<(), CliError> {
    let email = email.ok_or(CliError::MissingCredentials)?;
    let password = password.ok_or(CliError::MissingCredentials)?;
    session.login(email, password).await?;
    Ok(())
}

async fn run_space(api: &ApiClient, space: SpaceCommand) -> Result<(), CliError> {
    match space.command {
        SpaceSubcommand::List => print_json(&spaces::list(api).await?),
        SpaceSubcommand::Create { name } => print_json(&spaces::create(api, &name).await?),
        SpaceSubcommand::Read { space_id } => print_json(&spaces::get(api, space_id).await?),
        SpaceSubcommand::Rename { space_id, name } => {
            print_json(&spaces::rename(api, space_id, &name).await?)
        }
        SpaceSubcommand::Delete { space_id } => {
            spaces::delete(api, space_id).await?;
            eprintln!("deleted space {space_id}");
            Ok(())
        }
        SpaceSubcommand::Members { space_id } => print_json(&spaces::members(api, space_id).await?),
        SpaceSubcommand::Invite { space_id, email, role } => {
            print_json(&spaces::invite(api, space_id, &email, role).await?)
        }
        SpaceSubcommand::SetRole { space_id, user_id, role } => {
            print_json(&spaces::set_role(api, space_id, user_id, role).await?)
        }
        SpaceSubcommand::RemoveMember { space_id, user_id } => {
            spaces::remove_member(api, space_id, user_id).await?;
            eprintln!("removed member {user_id} from space {space_id}");
            Ok(())
        }
    }
}

async fn run_tender(api: &ApiClient, tender: TenderCommand) -> Result<(), CliError> {
    match tender.command {
        TenderSubcommand::List { space_id } => print_json(&tenders::list(api, space_id).await?),
        TenderSubcommand::Create { space_id, title } => {
            print_json(&tenders::create(api, space_id, &title).await?)
        }
        TenderSubcommand::Read { tender_id } => print_json(&tenders::get(api, tender_id).await?),
        TenderSubcommand::Delete { tender_id } => {
            tenders::delete(api, tender_id).await?;
            eprintln!("deleted tender {tender_id}");
            Ok(())
        }
    }
}

async fn run_doc(api: &ApiClient, doc: DocCommand) -> Result<(), CliError> {
    match doc.command {
        DocSubcommand::Upload { tender_id, file } => {
            let bytes = std::fs::read(&file).map_err(|error| CliError::ReadInput {
                path: file.clone(),
                message: error.to_string(),
            })?;
            let filename = Path::new(&file)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("document.pdf");
            print_json(&tenders::upload_document(api, tender_id, filename, bytes).await?)
        }
        DocSubcommand::List { tender_id } => print_json(&tenders::documents(api, tender_id).await?),
        DocSubcommand::Delete { document_id } => {
            tenders::delete_document(api, document_id).await?;
            eprintln!("deleted document {document_id}");
            Ok(())
        }
    }
}

async fn run_analysis(api: &ApiClient, command: AnalysisCommand) -> Result<(), CliError> {
    match command.command {
        AnalysisSubcommand::Run { tender_id, automation_id } => {
            print_json(&analysis::run(api, tender_id, automation_id).await?)
        }
        AnalysisSubcommand::List { tender_id } => print_json(&analysis::list(api, tender_id).await?),
        AnalysisSubcommand::Read { analysis_id } => {
            print_json(&analysis::get(api, analysis_id).await?)
        }
        AnalysisSubcommand::Watch { analysis_id } => run_watch(api, analysis_id).await,
    }
}

/// Re-fetch the analysis on every change nudge until it settles.
async fn run_watch(api: &ApiClient, analysis_id: Uuid) -> Result<(), CliError> {
    let mut result = analysis::get(api, analysis_id).await?;
    let mut nudges = live::watch_analysis(api.session().base_url(), analysis_id).await?;

    while !result.status.is_terminal() {
        eprintln!("analysis {analysis_id}: {}", serde_json::to_string(&result.status)?);
        // A closed channel means the backend closed the stream; fall through
        // with the last status seen.
        if nudges.recv().await.is_none() {
            break;
        }
        result = analysis::get(api, analysis_id).await?;
    }

    print_json(&result)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
