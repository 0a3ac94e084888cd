use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod auth;
mod contacts;
mod prompt;
mod recognize;
mod report;

use app::App;

#[derive(Parser)]
#[command(name = "memorie", about = "Face-recognition memory aid", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register(auth::RegisterArgs),
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and clear every cached record
    Logout,
    /// Show the signed-in user's profile
    Profile {
        /// Fetch the profile from the backend instead of the local copy
        #[arg(long)]
        remote: bool,
    },
    /// Print who is signed in, if anyone
    Whoami,
    /// Manage trusted contacts
    #[command(subcommand)]
    Contacts(ContactsCommand),
    /// Capture a face and check whether you remember them
    Recognize {
        /// Use a JPEG file instead of the camera
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// V4L2 device path (default: MEMORIE_CAMERA_DEVICE or /dev/video0)
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Show today's sightings
    Today,
    /// Show memory scores per contact
    Insights,
    /// Manage the recognition log
    #[command(subcommand)]
    Logs(LogsCommand),
    /// Show configuration, session and camera status
    Status,
}

#[derive(Subcommand)]
enum ContactsCommand {
    /// List cached contacts
    List {
        /// Filter by name or relationship
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Replace the cache with the backend's trusted contacts
    Refresh,
    /// Create a trusted contact on the backend
    Add(contacts::AddArgs),
    /// Edit a cached contact
    Edit(contacts::EditArgs),
    /// Remove a cached contact
    Delete {
        id: String,
    },
    /// Show one contact
    Show {
        id: String,
    },
}

#[derive(Subcommand)]
enum LogsCommand {
    /// Delete every recognition log entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let app = App::load()?;

    match cli.command {
        Commands::Register(args) => auth::register(&app, args).await?,
        Commands::Login { email, password } => auth::login(&app, email, password).await?,
        Commands::Logout => auth::logout(&app).await?,
        Commands::Profile { remote } => auth::profile(&app, remote).await?,
        Commands::Whoami => auth::whoami(&app),
        Commands::Contacts(cmd) => match cmd {
            ContactsCommand::List { search } => contacts::list(&app, search.as_deref()).await?,
            ContactsCommand::Refresh => contacts::refresh(&app).await?,
            ContactsCommand::Add(args) => contacts::add(&app, args).await?,
            ContactsCommand::Edit(args) => contacts::edit(&app, args)?,
            ContactsCommand::Delete { id } => contacts::delete(&app, &id)?,
            ContactsCommand::Show { id } => contacts::show(&app, &id)?,
        },
        Commands::Recognize { image, device } => recognize::run(&app, image, device).await?,
        Commands::Today => report::today(&app)?,
        Commands::Insights => report::insights(&app)?,
        Commands::Logs(LogsCommand::Clear) => {
            app.require_signed_in()?;
            app.store.clear_recognition_logs();
            println!("Recognition log cleared");
        }
        Commands::Status => report::status(&app),
    }

    Ok(())
}
