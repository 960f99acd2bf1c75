use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use notes_service::id::ObjectId;
use notes_service::models::{CreateNoteRequest, Note, NoteOwner, PopulatedNote, UpdateNoteRequest};
use notes_service::user_models::{CreateUserRequest, NoteSummary, UserResponse};
use prettytable::{Cell, Row, Table};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "A CLI tool for managing notes", long_about = None)]
struct Cli {
    #[arg(
        long,
        env = "NOTES_API_URL",
        default_value = "http://localhost:3001",
        help = "Base URL of the notes server"
    )]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List all notes")]
    List,

    #[command(about = "Show a single note")]
    Show {
        #[arg(help = "Note ID")]
        id: String,
    },

    #[command(about = "Create a new note")]
    Create {
        #[arg(short, long, help = "The note text")]
        content: String,

        #[arg(short, long, help = "Mark the note as important")]
        important: bool,

        #[arg(short, long, help = "Owning user ID")]
        user: Option<String>,
    },

    #[command(about = "Update a note's content or importance")]
    Update {
        #[arg(help = "Note ID")]
        id: String,

        #[arg(short, long, help = "New note text")]
        content: Option<String>,

        #[arg(short, long, help = "New importance (true/false)")]
        important: Option<bool>,
    },

    #[command(about = "Delete a note")]
    Delete {
        #[arg(help = "Note ID")]
        id: String,
    },

    #[command(about = "Create a new user account")]
    Signup {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Display name")]
        name: Option<String>,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "List users and their notes")]
    Users,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_command(&cli.url, cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_command(base: &str, command: Commands) -> Result<()> {
    let client = Client::new();
    let base = base.trim_end_matches('/');

    match command {
        Commands::List => list_notes(&client, base).await,
        Commands::Show { id } => show_note(&client, base, &id).await,
        Commands::Create {
            content,
            important,
            user,
        } => create_note(&client, base, content, important, user).await,
        Commands::Update {
            id,
            content,
            important,
        } => update_note(&client, base, &id, content, important).await,
        Commands::Delete { id } => delete_note(&client, base, &id).await,
        Commands::Signup {
            username,
            name,
            password,
        } => signup(&client, base, username, name, password).await,
        Commands::Users => list_users(&client, base).await,
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<Response> {
    request
        .send()
        .await
        .context("Failed to connect to notes server. Is the server running?")
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        bail!("{}", message);
    }
    response.json().await.context("Failed to parse response")
}

async fn list_notes(client: &Client, base: &str) -> Result<()> {
    let response = send(client.get(format!("{}/api/notes", base))).await?;
    let notes: Vec<PopulatedNote> = parse(response).await?;

    if notes.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    println!("\nNotes ({})\n", notes.len());

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Content"),
        Cell::new("Important"),
        Cell::new("Date"),
        Cell::new("User"),
    ]));

    for note in notes {
        let owner = match note.user {
            Some(NoteOwner::Resolved(user)) => user.username,
            Some(NoteOwner::Dangling(id)) => id.to_string(),
            None => "-".to_string(),
        };

        table.add_row(Row::new(vec![
            Cell::new(&note.id.to_string()),
            Cell::new(&note.content),
            Cell::new(if note.important { "yes" } else { "no" }),
            Cell::new(&note.date.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(&owner),
        ]));
    }

    table.printstd();
    println!();

    Ok(())
}

async fn show_note(client: &Client, base: &str, id: &str) -> Result<()> {
    let response = send(client.get(format!("{}/api/notes/{}", base, id))).await?;
    if response.status() == StatusCode::NOT_FOUND {
        bail!("Note {} not found", id);
    }
    let note: Note = parse(response).await?;
    print_note(&note);
    Ok(())
}

async fn create_note(
    client: &Client,
    base: &str,
    content: String,
    important: bool,
    user: Option<String>,
) -> Result<()> {
    let payload = CreateNoteRequest {
        content: Some(content),
        important: Some(important),
        user_id: user,
    };

    let response = send(client.post(format!("{}/api/notes", base)).json(&payload)).await?;
    let note: Note = parse(response).await?;

    println!("Note created successfully!");
    print_note(&note);
    Ok(())
}

async fn update_note(
    client: &Client,
    base: &str,
    id: &str,
    content: Option<String>,
    important: Option<bool>,
) -> Result<()> {
    if content.is_none() && important.is_none() {
        bail!("Nothing to update: pass --content and/or --important");
    }

    let payload = UpdateNoteRequest { content, important };
    let response = send(client.put(format!("{}/api/notes/{}", base, id)).json(&payload)).await?;
    if response.status() == StatusCode::NOT_FOUND {
        bail!("Note {} not found", id);
    }
    let note: Note = parse(response).await?;

    println!("Note updated successfully!");
    print_note(&note);
    Ok(())
}

async fn delete_note(client: &Client, base: &str, id: &str) -> Result<()> {
    let response = send(client.delete(format!("{}/api/notes/{}", base, id))).await?;
    if !response.status().is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "Unknown error".to_string(),
        };
        bail!("Failed to delete note: {}", message);
    }

    println!("Note {} deleted.", id);
    Ok(())
}

async fn signup(
    client: &Client,
    base: &str,
    username: String,
    name: Option<String>,
    password: String,
) -> Result<()> {
    let payload = CreateUserRequest {
        username: Some(username),
        name,
        password: Some(password),
    };

    let user: UserResponse<ObjectId> =
        parse(send(client.post(format!("{}/api/users", base)).json(&payload)).await?).await?;

    println!("Account created successfully!");
    println!("   Username: {}", user.username);
    println!("   User ID: {}", user.id);
    Ok(())
}

async fn list_users(client: &Client, base: &str) -> Result<()> {
    let users: Vec<UserResponse<NoteSummary>> =
        parse(send(client.get(format!("{}/api/users", base))).await?).await?;

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    for user in users {
        match user.name {
            Some(name) => println!("{} ({}) [{}]", user.username, name, user.id),
            None => println!("{} [{}]", user.username, user.id),
        }
        for note in user.notes {
            println!("   - {}{}", note.content, if note.important { " *" } else { "" });
        }
    }

    Ok(())
}

fn print_note(note: &Note) {
    println!("   ID: {}", note.id);
    println!("   Content: {}", note.content);
    println!("   Important: {}", note.important);
    println!("   Date: {}", note.date.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z"));
    if let Some(user) = note.user {
        println!("   User: {}", user);
    }
}
