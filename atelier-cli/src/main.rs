//! atelier-cli: terminal client for the Atelier shopping assistant
//!
//! # Subcommands
//! - `status`                                 show server health
//! - `login <username-or-email> <password>`   check credentials, print the user id
//! - `chat --user-id <id>`                    interactive conversation (`/reset`, `/quit`)

use std::io::{self, BufRead, Write};
use std::time::Duration;

use atelier_core::api::{ChatRequest, ChatResponse, LoginRequest, LoginResponse};
use atelier_core::{ChatMessage, RelevantData};
use clap::{Parser, Subcommand};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "atelier-cli", version, about = "Talk to the Atelier shopping assistant")]
struct Cli {
    /// Atelier HTTP server URL (overrides ATELIER_HTTP_URL env var)
    #[arg(long, env = "ATELIER_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show server status
    Status,

    /// Check a username or email and password
    Login {
        username_or_email: String,
        password: String,
    },

    /// Start an interactive chat
    Chat {
        /// User id returned by `login`
        #[arg(long)]
        user_id: i64,

        /// Print the carried context after every reply
        #[arg(long)]
        show_context: bool,
    },
}

// ============================================================================
// Chat session
// ============================================================================

/// What to do with one line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum LineAction {
    Send,
    Reset,
    Quit,
    Skip,
}

pub fn classify_line(line: &str) -> LineAction {
    match line.trim() {
        "" => LineAction::Skip,
        "/quit" | "/exit" => LineAction::Quit,
        "/reset" => LineAction::Reset,
        _ => LineAction::Send,
    }
}

/// Conversation history and carried context, replaced wholesale by each reply.
#[derive(Debug, Default)]
pub struct ChatSession {
    pub user_id: i64,
    pub messages: Vec<ChatMessage>,
    pub relevant_data: RelevantData,
}

impl ChatSession {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn request_for(&self, input: &str) -> ChatRequest {
        let mut messages = self.messages.clone();
        messages.push(ChatMessage::user(input.trim()));
        ChatRequest {
            messages,
            user_id: self.user_id,
            relevant_data: self.relevant_data.clone(),
        }
    }

    /// Store the server's view and return the agent replies added this turn.
    pub fn absorb(&mut self, response: ChatResponse) -> Vec<ChatMessage> {
        let sent = self.messages.len() + 1;
        let replies = response.messages.iter().skip(sent).cloned().collect();
        self.messages = response.messages;
        self.relevant_data = response.relevant_data;
        replies
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.relevant_data = RelevantData::default();
    }
}

pub fn format_reply(message: &ChatMessage) -> String {
    format!("[{}] {}", message.role, message.content)
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    match client(10)?.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Atelier server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("SQLite:         {}", body["sqlite"].as_str().unwrap_or("?"));
            println!(
                "Rows:           {} users, {} products, {} orders",
                body["users"], body["products"], body["orders"]
            );
        }
        Ok(r) => {
            eprintln!("atelier-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("atelier-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn do_login(server: &str, username_or_email: String, password: String) -> anyhow::Result<()> {
    let request = LoginRequest {
        username_or_email,
        password,
    };
    let response: LoginResponse = client(10)?
        .post(format!("{}/login", server))
        .json(&request)
        .send()?
        .json()?;

    match response.user_id {
        Some(id) if response.success => println!("{} (user id {})", response.msg, id),
        _ => {
            eprintln!("atelier-cli: {}", response.msg);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn do_chat(server: &str, user_id: i64, show_context: bool) -> anyhow::Result<()> {
    // Turns wait on the language model, which can be slow on small machines.
    let http = client(180)?;
    let url = format!("{}/chat", server);
    let mut session = ChatSession::new(user_id);

    println!("Chatting as user {}. Type /reset to start over, /quit to leave.", user_id);
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match classify_line(&line) {
            LineAction::Skip => continue,
            LineAction::Quit => break,
            LineAction::Reset => {
                session.reset();
                println!("(conversation cleared)");
                continue;
            }
            LineAction::Send => {}
        }

        let resp = match http.post(&url).json(&session.request_for(&line)).send() {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                let status = r.status();
                eprintln!("atelier-cli: server returned {}: {}", status, r.text().unwrap_or_default());
                continue;
            }
            Err(e) => {
                eprintln!("atelier-cli: request to {} failed: {}", url, e);
                continue;
            }
        };

        let response: ChatResponse = resp.json()?;
        for reply in session.absorb(response) {
            println!("{}", format_reply(&reply));
        }
        if show_context {
            println!("{}", serde_json::to_string_pretty(&session.relevant_data)?);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Status => do_status(&server),
        Commands::Login {
            username_or_email,
            password,
        } => do_login(&server, username_or_email, password),
        Commands::Chat { user_id, show_context } => do_chat(&server, user_id, show_context),
    };

    if let Err(e) = result {
        eprintln!("atelier-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
