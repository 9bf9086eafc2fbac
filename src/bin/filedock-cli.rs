use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use futures_util::future::BoxFuture;
use serde_json::Value;

use filedock::auth::panel::{change_password, PasswordPrompt, PromptReply, VerifierSubmitter};
use filedock::auth::{AuthError, SrpParameters, VerifierRecord};

#[derive(Parser)]
#[command(name = "filedock-cli")]
#[command(about = "User panel CLI for the filedock server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// API mount point; must match the server configuration.
    #[arg(long, default_value = "/~/api")]
    api_prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status
    Status,
    /// Change the password of an account (never transmits the password)
    ChangePassword {
        #[arg(short = 'n', long)]
        username: String,
    },
}

/// Prompts on the terminal; an empty line cancels.
struct StdinPrompt;

impl PasswordPrompt for StdinPrompt {
    fn prompt(&mut self, message: &str) -> PromptReply {
        print!("{message}: ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(_) => {
                let input = line.trim_end_matches(['\r', '\n']).to_string();
                if input.is_empty() {
                    PromptReply::Cancelled
                } else {
                    PromptReply::Input(input)
                }
            }
            Err(_) => PromptReply::Cancelled,
        }
    }
}

/// Submits derived records over the authenticated API session.
struct ApiSubmitter {
    client: reqwest::Client,
    api_base: String,
}

impl VerifierSubmitter for ApiSubmitter {
    fn submit<'a>(
        &'a mut self,
        _username: &'a str,
        record: &'a VerifierRecord,
    ) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(async move {
            let res = self
                .client
                .post(format!("{}/change_my_srp", self.api_base))
                .json(&serde_json::json!({
                    "salt": hex::encode(&record.salt),
                    "verifier": record.verifier,
                }))
                .send()
                .await
                .map_err(|e| AuthError::Rejected(e.to_string()))?;

            if res.status().is_success() {
                Ok(())
            } else {
                let body: Value = res.json().await.unwrap_or_default();
                let message = body["error"].as_str().unwrap_or("request failed").to_string();
                Err(AuthError::Rejected(message))
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let api_base = format!("{}{}", cli.url.trim_end_matches('/'), cli.api_prefix);
    let client = reqwest::Client::builder().cookie_store(true).build()?;

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{api_base}/get_status")).send().await?;
            print_response(res).await?;
        }
        Commands::ChangePassword { username } => {
            // Rotation requires an authenticated session first.
            let mut prompt = StdinPrompt;
            let current = match prompt.prompt("Current password") {
                PromptReply::Input(p) => p,
                PromptReply::Cancelled => {
                    eprintln!("Cancelled.");
                    return Ok(());
                }
            };
            let res = client
                .post(format!("{api_base}/login"))
                .json(&serde_json::json!({ "username": username, "password": current }))
                .send()
                .await?;
            if !res.status().is_success() {
                let body: Value = res.json().await.unwrap_or_default();
                eprintln!("Login failed: {}", body["error"].as_str().unwrap_or("unknown error"));
                return Ok(());
            }

            let params = SrpParameters::default();
            let mut submitter = ApiSubmitter { client, api_base };
            match change_password(&params, &username, &mut prompt, &mut submitter).await {
                Ok(()) => println!("Password changed."),
                Err(AuthError::Cancelled) => println!("Cancelled, nothing changed."),
                Err(AuthError::Mismatch) => {
                    println!("The second password did not match the first. Nothing changed.")
                }
                Err(e) => println!("Password change failed: {e}"),
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
