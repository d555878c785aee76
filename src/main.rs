use clap::Parser;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use brainstorm_sync::cli::{self, Args, Input};
use brainstorm_sync::media::{submit_idea_with_media, HttpMediaUploader, MediaAttachment};
use brainstorm_sync::{BrainstormClient, ClientConfig, ServerEvent, SessionStore};

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_header(config: &ClientConfig, username: &str) {
    println!("{}", "BRAINSTORM".bright_cyan().bold());
    println!("{}: {}", "Server".bright_yellow(), config.ws_url());
    println!("{}: {}", "User".bright_yellow(), username.bright_white());
    println!("{}", "=".repeat(50).bright_blue());
    println!("{}", "Type /help for commands.".bright_green());
}

fn print_sessions(store: &SessionStore) {
    if store.sessions().is_empty() {
        println!("{}", "  no sessions yet".dimmed());
        return;
    }
    for s in store.sessions() {
        let marker = if store.current_session_id() == Some(s.id.as_str()) {
            "*".bright_green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {} {} ({} members, {} ideas)",
            marker,
            s.id.bright_white(),
            s.name.bright_cyan(),
            s.users.len(),
            s.ideas.len()
        );
    }
}

fn print_ideas(store: &SessionStore, config: &ClientConfig) {
    let Some(session) = store.current_session() else {
        println!("{}", "  not in a session".dimmed());
        return;
    };
    for q in &session.guiding_questions {
        println!("{} {}", "?".bright_magenta(), q);
    }
    if session.ideas.is_empty() {
        println!("{}", "  no ideas yet".dimmed());
    }
    for idea in &session.ideas {
        println!(
            "{} [{}] {} {}",
            idea.id.bright_white(),
            idea.media_kind(),
            idea.content,
            format!("({})", idea.submitted_by.username).dimmed()
        );
        if let Some(url) = &idea.media_url {
            println!("    {}", config.media_url(url).underline());
        }
        match idea.rating_averages() {
            Some(avg) => println!(
                "    novelty {:.1}  feasibility {:.1}  usefulness {:.1}  ({} ratings)",
                avg.novelty, avg.feasibility, avg.usefulness, avg.count
            ),
            None => println!("    {}", "unrated".dimmed()),
        }
    }
}

fn print_event(event: &ServerEvent, store: &SessionStore) {
    match event {
        ServerEvent::SessionsList(_) => print_sessions(store),
        ServerEvent::SessionCreated(s) => {
            println!("{} {} ({})", "created".bright_green(), s.name.bright_cyan(), s.id);
        }
        ServerEvent::SessionJoined { session_id } => {
            let name = store
                .session(session_id)
                .map(|s| s.name.as_str())
                .unwrap_or(session_id.as_str());
            println!("{} {}", "joined".bright_green(), name.bright_cyan());
        }
        ServerEvent::SessionUpdated(s) => {
            println!(
                "{} members: {}",
                s.name.bright_cyan(),
                s.member_names().join(", ")
            );
        }
        ServerEvent::SessionMessage(line) => {
            let who = line.username.as_deref().unwrap_or("?");
            println!("{}: {}", who.bright_yellow(), line.text);
        }
        ServerEvent::IdeaSubmitted(idea) => {
            println!(
                "{} {} {} {}",
                "idea".bright_magenta(),
                idea.id.bright_white(),
                idea.content,
                format!("({})", idea.submitted_by.username).dimmed()
            );
        }
        ServerEvent::IdeaRated { idea_id, rating } => {
            println!(
                "{} {} n={} f={} u={}",
                "rated".bright_magenta(),
                idea_id.bright_white(),
                rating.novelty,
                rating.feasibility,
                rating.usefulness
            );
        }
        ServerEvent::AggregationStarted => println!("{}", "aggregating ideas...".bright_blue()),
        ServerEvent::AggregationResult(summary) => {
            println!("{}", "Summary".bright_green().bold());
            println!("{summary}");
        }
        ServerEvent::AggregationError(e) => {
            println!("{} {}", "aggregation failed:".bright_red(), e);
        }
        ServerEvent::DiscussionStarted(text) => {
            println!("{}", "Discussion".bright_green().bold());
            println!("{text}");
        }
        ServerEvent::ServerError(e) => println!("{} {}", "server error:".bright_red(), e),
    }
}

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

/// Returns `false` when the user asked to quit.
async fn handle_line(
    client: &mut BrainstormClient,
    uploader: &HttpMediaUploader,
    line: &str,
) -> bool {
    let input = match cli::parse_line(line) {
        Ok(input) => input,
        Err(msg) => {
            eprintln!("{}", msg.bright_red());
            return true;
        }
    };
    let result = match input {
        Input::Empty => Ok(()),
        Input::Quit => return false,
        Input::Help => {
            println!("{}", cli::HELP);
            Ok(())
        }
        Input::ShowSessions => {
            print_sessions(&client.store());
            Ok(())
        }
        Input::ShowIdeas => {
            print_ideas(&client.store(), client.config());
            Ok(())
        }
        Input::Command(command) => client.execute(command).await,
        Input::Media { path, caption } => match MediaAttachment::from_path(&path).await {
            Ok(attachment) => {
                let content = if caption.is_empty() {
                    attachment.filename.clone()
                } else {
                    caption
                };
                submit_idea_with_media(client, uploader, &content, Some(&attachment)).await
            }
            Err(e) => Err(e),
        },
    };
    if let Err(e) = result {
        eprintln!("{} {}", "error:".bright_red(), e);
    }
    true
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("brainstorm_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.resolve_config()?;
    let username = config
        .username
        .clone()
        .ok_or("a username is required (--username or `username` in the config file)")?;

    let uploader = HttpMediaUploader::from_config(&config);
    let mut client = BrainstormClient::new(config);
    client.connect(&username).await?;
    print_header(client.config(), &username);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Some(event) => print_event(&event, &client.store()),
                None => {
                    eprintln!("{}", "connection closed".bright_red());
                    break;
                }
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_line(&mut client, &uploader, &line).await {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    client.disconnect().await;
    Ok(())
}
