use std::path::PathBuf;

use clap::Parser;

use crate::commands::Command;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::model::RatingScores;

#[derive(Parser, Debug)]
#[command(name = "brainstorm")]
#[command(version)]
#[command(about = "Terminal client for collaborative brainstorming sessions")]
pub struct Args {
    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// WebSocket server URL (overrides the config file)
    #[arg(long)]
    pub server: Option<String>,

    /// Base URL for media uploads and links (overrides the config file)
    #[arg(long)]
    pub media_base: Option<String>,

    /// Name shown to other participants
    #[arg(long, short)]
    pub username: Option<String>,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(base) = &self.media_base {
            config.media_base_url = base.clone();
        }
        if let Some(name) = &self.username {
            config.username = Some(name.clone());
        }
        Ok(config)
    }
}

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// Upload a file, then submit it as an idea.
    Media { path: PathBuf, caption: String },
    ShowIdeas,
    ShowSessions,
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
/list                          refresh the session list
/sessions                      show known sessions
/create <name> | <q1> | <q2>   create a session with guiding questions
/join <session-id>             join a session
/leave                         leave the current session
/idea <text>                   submit a text idea
/media <path> [caption]        upload a file and submit it as an idea
/rate <idea-id> <n> <f> <u> [comment]
                               rate novelty, feasibility, usefulness (1-5)
/ideas                         show ideas and average ratings
/aggregate                     ask the server to aggregate ideas
/discuss                       start the discussion phase
/quit                          exit
<text>                         chat in the current session";

/// Parse a line of input. Errors are messages for the user.
pub fn parse_line(line: &str) -> std::result::Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Input::Command(Command::Chat {
            text: line.to_string(),
        }));
    };
    let (verb, arg) = match rest.split_once(char::is_whitespace) {
        Some((v, a)) => (v, a.trim()),
        None => (rest, ""),
    };

    let input = match verb {
        "list" => Input::Command(Command::ListSessions),
        "sessions" => Input::ShowSessions,
        "create" => {
            let mut parts = arg.split('|').map(str::trim);
            let name = parts.next().unwrap_or("");
            if name.is_empty() {
                return Err("usage: /create <name> | <question> | ...".into());
            }
            let guiding_questions: Vec<String> = parts
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .collect();
            if guiding_questions.is_empty() {
                return Err("at least one guiding question is required".into());
            }
            Input::Command(Command::CreateSession {
                name: name.to_string(),
                guiding_questions,
            })
        }
        "join" => {
            if arg.is_empty() {
                return Err("usage: /join <session-id>".into());
            }
            Input::Command(Command::JoinSession {
                session_id: arg.to_string(),
            })
        }
        "leave" => Input::Command(Command::LeaveSession),
        "idea" => {
            if arg.is_empty() {
                return Err("usage: /idea <text>".into());
            }
            Input::Command(Command::text_idea(arg))
        }
        "media" => {
            let (path, caption) = match arg.split_once(char::is_whitespace) {
                Some((p, c)) => (p, c.trim()),
                None => (arg, ""),
            };
            if path.is_empty() {
                return Err("usage: /media <path> [caption]".into());
            }
            Input::Media {
                path: PathBuf::from(path),
                caption: caption.to_string(),
            }
        }
        "rate" => parse_rating(arg)?,
        "ideas" => Input::ShowIdeas,
        "aggregate" => Input::Command(Command::AggregateIdeas),
        "discuss" => Input::Command(Command::StartDiscussion),
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '/{other}' (try /help)")),
    };
    Ok(input)
}

fn parse_rating(arg: &str) -> std::result::Result<Input, String> {
    const USAGE: &str = "usage: /rate <idea-id> <novelty> <feasibility> <usefulness> [comment]";
    let mut words = arg.splitn(5, char::is_whitespace);
    let idea_id = words.next().filter(|s| !s.is_empty()).ok_or(USAGE)?;
    let mut score = || -> std::result::Result<u8, String> {
        words
            .next()
            .and_then(|w| w.parse::<u8>().ok())
            .ok_or_else(|| USAGE.to_string())
    };
    let (n, f, u) = (score()?, score()?, score()?);
    let mut scores = RatingScores::new(n, f, u);
    if !scores.in_range() {
        return Err("scores must be between 1 and 5".into());
    }
    if let Some(comment) = words.next().map(str::trim).filter(|c| !c.is_empty()) {
        scores = scores.with_comment(comment);
    }
    Ok(Input::Command(Command::RateIdea {
        idea_id: idea_id.to_string(),
        scores,
    }))
}
