//! Command-line interface: run the server, or drive the API as a client.

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use crate::api::types::{NewNote, NewUser, UpdateNote, UpdateUser};
use crate::api::{CachedClient, Client};
use crate::config::Config;
use crate::server;

#[derive(Parser, Debug)]
#[command(name = "notedesk")]
#[command(about = "A notes service with per-user assignment and a caching client")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/notedesk/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Run the HTTP API server
  Serve {
    /// Listen address, overriding the config file
    #[arg(short, long)]
    bind: Option<String>,
  },
  /// Operate on users
  Users {
    #[command(subcommand)]
    action: UserAction,
  },
  /// Operate on notes
  Notes {
    #[command(subcommand)]
    action: NoteAction,
  },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
  /// List all users
  List,
  /// Create a user
  Create {
    username: String,
    password: String,
    /// Role, repeatable (default: Employee)
    #[arg(short, long = "role")]
    roles: Vec<String>,
  },
  /// Replace a user's fields
  Update {
    id: String,
    username: String,
    /// Role, repeatable
    #[arg(short, long = "role")]
    roles: Vec<String>,
    /// Mark the account inactive
    #[arg(long)]
    inactive: bool,
    /// New password; omit to keep the current one
    #[arg(short, long)]
    password: Option<String>,
  },
  /// Delete a user without assigned notes
  Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
  /// List all notes, open ones first
  List,
  /// Create a note assigned to a user
  Create {
    /// Id of the owning user
    user: String,
    title: String,
    text: String,
  },
  /// Replace a note's fields
  Update {
    id: String,
    /// Id of the owning user
    user: String,
    title: String,
    text: String,
    /// Mark the note completed
    #[arg(short, long)]
    completed: bool,
  },
  /// Delete a note
  Delete { id: String },
}

pub async fn run(args: Args, config: Config) -> Result<()> {
  match args.command {
    Command::Serve { bind } => {
      let mut config = config;
      if let Some(bind) = bind {
        config.server.bind = bind;
      }
      server::serve(&config).await
    }
    Command::Users { action } => {
      let client = client_from(&config)?;
      run_user_action(&client, action).await
    }
    Command::Notes { action } => {
      let client = client_from(&config)?;
      run_note_action(&client, action).await
    }
  }
}

fn client_from(config: &Config) -> Result<CachedClient> {
  let client = Client::new(&config.client.url, Config::api_token())?;
  Ok(CachedClient::new(client))
}

async fn run_user_action(client: &CachedClient, action: UserAction) -> Result<()> {
  match action {
    UserAction::List => {
      let users = client.get_users().await?;
      for user in users.all() {
        let state = if user.active { "active" } else { "inactive" };
        println!(
          "{}  {}  [{}]  {}",
          user.id,
          user.username,
          user.roles.join(", "),
          state
        );
      }
    }
    UserAction::Create {
      username,
      password,
      roles,
    } => {
      let roles = if roles.is_empty() {
        vec!["Employee".to_string()]
      } else {
        roles
      };
      let message = client
        .create_user(NewUser::new(username, password, roles))
        .await?;
      println!("{message}");
    }
    UserAction::Update {
      id,
      username,
      roles,
      inactive,
      password,
    } => {
      let mut req = UpdateUser::new(id, username, roles, !inactive);
      if let Some(password) = password {
        req = req.with_password(password);
      }
      println!("{}", client.update_user(req).await?);
    }
    UserAction::Delete { id } => {
      println!("{}", client.delete_user(&id).await?);
    }
  }
  Ok(())
}

async fn run_note_action(client: &CachedClient, action: NoteAction) -> Result<()> {
  match action {
    NoteAction::List => {
      let notes = client.get_notes().await?;
      for note in notes.all() {
        let state = if note.completed { "done" } else { "open" };
        println!("{}  {}  {}  (user {})", note.id, state, note.title, note.user);
      }
    }
    NoteAction::Create { user, title, text } => {
      let message = client.create_note(NewNote::new(user, title, text)).await?;
      println!("{message}");
    }
    NoteAction::Update {
      id,
      user,
      title,
      text,
      completed,
    } => {
      let req = UpdateNote::new(id, user, title, text, completed);
      println!("{}", client.update_note(req).await?);
    }
    NoteAction::Delete { id } => {
      println!("{}", client.delete_note(&id).await?);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn command_definition_is_consistent() {
    Args::command().debug_assert();
  }

  #[test]
  fn parses_user_create_with_roles() {
    let args = Args::try_parse_from([
      "notedesk", "users", "create", "alice", "pw123456", "--role", "Manager",
    ])
    .unwrap();
    match args.command {
      Command::Users {
        action:
          UserAction::Create {
            username, roles, ..
          },
      } => {
        assert_eq!(username, "alice");
        assert_eq!(roles, vec!["Manager".to_string()]);
      }
      other => panic!("unexpected command: {other:?}"),
    }
  }

  #[test]
  fn parses_serve_with_bind_override() {
    let args =
      Args::try_parse_from(["notedesk", "serve", "--bind", "0.0.0.0:3500"]).unwrap();
    match args.command {
      Command::Serve { bind } => assert_eq!(bind.as_deref(), Some("0.0.0.0:3500")),
      other => panic!("unexpected command: {other:?}"),
    }
  }
}
