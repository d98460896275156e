//! Companion CLI for operators: account provisioning and song moderation
//! against the same SQLite database the server uses.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sharedmelody_server::schema::VERSIONED_SCHEMAS;
use sharedmelody_server::song::{NewSong, SongVisibility};
use sharedmelody_server::user::auth::UsernamePasswordCredentials;
use sharedmelody_server::user::{UserAuthCredentialsStore, UserAuthCredentials};
use sharedmelody_server::{
    Database, SongStore, SqliteSongStore, SqliteUserStore, UserStore,
};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user account with a password.
    CreateUser { handle: String, password: String },

    /// Replaces an existing user's password.
    SetPassword { handle: String, password: String },

    /// Inserts a song, pending moderation unless --publish is given.
    AddSong {
        title: String,
        artist: String,
        #[clap(long)]
        genre: Option<String>,
        #[clap(long)]
        publish: bool,
    },

    /// Changes a song's moderation state.
    SetVisibility {
        song_id: i64,
        #[clap(value_enum)]
        visibility: VisibilityArg,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum VisibilityArg {
    Pending,
    Public,
    Hidden,
}

impl From<VisibilityArg> for SongVisibility {
    fn from(arg: VisibilityArg) -> Self {
        match arg {
            VisibilityArg::Pending => SongVisibility::Pending,
            VisibilityArg::Public => SongVisibility::Public,
            VisibilityArg::Hidden => SongVisibility::Hidden,
        }
    }
}

fn set_password(user_store: &SqliteUserStore, handle: &str, password: &str) -> Result<()> {
    let user_id = user_store
        .get_user_id(handle)?
        .with_context(|| format!("No user with handle {}", handle))?;
    let credentials = UsernamePasswordCredentials::from_plain_password(user_id, password)?;
    user_store.update_user_auth_credentials(UserAuthCredentials {
        user_id,
        handle: handle.to_string(),
        username_password: Some(credentials),
    })?;
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let db = Database::open(&cli_args.db_path, VERSIONED_SCHEMAS)?;
    let user_store = SqliteUserStore::new(db.clone());
    let song_store = SqliteSongStore::new(db);

    match cli_args.command {
        Command::CreateUser { handle, password } => {
            let user_id = user_store.create_user(&handle)?;
            set_password(&user_store, &handle, &password)?;
            println!("Created user {} with id {}", handle, user_id);
        }
        Command::SetPassword { handle, password } => {
            set_password(&user_store, &handle, &password)?;
            println!("Updated password for {}", handle);
        }
        Command::AddSong {
            title,
            artist,
            genre,
            publish,
        } => {
            let visibility = if publish {
                SongVisibility::Public
            } else {
                SongVisibility::Pending
            };
            let song_id = song_store.create_song(NewSong {
                title: title.clone(),
                artist,
                genre,
                visibility,
            })?;
            println!("Created song '{}' with id {}", title, song_id);
        }
        Command::SetVisibility { song_id, visibility } => {
            if !song_store.set_song_visibility(song_id, visibility.into())? {
                bail!("No song with id {}", song_id);
            }
            println!("Updated visibility of song {}", song_id);
        }
    }

    Ok(())
}
