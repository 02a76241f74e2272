//! Runtime configuration, read from `RB_*` environment variables
//! (a `.env` file is loaded first when present).

use std::path::PathBuf;

use rb_core::{AppError, BoardConfig, Identity, PageState, PostId};

#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub board: BoardConfig,
    pub page: PageState,
    pub identity: Identity,
}

impl LiveConfig {
    pub fn from_env() -> rb_core::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> rb_core::Result<Self> {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let thread = match lookup("RB_THREAD") {
            Some(raw) => raw
                .trim()
                .parse::<PostId>()
                .map_err(|e| AppError::config("RB_THREAD", e.to_string()))?,
            None => 0,
        };

        Ok(Self {
            database_url: string("RB_DATABASE_URL", "sqlite::memory:"),
            upload_dir: PathBuf::from(string("RB_UPLOAD_DIR", "./data/uploads")),
            board: BoardConfig {
                text_only: flag(&lookup, "RB_TEXT_ONLY")?,
                forced_anon: flag(&lookup, "RB_FORCED_ANON")?,
            },
            page: PageState {
                board: string("RB_BOARD", "b"),
                thread,
            },
            identity: Identity {
                name: string("RB_NAME", ""),
                password: string("RB_PASSWORD", ""),
                sage: flag(&lookup, "RB_SAGE")?,
            },
        })
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> rb_core::Result<bool> {
    let Some(raw) = lookup(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => Err(AppError::config(key, format!("expected a boolean, got {other:?}"))),
    }
}
