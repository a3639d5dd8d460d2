use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CliError;

/// One failure reported alongside (possibly stale) data.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

/// JSON document printed for every command.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub request_id: String,
    pub command: &'static str,
    pub generated_at: String,
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<ErrorEntry>,
}

impl Envelope {
    pub fn new(
        command: &'static str,
        data: Value,
        warnings: Vec<String>,
        errors: Vec<ErrorEntry>,
    ) -> Self {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            request_id: Uuid::new_v4().to_string(),
            command,
            generated_at,
            data,
            warnings,
            errors,
        }
    }
}

pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{payload}")?;
    stdout.flush()?;
    Ok(())
}

