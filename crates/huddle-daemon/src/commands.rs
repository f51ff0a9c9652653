//! Line commands read from standard input.
//!
//! The daemon has no UI of its own; whoever runs it reports view changes,
//! read and delete intents and alert responses as one command per line:
//!
//! ```text
//! view elsewhere | view messaging | view <chat>
//! read <chat> <subject>
//! delete <chat> <message> [<message>...]
//! accept <alert> | dismiss <alert>
//! enable | disable | quit
//! ```

use huddle_app::DriverEvent;
use huddle_client::{AlertId, AlertResponse, SyncEvent, ViewContext};
use huddle_proto::MessageId;

/// Parse one command line.
///
/// Blank lines and `#` comments yield `Ok(None)`.
///
/// # Errors
///
/// Returns a description of the problem if the line is not a command.
pub fn parse_command(line: &str) -> Result<Option<DriverEvent>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    if verb.starts_with('#') {
        return Ok(None);
    }
    let args: Vec<&str> = words.collect();

    let event = match (verb, args.as_slice()) {
        ("enable", []) => SyncEvent::Enable,
        ("disable", []) => SyncEvent::Disable,
        ("quit" | "exit", []) => return Ok(Some(DriverEvent::Shutdown)),
        ("view", ["elsewhere"]) => SyncEvent::ViewChanged(ViewContext::elsewhere()),
        ("view", ["messaging"]) => SyncEvent::ViewChanged(ViewContext::messaging()),
        ("view", [chat]) => SyncEvent::ViewChanged(ViewContext::focused(*chat)),
        ("read", [chat, subject]) => {
            SyncEvent::MarkAsRead { chat_id: (*chat).into(), subject_id: (*subject).into() }
        },
        ("delete", [chat, ids @ ..]) if !ids.is_empty() => SyncEvent::DeleteMessages {
            chat_id: (*chat).into(),
            message_ids: ids.iter().copied().map(MessageId::from).collect(),
        },
        ("accept", [id]) => {
            SyncEvent::AlertResolved { alert_id: parse_alert_id(id)?, response: AlertResponse::Accepted }
        },
        ("dismiss", [id]) => {
            SyncEvent::AlertResolved { alert_id: parse_alert_id(id)?, response: AlertResponse::Dismissed }
        },
        _ => return Err(format!("unrecognized command: {}", line.trim())),
    };

    Ok(Some(DriverEvent::Sync(event)))
}

/// Accepts both `alert-7` and `7`.
fn parse_alert_id(raw: &str) -> Result<AlertId, String> {
    let digits = raw.strip_prefix("alert-").unwrap_or(raw);
    digits.parse().map(AlertId).map_err(|_| format!("invalid alert id: {raw}"))
}
