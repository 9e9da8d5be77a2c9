//! Rendering retrieved records and conversation history into prompt text

use crate::models::ChatMessage;
use crate::models::Language;
use crate::models::Role;
use crate::models::ShelterRecord;

/// Number of recent messages included in the prompt
pub const HISTORY_WINDOW: usize = 6;

/// Render retrieved records as a numbered context block.
///
/// Metadata lines are emitted only for fields the record actually has, so
/// sparse scraped data produces shorter entries instead of empty labels.
#[must_use]
pub fn format_context(records: &[ShelterRecord], language: Language) -> String {
    if records.is_empty() {
        return match language {
            Language::Sv => "Ingen relevant skyddsrumsinformation hittades.".to_string(),
            Language::En => "No relevant shelter information was found.".to_string(),
        };
    }

    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let header = match language {
            Language::Sv => format!("[Källa {}]", index + 1),
            Language::En => format!("[Source {}]", index + 1),
        };
        out.push_str(&header);
        out.push('\n');
        out.push_str(record.document.trim());
        out.push('\n');

        let meta = &record.metadata;
        if let Some(name) = &meta.name {
            out.push_str(&label_line(language, "Namn", "Name", name));
        }
        if let Some(address) = &meta.address {
            out.push_str(&label_line(language, "Adress", "Address", address));
        }
        if let Some(capacity) = meta.capacity {
            let value = match language {
                Language::Sv => format!("{capacity} personer"),
                Language::En => format!("{capacity} people"),
            };
            out.push_str(&label_line(language, "Kapacitet", "Capacity", &value));
        }
        if let Some(district) = &meta.district {
            out.push_str(&label_line(language, "Stadsdel", "District", district));
        }
        if let Some(distance) = record.geo_distance_km {
            let value = format!("{distance:.1} km");
            out.push_str(&label_line(language, "Avstånd", "Distance", &value));
        }
    }
    out
}

fn label_line(language: Language, sv: &str, en: &str, value: &str) -> String {
    match language {
        Language::Sv => format!("{sv}: {value}\n"),
        Language::En => format!("{en}: {value}\n"),
    }
}

/// Render the tail of the conversation history for the prompt.
///
/// Only the most recent [`HISTORY_WINDOW`] user and assistant messages are
/// included; system messages are dropped, and older turns add prompt length
/// without improving answers.
#[must_use]
pub fn format_history(history: &[ChatMessage], language: Language) -> String {
    let recent: Vec<&ChatMessage> = history
        .iter()
        .filter(|message| message.role != Role::System)
        .rev()
        .take(HISTORY_WINDOW)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if recent.is_empty() {
        return match language {
            Language::Sv => "(Ingen tidigare konversation)".to_string(),
            Language::En => "(No previous conversation)".to_string(),
        };
    }

    let mut out = String::new();
    for message in recent {
        let label = match (language, message.role) {
            (Language::Sv, Role::User) => "Användare",
            (Language::Sv, _) => "Assistent",
            (Language::En, Role::User) => "User",
            (Language::En, _) => "Assistant",
        };
        out.push_str(label);
        out.push_str(": ");
        out.push_str(message.content.trim());
        out.push('\n');
    }
    out
}
