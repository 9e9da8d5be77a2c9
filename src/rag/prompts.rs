//! Prompt templates and assembly
//!
//! Templates use `{placeholder}` markers. A marker with no supplied value is
//! a programmer error (template and assembly code drifted apart) and panics
//! rather than silently shipping a broken prompt.

use crate::models::ChatMessage;
use crate::models::Language;
use crate::models::ResolvedLocation;
use crate::models::ShelterRecord;
use crate::rag::context;

const SYSTEM_PROMPT_SV: &str = "\
Du är en hjälpsam assistent som svarar på frågor om skyddsrum i Uppsala.

Det finns totalt {total_shelters} registrerade skyddsrum i Uppsala kommun.
Nedan följer {context_count} utdrag ur skyddsrumsregistret som är mest \
relevanta för frågan.

Underlag:
{context}

Tidigare konversation:
{history}

Fråga: {question}

Svara på svenska, kortfattat och konkret. Använd endast informationen i \
underlaget ovan. Om underlaget inte räcker för att svara, säg det istället \
för att gissa.{location_note}";

const SYSTEM_PROMPT_EN: &str = "\
You are a helpful assistant answering questions about emergency shelters \
in Uppsala, Sweden.

There are {total_shelters} registered shelters in Uppsala municipality in \
total. Below are the {context_count} register excerpts most relevant to \
the question.

Context:
{context}

Previous conversation:
{history}

Question: {question}

Answer in English, briefly and concretely. Use only the information in the \
context above. If the context is not enough to answer, say so instead of \
guessing.{location_note}";

/// Build the full generation prompt for one chat turn.
#[must_use]
pub fn assemble(
    language: Language,
    question: &str,
    history: &[ChatMessage],
    records: &[ShelterRecord],
    total_shelters: usize,
    location: Option<&ResolvedLocation>,
) -> String {
    let template = match language {
        Language::Sv => SYSTEM_PROMPT_SV,
        Language::En => SYSTEM_PROMPT_EN,
    };
    let values = [
        ("total_shelters", total_shelters.to_string()),
        ("context_count", records.len().to_string()),
        ("location_note", location_note(language, location)),
        ("context", context::format_context(records, language)),
        ("history", context::format_history(history, language)),
        ("question", question.trim().to_string()),
    ];
    render_template(template, &values)
}

/// Note about the user's resolved location, appended after the instructions.
/// Empty when the turn has no location.
fn location_note(language: Language, location: Option<&ResolvedLocation>) -> String {
    let Some(location) = location else {
        return String::new();
    };
    match language {
        Language::Sv => format!(
            "\n\nAnvändaren befinner sig vid {} ({:.4}, {:.4}). Ange avstånd till \
             skyddsrummen när underlaget innehåller dem.",
            location.place_name, location.latitude, location.longitude
        ),
        Language::En => format!(
            "\n\nThe user is at {} ({:.4}, {:.4}). Mention distances to the \
             shelters when the context includes them.",
            location.place_name, location.latitude, location.longitude
        ),
    }
}

/// Substitute `{placeholder}` markers in a single pass.
///
/// # Panics
/// Panics when the template contains a marker with no corresponding value.
fn render_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        let value = values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or_else(|| panic!("prompt template references unknown placeholder '{name}'"));
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
