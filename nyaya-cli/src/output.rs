//! Terminal rendering for replies and session listings

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use console::style;
use nyaya_core::chat::{ActionStep, ContactInfo, ContactKind, LegalReference, Message, Session};
use nyaya_providers::CounselReply;

/// Print the structured sections of a decoded reply
pub fn print_reply_metadata(reply: &CounselReply) {
    let rendered = render_metadata(
        &reply.legal_references,
        &reply.action_steps,
        &reply.contact_info,
    );
    if !rendered.is_empty() {
        print!("{}", rendered);
    }
}

/// Print the session list with the current session marked
pub fn print_session_list(sessions: &[Session], current: Option<&str>) {
    if sessions.is_empty() {
        println!("No sessions.");
        return;
    }

    println!("{}", style("Sessions").bold().cyan());
    println!();
    for session in sessions {
        let marker = if current == Some(session.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} {}",
            style(marker).green().bold(),
            style(&session.title).bold(),
            style(format!("({})", session.id)).dim()
        );
        println!(
            "    {} message(s), updated {}",
            session.messages.len(),
            format_timestamp(session.updated_at)
        );
    }
}

/// Print a full session transcript
pub fn print_session(session: &Session) {
    println!(
        "{} {}",
        style(&session.title).bold().cyan(),
        style(format!("({})", session.id)).dim()
    );
    println!(
        "Created {}, {} message(s)",
        format_timestamp(session.created_at),
        session.messages.len()
    );
    println!();

    for message in &session.messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let label = if message.sender.is_user() {
        style("You").bold().cyan()
    } else {
        style("Assistant").bold().green()
    };
    println!(
        "{} {}",
        label,
        style(format_timestamp(message.timestamp)).dim()
    );
    println!("{}", message.content);

    let rendered = render_metadata(
        &message.legal_references,
        &message.action_steps,
        &message.contact_info,
    );
    if !rendered.is_empty() {
        print!("{}", rendered);
    }
    println!();
}

/// Render the three metadata sections; empty when there is nothing to show
fn render_metadata(
    legal_references: &[LegalReference],
    action_steps: &[ActionStep],
    contact_info: &[ContactInfo],
) -> String {
    let mut out = String::new();

    if !legal_references.is_empty() {
        let _ = writeln!(out, "\n{}", style("Legal references").bold().underlined());
        for reference in legal_references {
            let _ = writeln!(
                out,
                "  {}: {}",
                style(&reference.section).cyan(),
                reference.description
            );
        }
    }

    if !action_steps.is_empty() {
        let _ = writeln!(out, "\n{}", style("Recommended steps").bold().underlined());
        for step in action_steps {
            let _ = writeln!(
                out,
                "  {} {}",
                style(format!("{}.", step.step)).bold(),
                step.description
            );
        }
    }

    if !contact_info.is_empty() {
        let _ = writeln!(out, "\n{}", style("Contacts").bold().underlined());
        for contact in contact_info {
            let _ = write!(
                out,
                "  {}: {} [{}]",
                style(&contact.department).bold(),
                contact.helpline,
                kind_label(contact.kind)
            );
            match &contact.description {
                Some(description) => {
                    let _ = writeln!(out, " {}", description);
                }
                None => {
                    let _ = writeln!(out);
                }
            }
        }
    }

    out
}

fn kind_label(kind: ContactKind) -> &'static str {
    match kind {
        ContactKind::Phone => "phone",
        ContactKind::Email => "email",
        ContactKind::Website => "website",
    }
}

/// Local-time timestamp for listings
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metadata_includes_all_sections() {
        let references = vec![LegalReference {
            section: "Section 154 CrPC".to_string(),
            description: "Registration of an FIR".to_string(),
        }];
        let steps = vec![ActionStep {
            step: "1".to_string(),
            description: "Visit the nearest police station".to_string(),
        }];
        let contacts = vec![ContactInfo {
            department: "Police Helpline".to_string(),
            helpline: "100".to_string(),
            kind: ContactKind::Phone,
            description: Some("24x7 emergency line".to_string()),
        }];

        let rendered = render_metadata(&references, &steps, &contacts);

        assert!(rendered.contains("Legal references"));
        assert!(rendered.contains("Section 154 CrPC"));
        assert!(rendered.contains("Recommended steps"));
        assert!(rendered.contains("Visit the nearest police station"));
        assert!(rendered.contains("Contacts"));
        assert!(rendered.contains("100 [phone]"));
        assert!(rendered.contains("24x7 emergency line"));
    }

    #[test]
    fn test_render_metadata_empty_when_no_sections() {
        assert!(render_metadata(&[], &[], &[]).is_empty());
    }

    #[test]
    fn test_contact_without_description_ends_cleanly() {
        let contacts = vec![ContactInfo {
            department: "Cyber Cell".to_string(),
            helpline: "https://cybercrime.gov.in".to_string(),
            kind: ContactKind::Website,
            description: None,
        }];

        let rendered = render_metadata(&[], &[], &contacts);
        assert!(rendered.contains("[website]\n"));
    }

    #[test]
    fn test_format_timestamp_shape() {
        let rendered = format_timestamp(Utc::now());
        // YYYY-MM-DD HH:MM
        assert_eq!(rendered.len(), 16);
        assert_eq!(&rendered[4..5], "-");
        assert_eq!(&rendered[10..11], " ");
    }
}
