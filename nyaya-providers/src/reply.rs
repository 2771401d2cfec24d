//! Structured-reply decoding
//!
//! Model answers carry optional marker-delimited blocks for statutory
//! references, action steps and contacts. This module extracts the blocks,
//! parses their line formats and strips all markers from the answer text.
//! Absent blocks yield empty sections; there is no fallback extraction
//! from free text.

use nyaya_core::chat::{ActionStep, ContactInfo, ContactKind, LegalReference};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::base::CounselReply;

const REFERENCES_START: &str = "###REFERENCES###";
const REFERENCES_END: &str = "###ENDREFERENCES###";
const STEPS_START: &str = "###STEPS###";
const STEPS_END: &str = "###ENDSTEPS###";
const CONTACTS_START: &str = "###CONTACTS###";
const CONTACTS_END: &str = "###ENDCONTACTS###";

const ALL_MARKERS: &[&str] = &[
    REFERENCES_END,
    REFERENCES_START,
    STEPS_END,
    STEPS_START,
    CONTACTS_END,
    CONTACTS_START,
];

// Lines look like `1. **File a complaint:** visit the nearest police station`
static STEP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.\s*\*\*(.+?):\*\*\s*(.+)$").unwrap());

// Lines look like `Women Helpline - Phone: 1091`
static CONTACT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s*-\s*(Phone|Email|Website):\s*(.+)$").unwrap());

/// Decode a raw model answer into content plus structured sections
pub fn decode_reply(raw: &str) -> CounselReply {
    let mut content = raw.to_string();

    let legal_references = extract_block(&mut content, REFERENCES_START, REFERENCES_END)
        .map(|block| parse_references(&block))
        .unwrap_or_default();
    let action_steps = extract_block(&mut content, STEPS_START, STEPS_END)
        .map(|block| parse_steps(&block))
        .unwrap_or_default();
    let contact_info = extract_block(&mut content, CONTACTS_START, CONTACTS_END)
        .map(|block| parse_contacts(&block))
        .unwrap_or_default();

    // Unpaired markers are noise once the blocks are gone
    for marker in ALL_MARKERS {
        if content.contains(marker) {
            content = content.replace(marker, "");
        }
    }

    CounselReply {
        content: content.trim().to_string(),
        legal_references,
        action_steps,
        contact_info,
    }
}

/// Cut a `start`..`end` block out of `content`, returning the inner text
fn extract_block(content: &mut String, start: &str, end: &str) -> Option<String> {
    let start_idx = content.find(start)?;
    let end_idx = content.find(end)?;
    if end_idx < start_idx {
        return None;
    }
    let inner = content[start_idx + start.len()..end_idx].to_string();
    content.replace_range(start_idx..end_idx + end.len(), "");
    Some(inner)
}

fn parse_references(block: &str) -> Vec<LegalReference> {
    block
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (section, description) = line.split_once(':')?;
            let section = section.trim();
            let description = description.trim();
            if section.is_empty() || description.is_empty() {
                return None;
            }
            Some(LegalReference {
                section: section.to_string(),
                description: description.to_string(),
            })
        })
        .collect()
}

fn parse_steps(block: &str) -> Vec<ActionStep> {
    block
        .lines()
        .filter_map(|line| {
            let caps = STEP_LINE.captures(line.trim())?;
            let ordinal = caps.get(1)?.as_str();
            let title = caps.get(2)?.as_str().trim();
            let description = caps.get(3)?.as_str().trim();
            Some(ActionStep {
                step: ordinal.to_string(),
                description: format!("**{}:** {}", title, description),
            })
        })
        .collect()
}

fn parse_contacts(block: &str) -> Vec<ContactInfo> {
    block
        .lines()
        .filter_map(|line| {
            let caps = CONTACT_LINE.captures(line.trim())?;
            let department = caps.get(1)?.as_str().trim();
            let label = caps.get(2)?.as_str();
            let value = caps.get(3)?.as_str().trim();
            if department.is_empty() || value.is_empty() {
                return None;
            }
            let (kind, label) = match label.to_ascii_lowercase().as_str() {
                "phone" => (ContactKind::Phone, "Phone"),
                "email" => (ContactKind::Email, "Email"),
                _ => (ContactKind::Website, "Website"),
            };
            Some(ContactInfo {
                department: department.to_string(),
                helpline: value.to_string(),
                kind,
                description: Some(format!("{}: {}", label, value)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_answer() {
        let reply = decode_reply("You can file an FIR at any police station.");
        assert_eq!(reply.content, "You can file an FIR at any police station.");
        assert!(reply.legal_references.is_empty());
        assert!(reply.action_steps.is_empty());
        assert!(reply.contact_info.is_empty());
    }

    #[test]
    fn test_decode_full_reply() {
        let raw = "\
An FIR is the first step in the criminal process.

###REFERENCES###
Section 154 CrPC: Information in cognizable cases
Article 21: Protection of life and personal liberty
###ENDREFERENCES###

###STEPS###
1. **Visit the police station:** go to the station with jurisdiction
2. **Get a copy:** the FIR copy is free of cost
###ENDSTEPS###

###CONTACTS###
Police Control Room - Phone: 100
National Legal Services Authority - Website: nalsa.gov.in
###ENDCONTACTS###

Remember to keep your copy safe.";

        let reply = decode_reply(raw);

        assert!(reply.content.starts_with("An FIR is the first step"));
        assert!(reply.content.ends_with("Remember to keep your copy safe."));
        assert!(!reply.content.contains("###"));

        assert_eq!(reply.legal_references.len(), 2);
        assert_eq!(reply.legal_references[0].section, "Section 154 CrPC");
        assert_eq!(reply.legal_references[1].section, "Article 21");

        assert_eq!(reply.action_steps.len(), 2);
        assert_eq!(reply.action_steps[0].step, "1");
        assert_eq!(
            reply.action_steps[0].description,
            "**Visit the police station:** go to the station with jurisdiction"
        );

        assert_eq!(reply.contact_info.len(), 2);
        assert_eq!(reply.contact_info[0].department, "Police Control Room");
        assert_eq!(reply.contact_info[0].helpline, "100");
        assert_eq!(reply.contact_info[0].kind, ContactKind::Phone);
        assert_eq!(
            reply.contact_info[0].description.as_deref(),
            Some("Phone: 100")
        );
        assert_eq!(reply.contact_info[1].kind, ContactKind::Website);
    }

    #[test]
    fn test_decode_strips_unpaired_markers() {
        let reply = decode_reply("Answer text ###REFERENCES### with a stray marker");
        assert_eq!(reply.content, "Answer text  with a stray marker");
        assert!(reply.legal_references.is_empty());
    }

    #[test]
    fn test_decode_skips_malformed_lines() {
        let raw = "\
###STEPS###
1. **Proper step:** do this
not a step at all
3. missing bold title
###ENDSTEPS###";
        let reply = decode_reply(raw);
        assert_eq!(reply.action_steps.len(), 1);
        assert_eq!(reply.action_steps[0].step, "1");
        assert_eq!(reply.content, "");
    }

    #[test]
    fn test_decode_reference_without_description_is_skipped() {
        let raw = "###REFERENCES###\nSection 498A:\nSection 125 CrPC: Maintenance\n###ENDREFERENCES###";
        let reply = decode_reply(raw);
        assert_eq!(reply.legal_references.len(), 1);
        assert_eq!(reply.legal_references[0].section, "Section 125 CrPC");
    }

    #[test]
    fn test_decode_contact_label_is_case_insensitive() {
        let raw = "###CONTACTS###\nCyber Cell - phone: 1930\n###ENDCONTACTS###";
        let reply = decode_reply(raw);
        assert_eq!(reply.contact_info.len(), 1);
        assert_eq!(reply.contact_info[0].kind, ContactKind::Phone);
        assert_eq!(
            reply.contact_info[0].description.as_deref(),
            Some("Phone: 1930")
        );
    }

    #[test]
    fn test_decode_end_marker_before_start_is_ignored() {
        let raw = "###ENDSTEPS### text ###STEPS###";
        let reply = decode_reply(raw);
        assert!(reply.action_steps.is_empty());
        assert_eq!(reply.content, "text");
    }

    #[test]
    fn test_reference_description_keeps_extra_colons() {
        let raw = "###REFERENCES###\nSection 420 IPC: Cheating: punishment up to 7 years\n###ENDREFERENCES###";
        let reply = decode_reply(raw);
        assert_eq!(reply.legal_references.len(), 1);
        assert_eq!(
            reply.legal_references[0].description,
            "Cheating: punishment up to 7 years"
        );
    }
}
