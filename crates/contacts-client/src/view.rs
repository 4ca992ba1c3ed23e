//! Line-oriented command parsing and text rendering for the REPL.

use contacts_shared::{Contact, ContactId, ContactInput};

use crate::queue::PendingOperation;
use crate::sync::DrainReport;

pub const HELP: &str = "\
Commands:
  list                                  show all contacts
  search <term>                         filter by name or email
  show <id>                             show one contact
  add <name> | <email> | <phone>        create a contact
  edit <id> <name> | <email> | <phone>  replace a contact's fields
  rm <id>                               delete a contact
  sync                                  replay pending offline changes now
  queue                                 list pending offline changes
  discard                               drop the first pending change
  offline / online                      force offline mode on or off
  help                                  this text
  quit                                  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Search(String),
    Show(ContactId),
    Add(ContactInput),
    Edit(ContactId, ContactInput),
    Remove(ContactId),
    Sync,
    Queue,
    Discard,
    Offline,
    Online,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Command::List,
            "search" | "find" => Command::Search(rest.to_string()),
            "show" | "get" => Command::Show(id_arg(rest)?),
            "add" | "new" => Command::Add(fields(rest)?),
            "edit" | "update" => {
                let (id, rest) = rest
                    .split_once(char::is_whitespace)
                    .ok_or("usage: edit <id> <name> | <email> | <phone>")?;
                Command::Edit(id_arg(id)?, fields(rest)?)
            }
            "rm" | "delete" | "del" => Command::Remove(id_arg(rest)?),
            "sync" => Command::Sync,
            "queue" | "pending" => Command::Queue,
            "discard" => Command::Discard,
            "offline" => Command::Offline,
            "online" => Command::Online,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

fn id_arg(raw: &str) -> Result<ContactId, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains(char::is_whitespace) {
        return Err("expected a single contact id".to_string());
    }
    Ok(ContactId::from(raw))
}

/// `name | email | phone`. Blank fields are kept so validation can name them.
fn fields(raw: &str) -> Result<ContactInput, String> {
    let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [name, email, phone] => Ok(ContactInput::new(*name, *email, *phone)),
        _ => Err("expected: <name> | <email> | <phone>".to_string()),
    }
}

/// Table of contacts, one per line.
pub fn render_list(contacts: &[Contact]) -> String {
    if contacts.is_empty() {
        return "No contacts found.".to_string();
    }
    let id_width = contacts
        .iter()
        .map(|c| c.id.as_str().len())
        .max()
        .unwrap_or(0)
        .max(2);
    let name_width = contacts
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!("{:id_width$}  {:name_width$}  EMAIL / PHONE", "ID", "NAME");
    for c in contacts {
        let marker = if c.is_provisional() { " (pending)" } else { "" };
        out.push_str(&format!(
            "\n{:id_width$}  {:name_width$}  {} / {}{marker}",
            c.id.as_str(),
            c.name,
            c.email,
            c.phone
        ));
    }
    out
}

pub fn render_contact(contact: &Contact) -> String {
    let mut out = format!(
        "{}\n  id:    {}\n  email: {}\n  phone: {}",
        contact.name, contact.id, contact.email, contact.phone
    );
    if let Some(created) = contact.created_at {
        out.push_str(&format!("\n  created: {}", created.to_rfc3339()));
    }
    if let Some(updated) = contact.updated_at {
        out.push_str(&format!("\n  updated: {}", updated.to_rfc3339()));
    }
    if contact.is_provisional() {
        out.push_str("\n  (not yet synced)");
    }
    out
}

pub fn render_queue(pending: &[PendingOperation]) -> String {
    if pending.is_empty() {
        return "No pending changes.".to_string();
    }
    pending
        .iter()
        .enumerate()
        .map(|(i, op)| {
            let detail = op
                .payload()
                .map(|p| format!(" ({})", p.name))
                .unwrap_or_default();
            format!("{}. {} {}{detail}", i + 1, op.kind(), op.target())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_report(report: &DrainReport) -> String {
    match &report.failure {
        None if report.replayed == 0 => "Nothing to sync.".to_string(),
        None => format!("Synced {} change(s).", report.replayed),
        Some(e) if !e.is_retryable() => format!(
            "Synced {} change(s), {} still pending. The first was rejected: {e}. \
             Use 'discard' to drop it.",
            report.replayed, report.remaining
        ),
        Some(e) => format!(
            "Synced {} change(s), {} still pending: {e}",
            report.replayed, report.remaining
        ),
    }
}
