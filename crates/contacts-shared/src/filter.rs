//! Client-side search and ordering of contact lists.

use crate::contact::Contact;

/// Case-insensitive substring match on name or email.
/// A blank term matches everything.
pub fn matches(contact: &Contact, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    contact.name.to_lowercase().contains(&term) || contact.email.to_lowercase().contains(&term)
}

pub fn filter_contacts(contacts: Vec<Contact>, term: &str) -> Vec<Contact> {
    contacts.into_iter().filter(|c| matches(c, term)).collect()
}

/// Sort by name, case-insensitive, falling back to id for a stable order.
pub fn sort_by_name(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactInput;
    use crate::types::ContactId;

    fn contact(id: &str, name: &str, email: &str) -> Contact {
        Contact::provisional(ContactId::from(id), &ContactInput::new(name, email, "555"))
    }

    #[test]
    fn matches_name_or_email_ignoring_case() {
        let c = contact("1", "Ada Lovelace", "ada@analytical.org");
        assert!(matches(&c, "LOVE"));
        assert!(matches(&c, "analytical"));
        assert!(!matches(&c, "babbage"));
    }

    #[test]
    fn phone_is_not_searched() {
        let c = contact("1", "Ada", "ada@x.com");
        assert!(!matches(&c, "555"));
    }

    #[test]
    fn blank_term_keeps_everything() {
        let list = vec![contact("1", "Ada", "a@x"), contact("2", "Bob", "b@x")];
        assert_eq!(filter_contacts(list, "   ").len(), 2);
    }

    #[test]
    fn sorts_case_insensitively() {
        let mut list = vec![
            contact("1", "charlie", "c@x"),
            contact("2", "Bob", "b@x"),
            contact("3", "alice", "a@x"),
        ];
        sort_by_name(&mut list);
        let names: Vec<_> = list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["alice", "Bob", "charlie"]);
    }
}
