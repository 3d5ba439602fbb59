//! Mailboxes recovered from free-form recipient text.
//!
//! Outlook keeps senders and recipients as display text. The recipient
//! table and `PR_DISPLAY_TO` separate entries with `;`, transport headers
//! with `,`. Both are split here, ignoring separators inside quotes or
//! angle brackets.

/// One `name <local@domain>` entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Mailbox {
    /// Display name without surrounding quotes, if one was given.
    pub name: Option<String>,
    /// `local@domain`.
    pub email: String,
}

impl Mailbox {
    /// Parse one entry. Returns `None` unless it holds a `local@domain` address.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let (name, email) = match (entry.rfind('<'), entry.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                (unquote(&entry[..open]), entry[open + 1..close].trim())
            }
            _ => (None, entry),
        };

        if !is_addr_spec(email) {
            return None;
        }
        Some(Self {
            name: name.filter(|n| n != email),
            email: email.to_string(),
        })
    }

    /// Parse a whole recipient list. `None` if any entry lacks a usable address.
    pub fn parse_list(text: &str) -> Option<Vec<Self>> {
        let entries = split_entries(text);
        if entries.is_empty() {
            return None;
        }
        entries.into_iter().map(Self::parse).collect()
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// `true` for `local@domain` with both sides non-empty and no whitespace.
fn is_addr_spec(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn unquote(s: &str) -> Option<String> {
    let s = s.trim();
    let s = s
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
        .trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Split on `,` and `;` outside quotes and angle brackets, dropping blanks.
fn split_entries(text: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut quoted = false;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '<' if !quoted => depth += 1,
            '>' if !quoted => depth = depth.saturating_sub(1),
            ',' | ';' if !quoted && depth == 0 => {
                entries.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    entries.push(&text[start..]);

    entries.retain(|e| !e.trim().is_empty());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address() {
        let m = Mailbox::parse("user@example.com").unwrap();
        assert_eq!(m.email, "user@example.com");
        assert_eq!(m.name, None);
    }

    #[test]
    fn test_name_and_address() {
        let m = Mailbox::parse("\"Dupont, Jean\" <jean@exemple.fr>").unwrap();
        assert_eq!(m.name.as_deref(), Some("Dupont, Jean"));
        assert_eq!(m.email, "jean@exemple.fr");
        assert_eq!(m.to_string(), "Dupont, Jean <jean@exemple.fr>");
    }

    #[test]
    fn test_name_equal_to_address_is_dropped() {
        let m = Mailbox::parse("a@x.com <a@x.com>").unwrap();
        assert_eq!(m.name, None);
    }

    #[test]
    fn test_display_name_only_is_rejected() {
        assert_eq!(Mailbox::parse("Marketing Team"), None);
        assert_eq!(Mailbox::parse("Team <not an address>"), None);
    }

    #[test]
    fn test_outlook_semicolon_list() {
        let list = Mailbox::parse_list("Alice <a@b.com>; Bob <c@d.com>; plain@addr.com;").unwrap();
        let emails: Vec<&str> = list.iter().map(|m| m.email.as_str()).collect();
        assert_eq!(emails, ["a@b.com", "c@d.com", "plain@addr.com"]);
    }

    #[test]
    fn test_separators_inside_quotes() {
        let list = Mailbox::parse_list("\"Last; First\" <a@b.com>, other@c.com").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_deref(), Some("Last; First"));
    }

    #[test]
    fn test_one_bad_entry_rejects_the_list() {
        assert_eq!(Mailbox::parse_list("a@b.com; Undisclosed recipients"), None);
        assert_eq!(Mailbox::parse_list(" ; "), None);
    }
}
