//! Fields taken from a message's stored Internet transport headers.

use mail_parser::{Address, MessageParser};

/// Header values that take precedence over MAPI properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportHeaders {
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    /// RFC 2822 date, with the sender's zone preserved.
    pub date: Option<String>,
}

/// Extract From/To/Cc/Date from the `PR_TRANSPORT_MESSAGE_HEADERS` text.
///
/// Unparsable header blocks yield empty fields rather than an error.
pub fn parse_transport_headers(raw: &str) -> TransportHeaders {
    let mut block = raw.trim_end().replace("\r\n", "\n").replace('\n', "\r\n");
    block.push_str("\r\n\r\n");

    let Some(message) = MessageParser::default().parse(block.as_bytes()) else {
        return TransportHeaders::default();
    };

    TransportHeaders {
        from: message.from().and_then(format_address_list),
        to: message.to().and_then(format_address_list),
        cc: message.cc().and_then(format_address_list),
        date: message.date().map(|d| d.to_rfc822()),
    }
}

/// Render an address header as `"Name <addr>, other@x"`.
fn format_address_list(address: &Address<'_>) -> Option<String> {
    let addrs: Vec<&mail_parser::Addr<'_>> = match address {
        Address::List(list) => list.iter().collect(),
        Address::Group(groups) => groups.iter().flat_map(|g| g.addresses.iter()).collect(),
    };

    let rendered: Vec<String> = addrs
        .into_iter()
        .filter_map(|addr| {
            let name = addr.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
            let email = addr.address.as_deref().map(str::trim).filter(|a| !a.is_empty());
            match (name, email) {
                (Some(name), Some(email)) if name != email => Some(format!("{name} <{email}>")),
                (_, Some(email)) => Some(email.to_string()),
                (Some(name), None) => Some(name.to_string()),
                (None, None) => None,
            }
        })
        .collect();

    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join(", "))
    }
}
