//! Message text normalization and sender-header helpers.
//!
//! Classifiers only ever see the output of [`normalized_text`]; keyword
//! matching is therefore case-insensitive by construction.

/// Lower-cased `subject + " " + body`, the classifier input.
pub fn normalized_text(subject: &str, body: &str) -> String {
    let mut text = String::with_capacity(subject.len() + body.len() + 1);
    text.push_str(subject);
    text.push(' ');
    text.push_str(body);
    text.to_lowercase()
}

/// Convert an HTML email body to plain text.
///
/// Falls back to stripping nothing if the HTML is too broken to render;
/// a noisy body is still classifiable, a dropped one is not.
pub fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|_| html.to_string())
}

/// Extract bare email from a "From" header like "Name <email@example.com>".
pub fn extract_email_address(from_field: &str) -> String {
    if let Some(start) = from_field.find('<') {
        if let Some(end) = from_field.find('>') {
            if end > start {
                return from_field[start + 1..end].to_lowercase();
            }
        }
    }
    from_field.trim().to_lowercase()
}

/// Extract domain from an email address.
pub fn extract_domain(email_addr: &str) -> String {
    if let Some(at_pos) = email_addr.rfind('@') {
        email_addr[at_pos + 1..].to_lowercase()
    } else {
        String::new()
    }
}

/// Derive a company name from a "From" header: the base label of the
/// sender's domain ("jobs@mail.acme.com" → "acme").
///
/// The domain is the one part of a recruiting email that names the company
/// unambiguously; display names and local parts vary per mailing system.
pub fn company_from_sender(from_field: &str) -> String {
    let domain = extract_domain(&extract_email_address(from_field));
    if domain.is_empty() {
        return String::new();
    }
    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => String::new(),
        1 => labels[0].to_string(),
        // "mail.acme.com" → "acme"; "acme.co.uk" still yields "co", which is
        // wrong but stable, and identity matching only needs consistency.
        n => labels[n - 2].to_string(),
    }
}
