//! WhatsApp number handling.

const COUNTRY_CODE: &str = "65";

/// Keep digits and a single leading `+`. `None` when no digits remain.
pub fn sanitize_phone(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
  if digits.is_empty() {
    return None;
  }
  if trimmed.starts_with('+') {
    Some(format!("+{digits}"))
  } else {
    Some(digits)
  }
}

/// A `wa.me` link for the number, prefixing the Singapore country code when
/// it is missing.
pub fn whatsapp_link(number: &str) -> Option<String> {
  let digits: String = number.chars().filter(char::is_ascii_digit).collect();
  if digits.is_empty() {
    return None;
  }
  if digits.starts_with(COUNTRY_CODE) {
    Some(format!("https://wa.me/{digits}"))
  } else {
    Some(format!("https://wa.me/{COUNTRY_CODE}{digits}"))
  }
}
