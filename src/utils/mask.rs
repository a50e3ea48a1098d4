/// Masks sensitive values for logs; keeps the first and last two characters.
pub fn mask_sensitive(value: &str) -> String {
    if value.is_empty() {
        return "".to_string();
    }

    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len <= 4 {
        return "*".repeat(len);
    }

    format!(
        "{}{}{}",
        chars[..2].iter().collect::<String>(),
        "*".repeat(len - 4),
        chars[len - 2..].iter().collect::<String>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(mask_sensitive("MyPassword123"), "My*********23");
        assert_eq!(mask_sensitive("abc"), "***");
        assert_eq!(mask_sensitive(""), "");
    }

    #[test]
    fn test_mask_username() {
        assert_eq!(mask_sensitive("user@example.com"), "us************om");
    }
}
