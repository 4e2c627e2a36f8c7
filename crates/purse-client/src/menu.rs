//! Menu choices and input handling for the terminal client.

use purse_protocol::DonationEvent;

pub const MENU: &str = "\
1. Top-up saldo
2. Cek saldo
3. Donasi
4. Exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    TopUp,
    CheckBalance,
    Donate,
    Exit,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Choice::TopUp),
            "2" => Some(Choice::CheckBalance),
            "3" => Some(Choice::Donate),
            "4" => Some(Choice::Exit),
            _ => None,
        }
    }
}

/// Build a donation from raw prompt answers.
pub fn build_donation(name: &str, amount: &str, message: &str) -> Result<DonationEvent, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }

    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid amount", amount.trim()))?;
    if !amount.is_finite() {
        return Err(format!("'{}' is not a valid amount", amount));
    }

    Ok(DonationEvent::new(name, amount, message.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_choices() {
        assert_eq!(Choice::parse("1\n"), Some(Choice::TopUp));
        assert_eq!(Choice::parse(" 2 "), Some(Choice::CheckBalance));
        assert_eq!(Choice::parse("3"), Some(Choice::Donate));
        assert_eq!(Choice::parse("4"), Some(Choice::Exit));
        assert_eq!(Choice::parse("5"), None);
        assert_eq!(Choice::parse(""), None);
    }

    #[test]
    fn test_builds_donation() {
        let event = build_donation(" budi ", "10000", " semangat ").unwrap();
        assert_eq!(event, DonationEvent::new("budi", 10_000.0, "semangat"));
    }

    #[test]
    fn test_rejects_bad_donation_input() {
        assert!(build_donation("", "1", "hi").is_err());
        assert!(build_donation("budi", "banyak", "hi").is_err());
        assert!(build_donation("budi", "inf", "hi").is_err());
    }
}
