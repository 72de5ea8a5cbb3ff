use chrono::NaiveDate;

use crate::error::AppError;

/// Strips punctuation from a CPF and checks its two verifier digits.
/// Returns the 11 bare digits.
pub fn normalize_cpf(input: &str) -> Result<String, AppError> {
    let digits: Vec<u32> = input
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(|| AppError::ValidationError("CPF must contain only digits".to_string()))?;

    if digits.len() != 11 {
        return Err(AppError::ValidationError("CPF must have 11 digits".to_string()));
    }

    // 000.000.000-00, 111.111.111-11, ... pass the checksum but are not issued
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(AppError::ValidationError("Invalid CPF".to_string()));
    }

    if verifier_digit(&digits[..9]) != digits[9] || verifier_digit(&digits[..10]) != digits[10] {
        return Err(AppError::ValidationError("Invalid CPF".to_string()));
    }

    Ok(digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect())
}

fn verifier_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    match (sum * 10) % 11 {
        10 => 0,
        r => r,
    }
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let invalid = || AppError::ValidationError("Invalid e-mail".to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.len() < 2 {
        return Err(invalid());
    }

    Ok(())
}

/// Accepts `DD/MM/YYYY` or ISO `YYYY-MM-DD`. Dates after `today` are rejected.
pub fn parse_birth_date(input: &str, today: NaiveDate) -> Result<NaiveDate, AppError> {
    let input = input.trim();
    let date = NaiveDate::parse_from_str(input, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .map_err(|_| AppError::ValidationError("Birth date must be DD/MM/YYYY".to_string()))?;

    if date > today {
        return Err(AppError::ValidationError("Birth date is in the future".to_string()));
    }
    Ok(date)
}

pub fn normalize_flight_number(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

pub fn normalize_seat_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{} is required", field)));
    }
    Ok(())
}
