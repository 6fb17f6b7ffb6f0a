use crate::models::Attempt;

const CSV_HEADER: &str =
    "ordinal,timestamp,question_id,question,level,correct,given_answer,correct_answer,response_time";

/// Escapes CSV field to prevent formula injection attacks.
/// Prefixes dangerous characters (=, +, @, -, tab, newline) with a tab to neutralize them,
/// except for plain numbers such as negative answers.
/// Also wraps fields containing special characters in quotes.
fn escape_csv_field(value: &str) -> String {
    let is_number = value.parse::<f64>().is_ok_and(f64::is_finite);
    let sanitized = if !is_number && value.starts_with(['=', '+', '@', '-', '\t', '\r', '\n']) {
        format!("\t{}", value)
    } else {
        value.to_string()
    };

    if sanitized.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", sanitized.replace('"', "\"\""))
    } else {
        sanitized
    }
}

/// Attempt log as CSV, one row per attempt in session order.
pub fn attempts_csv(attempts: &[Attempt]) -> String {
    let mut lines = Vec::with_capacity(attempts.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for attempt in attempts {
        lines.push(format!(
            "{},{},{},{},{},{},{},{},{:.3}",
            attempt.ordinal,
            attempt.timestamp.to_rfc3339(),
            escape_csv_field(&attempt.question_id),
            escape_csv_field(&attempt.question),
            attempt.level,
            attempt.correct,
            escape_csv_field(&attempt.given_answer),
            escape_csv_field(&attempt.correct_answer),
            attempt.response_time
        ));
    }

    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DifficultyTier;
    use crate::services::adaptive::history::tests::attempt;

    #[test]
    fn test_csv_escape_formula_injection() {
        assert_eq!(escape_csv_field("=1+1"), "\t=1+1");
        assert_eq!(escape_csv_field("+cmd"), "\t+cmd");
        assert_eq!(escape_csv_field("@SUM(A1)"), "\t@SUM(A1)");
        assert_eq!(escape_csv_field("-3+cmd"), "\t-3+cmd");
    }

    #[test]
    fn test_csv_keeps_negative_numbers_readable() {
        assert_eq!(escape_csv_field("-25"), "-25");
        assert_eq!(escape_csv_field("-0.75"), "-0.75");
        assert_eq!(escape_csv_field("+7"), "+7");
        assert_eq!(escape_csv_field("-inf"), "\t-inf");
    }

    #[test]
    fn test_csv_escape_quotes_and_commas() {
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("12"), "12");
    }

    #[test]
    fn test_attempts_csv() {
        let attempts = vec![
            attempt(1, DifficultyTier::Easy, true, 4.25),
            attempt(2, DifficultyTier::Medium, false, 12.0),
        ];
        let csv = attempts_csv(&attempts);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,"));
        assert!(lines[1].contains(",easy,true,2,2,4.250"));
        assert!(lines[2].contains(",medium,false,3,2,12.000"));
    }

    #[test]
    fn test_empty_log_has_header_only() {
        assert_eq!(attempts_csv(&[]), format!("{}\n", CSV_HEADER));
    }
}
