//! CSV bulk import of onboarding requests.
//!
//! The first line is a header naming the columns; `site` and `ip_address`
//! (or `target`) are required, every other column is optional. Quoted
//! fields may contain commas and doubled quotes but not line breaks.

use crate::models::{Credentials, OnboardingRequest};

const KNOWN_COLUMNS: &[&str] = &[
    "site",
    "ip_address",
    "target",
    "port",
    "timeout",
    "platform",
    "device_type",
    "role",
    "username",
    "password",
    "secret",
];

/// One row-level problem, reported as "Row N field: message"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based data row; 0 is the header
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.row == 0 {
            write!(f, "Header {}: {}", self.field, self.message)
        } else {
            write!(f, "Row {} {}: {}", self.row, self.field, self.message)
        }
    }
}

impl RowError {
    pub fn new(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Parse every row, collecting all errors. Either the whole file parses or
/// nothing is returned.
pub fn parse_bulk_csv(text: &str) -> Result<Vec<OnboardingRequest>, Vec<RowError>> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Err(vec![RowError::new(0, "header", "file is empty")]);
    };
    let header: Vec<String> = split_line(header_line)
        .map_err(|e| vec![RowError::new(0, "header", e)])?
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let mut errors = Vec::new();
    for column in &header {
        if !KNOWN_COLUMNS.contains(&column.as_str()) {
            errors.push(RowError::new(0, column, "unknown column"));
        }
    }
    let has = |name: &str| header.iter().any(|h| h == name);
    if !has("site") {
        errors.push(RowError::new(0, "site", "column is required"));
    }
    if !has("ip_address") && !has("target") {
        errors.push(RowError::new(0, "ip_address", "column is required"));
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut requests = Vec::new();
    for (index, line) in lines.enumerate() {
        let row = index + 1;
        let fields = match split_line(line) {
            Ok(fields) => fields,
            Err(e) => {
                errors.push(RowError::new(row, "row", e));
                continue;
            }
        };
        if fields.len() != header.len() {
            errors.push(RowError::new(
                row,
                "row",
                format!("expected {} fields, found {}", header.len(), fields.len()),
            ));
            continue;
        }
        let record: Vec<(&str, &str)> = header
            .iter()
            .map(String::as_str)
            .zip(fields.iter().map(|f| f.trim()))
            .collect();
        match parse_record(row, &record) {
            Ok(req) => requests.push(req),
            Err(mut row_errors) => errors.append(&mut row_errors),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    if requests.is_empty() {
        return Err(vec![RowError::new(0, "rows", "file has no data rows")]);
    }
    Ok(requests)
}

fn parse_record(row: usize, record: &[(&str, &str)]) -> Result<OnboardingRequest, Vec<RowError>> {
    let get = |name: &str| {
        record
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| *value)
            .filter(|v| !v.is_empty())
    };
    let mut errors = Vec::new();

    let site = get("site");
    if site.is_none() {
        errors.push(RowError::new(row, "site", "This field is required."));
    }
    let target = get("ip_address").or_else(|| get("target"));
    if target.is_none() {
        errors.push(RowError::new(row, "ip_address", "This field is required."));
    }

    let mut req = OnboardingRequest::new(target.unwrap_or_default(), site.unwrap_or_default());
    if let Some(port) = get("port") {
        match port.parse::<u16>() {
            Ok(p) => req.port = p,
            Err(_) => errors.push(RowError::new(row, "port", "Enter a whole number.")),
        }
    }
    if let Some(timeout) = get("timeout") {
        match timeout.parse::<u64>() {
            Ok(t) => req.timeout = t,
            Err(_) => errors.push(RowError::new(row, "timeout", "Enter a whole number.")),
        }
    }
    req.platform = get("platform").map(str::to_string);
    req.device_type = get("device_type").map(str::to_string);
    req.role = get("role").map(str::to_string);

    let credentials = Credentials {
        username: get("username").map(str::to_string),
        password: get("password").map(str::to_string),
        secret: get("secret").map(str::to_string),
    };
    if credentials.username.is_some() || credentials.password.is_some() || credentials.secret.is_some() {
        req.credentials = Some(credentials);
    }

    if errors.is_empty() {
        Ok(req)
    } else {
        Err(errors)
    }
}

/// Split one CSV line into fields
fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            (true, '"') => quoted = false,
            (true, c) => field.push(c),
            (false, '"') if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            (false, ',') => fields.push(std::mem::take(&mut field)),
            (false, c) => field.push(c),
        }
    }
    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_rows_with_defaults_and_credentials() {
        let csv = "site,ip_address,port,platform,username,password,secret\r\n\
                   nyc01,198.51.100.5,,ios,,,\r\n\
                   lon01,sw2.example.net,2222,,netops,\"pa,ss\"\"word\",en\r\n";
        let requests = parse_bulk_csv(csv).unwrap();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].site, "nyc01");
        assert_eq!(requests[0].target, "198.51.100.5");
        assert_eq!(requests[0].port, 22);
        assert_eq!(requests[0].timeout, 30);
        assert_eq!(requests[0].platform.as_deref(), Some("ios"));
        assert!(requests[0].credentials.is_none());

        assert_eq!(requests[1].port, 2222);
        assert!(requests[1].platform.is_none());
        let creds = requests[1].credentials.clone().unwrap();
        assert_eq!(creds.username.as_deref(), Some("netops"));
        assert_eq!(creds.password.as_deref(), Some("pa,ss\"word"));
        assert_eq!(creds.secret.as_deref(), Some("en"));
    }

    #[test]
    fn test_all_row_errors_are_reported() {
        let csv = "site,ip_address,port,timeout\n\
                   nyc01,198.51.100.5,22,30\n\
                   ,198.51.100.6,abc,30\n\
                   nyc01,,22,soon\n";
        let errors = parse_bulk_csv(csv).unwrap_err();
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Row 2 site: This field is required.",
                "Row 2 port: Enter a whole number.",
                "Row 3 ip_address: This field is required.",
                "Row 3 timeout: Enter a whole number.",
            ]
        );
    }

    #[test]
    fn test_header_problems() {
        let errors = parse_bulk_csv("site,address\nnyc01,192.0.2.1\n").unwrap_err();
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec!["Header address: unknown column", "Header ip_address: column is required"]
        );

        assert!(parse_bulk_csv("").is_err());
        assert!(parse_bulk_csv("site,ip_address\n").is_err());
    }

    #[test]
    fn test_target_column_and_field_count() {
        let requests = parse_bulk_csv("Target,Site\nsw1.example.net,nyc01\n").unwrap();
        assert_eq!(requests[0].target, "sw1.example.net");

        let errors = parse_bulk_csv("site,target\nnyc01\n").unwrap_err();
        assert_eq!(errors[0].to_string(), "Row 1 row: expected 2 fields, found 1");
    }

    #[test]
    fn test_split_line_quotes() {
        assert_eq!(split_line("a,\"b,c\",d").unwrap(), vec!["a", "b,c", "d"]);
        assert_eq!(split_line("\"say \"\"hi\"\"\"").unwrap(), vec!["say \"hi\""]);
        assert_eq!(split_line("a,,").unwrap(), vec!["a", "", ""]);
        assert!(split_line("\"open").is_err());
    }
}
