/// Parse a listening port.
///
/// Port 0 is rejected: the dev server URL has to be known before binding.
///
/// # Errors
///
/// Returns an error message if the value is not a port number or is zero.
pub fn parse_port(s: &str) -> Result<u16, String> {
    let port: u16 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid port number (1-65535)", s))?;

    if port == 0 {
        return Err("Port must be between 1 and 65535".to_string());
    }

    Ok(port)
}

/// Parse a browser name.
///
/// Any non-empty name is accepted; `none` suppresses opening a browser.
///
/// # Errors
///
/// Returns an error message if the name is empty.
pub fn parse_browser(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("Browser name cannot be empty; use --browser=none to skip opening one".to_string());
    }
    Ok(trimmed.to_string())
}
