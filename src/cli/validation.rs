//! CLI argument validation functions
//!
//! Value parsers for arguments clap cannot check on its own.

use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

const MAX_ROLLBACK_STEPS: u32 = 100;

/// Port between 1 and 65535
pub fn validate_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str.parse().map_err(|_| {
        format!(
            "Port must be a valid number between 1 and 65535, got: '{}'",
            port_str
        )
    })?;

    if port == 0 {
        return Err("Port must be between 1 and 65535. Port 0 is not allowed.".to_string());
    }

    Ok(port)
}

/// Existing, readable file
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(format!(
            "Configuration file does not exist or is not a file: '{}'",
            path_str
        ));
    }

    fs::File::open(&path)
        .map(|_| path)
        .map_err(|e| format!("Cannot read configuration file '{}': {}", path_str, e))
}

/// Between 1 and 100 steps
pub fn validate_rollback_steps(steps_str: &str) -> Result<u32, String> {
    let steps: u32 = steps_str.parse().map_err(|_| {
        format!(
            "Rollback steps must be a valid positive number, got: '{}'",
            steps_str
        )
    })?;

    if steps == 0 {
        return Err("Rollback steps must be greater than 0".to_string());
    }

    if steps > MAX_ROLLBACK_STEPS {
        return Err(format!(
            "Rollback steps cannot exceed {}",
            MAX_ROLLBACK_STEPS
        ));
    }

    Ok(steps)
}

/// IP address, `localhost` or a plausible hostname
pub fn validate_host_address(host_str: &str) -> Result<String, String> {
    let host = host_str.trim();

    if host.is_empty() {
        return Err("Host address cannot be empty".to_string());
    }

    if host.parse::<IpAddr>().is_ok() || host == "localhost" {
        return Ok(host.to_string());
    }

    // Dotted digits that failed to parse as an IP
    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(format!("Invalid IPv4 address format: '{}'", host_str));
    }

    if host.len() > 253 {
        return Err("Host address is too long (maximum 253 characters)".to_string());
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.'))
    {
        return Err(format!("Invalid hostname: '{}'", host_str));
    }

    Ok(host.to_string())
}
