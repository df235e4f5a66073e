//! Backend version gating.
//!
//! Some attributes only exist on newer FortiSASE releases. Versions reported
//! by the backend are not always full semver (`v24.3`, `24.3.1`), so parsing
//! is lenient.

use semver::{Version, VersionReq};

use crate::error::ValueError;

/// Parses a backend version, filling missing minor/patch components.
///
/// # Errors
///
/// Returns [`ValueError::InvalidVersion`] if the string is not a version.
pub fn parse_version(version: &str) -> Result<Version, ValueError> {
    let trimmed = version.trim().trim_start_matches(['v', 'V']);
    let (core, rest) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }

    let normalized = format!("{}{rest}", parts.join("."));
    Version::parse(&normalized).map_err(|e| ValueError::InvalidVersion {
        version: version.to_string(),
        message: e.to_string(),
    })
}

/// Returns true if `current` satisfies `requirement`.
///
/// An empty requirement matches every version.
///
/// # Errors
///
/// Returns an error if either side fails to parse.
pub fn version_matches(current: &str, requirement: &str) -> Result<bool, ValueError> {
    if requirement.trim().is_empty() {
        return Ok(true);
    }

    let version = parse_version(current)?;
    let req = VersionReq::parse(requirement).map_err(|e| ValueError::InvalidRequirement {
        requirement: requirement.to_string(),
        message: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_version("v24.3").unwrap(), Version::new(24, 3, 0));
        assert_eq!(parse_version("24").unwrap(), Version::new(24, 0, 0));
        assert_eq!(parse_version("24.3.1").unwrap(), Version::new(24, 3, 1));
        assert!(parse_version("latest").is_err());
    }

    #[test]
    fn test_matches() {
        assert!(version_matches("24.3.1", ">=24.2").unwrap());
        assert!(!version_matches("24.1", ">=24.2").unwrap());
        assert!(version_matches("v25.1", ">=24.2, <26").unwrap());
        assert!(version_matches("anything-goes", "").unwrap_or(false));
    }

    #[test]
    fn test_invalid_requirement() {
        assert!(matches!(
            version_matches("24.3", "not a req"),
            Err(ValueError::InvalidRequirement { .. })
        ));
    }
}
