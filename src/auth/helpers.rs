#[derive(Debug, PartialEq, Eq)]
pub enum TokenExtractionError {
    InvalidScheme,
    EmptyToken,
}

/// Extracts a bearer token from an Authorization header.
/// Returns None if no auth header is present.
pub fn extract_bearer_token(
    auth_header: Option<&str>,
) -> Result<Option<&str>, TokenExtractionError> {
    let Some(header) = auth_header else {
        return Ok(None);
    };

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(TokenExtractionError::InvalidScheme)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenExtractionError::InvalidScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenExtractionError::EmptyToken);
    }

    Ok(Some(token))
}
