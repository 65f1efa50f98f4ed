use crate::{data::ResponseData, error::Error, util};

pub fn assert_status(response: &ResponseData, expected: u16) -> Result<(), Error> {
    if response.status_code == expected {
        Ok(())
    } else {
        Err(Error::assertion(
            "Response code",
            expected,
            response.status_code,
        ))
    }
}

pub fn assert_body(response: &ResponseData, expected: &str) -> Result<(), Error> {
    if response.body == expected {
        Ok(())
    } else {
        Err(Error::assertion("Response body", expected, &response.body))
    }
}

/// Compares bodies with all whitespace removed from both sides.
pub fn assert_body_normalized(response: &ResponseData, expected: &str) -> Result<(), Error> {
    let expected = util::strip_whitespace(expected);
    let actual = util::strip_whitespace(&response.body);

    if actual == expected {
        Ok(())
    } else {
        Err(Error::assertion("Normalized response body", expected, actual))
    }
}

pub fn assert_body_contains(response: &ResponseData, fragment: &str) -> Result<(), Error> {
    if response.body.contains(fragment) {
        Ok(())
    } else {
        Err(Error::assertion(
            "Response body containment",
            format!("a body containing '{}'", fragment),
            &response.body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> ResponseData {
        ResponseData::new(200, "{\"status\":\"ready\"}")
    }

    #[test]
    fn status_must_match_exactly() {
        assert!(assert_status(&ready(), 200).is_ok());

        let error = assert_status(&ready(), 404).unwrap_err();
        assert!(error.is_assertion_failure());
        assert_eq!(
            error.to_string(),
            "Response code mismatch. Expected: \"404\". Actual: \"200\""
        );
    }

    #[test]
    fn exact_body_is_whitespace_sensitive() {
        assert!(assert_body(&ready(), "{\"status\":\"ready\"}").is_ok());
        assert!(assert_body(&ready(), "{ \"status\": \"ready\" }").is_err());
    }

    #[test]
    fn normalized_body_ignores_formatting() {
        let pretty = "{\n    \"status\": \"ready\"\n}\n";
        assert!(assert_body_normalized(&ready(), pretty).is_ok());
        assert!(assert_body_normalized(&ready(), "{\"status\":\"busy\"}").is_err());
    }

    #[test]
    fn containment_looks_for_a_substring() {
        assert!(assert_body_contains(&ready(), "ready").is_ok());
        assert!(assert_body_contains(&ready(), "").is_ok());
        assert!(assert_body_contains(&ready(), "failed").is_err());
    }
}
