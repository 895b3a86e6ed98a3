// Input validation utilities

use crate::error::{WizardError, WizardResult};
use crate::models::requests::{ConnectForm, ConnectionParams};

pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields";

/// Trimmed value, or `None` when nothing but whitespace was entered.
pub fn required_trimmed(value: &str) -> Option<&str> {
    let v = value.trim();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Parse a TCP port typed into the form.
pub fn parse_port(raw: &str) -> WizardResult<u16> {
    let s = raw.trim();
    match s.parse::<u16>() {
        Ok(0) | Err(_) => Err(WizardError::Validation(format!(
            "Invalid port '{}': expected a number between 1 and 65535",
            s
        ))),
        Ok(port) => Ok(port),
    }
}

/// Validate the connect form.
///
/// Host, port, username and schema must be non-empty after trimming. The password is checked
/// for emptiness only and is passed through untrimmed.
pub fn validate_connect_form(form: &ConnectForm) -> WizardResult<ConnectionParams> {
    let missing = || WizardError::Validation(MISSING_FIELDS_MESSAGE.to_string());

    let host = required_trimmed(&form.host).ok_or_else(missing)?;
    let port_raw = required_trimmed(&form.port).ok_or_else(missing)?;
    let username = required_trimmed(&form.username).ok_or_else(missing)?;
    if form.password.is_empty() {
        return Err(missing());
    }
    let schema = required_trimmed(&form.schema).ok_or_else(missing)?;

    let port = parse_port(port_raw)?;

    Ok(ConnectionParams {
        host: host.to_string(),
        port,
        username: username.to_string(),
        password: form.password.clone(),
        schema: schema.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn full_form() -> ConnectForm {
        ConnectForm {
            host: " db.example.com ".to_string(),
            port: "3306".to_string(),
            username: " analyst".to_string(),
            password: " secret ".to_string(),
            schema: "shop ".to_string(),
        }
    }

    #[test]
    fn valid_form_is_trimmed_except_password() {
        let p = validate_connect_form(&full_form()).unwrap();
        assert_eq!(p.host, "db.example.com");
        assert_eq!(p.port, 3306);
        assert_eq!(p.username, "analyst");
        assert_eq!(p.password, " secret ");
        assert_eq!(p.schema, "shop");
    }

    #[test]
    fn each_empty_field_is_a_validation_error() {
        let blankers: [fn(&mut ConnectForm); 5] = [
            |f: &mut ConnectForm| f.host = "   ".to_string(),
            |f: &mut ConnectForm| f.port = String::new(),
            |f: &mut ConnectForm| f.username = "\t".to_string(),
            |f: &mut ConnectForm| f.password = String::new(),
            |f: &mut ConnectForm| f.schema = " ".to_string(),
        ];

        for blank in blankers {
            let mut form = full_form();
            blank(&mut form);
            let err = validate_connect_form(&form).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(err.to_string(), MISSING_FIELDS_MESSAGE);
        }
    }

    #[test]
    fn whitespace_password_is_accepted() {
        let mut form = full_form();
        form.password = "  ".to_string();
        assert!(validate_connect_form(&form).is_ok());
    }

    #[test]
    fn bad_ports_are_rejected() {
        for raw in ["abc", "0", "70000", "-1", "33 06"] {
            let err = parse_port(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "port {:?}", raw);
        }
        assert_eq!(parse_port(" 5432 ").unwrap(), 5432);
    }
}
