use serde::Deserialize;

/// Form body for `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub login_name: String,
    pub password: String,
    pub phone_number: String,
}

/// Form body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub phone_number: String,
}

/// Form body for `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub verification_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_form_field_names() {
        let form: RegisterForm = serde_json::from_str(
            r#"{"login_name": "alice", "password": "p@ss", "phone_number": "+15551234567"}"#,
        )
        .expect("deserialize");
        assert_eq!(form.login_name, "alice");
        assert_eq!(form.phone_number, "+15551234567");
    }

    #[test]
    fn verify_form_field_name() {
        let form: VerifyForm =
            serde_json::from_str(r#"{"verification_code": "123456"}"#).expect("deserialize");
        assert_eq!(form.verification_code, "123456");
    }
}
