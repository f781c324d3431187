use crate::error::AppError;
use crate::settings::ConnectionSettings;

/// True iff a credential is stored.
pub fn is_admin(settings: &ConnectionSettings) -> bool {
    !settings.token.trim().is_empty()
}

/// Gate in front of write-capable commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGate {
    open: bool,
}

impl AdminGate {
    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        Self { open: is_admin(settings) }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn require_open(&self, action: &str) -> Result<(), AppError> {
        if self.open {
            Ok(())
        } else {
            Err(AppError::user(
                "credential_missing".to_string(),
                format!("{} needs an admin token; run `settings save --token <token>` first", action),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_token_is_not_a_credential() {
        let mut s = ConnectionSettings::default();
        assert!(!is_admin(&s));
        s.token = "   ".into();
        assert!(!is_admin(&s));
        s.token = " ghp_x ".into();
        assert!(is_admin(&s));
    }

    #[test]
    fn closed_gate_refuses_with_user_error() {
        let gate = AdminGate::from_settings(&ConnectionSettings::default());
        let err = gate.require_open("upload").unwrap_err();
        assert_eq!(err.code_str(), "credential_missing");
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().starts_with("upload"));
    }
}
