//! Token parameter values.
//!
//! The `system|code` grammar distinguishes four shapes: a bare code
//! matches any system, `|code` matches only entries without a system,
//! `system|` matches any code within the system, and `system|code` pins
//! both.

use super::ValueError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValue {
    /// `code`: match the code in any system.
    Code { code: String },
    /// `|code`: match the code only where no system is indexed.
    SystemlessCode { code: String },
    /// `system|`: match anything within the system.
    System { system: String },
    /// `system|code`: match both.
    SystemAndCode { system: String, code: String },
}

impl TokenValue {
    pub fn system(&self) -> Option<&str> {
        match self {
            TokenValue::System { system } | TokenValue::SystemAndCode { system, .. } => {
                Some(system)
            }
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            TokenValue::Code { code }
            | TokenValue::SystemlessCode { code }
            | TokenValue::SystemAndCode { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub(super) fn parse_branch(branch: &str) -> Result<TokenValue, ValueError> {
    if branch.is_empty() {
        return Err(ValueError::Empty);
    }
    let Some((system, code)) = branch.split_once('|') else {
        return Ok(TokenValue::Code {
            code: branch.to_string(),
        });
    };
    match (system.is_empty(), code.is_empty()) {
        (true, true) => Err(ValueError::Empty),
        (true, false) => Ok(TokenValue::SystemlessCode {
            code: code.to_string(),
        }),
        (false, true) => Ok(TokenValue::System {
            system: system.to_string(),
        }),
        (false, false) => Ok(TokenValue::SystemAndCode {
            system: system.to_string(),
            code: code.to_string(),
        }),
    }
}
