//! Caller identity threaded explicitly through every operation that needs it.
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Director,
    Hr,
    Staff,
    Manager,
}

impl Role {
    /// Numeric code understood by the request service in `X-Role`.
    pub fn code(&self) -> i64 {
        match self {
            Role::Director => 0,
            Role::Hr => 1,
            Role::Staff => 2,
            Role::Manager => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Role::Director),
            1 => Some(Role::Hr),
            2 => Some(Role::Staff),
            3 => Some(Role::Manager),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => "director",
            Role::Hr => "hr",
            Role::Staff => "staff",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("department must be non-empty")]
    MissingDepartment,
}

impl FromStr for Role {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Role::from_code(code).ok_or_else(|| ContextError::UnknownRole(s.to_string()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "director" => Ok(Role::Director),
            "hr" => Ok(Role::Hr),
            "staff" => Ok(Role::Staff),
            "manager" => Ok(Role::Manager),
            _ => Err(ContextError::UnknownRole(s.to_string())),
        }
    }
}

/// Who is asking. Built once by the caller and passed down; nothing in the
/// crate reads identity from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    staff_id: i64,
    role: Role,
    department: String,
}

impl RequestContext {
    pub fn new(staff_id: i64, role: Role, department: impl Into<String>) -> Result<Self, ContextError> {
        let department = department.into().trim().to_string();
        if department.is_empty() {
            return Err(ContextError::MissingDepartment);
        }
        Ok(Self {
            staff_id,
            role,
            department,
        })
    }

    pub fn staff_id(&self) -> i64 {
        self.staff_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    /// Header pairs identifying the caller to the request service.
    pub fn identity_headers(&self) -> [(&'static str, String); 3] {
        [
            ("X-Role", self.role.code().to_string()),
            ("X-Staff-ID", self.staff_id.to_string()),
            ("X-Department", self.department.clone()),
        ]
    }
}
