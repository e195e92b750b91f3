//! Resident accounts and signup validation.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::auth::password::{PlainPassword, StoredCredential};

/// Longest accepted full name, in characters
pub const MAX_FULL_NAME_LEN: usize = 150;

/// Role a resident signs up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Security,
    Secretary,
    FlatOwner,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Security, Role::Secretary, Role::FlatOwner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Security => "security",
            Role::Secretary => "secretary",
            Role::FlatOwner => "flat_owner",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Security => "Security",
            Role::Secretary => "Secretary",
            Role::FlatOwner => "Flat Owner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "security" => Ok(Role::Security),
            "secretary" => Ok(Role::Secretary),
            "flat_owner" => Ok(Role::FlatOwner),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// A 10-digit contact number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactNumber(String);

impl ContactNumber {
    pub fn parse(value: &str) -> Option<Self> {
        is_digits(value, 10).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for ContactNumber {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for ContactNumber {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        ContactNumber::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("Invalid contact number: {}", raw).into()))
    }
}

/// A 12-digit Aadhar (national ID) number. Only held in memory; stored sealed.
#[derive(Clone, PartialEq, Eq)]
pub struct AadharNumber(String);

impl AadharNumber {
    pub fn parse(value: &str) -> Option<Self> {
        is_digits(value, 12).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form showing only the last four digits, e.g. `XXXX XXXX 9012`
    pub fn masked(&self) -> String {
        format!("XXXX XXXX {}", &self.0[8..])
    }
}

impl std::fmt::Debug for AadharNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AadharNumber({})", self.masked())
    }
}

/// Form field names, used to attach validation messages to inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Role,
    FullName,
    ContactNumber,
    AadharNumber,
    DateOfBirth,
    Password,
    ProfileImage,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Role => "role",
            Field::FullName => "full_name",
            Field::ContactNumber => "contact_number",
            Field::AadharNumber => "aadhar_number",
            Field::DateOfBirth => "dob",
            Field::Password => "password",
            Field::ProfileImage => "profile_image",
        }
    }
}

/// One failing field with its user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

/// Every field that failed validation, in form order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.push(ValidationError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn fields(&self) -> Vec<Field> {
        self.0.iter().map(|e| e.field).collect()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field.as_str(), e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Raw signup form values as submitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub aadhar_number: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub password: String,
}

/// A validated signup, ready to be hashed and stored
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub role: Role,
    pub full_name: String,
    pub contact_number: ContactNumber,
    pub aadhar_number: AadharNumber,
    pub date_of_birth: NaiveDate,
    pub password: PlainPassword,
}

impl NewAccount {
    /// Validate every field, collecting all failures. `today` bounds the birth date.
    pub fn validate(form: &SignupForm, today: NaiveDate) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let role = form.role.trim().parse::<Role>().ok();
        if role.is_none() {
            errors.push(Field::Role, "Select a valid role.");
        }

        let full_name = form.full_name.trim().to_string();
        if full_name.is_empty() {
            errors.push(Field::FullName, "This field is required.");
        } else if full_name.chars().count() > MAX_FULL_NAME_LEN {
            errors.push(
                Field::FullName,
                format!("Ensure this value has at most {} characters.", MAX_FULL_NAME_LEN),
            );
        }

        let contact_number = ContactNumber::parse(form.contact_number.trim());
        if contact_number.is_none() {
            errors.push(Field::ContactNumber, "Enter a valid 10-digit contact number.");
        }

        let aadhar_number = AadharNumber::parse(form.aadhar_number.trim());
        if aadhar_number.is_none() {
            errors.push(Field::AadharNumber, "Enter a valid 12-digit Aadhar number.");
        }

        let date_of_birth = match NaiveDate::parse_from_str(form.dob.trim(), "%Y-%m-%d") {
            Ok(date) if date > today => {
                errors.push(Field::DateOfBirth, "Date of birth cannot be in the future.");
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(Field::DateOfBirth, "Enter a valid date.");
                None
            }
        };

        let password = PlainPassword::new(form.password.clone());
        if !password.is_long_enough() {
            errors.push(
                Field::Password,
                format!(
                    "Ensure this value has at least {} characters (it has {}).",
                    crate::auth::password::MIN_PASSWORD_LEN,
                    password.char_len()
                ),
            );
        }

        match (role, contact_number, aadhar_number, date_of_birth) {
            (Some(role), Some(contact_number), Some(aadhar_number), Some(date_of_birth))
                if errors.is_empty() =>
            {
                Ok(NewAccount {
                    role,
                    full_name,
                    contact_number,
                    aadhar_number,
                    date_of_birth,
                    password,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Aadhar number encrypted for storage (hex of nonce || ciphertext)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedAadhar(pub String);

/// A stored resident account
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub role: Role,
    pub full_name: String,
    pub contact_number: ContactNumber,
    pub aadhar: SealedAadhar,
    pub date_of_birth: NaiveDate,
    pub password_hash: StoredCredential,
    pub created_at: DateTime<Utc>,
    pub profile_image: Option<String>,
}

impl Account {
    /// Profile image URL under /media, if one was uploaded
    pub fn profile_image_url(&self) -> Option<String> {
        self.profile_image
            .as_ref()
            .map(|path| format!("/media/{}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
    }

    fn valid_form() -> SignupForm {
        SignupForm {
            role: "flat_owner".to_string(),
            full_name: "Anil Joshi".to_string(),
            contact_number: "9876543210".to_string(),
            aadhar_number: "123456789012".to_string(),
            dob: "1985-04-12".to_string(),
            password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_valid_signup() {
        let account = NewAccount::validate(&valid_form(), today()).unwrap();
        assert_eq!(account.role, Role::FlatOwner);
        assert_eq!(account.contact_number.as_str(), "9876543210");
        assert_eq!(account.date_of_birth, NaiveDate::from_ymd_opt(1985, 4, 12).unwrap());
    }

    #[test]
    fn test_contact_number_shapes() {
        for bad in ["987654321", "98765432100", "98765a3210", "", "+919876543", "９８７６５４３２１０"] {
            let form = SignupForm {
                contact_number: bad.to_string(),
                ..valid_form()
            };
            let errors = NewAccount::validate(&form, today()).unwrap_err();
            assert_eq!(errors.fields(), vec![Field::ContactNumber], "input {:?}", bad);
            assert_eq!(
                errors.get(Field::ContactNumber),
                Some("Enter a valid 10-digit contact number.")
            );
        }
    }

    #[test]
    fn test_aadhar_shapes() {
        for bad in ["12345678901", "1234567890123", "1234 5678 9012", "abcdefghijkl"] {
            let form = SignupForm {
                aadhar_number: bad.to_string(),
                ..valid_form()
            };
            let errors = NewAccount::validate(&form, today()).unwrap_err();
            assert_eq!(errors.fields(), vec![Field::AadharNumber], "input {:?}", bad);
        }
    }

    #[test]
    fn test_short_password() {
        let form = SignupForm {
            password: "12345".to_string(),
            ..valid_form()
        };
        let errors = NewAccount::validate(&form, today()).unwrap_err();
        assert_eq!(errors.fields(), vec![Field::Password]);
    }

    #[test]
    fn test_collects_every_failing_field() {
        let form = SignupForm {
            role: "admin".to_string(),
            full_name: "   ".to_string(),
            dob: "12/04/1985".to_string(),
            ..valid_form()
        };
        let errors = NewAccount::validate(&form, today()).unwrap_err();
        assert_eq!(
            errors.fields(),
            vec![Field::Role, Field::FullName, Field::DateOfBirth]
        );
    }

    #[test]
    fn test_future_birth_date() {
        let form = SignupForm {
            dob: "2030-01-01".to_string(),
            ..valid_form()
        };
        let errors = NewAccount::validate(&form, today()).unwrap_err();
        assert_eq!(errors.fields(), vec![Field::DateOfBirth]);
    }

    #[test]
    fn test_full_name_length() {
        let form = SignupForm {
            full_name: "a".repeat(MAX_FULL_NAME_LEN + 1),
            ..valid_form()
        };
        assert!(NewAccount::validate(&form, today()).is_err());

        let form = SignupForm {
            full_name: "a".repeat(MAX_FULL_NAME_LEN),
            ..valid_form()
        };
        assert!(NewAccount::validate(&form, today()).is_ok());
    }

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(Role::FlatOwner.label(), "Flat Owner");
    }

    #[test]
    fn test_aadhar_masking() {
        let aadhar = AadharNumber::parse("123456789012").unwrap();
        assert_eq!(aadhar.masked(), "XXXX XXXX 9012");
        assert!(!format!("{:?}", aadhar).contains("12345678"));
    }
}
