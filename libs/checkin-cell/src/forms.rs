use regex::Regex;

use crate::models::{
    CheckinInput, Demographics, DemographicsInput, FormErrors, Intake, WalkinInput, WalkinIntake,
};

pub const REQUIRED: &str = "This field is required.";
pub const ONLY_WHITESPACE: &str = "Must not be only white spaces.";
pub const INVALID_SSN: &str = "Must enter valid US Social Security Number XXX-XX-XXXX";
pub const INVALID_PHONE: &str =
    "Phone numbers must be entered in the format: '+999999999999999'. Up to 15 digits allowed.";
pub const INVALID_ZIP: &str = "Enter a valid US zip code in the format 99999";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

pub const GENDERS: [&str; 3] = ["Male", "Female", "Other"];

const NAME_MAX_LENGTH: usize = 100;
const EMERGENCY_NAME_MAX_LENGTH: usize = 250;

// Numbers the SSA has taken out of circulation after they were published.
const PROMOTIONAL_SSNS: [&str; 2] = ["078-05-1120", "219-09-9999"];

fn too_long(max: usize, actual: usize) -> String {
    format!("Ensure this value has at most {} characters (it has {}).", max, actual)
}

fn push(errors: &mut FormErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

/// Validates and cleans the kiosk forms.
pub struct FormValidator {
    ssn: Regex,
    phone: Regex,
    zip: Regex,
    email: Regex,
}

impl FormValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            ssn: Regex::new(r"^(\d{3})[- ]?(\d{2})[- ]?(\d{4})$")?,
            phone: Regex::new(r"^\+?1?\d{9,15}$")?,
            zip: Regex::new(r"^\d{5}$")?,
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?,
        })
    }

    /// Returns the number in `XXX-XX-XXXX` form, or `None` when it is not a valid
    /// US social security number.
    pub fn normalize_ssn(&self, raw: &str) -> Option<String> {
        let caps = self.ssn.captures(raw.trim())?;
        let (area, group, serial) = (&caps[1], &caps[2], &caps[3]);

        if area == "000" || area == "666" || area.starts_with('9') || group == "00" || serial == "0000" {
            return None;
        }

        let normalized = format!("{}-{}-{}", area, group, serial);
        if PROMOTIONAL_SSNS.contains(&normalized.as_str()) {
            return None;
        }
        Some(normalized)
    }

    fn name(&self, errors: &mut FormErrors, field: &str, raw: &str) -> String {
        let name = raw.trim();
        let length = name.chars().count();
        if raw.is_empty() {
            push(errors, field, REQUIRED);
        } else if name.is_empty() {
            push(errors, field, ONLY_WHITESPACE);
        } else if length > NAME_MAX_LENGTH {
            push(errors, field, too_long(NAME_MAX_LENGTH, length));
        }
        name.to_string()
    }

    fn ssn_field(&self, errors: &mut FormErrors, raw: &str) -> String {
        const FIELD: &str = "social_security_number";
        if raw.is_empty() {
            push(errors, FIELD, REQUIRED);
            return String::new();
        }
        if raw.trim().is_empty() {
            push(errors, FIELD, ONLY_WHITESPACE);
            return String::new();
        }
        self.normalize_ssn(raw).unwrap_or_else(|| {
            push(errors, FIELD, INVALID_SSN);
            String::new()
        })
    }

    pub fn validate_checkin(&self, input: &CheckinInput) -> Result<Intake, FormErrors> {
        let mut errors = FormErrors::new();

        let intake = Intake {
            first_name: self.name(&mut errors, "first_name", &input.first_name),
            last_name: self.name(&mut errors, "last_name", &input.last_name),
            social_security_number: self.ssn_field(&mut errors, &input.social_security_number),
        };

        if errors.is_empty() { Ok(intake) } else { Err(errors) }
    }

    pub fn validate_walkin(&self, input: &WalkinInput) -> Result<WalkinIntake, FormErrors> {
        let identity = self.validate_checkin(&input.identity());
        let mut errors = identity.as_ref().err().cloned().unwrap_or_default();

        let gender = input.gender.trim();
        if gender.is_empty() {
            push(&mut errors, "gender", REQUIRED);
        } else if !GENDERS.contains(&gender) {
            push(
                &mut errors,
                "gender",
                format!("Select a valid choice. {} is not one of the available choices.", gender),
            );
        }

        match identity {
            Ok(intake) if errors.is_empty() => Ok(WalkinIntake { intake, gender: gender.to_string() }),
            _ => Err(errors),
        }
    }

    pub fn validate_demographics(&self, input: &DemographicsInput) -> Result<Demographics, FormErrors> {
        let mut errors = FormErrors::new();

        let mut phone = |field: &str, raw: &str| {
            let value = raw.trim();
            if value.is_empty() {
                push(&mut errors, field, REQUIRED);
            } else if !self.phone.is_match(value) {
                push(&mut errors, field, INVALID_PHONE);
            }
            value.to_string()
        };
        let cell_phone = phone("cell_phone", &input.cell_phone);
        let emergency_contact_phone = phone("emergency_contact_phone", &input.emergency_contact_phone);

        let email = input.email.trim().to_string();
        if !email.is_empty() && !self.email.is_match(&email) {
            push(&mut errors, "email", INVALID_EMAIL);
        }

        let zip_code = input.zip_code.trim().to_string();
        if !zip_code.is_empty() && !self.zip.is_match(&zip_code) {
            push(&mut errors, "zip_code", INVALID_ZIP);
        }

        let emergency_contact_name = input.emergency_contact_name.trim().to_string();
        let length = emergency_contact_name.chars().count();
        if length > EMERGENCY_NAME_MAX_LENGTH {
            push(&mut errors, "emergency_contact_name", too_long(EMERGENCY_NAME_MAX_LENGTH, length));
        }

        let demographics = Demographics {
            cell_phone,
            email,
            zip_code,
            address: input.address.trim().to_string(),
            emergency_contact_phone,
            emergency_contact_name,
        };

        if errors.is_empty() { Ok(demographics) } else { Err(errors) }
    }
}
