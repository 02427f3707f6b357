use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// One-time authentication code: exactly six ASCII digits
    /// - Valid: "004211", "999999"
    /// - Invalid: "12345", "12a456", " 123456"
    pub static ref OTP_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();

    /// Gender as recorded at the registration desk
    pub static ref GENDER_REGEX: Regex = Regex::new(r"^(?i)(male|female|other)$").unwrap();
}
