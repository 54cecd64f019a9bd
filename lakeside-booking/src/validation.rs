use chrono::NaiveDate;
use lakeside_core::{GuestInfo, ValidationRule};
use validator::{Validate, ValidationErrors};

/// Guest-supplied fields of a booking request, checked with `validator`.
#[derive(Debug, Validate)]
struct GuestFields {
    #[validate(length(min = 1))]
    full_name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    phone: String,
    #[validate(range(min = 1))]
    adults: u32,
}

impl GuestFields {
    fn new(guest: &GuestInfo, adults: u32) -> Self {
        Self {
            full_name: guest.full_name.trim().to_string(),
            email: guest.email.expose().trim().to_string(),
            phone: guest.phone.expose().trim().to_string(),
            adults,
        }
    }
}

pub fn validate_guest(guest: &GuestInfo, adults: u32) -> Result<(), ValidationRule> {
    GuestFields::new(guest, adults).validate().map_err(first_rule)
}

/// Report the first failing field, in form order.
fn first_rule(errors: ValidationErrors) -> ValidationRule {
    let fields = errors.field_errors();
    for field in ["full_name", "email", "phone"] {
        if fields.contains_key(field) {
            return ValidationRule::MissingGuestField(field);
        }
    }
    ValidationRule::InvalidGuestCount
}

/// Checks a stay window and returns its length in nights.
pub fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
    today: NaiveDate,
    max_stay_nights: i64,
) -> Result<i64, ValidationRule> {
    if check_in < today {
        return Err(ValidationRule::CheckInInPast(check_in));
    }
    if check_out <= check_in {
        return Err(ValidationRule::CheckOutNotAfterCheckIn);
    }
    let nights = (check_out - check_in).num_days();
    if nights > max_stay_nights {
        return Err(ValidationRule::StayTooLong { nights, max: max_stay_nights });
    }
    Ok(nights)
}

pub fn validate_amount(amount: i64) -> Result<(), ValidationRule> {
    if amount < 0 {
        return Err(ValidationRule::NegativeAmount);
    }
    Ok(())
}
