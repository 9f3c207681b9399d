use thiserror::Error;

/// Malformed reservation input, rejected before any transaction starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one seat must be selected")]
    NoSeats,

    #[error("Seat numbers must be positive, got {0}")]
    InvalidSeatNumber(i32),

    #[error("Passenger name is required")]
    MissingName,

    #[error("Passenger phone must be a 10-digit number")]
    InvalidPhone,

    #[error("{0} is required")]
    MissingIdentifier(&'static str),

    #[error("{0} must be a valid id")]
    InvalidIdentifier(&'static str),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// Non-empty set of positive seat numbers, sorted ascending without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatSelection(Vec<i32>);

impl SeatSelection {
    pub fn new(seats: impl IntoIterator<Item = i32>) -> Result<Self, ValidationError> {
        let mut seats: Vec<i32> = seats.into_iter().collect();
        if let Some(bad) = seats.iter().copied().find(|n| *n <= 0) {
            return Err(ValidationError::InvalidSeatNumber(bad));
        }

        seats.sort_unstable();
        seats.dedup();

        if seats.is_empty() {
            return Err(ValidationError::NoSeats);
        }

        Ok(Self(seats))
    }

    pub fn numbers(&self) -> &[i32] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passenger {
    name: String,
    phone: String,
}

impl Passenger {
    pub fn new(name: &str, phone: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        let phone = phone.trim();
        if !is_valid_phone(phone) {
            return Err(ValidationError::InvalidPhone);
        }

        Ok(Self {
            name: name.to_string(),
            phone: phone.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_sorts_and_dedups() {
        let selection = SeatSelection::new([5, 3, 5, 4]).unwrap();
        assert_eq!(selection.numbers(), &[3, 4, 5]);
    }

    #[test]
    fn test_selection_rejects_empty_and_non_positive() {
        assert_eq!(SeatSelection::new([]), Err(ValidationError::NoSeats));
        assert_eq!(
            SeatSelection::new([2, 0]),
            Err(ValidationError::InvalidSeatNumber(0))
        );
        assert_eq!(
            SeatSelection::new([-3]),
            Err(ValidationError::InvalidSeatNumber(-3))
        );
    }

    #[test]
    fn test_passenger_validation() {
        let passenger = Passenger::new("  Asha ", "9811111111").unwrap();
        assert_eq!(passenger.name(), "Asha");
        assert_eq!(passenger.phone(), "9811111111");

        assert_eq!(Passenger::new(" ", "9811111111"), Err(ValidationError::MissingName));
        assert_eq!(Passenger::new("A", "981111111"), Err(ValidationError::InvalidPhone));
        assert_eq!(Passenger::new("A", "98111111112"), Err(ValidationError::InvalidPhone));
        assert_eq!(Passenger::new("A", "98111-1111"), Err(ValidationError::InvalidPhone));
    }
}
