//! The `User` entity and its mapping onto record bins.

use asrest_core::{ApiError, BinValue, Bins};

/// A demo application entity, mapped 1:1 onto a record's bins.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub interests: Vec<String>,
}

impl User {
    pub fn new(id: &str, name: &str, email: &str, interests: &[&str]) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            interests: interests.iter().map(|i| i.to_string()).collect(),
        }
    }

    /// Render the user as a bin map for storage.
    pub fn to_bins(&self) -> Bins {
        let mut bins = Bins::new();
        bins.insert("id".to_string(), self.id.as_str().into());
        bins.insert("name".to_string(), self.name.as_str().into());
        bins.insert("email".to_string(), self.email.as_str().into());
        bins.insert(
            "interests".to_string(),
            BinValue::List(self.interests.iter().map(|i| i.as_str().into()).collect()),
        );
        bins
    }

    /// Rebuild a user from a retrieved bin map. A missing `interests` bin
    /// decodes as an empty list.
    pub fn from_bins(bins: &Bins) -> Result<User, ApiError> {
        let interests = match bins.get("interests") {
            Some(BinValue::List(items)) => string_list(items, "interests")?,
            None => Vec::new(),
            Some(_) => return Err(shape_error("interests")),
        };
        Ok(User {
            id: string_bin(bins, "id")?,
            name: string_bin(bins, "name")?,
            email: string_bin(bins, "email")?,
            interests,
        })
    }
}

fn string_bin(bins: &Bins, name: &str) -> Result<String, ApiError> {
    match bins.get(name) {
        Some(BinValue::Str(s)) => Ok(s.clone()),
        _ => Err(shape_error(name)),
    }
}

pub(crate) fn string_list(items: &[BinValue], name: &str) -> Result<Vec<String>, ApiError> {
    items
        .iter()
        .map(|item| match item {
            BinValue::Str(s) => Ok(s.clone()),
            _ => Err(shape_error(name)),
        })
        .collect()
}

fn shape_error(name: &str) -> ApiError {
    ApiError::DeserializationError(format!("bin '{name}' has an unexpected shape"))
}
