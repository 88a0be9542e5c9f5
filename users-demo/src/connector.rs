//! `UserConnector`: stores and retrieves `User` entities through the record
//! client.
//!
//! Demonstrates the intended error-absorption points: a create can be asked
//! to tolerate an existing user, and a lookup reports absence as `None`
//! rather than an error. `add_interest` uses an update-only operate batch so
//! it never creates a user as a side effect.

use asrest_core::{
    ApiError, BinValue, Encoding, Operation, QueryParams, RestClient, UserKey,
};
use tracing::debug;

use crate::transport;
use crate::user::{string_list, User};

pub struct UserConnector {
    client: RestClient,
    agent: ureq::Agent,
    namespace: String,
    set_name: String,
}

impl UserConnector {
    pub fn new(client: RestClient, namespace: &str, set_name: &str) -> UserConnector {
        UserConnector {
            client,
            agent: transport::agent(),
            namespace: namespace.to_string(),
            set_name: set_name.to_string(),
        }
    }

    /// Store a new user. Never updates an existing one; when
    /// `error_if_exists` is false, an existing user with the same id is
    /// silently tolerated.
    pub fn create_user(&self, user: &User, error_if_exists: bool) -> Result<(), ApiError> {
        let key = UserKey::Str(user.id.clone());
        let req = self.client.build_create_record(
            &self.namespace,
            &self.set_name,
            &key,
            &user.to_bins(),
            &QueryParams::none(),
        )?;
        let response = transport::execute(&self.agent, req)?;
        match self.client.parse_create_record(response) {
            Err(ApiError::RecordExists) if !error_if_exists => {
                debug!(id = %user.id, "user already exists, ignoring");
                Ok(())
            }
            result => result,
        }
    }

    /// Look up a user by id. Absence is not an error: a missing record
    /// returns `None`.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>, ApiError> {
        let key = UserKey::from(user_id);
        let req = self.client.build_get_record(
            &self.namespace,
            &self.set_name,
            &key,
            &QueryParams::none(),
            Encoding::Json,
        );
        let response = transport::execute(&self.agent, req)?;
        match self.client.parse_get_record(response) {
            Ok(record) => Ok(Some(User::from_bins(&record.bins)?)),
            Err(ApiError::RecordNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Append an interest to an existing user's list and return the updated
    /// list. Fails with `RecordNotFound` rather than creating a new user.
    pub fn add_interest(&self, user_id: &str, interest: &str) -> Result<Vec<String>, ApiError> {
        let key = UserKey::from(user_id);
        let ops = [
            Operation::list_append("interests", interest),
            Operation::read("interests"),
        ];
        let req = self.client.build_operate_record(
            &self.namespace,
            &self.set_name,
            &key,
            &ops,
            &QueryParams::update_only(),
            Encoding::Json,
        )?;
        let response = transport::execute(&self.agent, req)?;
        let view = self.client.parse_operate_record(response)?;
        debug!(id = %user_id, %interest, "appended interest");

        // Both operations produce a result for the `interests` bin, so the
        // fold is a two-entry list: the new length, then the read-back list.
        match view.bins.get("interests") {
            Some(BinValue::List(results)) => match results.get(1) {
                Some(BinValue::List(items)) => string_list(items, "interests"),
                _ => Err(missing_read_back()),
            },
            _ => Err(missing_read_back()),
        }
    }
}

fn missing_read_back() -> ApiError {
    ApiError::DeserializationError(
        "operate response is missing the interests read-back".to_string(),
    )
}
