//! Create/edit form lifecycle.
//!
//! Opening a form fetches the customer collection to learn which cities may
//! be chosen; a form with no cities to offer cannot be submitted. Input is
//! validated locally before anything is sent, and a successful submit hands
//! the server's record to the [`CustomerTable`] and resets the form.

use customer_desk_core::validation::validate;
use customer_desk_core::{AllowedCities, Customer, CustomerDraft, CustomerId, FormState, ValidationErrors};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::api::{ApiClient, ApiError};
use crate::session::Session;
use crate::table::{Completion, CustomerTable, TableError};

/// Errors surfaced by the form.
#[derive(Debug, Error)]
pub enum FormError {
    /// The city list is empty or could not be fetched.
    #[error("No cities available; customers can only be added to a city already on file")]
    NoCitiesAvailable,

    /// Local validation failed; nothing was sent.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationErrors),

    /// No session, or the server rejected the token.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The server rejected or failed the save.
    #[error(transparent)]
    SaveFailed(TableError),
}

impl FormError {
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}

impl From<TableError> for FormError {
    fn from(error: TableError) -> Self {
        match error {
            TableError::Unauthenticated => Self::Unauthenticated,
            other => Self::SaveFailed(other),
        }
    }
}

/// Whether the form creates a new customer or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(CustomerId),
}

/// An open create/edit form.
#[derive(Debug)]
pub struct CustomerForm {
    mode: FormMode,
    state: FormState,
    cities: AllowedCities,
}

impl CustomerForm {
    /// Open an empty create form.
    ///
    /// # Errors
    ///
    /// Returns `FormError::NoCitiesAvailable` if there are no cities to
    /// choose from, `FormError::Unauthenticated` if the session is missing
    /// or rejected.
    pub async fn create(api: &ApiClient, session: &Session) -> Result<Self, FormError> {
        Self::mount(FormMode::Create, FormState::new(), api, session).await
    }

    /// Open an edit form prefilled from `customer`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn edit(customer: &Customer, api: &ApiClient, session: &Session) -> Result<Self, FormError> {
        Self::mount(
            FormMode::Edit(customer.id),
            FormState::from_customer(customer),
            api,
            session,
        )
        .await
    }

    /// Open a form, fetching the allowed cities.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    #[instrument(skip(state, api, session))]
    pub async fn mount(
        mode: FormMode,
        state: FormState,
        api: &ApiClient,
        session: &Session,
    ) -> Result<Self, FormError> {
        let cities = match api.list_customers(session).await {
            Ok(customers) => AllowedCities::from_customers(&customers),
            Err(ApiError::Unauthenticated) => return Err(FormError::Unauthenticated),
            Err(e) => {
                warn!(error = %e, "failed to fetch cities");
                return Err(FormError::NoCitiesAvailable);
            }
        };
        Self::with_cities(mode, state, cities)
    }

    /// Open a form with an already known city set.
    ///
    /// # Errors
    ///
    /// Returns `FormError::NoCitiesAvailable` if `cities` is empty.
    pub fn with_cities(mode: FormMode, state: FormState, cities: AllowedCities) -> Result<Self, FormError> {
        if cities.is_empty() {
            return Err(FormError::NoCitiesAvailable);
        }
        debug!(cities = cities.as_slice().len(), "form opened");
        Ok(Self { mode, state, cities })
    }

    #[must_use]
    pub const fn mode(&self) -> FormMode {
        self.mode
    }

    #[must_use]
    pub const fn state(&self) -> &FormState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    /// Cities the city field may be set to.
    #[must_use]
    pub const fn cities(&self) -> &AllowedCities {
        &self.cities
    }

    /// Validate the current input without sending it.
    ///
    /// # Errors
    ///
    /// Returns every field problem as `FormError::Invalid`.
    pub fn validate(&self) -> Result<CustomerDraft, FormError> {
        Ok(validate(&self.state, &self.cities)?)
    }

    /// Validate and send. On success the form is reset and the saved record
    /// has been applied to `table`.
    ///
    /// # Errors
    ///
    /// Returns `FormError::Invalid` without sending anything when local
    /// validation fails, or the table's error when the save fails. Input is
    /// kept on error so it can be corrected.
    #[instrument(skip(self, table), fields(mode = ?self.mode))]
    pub async fn submit(&mut self, table: &CustomerTable) -> Result<Completion<Customer>, FormError> {
        let draft = self.validate()?;
        let completion = match self.mode {
            FormMode::Create => table.create(&draft).await?,
            FormMode::Edit(id) => table.update(id, &draft).await?,
        };
        self.state.clear();
        Ok(completion)
    }

    /// Close the form, discarding its input.
    pub fn cancel(self) {
        debug!(mode = ?self.mode, "form cancelled");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use customer_desk_core::Field;
    use url::Url;

    use super::*;

    fn cities() -> AllowedCities {
        ["Colombo", "Kandy"].into_iter().collect()
    }

    #[test]
    fn test_empty_city_set_blocks_the_form() {
        let err = CustomerForm::with_cities(FormMode::Create, FormState::new(), AllowedCities::default())
            .unwrap_err();
        assert!(matches!(err, FormError::NoCitiesAvailable));
    }

    #[test]
    fn test_validate_reports_invalid_input() {
        let mut form = CustomerForm::with_cities(FormMode::Create, FormState::new(), cities()).unwrap();
        form.state_mut().set_text(Field::City, "Jaffna");
        let FormError::Invalid(errors) = form.validate().unwrap_err() else {
            panic!("expected validation errors");
        };
        assert!(errors.get(Field::City).is_some());
        assert!(errors.get(Field::Email).is_some());
    }

    #[tokio::test]
    async fn test_invalid_submit_sends_nothing_and_keeps_input() {
        let api = ApiClient::new(Url::parse("http://127.0.0.1:9/").unwrap()).unwrap();
        let table = CustomerTable::mount(api, Session::in_memory());
        let mut form = CustomerForm::with_cities(FormMode::Create, FormState::new(), cities()).unwrap();
        form.state_mut().set_text(Field::FirstName, "A");

        let err = form.submit(&table).await.unwrap_err();
        assert!(matches!(err, FormError::Invalid(_)));
        assert_eq!(form.state().text(Field::FirstName).as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_mount_without_session_is_unauthenticated() {
        let api = ApiClient::new(Url::parse("http://127.0.0.1:9/").unwrap()).unwrap();
        let err = CustomerForm::create(&api, &Session::in_memory()).await.unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[test]
    fn test_table_unauthenticated_maps_to_form_unauthenticated() {
        assert!(FormError::from(TableError::Unauthenticated).is_unauthenticated());
    }
}
