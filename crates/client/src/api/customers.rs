//! Customer collection endpoints.

use customer_desk_core::{Customer, CustomerDraft, CustomerId};
use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument};

use super::{ApiClient, ApiError};
use crate::session::Session;

const CUSTOMERS_PATH: &str = "cms/customers/";

fn customer_path(id: CustomerId) -> String {
    format!("{CUSTOMERS_PATH}{id}/")
}

impl ApiClient {
    /// Fetch every customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without a session or when the
    /// token is rejected.
    #[instrument(skip(self, session))]
    pub async fn list_customers(&self, session: &Session) -> Result<Vec<Customer>, ApiError> {
        let url = self.endpoint(CUSTOMERS_PATH)?;
        let response = self.send_authorized(session, self.http().get(url)).await?;
        let customers: Vec<Customer> = Self::handle_response(response).await?;
        debug!(count = customers.len(), "customers fetched");
        Ok(customers)
    }

    /// Create a customer. Sent as multipart when the draft carries a photo.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` when the server rejects a field.
    #[instrument(skip(self, session, draft), fields(email = %draft.email))]
    pub async fn create_customer(
        &self,
        session: &Session,
        draft: &CustomerDraft,
    ) -> Result<Customer, ApiError> {
        let url = self.endpoint(CUSTOMERS_PATH)?;
        let request = with_body(self.http().post(url), draft)?;
        let response = self.send_authorized(session, request).await?;
        let customer: Customer = Self::handle_response(response).await?;
        debug!(id = %customer.id, "customer created");
        Ok(customer)
    }

    /// Replace every field of an existing customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the customer no longer exists.
    #[instrument(skip(self, session, draft))]
    pub async fn update_customer(
        &self,
        session: &Session,
        id: CustomerId,
        draft: &CustomerDraft,
    ) -> Result<Customer, ApiError> {
        let url = self.endpoint(&customer_path(id))?;
        let request = with_body(self.http().put(url), draft)?;
        let response = self.send_authorized(session, request).await?;
        Self::handle_response(response).await
    }

    /// Delete a customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the customer no longer exists.
    #[instrument(skip(self, session))]
    pub async fn delete_customer(&self, session: &Session, id: CustomerId) -> Result<(), ApiError> {
        let url = self.endpoint(&customer_path(id))?;
        let response = self.send_authorized(session, self.http().delete(url)).await?;

        if response.status().is_success() {
            debug!("customer deleted");
            return Ok(());
        }

        Err(Self::parse_error(response).await)
    }
}

/// JSON body, or multipart with a `photo` part when a file is attached.
fn with_body(
    request: reqwest::RequestBuilder,
    draft: &CustomerDraft,
) -> Result<reqwest::RequestBuilder, ApiError> {
    let Some(photo) = &draft.photo else {
        return Ok(request.json(draft));
    };

    let form = draft
        .text_fields()
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));
    let part = Part::bytes(photo.bytes.clone())
        .file_name(photo.file_name.clone())
        .mime_str(&photo.content_type)?;
    Ok(request.multipart(form.part("photo", part)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_path() {
        assert_eq!(customer_path(CustomerId::new(42)), "cms/customers/42/");
    }
}
