//! Customer dashboard state.
//!
//! [`CustomerTable`] owns the fetched customer collection in fetch order,
//! plus the active sort and filter. The displayed order is never stored: it
//! is derived from the collection on every read through a
//! [`SortedView`], so create/update/delete only have to edit the collection.
//!
//! # Lifecycle
//!
//! A table is created by [`CustomerTable::mount`] and torn down by
//! [`CustomerTable::unmount`]. Requests still in flight when the table is
//! unmounted complete as [`Completion::Discarded`] without touching state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use customer_desk_core::{AllowedCities, Customer, CustomerDraft, CustomerId, SortKey, SortSpec, SortedView};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, ApiError, ServerErrors};
use crate::route::Route;
use crate::session::Session;

/// Question asked before a customer is deleted.
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this customer?";

/// Errors surfaced by table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// No session, or the server rejected the token. The session has been
    /// cleared; the user must log in again.
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Failed to load customers: {0}")]
    LoadFailed(#[source] ApiError),

    #[error("Failed to save customer: {0}")]
    SaveFailed(#[source] ApiError),

    #[error("Failed to delete customer: {0}")]
    DeleteFailed(#[source] ApiError),
}

impl TableError {
    fn classify(error: ApiError, wrap: fn(ApiError) -> Self) -> Self {
        match error {
            ApiError::Unauthenticated => Self::Unauthenticated,
            other => wrap(other),
        }
    }

    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Where the user should be sent after this error, if anywhere.
    #[must_use]
    pub const fn redirect(&self) -> Option<Route> {
        match self {
            Self::Unauthenticated => Some(Route::Login),
            _ => None,
        }
    }

    /// Field errors the server reported for a rejected save.
    #[must_use]
    pub fn server_errors(&self) -> Option<&ServerErrors> {
        match self {
            Self::SaveFailed(ApiError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}

/// Result of an operation that may finish after the table was unmounted.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    /// The result was applied to the table.
    Applied(T),
    /// The table was unmounted first; nothing was changed locally.
    Discarded,
}

impl<T> Completion<T> {
    #[must_use]
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Discarded => None,
        }
    }
}

/// Result of a delete request.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The server deleted the customer and it was removed locally.
    Deleted,
    /// The user declined; no request was sent.
    Declined,
    /// The table was unmounted before the request finished.
    Discarded,
}

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Default)]
struct TableState {
    customers: Vec<Customer>,
    sort: SortSpec,
    filter: String,
    loading: bool,
}

/// The customer dashboard.
///
/// Cheap to clone; clones share state and the mounted flag.
#[derive(Clone)]
pub struct CustomerTable {
    inner: Arc<TableInner>,
}

struct TableInner {
    api: ApiClient,
    session: Session,
    mounted: AtomicBool,
    state: RwLock<TableState>,
}

impl CustomerTable {
    /// Mount an empty table in the loading state. Call [`Self::load`] to
    /// fetch the collection.
    #[must_use]
    pub fn mount(api: ApiClient, session: Session) -> Self {
        Self {
            inner: Arc::new(TableInner {
                api,
                session,
                mounted: AtomicBool::new(true),
                state: RwLock::new(TableState {
                    loading: true,
                    ..TableState::default()
                }),
            }),
        }
    }

    /// Tear the table down. Later completions are discarded.
    pub fn unmount(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        debug!("customer table unmounted");
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Fetch the collection, replacing whatever was loaded before.
    ///
    /// Returns the number of customers loaded. The loading flag is cleared
    /// after every completed attempt.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Unauthenticated` without a session or when the
    /// token is rejected, `TableError::LoadFailed` otherwise.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Completion<usize>, TableError> {
        self.inner.state.write().await.loading = true;
        let result = self.inner.api.list_customers(&self.inner.session).await;

        let mut state = self.inner.state.write().await;
        if !self.is_mounted() {
            debug!("discarding customer list for unmounted table");
            return Ok(Completion::Discarded);
        }
        state.loading = false;

        match result {
            Ok(customers) => {
                let count = customers.len();
                state.customers = customers;
                info!(count, "customers loaded");
                Ok(Completion::Applied(count))
            }
            Err(e) => {
                warn!(error = %e, "failed to load customers");
                Err(TableError::classify(e, TableError::LoadFailed))
            }
        }
    }

    /// Select a sort column; selecting the active column flips direction.
    pub async fn set_sort(&self, key: SortKey) -> SortSpec {
        let mut state = self.inner.state.write().await;
        state.sort = state.sort.toggled(key);
        state.sort
    }

    /// Replace the sort outright.
    pub async fn set_sort_spec(&self, spec: SortSpec) {
        self.inner.state.write().await.sort = spec;
    }

    pub async fn sort_spec(&self) -> SortSpec {
        self.inner.state.read().await.sort
    }

    /// Show only customers matching `query`. A blank query shows everyone.
    pub async fn set_filter(&self, query: &str) {
        query.trim().clone_into(&mut self.inner.state.write().await.filter);
    }

    pub async fn filter(&self) -> String {
        self.inner.state.read().await.filter.clone()
    }

    /// Run `f` over the displayed rows without copying them.
    pub async fn with_view<R>(&self, f: impl FnOnce(&SortedView<'_>) -> R) -> R {
        let state = self.inner.state.read().await;
        let view = SortedView::new(&state.customers, state.sort, &state.filter);
        f(&view)
    }

    /// The displayed rows, in display order.
    pub async fn displayed(&self) -> Vec<Customer> {
        self.with_view(|view| view.to_vec()).await
    }

    /// The whole collection in fetch order, ignoring sort and filter.
    pub async fn customers(&self) -> Vec<Customer> {
        self.inner.state.read().await.customers.clone()
    }

    pub async fn get(&self, id: CustomerId) -> Option<Customer> {
        self.inner
            .state
            .read()
            .await
            .customers
            .iter()
            .find(|customer| customer.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.customers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.customers.is_empty()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.state.read().await.loading
    }

    /// Cities present in the loaded collection.
    pub async fn cities(&self) -> AllowedCities {
        AllowedCities::from_customers(&self.inner.state.read().await.customers)
    }

    /// Create a customer and append the server's record to the collection.
    ///
    /// # Errors
    ///
    /// Returns `TableError::SaveFailed` if the server rejects the draft.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: &CustomerDraft) -> Result<Completion<Customer>, TableError> {
        let result = self
            .inner
            .api
            .create_customer(&self.inner.session, draft)
            .await;

        let mut state = self.inner.state.write().await;
        if !self.is_mounted() {
            debug!("discarding created customer for unmounted table");
            return Ok(Completion::Discarded);
        }

        let customer = result.map_err(|e| {
            warn!(error = %e, "failed to create customer");
            TableError::classify(e, TableError::SaveFailed)
        })?;
        state.customers.push(customer.clone());
        info!(id = %customer.id, "customer created");
        Ok(Completion::Applied(customer))
    }

    /// Replace a customer and swap the server's record into its position.
    ///
    /// # Errors
    ///
    /// Returns `TableError::SaveFailed` if the server rejects the draft or
    /// the customer no longer exists.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        id: CustomerId,
        draft: &CustomerDraft,
    ) -> Result<Completion<Customer>, TableError> {
        let result = self
            .inner
            .api
            .update_customer(&self.inner.session, id, draft)
            .await;

        let mut state = self.inner.state.write().await;
        if !self.is_mounted() {
            debug!("discarding updated customer for unmounted table");
            return Ok(Completion::Discarded);
        }

        let customer = result.map_err(|e| {
            warn!(error = %e, "failed to update customer");
            TableError::classify(e, TableError::SaveFailed)
        })?;
        match state.customers.iter_mut().find(|existing| existing.id == id) {
            Some(slot) => slot.clone_from(&customer),
            None => debug!("updated customer is not in the loaded collection"),
        }
        info!("customer updated");
        Ok(Completion::Applied(customer))
    }

    /// Ask for confirmation, then delete a customer and drop it from the
    /// collection. Nothing is sent if the user declines.
    ///
    /// # Errors
    ///
    /// Returns `TableError::DeleteFailed` if the server refuses.
    #[instrument(skip(self, confirm))]
    pub async fn delete(
        &self,
        id: CustomerId,
        confirm: &impl Confirm,
    ) -> Result<DeleteOutcome, TableError> {
        if !confirm.confirm(DELETE_PROMPT) {
            debug!("delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        let result = self.inner.api.delete_customer(&self.inner.session, id).await;

        let mut state = self.inner.state.write().await;
        if !self.is_mounted() {
            debug!("discarding delete for unmounted table");
            return Ok(DeleteOutcome::Discarded);
        }

        result.map_err(|e| {
            warn!(error = %e, "failed to delete customer");
            TableError::classify(e, TableError::DeleteFailed)
        })?;
        state.customers.retain(|customer| customer.id != id);
        info!("customer deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

impl std::fmt::Debug for CustomerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerTable")
            .field("api", &self.inner.api)
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use url::Url;

    use super::*;

    fn unreachable_table() -> CustomerTable {
        let api = ApiClient::new(Url::parse("http://127.0.0.1:9/").unwrap()).unwrap();
        CustomerTable::mount(api, Session::in_memory())
    }

    #[tokio::test]
    async fn test_mount_starts_loading_and_empty() {
        let table = unreachable_table();
        assert!(table.is_mounted());
        assert!(table.is_loading().await);
        assert!(table.is_empty().await);
        assert!(table.displayed().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_without_session_is_unauthenticated() {
        let table = unreachable_table();
        let err = table.load().await.unwrap_err();
        assert!(err.is_unauthenticated());
        assert_eq!(err.redirect(), Some(Route::Login));
        assert!(!table.is_loading().await);
    }

    #[tokio::test]
    async fn test_load_after_unmount_is_discarded() {
        let table = unreachable_table();
        table.unmount();
        assert_eq!(table.load().await.unwrap(), Completion::Discarded);
    }

    #[tokio::test]
    async fn test_declined_delete_sends_nothing() {
        let table = unreachable_table();
        let asked = AtomicUsize::new(0);
        let outcome = table
            .delete(CustomerId::new(1), &|prompt: &str| {
                assert_eq!(prompt, DELETE_PROMPT);
                asked.fetch_add(1, Ordering::SeqCst);
                false
            })
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_sort_toggles() {
        let table = unreachable_table();
        let spec = table.set_sort(SortKey::CreditLimit).await;
        assert_eq!(spec.key(), Some(SortKey::CreditLimit));
        let spec = table.set_sort(SortKey::CreditLimit).await;
        assert_eq!(
            spec.direction(),
            Some(customer_desk_core::SortDirection::Descending)
        );
        assert_eq!(table.sort_spec().await, spec);
    }

    #[tokio::test]
    async fn test_set_filter_trims() {
        let table = unreachable_table();
        table.set_filter("  kandy ").await;
        assert_eq!(table.filter().await, "kandy");
    }

    #[test]
    fn test_error_classification() {
        assert!(TableError::classify(ApiError::Unauthenticated, TableError::LoadFailed)
            .is_unauthenticated());
        let err = TableError::classify(
            ApiError::NotFound("gone".into()),
            TableError::DeleteFailed,
        );
        assert!(matches!(err, TableError::DeleteFailed(ApiError::NotFound(_))));
        assert_eq!(err.redirect(), None);
    }

    #[test]
    fn test_server_errors_exposed_for_rejected_save() {
        let errors = ServerErrors::parse(r#"{"email": ["taken"]}"#).unwrap();
        let err = TableError::SaveFailed(ApiError::Validation(errors));
        assert_eq!(err.server_errors().unwrap().get("email").unwrap(), ["taken".to_string()]);
    }
}
