//! Customer list, add, edit and delete.
//!
//! # Usage
//!
//! ```bash
//! # List customers, highest credit limit first, only those in Kandy
//! cdesk customers list --sort credit_limit --desc --filter kandy
//!
//! # Add a customer (city must already be on file)
//! cdesk customers add --title Ms --category Domestic \
//!     --first-name Kamala --last-name Silva --email kamala@example.lk \
//!     --address-1 "1 Lake Drive" --city Colombo --mobile 0711234567 \
//!     --credit-limit 1500 --credit-period 30 --photo ./kamala.png
//!
//! # Change one field of customer 7
//! cdesk customers edit 7 --credit-limit 2500
//!
//! # Delete customer 7 without the confirmation prompt
//! cdesk customers delete 7 --yes
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use customer_desk_client::{
    Completion, CustomerForm, CustomerTable, DeleteOutcome, FormError, FormMode, Route,
};
use customer_desk_core::{Attachment, Customer, CustomerId, Field, FormState, SortDirection, SortKey, SortSpec};

use super::{CliError, Context};
use crate::prompt::{self, AssumeYes, StdinConfirm};
use crate::render::TableRenderer;

/// Field values for add/edit. Unset flags leave the field as it is; an
/// empty string clears an optional field.
#[derive(Debug, Default, Clone, Args)]
pub struct CustomerArgs {
    /// Mr, Mrs, Ms or Dr
    #[arg(long)]
    pub title: Option<String>,
    /// Domestic or International
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address_1: Option<String>,
    #[arg(long)]
    pub address_2: Option<String>,
    /// Must be a city some customer already has
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub mobile: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub credit_limit: Option<String>,
    /// Days
    #[arg(long)]
    pub credit_period: Option<String>,
    /// Image file to upload as the customer photo
    #[arg(long)]
    pub photo: Option<PathBuf>,
}

impl CustomerArgs {
    fn texts(&self) -> [(Field, Option<&String>); 13] {
        [
            (Field::Title, self.title.as_ref()),
            (Field::CustomerCategory, self.category.as_ref()),
            (Field::FirstName, self.first_name.as_ref()),
            (Field::LastName, self.last_name.as_ref()),
            (Field::Email, self.email.as_ref()),
            (Field::Address1, self.address_1.as_ref()),
            (Field::Address2, self.address_2.as_ref()),
            (Field::City, self.city.as_ref()),
            (Field::Mobile, self.mobile.as_ref()),
            (Field::Phone, self.phone.as_ref()),
            (Field::CompanyName, self.company.as_ref()),
            (Field::CreditLimit, self.credit_limit.as_ref()),
            (Field::CreditPeriod, self.credit_period.as_ref()),
        ]
    }

    /// Copy every given flag into `state`.
    async fn apply(&self, state: &mut FormState) -> Result<(), CliError> {
        for (field, value) in self.texts() {
            if let Some(value) = value {
                state.set_text(field, value.as_str());
            }
        }
        if let Some(path) = &self.photo {
            state.set_file(Field::Photo, load_photo(path).await?);
        }
        Ok(())
    }
}

/// Read an image from disk for upload.
pub async fn load_photo(path: &Path) -> Result<Attachment, CliError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::Usage(format!("not a file: {}", path.display())))?
        .to_string();
    Ok(Attachment {
        content_type: content_type(path).to_string(),
        file_name,
        bytes,
    })
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Print the customer table.
pub async fn list(
    ctx: &Context,
    sort: Option<SortKey>,
    descending: bool,
    filter: Option<&str>,
) -> Result<(), CliError> {
    ctx.enter(Route::Dashboard)?;
    let table = CustomerTable::mount(ctx.api.clone(), ctx.session.clone());
    let _ = table.load().await?;

    if let Some(key) = sort {
        let direction = if descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        table.set_sort_spec(SortSpec::by(key, direction)).await;
    }
    if let Some(filter) = filter {
        table.set_filter(filter).await;
    }

    let renderer = TableRenderer::new(ctx.theme);
    table
        .with_view(|view| renderer.render(&mut io::stdout().lock(), view))
        .await?;
    table.unmount();
    Ok(())
}

/// Create a customer from flags.
pub async fn add(ctx: &Context, args: &CustomerArgs) -> Result<(), CliError> {
    ctx.enter(Route::AddCustomer)?;
    let mut form = CustomerForm::create(&ctx.api, &ctx.session).await?;
    args.apply(form.state_mut()).await?;

    let table = CustomerTable::mount(ctx.api.clone(), ctx.session.clone());
    if let Completion::Applied(customer) = form.submit(&table).await? {
        writeln!(
            io::stdout().lock(),
            "Customer {} added: {}",
            customer.id,
            customer.full_name()
        )?;
    }
    table.unmount();
    Ok(())
}

/// Replace a customer, starting from its current values.
pub async fn edit(ctx: &Context, id: CustomerId, args: &CustomerArgs) -> Result<(), CliError> {
    ctx.enter(Route::Dashboard)?;
    let table = CustomerTable::mount(ctx.api.clone(), ctx.session.clone());
    let _ = table.load().await?;
    let customer = table.get(id).await.ok_or(CliError::NotFound(id))?;

    let mut form = CustomerForm::with_cities(
        FormMode::Edit(id),
        FormState::from_customer(&customer),
        table.cities().await,
    )?;
    args.apply(form.state_mut()).await?;

    if let Completion::Applied(customer) = form.submit(&table).await? {
        writeln!(
            io::stdout().lock(),
            "Customer {} updated: {}",
            customer.id,
            customer.full_name()
        )?;
    }
    table.unmount();
    Ok(())
}

/// Delete a customer after confirmation.
pub async fn delete(ctx: &Context, id: CustomerId, yes: bool) -> Result<(), CliError> {
    ctx.enter(Route::Dashboard)?;
    let table = CustomerTable::mount(ctx.api.clone(), ctx.session.clone());
    let outcome = if yes {
        table.delete(id, &AssumeYes).await?
    } else {
        table.delete(id, &StdinConfirm).await?
    };
    table.unmount();

    let mut out = io::stdout().lock();
    match outcome {
        DeleteOutcome::Deleted => writeln!(out, "Customer {id} deleted.")?,
        DeleteOutcome::Declined => writeln!(out, "Cancelled.")?,
        DeleteOutcome::Discarded => {}
    }
    Ok(())
}

/// The add-customer page: prompt for every field, then submit.
pub async fn add_interactive(ctx: &Context) -> Result<(), CliError> {
    ctx.enter(Route::AddCustomer)?;
    let mut form = CustomerForm::create(&ctx.api, &ctx.session).await?;
    let table = CustomerTable::mount(ctx.api.clone(), ctx.session.clone());
    let saved = fill_and_submit(&mut form, &table).await;
    table.unmount();

    let mut out = io::stdout().lock();
    match saved? {
        Some(customer) => writeln!(out, "Customer {} added: {}", customer.id, customer.full_name())?,
        None => writeln!(out, "Cancelled.")?,
    }
    Ok(())
}

/// Prompt until the form saves or input ends. Only fields that failed are
/// asked again. Returns `None` when cancelled.
pub async fn fill_and_submit(
    form: &mut CustomerForm,
    table: &CustomerTable,
) -> Result<Option<Customer>, CliError> {
    let mut pending: Vec<Field> = Field::ALL.to_vec();
    loop {
        if !prompt_fields(form, &pending).await? {
            return Ok(None);
        }

        match form.submit(table).await {
            Ok(completion) => return Ok(completion.applied()),
            Err(FormError::Invalid(errors)) => {
                let mut err = io::stderr().lock();
                for error in errors.errors() {
                    writeln!(err, "  {}: {}", label(error.field), error.error)?;
                }
                pending = errors.errors().iter().map(|e| e.field).collect();
            }
            Err(FormError::SaveFailed(e)) => {
                let fields: Vec<Field> = match e.server_errors() {
                    Some(server) => {
                        let mut err = io::stderr().lock();
                        for (name, messages) in server.iter() {
                            writeln!(err, "  {name}: {}", messages.join(" "))?;
                        }
                        server.iter().filter_map(|(name, _)| name.parse().ok()).collect()
                    }
                    None => Vec::new(),
                };
                if fields.is_empty() {
                    return Err(FormError::SaveFailed(e).into());
                }
                pending = fields;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn label(field: Field) -> String {
    field.as_str().replace('_', " ")
}

/// Ask for each of `fields`. Enter keeps the shown value, `-` clears it.
/// Returns `false` at end of input.
async fn prompt_fields(form: &mut CustomerForm, fields: &[Field]) -> Result<bool, CliError> {
    for &field in fields {
        let hint = match field {
            Field::Title => " (Mr, Mrs, Ms, Dr)".to_string(),
            Field::CustomerCategory => " (Domestic, International)".to_string(),
            Field::City => format!(" ({})", form.cities().as_slice().join(", ")),
            Field::Photo => " (image path)".to_string(),
            _ => String::new(),
        };
        let current = match field {
            Field::Photo => form
                .state()
                .file(Field::Photo)
                .map(|photo| photo.file_name.clone()),
            _ => form.state().text(field).map(|text| text.into_owned()),
        };
        let shown = current.map(|value| format!(" [{value}]")).unwrap_or_default();

        let Some(input) = prompt::read_line(&format!("{}{hint}{shown}: ", label(field))).await? else {
            return Ok(false);
        };
        match input.trim() {
            "" => {}
            "-" => {
                form.state_mut().remove(field);
            }
            value if field == Field::Photo => {
                let photo = load_photo(Path::new(value)).await?;
                form.state_mut().set_file(Field::Photo, photo);
            }
            value => form.state_mut().set_text(field, value),
        }
    }
    Ok(true)
}
