//! Interactive customer dashboard.
//!
//! Loads the collection once, then redraws the table after every command.
//! Failures show up as notices; only a lost session ends the loop early.

use std::io::{self, Write};

use customer_desk_client::{
    Completion, CustomerForm, CustomerTable, DeleteOutcome, FormMode, NoticeBoard, TableError,
};
use customer_desk_core::{CustomerId, FormState, SortKey};

use super::customers::fill_and_submit;
use super::{CliError, Context};
use crate::prompt::{self, StdinConfirm};
use crate::render::{self, TableRenderer};

const HELP: &str = "\
Commands:
  sort <column>   sort by a column; again to reverse
  filter [text]   show matching customers; blank shows all
  add             add a customer
  edit <id>       edit a customer
  delete <id>     delete a customer
  reload          fetch customers again
  logout          log out and leave
  help            show this help
  quit            leave the dashboard";

/// One line of dashboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Sort(SortKey),
    Filter(String),
    Add,
    Edit(CustomerId),
    Delete(CustomerId),
    Reload,
    Logout,
    Help,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let id = || {
            rest.parse::<CustomerId>()
                .map_err(|_| format!("expected a customer id, got {rest:?}"))
        };
        match word.to_lowercase().as_str() {
            "sort" => rest.parse().map(Self::Sort),
            "filter" => Ok(Self::Filter(rest.to_string())),
            "add" => Ok(Self::Add),
            "edit" => id().map(Self::Edit),
            "delete" => id().map(Self::Delete),
            "reload" => Ok(Self::Reload),
            "logout" => Ok(Self::Logout),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command: {other}; type `help`")),
        }
    }
}

/// Run the dashboard until the user quits or the session is lost.
pub async fn run(ctx: &Context) -> Result<(), CliError> {
    ctx.enter(customer_desk_client::Route::Dashboard)?;
    let table = CustomerTable::mount(ctx.api.clone(), ctx.session.clone());
    let result = event_loop(ctx, &table).await;
    table.unmount();
    result
}

async fn event_loop(ctx: &Context, table: &CustomerTable) -> Result<(), CliError> {
    let renderer = TableRenderer::new(ctx.theme);
    let mut notices = NoticeBoard::new();

    if let Err(e) = table.load().await {
        bail_if_unauthenticated(e, &mut notices)?;
    }

    loop {
        {
            let mut out = io::stdout().lock();
            writeln!(out)?;
            render::render_notice(&mut out, &mut notices)?;
        }
        table
            .with_view(|view| renderer.render(&mut io::stdout().lock(), view))
            .await?;

        let Some(line) = prompt::read_line("dashboard> ").await? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        // Any action dismisses the previous notice.
        notices.dismiss();

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(message) => {
                notices.error(message);
                continue;
            }
        };

        match command {
            Command::Sort(key) => {
                table.set_sort(key).await;
            }
            Command::Filter(query) => table.set_filter(&query).await,
            Command::Reload => match table.load().await {
                Ok(Completion::Applied(count)) => notices.success(format!("Loaded {count} customers")),
                Ok(Completion::Discarded) => return Ok(()),
                Err(e) => bail_if_unauthenticated(e, &mut notices)?,
            },
            Command::Add => {
                let form = CustomerForm::create(&ctx.api, &ctx.session).await;
                save(form, table, &mut notices, "added").await?;
            }
            Command::Edit(id) => {
                let Some(customer) = table.get(id).await else {
                    notices.error(format!("Customer {id} not found"));
                    continue;
                };
                let form = CustomerForm::with_cities(
                    FormMode::Edit(id),
                    FormState::from_customer(&customer),
                    table.cities().await,
                );
                save(form, table, &mut notices, "updated").await?;
            }
            Command::Delete(id) => match table.delete(id, &StdinConfirm).await {
                Ok(DeleteOutcome::Deleted) => notices.success(format!("Customer {id} deleted")),
                Ok(DeleteOutcome::Declined) => {}
                Ok(DeleteOutcome::Discarded) => return Ok(()),
                Err(e) => bail_if_unauthenticated(e, &mut notices)?,
            },
            Command::Logout => {
                ctx.session.clear()?;
                writeln!(io::stdout().lock(), "Logged out.")?;
                return Ok(());
            }
            Command::Help => writeln!(io::stdout().lock(), "{HELP}")?,
            Command::Quit => return Ok(()),
        }
    }
}

/// Run an opened form to completion and report the result as a notice.
async fn save(
    form: Result<CustomerForm, customer_desk_client::FormError>,
    table: &CustomerTable,
    notices: &mut NoticeBoard,
    verb: &str,
) -> Result<(), CliError> {
    let mut form = match form {
        Ok(form) => form,
        Err(e) if e.is_unauthenticated() => return Err(e.into()),
        Err(e) => {
            notices.error(e.to_string());
            return Ok(());
        }
    };

    match fill_and_submit(&mut form, table).await {
        Ok(Some(customer)) => {
            notices.success(format!("Customer {} {verb}", customer.id));
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) if e.exit_code() == super::EXIT_UNAUTHENTICATED => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "failed to save customer");
            notices.error(e.to_string());
            Ok(())
        }
    }
}

/// A lost session ends the dashboard; anything else becomes a notice.
fn bail_if_unauthenticated(error: TableError, notices: &mut NoticeBoard) -> Result<(), CliError> {
    if error.is_unauthenticated() {
        return Err(error.into());
    }
    notices.error(error.to_string());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("sort limit".parse::<Command>().unwrap(), Command::Sort(SortKey::CreditLimit));
        assert_eq!("filter  kandy ".parse::<Command>().unwrap(), Command::Filter("kandy".into()));
        assert_eq!("filter".parse::<Command>().unwrap(), Command::Filter(String::new()));
        assert_eq!("delete 4".parse::<Command>().unwrap(), Command::Delete(CustomerId::new(4)));
        assert_eq!("EDIT 2".parse::<Command>().unwrap(), Command::Edit(CustomerId::new(2)));
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("sort shoe_size".parse::<Command>().is_err());
        assert!("delete seven".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }

    #[test]
    fn test_unauthenticated_ends_the_loop() {
        let mut notices = NoticeBoard::new();
        assert!(bail_if_unauthenticated(TableError::Unauthenticated, &mut notices).is_err());
    }
}
