//! Login, logout and profile pages.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password is read from stdin)
//! cdesk login -u admin
//!
//! # Show the logged-in user
//! cdesk profile
//!
//! # Forget the stored tokens
//! cdesk logout
//! ```

use std::io::{self, Write};

use customer_desk_client::Route;

use super::{CliError, Context};
use crate::prompt;
use crate::render;

/// Exchange credentials for tokens and store them.
pub async fn login(ctx: &Context, username: &str) -> Result<(), CliError> {
    ctx.enter(Route::Login)?;

    let username = username.trim();
    if username.is_empty() {
        return Err(CliError::Usage("username cannot be empty".to_string()));
    }
    let password = prompt::read_password("Password: ").await?
        .ok_or_else(|| CliError::Usage("no password given".to_string()))?;

    ctx.api.login(&ctx.session, username, &password).await?;
    writeln!(io::stdout().lock(), "Logged in as {username}.")?;
    Ok(())
}

/// Clear the stored session.
pub fn logout(ctx: &Context) -> Result<(), CliError> {
    ctx.session.clear()?;
    tracing::info!("logged out");
    writeln!(io::stdout().lock(), "Logged out.")?;
    Ok(())
}

/// Show the logged-in user's profile.
pub async fn profile(ctx: &Context) -> Result<(), CliError> {
    ctx.enter(Route::Profile)?;
    let profile = ctx.api.profile(&ctx.session).await?;
    render::render_profile(&mut io::stdout().lock(), &profile)?;
    Ok(())
}
