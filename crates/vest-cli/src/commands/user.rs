use anyhow::Context;
use vest_config::VestConfig;
use vest_core::enums::Role;
use vest_db::repos::user::NewUser;

use crate::cli::{GlobalFlags, UserCommands};
use crate::output;

/// Promotions from the CLI are audited with the promoted user as the actor.
pub async fn handle(action: UserCommands, config: &VestConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let service = super::open_service(config).await?;
    match action {
        UserCommands::Create {
            email,
            name,
            password,
            admin,
        } => {
            let password_hash = vest_auth::hash_password(&password)?;
            let user = service
                .create_user(NewUser {
                    name,
                    email,
                    phone: None,
                    password_hash,
                    role: if admin { Role::Admin } else { Role::User },
                })
                .await
                .context("failed to create user")?;
            output::print(&user, flags.format)
        }
        UserCommands::Promote { email } => {
            let (user, _) = service
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("no user with email {email}"))?;
            let user = service.set_role(&user.id, &user.id, Role::Admin).await?;
            output::print(&user, flags.format)
        }
    }
}
