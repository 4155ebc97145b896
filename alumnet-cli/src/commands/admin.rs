use anyhow::Result;
use clap::Subcommand;
use shared::{config::client::ClientConfig, models::Role};

use super::{Context, GlobalOptions, print_json};

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// List every account
    Users,
    /// Delete an account and everything it owns
    DeleteUser {
        /// User id
        id: i64,
    },
    /// Account counts per role
    Stats,
}

pub async fn run(command: AdminCommand, config: ClientConfig, options: &GlobalOptions) -> Result<()> {
    let context = Context::resume(&config).await?;
    context.require_role(Role::Admin)?;
    let api = context.api();

    match command {
        AdminCommand::Users => {
            let users = api.list_users().await?;
            if options.json {
                return print_json(&users);
            }
            for user in &users {
                let identity = &user.identity;
                println!(
                    "#{:<4} {:<8} {} <{}>{}",
                    identity.id,
                    identity.role,
                    identity.name,
                    identity.email,
                    if user.profile.is_some() { "" } else { " (no profile)" },
                );
            }
            println!("{} users", users.len());
            Ok(())
        }
        AdminCommand::DeleteUser { id } => {
            let response = api.delete_user(id).await?;
            println!("{}", response.message);
            Ok(())
        }
        AdminCommand::Stats => {
            let stats = api.admin_stats().await?;
            if options.json {
                return print_json(&stats);
            }
            println!("total:    {}", stats.total_users);
            println!("admins:   {}", stats.admin_count);
            println!("alumni:   {}", stats.alumni_count);
            println!("students: {}", stats.student_count);
            Ok(())
        }
    }
}
