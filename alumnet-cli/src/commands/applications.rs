use anyhow::Result;
use clap::Subcommand;
use shared::{
    config::client::ClientConfig,
    models::{Application, ApplicationStatus, Role},
};

use super::{Context, GlobalOptions, or_dash, print_json};

#[derive(Subcommand, Debug)]
pub enum ApplicationsCommand {
    /// Applications you submitted (students)
    Mine,
    /// Applications to your postings (alumni)
    Received,
    /// Withdraw one of your applications (students)
    Withdraw {
        /// Application id
        id: i64,
    },
    /// Accept or decline an application (alumni)
    Status {
        /// Application id
        id: i64,
        /// pending, accepted or declined
        status: ApplicationStatus,
    },
}

pub async fn run(
    command: ApplicationsCommand,
    config: ClientConfig,
    options: &GlobalOptions,
) -> Result<()> {
    let context = Context::resume(&config).await?;
    let api = context.api();

    match command {
        ApplicationsCommand::Mine => {
            context.require_role(Role::Student)?;
            let applications = api.my_applications().await?;
            show_list(&applications, options)
        }
        ApplicationsCommand::Received => {
            context.require_role(Role::Alumni)?;
            let applications = api.received_applications().await?;
            show_list(&applications, options)
        }
        ApplicationsCommand::Withdraw { id } => {
            context.require_role(Role::Student)?;
            let response = api.withdraw_application(id).await?;
            println!("{}", response.message);
            Ok(())
        }
        ApplicationsCommand::Status { id, status } => {
            context.require_role(Role::Alumni)?;
            let application = api.update_application_status(id, status).await?;
            if options.json {
                return print_json(&application);
            }
            println!("Application {} is now {}.", application.id, application.status);
            Ok(())
        }
    }
}

fn show_list(applications: &[Application], options: &GlobalOptions) -> Result<()> {
    if options.json {
        return print_json(applications);
    }
    if applications.is_empty() {
        println!("No applications found.");
        return Ok(());
    }
    for application in applications {
        println!(
            "#{:<4} {:<9} {} <- {} (applied {}, resume {})",
            application.id,
            application.status.as_ref(),
            application
                .opportunity_title
                .as_deref()
                .map_or_else(|| format!("opportunity {}", application.opportunity_id), str::to_string),
            application
                .student_name
                .as_deref()
                .map_or_else(|| format!("student {}", application.student_id), str::to_string),
            application
                .applied_at
                .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string()),
            or_dash(application.resume_file.as_deref()),
        );
    }
    Ok(())
}
