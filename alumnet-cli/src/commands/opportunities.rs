use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use client::ResumeUpload;
use shared::{
    config::client::ClientConfig,
    models::{
        NewOpportunity, Opportunity, OpportunityFilters, OpportunityType, OpportunityUpdate, Role,
    },
};

use super::{Context, GlobalOptions, or_dash, print_json};

#[derive(Subcommand, Debug)]
pub enum OpportunitiesCommand {
    /// Browse open postings (students)
    List(ListArgs),
    /// Postings you created (alumni)
    Mine,
    /// Publish a new posting (alumni)
    Create(CreateArgs),
    /// Change fields of one of your postings (alumni)
    Update(UpdateArgs),
    /// Remove one of your postings (alumni)
    Delete {
        /// Posting id
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// internship, scholarship, mentorship or success_story
    #[arg(long = "type", short = 't')]
    pub kind: Option<OpportunityType>,

    #[arg(long)]
    pub category: Option<String>,

    /// Only postings whose CGPA requirement you meet
    #[arg(long)]
    pub min_cgpa: Option<f64>,
}

/// Fields shared by create and update.
#[derive(Args, Debug, Default)]
pub struct PostingFields {
    #[arg(long)]
    pub min_cgpa: Option<f64>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub duration: Option<String>,
    #[arg(long)]
    pub stipend: Option<String>,
    #[arg(long)]
    pub requirements: Option<String>,
    /// Application deadline (YYYY-MM-DD)
    #[arg(long)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// internship, scholarship, mentorship or success_story
    #[arg(long = "type", short = 't')]
    pub kind: OpportunityType,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    #[command(flatten)]
    pub fields: PostingFields,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Posting id
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[command(flatten)]
    pub fields: PostingFields,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Opportunity id
    pub id: i64,

    /// Resume to attach (PDF, DOC or DOCX)
    #[arg(long, short)]
    pub resume: Option<PathBuf>,
}

pub async fn run(
    command: OpportunitiesCommand,
    config: ClientConfig,
    options: &GlobalOptions,
) -> Result<()> {
    let context = Context::resume(&config).await?;
    let api = context.api();

    match command {
        OpportunitiesCommand::List(args) => {
            context.require_role(Role::Student)?;
            let filters = OpportunityFilters {
                kind: args.kind,
                category: args.category,
                min_cgpa: args.min_cgpa,
            };
            let opportunities = api.list_opportunities(&filters).await?;
            show_list(&opportunities, options)
        }
        OpportunitiesCommand::Mine => {
            context.require_role(Role::Alumni)?;
            let opportunities = api.my_opportunities().await?;
            show_list(&opportunities, options)
        }
        OpportunitiesCommand::Create(args) => {
            context.require_role(Role::Alumni)?;
            let fields = args.fields;
            let opportunity = NewOpportunity {
                kind: args.kind,
                title: args.title,
                description: args.description,
                min_cgpa: fields.min_cgpa,
                category: fields.category,
                company: fields.company,
                location: fields.location,
                duration: fields.duration,
                stipend: fields.stipend,
                requirements: fields.requirements,
                deadline: fields.deadline,
            };
            let created = api.create_opportunity(&opportunity).await?;
            show_one("Opportunity created", &created, options)
        }
        OpportunitiesCommand::Update(args) => {
            context.require_role(Role::Alumni)?;
            let fields = args.fields;
            let update = OpportunityUpdate {
                title: args.title,
                description: args.description,
                min_cgpa: fields.min_cgpa,
                category: fields.category,
                company: fields.company,
                location: fields.location,
                duration: fields.duration,
                stipend: fields.stipend,
                requirements: fields.requirements,
                deadline: fields.deadline,
            };
            if update.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let updated = api.update_opportunity(args.id, &update).await?;
            show_one("Opportunity updated", &updated, options)
        }
        OpportunitiesCommand::Delete { id } => {
            context.require_role(Role::Alumni)?;
            let response = api.delete_opportunity(id).await?;
            println!("{}", response.message);
            Ok(())
        }
    }
}

pub async fn apply(args: ApplyArgs, config: ClientConfig, options: &GlobalOptions) -> Result<()> {
    let context = Context::resume(&config).await?;
    context.require_role(Role::Student)?;

    let resume = match args.resume {
        Some(path) => Some(ResumeUpload::from_path(&path).await?),
        None => None,
    };
    let application = context.api().apply_to_opportunity(args.id, resume).await?;

    if options.json {
        return print_json(&application);
    }
    println!(
        "Applied to opportunity {} (application {}, status {})",
        application.opportunity_id, application.id, application.status
    );
    if let Some(file) = application.resume_file.as_deref() {
        println!("  resume: {file}");
    }
    Ok(())
}

fn show_list(opportunities: &[Opportunity], options: &GlobalOptions) -> Result<()> {
    if options.json {
        return print_json(opportunities);
    }
    if opportunities.is_empty() {
        println!("No opportunities found.");
        return Ok(());
    }
    for opportunity in opportunities {
        summarize(opportunity);
    }
    Ok(())
}

fn show_one(headline: &str, opportunity: &Opportunity, options: &GlobalOptions) -> Result<()> {
    if options.json {
        return print_json(opportunity);
    }
    println!("{headline}.");
    summarize(opportunity);
    Ok(())
}

fn summarize(opportunity: &Opportunity) {
    println!(
        "#{:<4} [{}] {}",
        opportunity.id, opportunity.kind, opportunity.title
    );
    println!(
        "      by {} | company {} | min CGPA {} | deadline {}",
        or_dash(opportunity.alumni_name.as_deref()),
        or_dash(opportunity.company.as_deref()),
        opportunity
            .min_cgpa
            .map_or_else(|| "-".to_string(), |cgpa| cgpa.to_string()),
        opportunity
            .deadline
            .map_or_else(|| "-".to_string(), |date| date.to_string()),
    );
}
