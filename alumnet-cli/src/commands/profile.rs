use anyhow::{Context as _, Result, anyhow, bail};
use clap::{Args, Subcommand};
use client::ProfileReconciler;
use shared::{
    config::client::ClientConfig,
    models::{Profile, ProfileField, ProfileKind, ProfilePatch},
};

use super::{Context, GlobalOptions, or_dash, print_json, profile_kind_for};

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show a profile (your own by default)
    Show(ShowArgs),
    /// Edit your own profile
    Edit(EditArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Profile variant; defaults to the one matching your role
    #[arg(long, short)]
    pub kind: Option<ProfileKind>,

    /// User whose profile to show; defaults to yourself
    #[arg(long)]
    pub id: Option<i64>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Field assignment such as `name=Asha` or `linkedIn=https://...`; repeatable
    #[arg(long = "set", short = 's', value_name = "FIELD=VALUE", value_parser = parse_assignment, required = true)]
    pub assignments: Vec<(ProfileField, String)>,
}

pub async fn run(command: ProfileCommand, config: ClientConfig, options: &GlobalOptions) -> Result<()> {
    let context = Context::resume(&config).await?;
    match command {
        ProfileCommand::Show(args) => show(args, &context, options).await,
        ProfileCommand::Edit(args) => edit(args, &context, options).await,
    }
}

async fn show(args: ShowArgs, context: &Context, options: &GlobalOptions) -> Result<()> {
    let viewer = context.session.user();
    let kind = match (args.kind, viewer) {
        (Some(kind), _) => kind,
        (None, Some(identity)) => profile_kind_for(identity.role)
            .ok_or_else(|| anyhow!("admins have no profile; pass --kind to view someone else's"))?,
        (None, None) => bail!("pass --kind and --id, or sign in to view your own profile"),
    };

    let mut reconciler =
        ProfileReconciler::new(context.api().clone(), kind, viewer.map(|identity| identity.id));
    reconciler.load(args.id).await?;
    let profile = reconciler
        .displayed()
        .ok_or_else(|| anyhow!("profile could not be loaded"))?;
    render(&profile, options)
}

async fn edit(args: EditArgs, context: &Context, options: &GlobalOptions) -> Result<()> {
    let identity = context.user()?;
    let kind = profile_kind_for(identity.role)
        .ok_or_else(|| anyhow!("admins have no profile to edit"))?;

    let mut reconciler = ProfileReconciler::new(context.api().clone(), kind, Some(identity.id));
    reconciler.load(None).await?;

    let patch: ProfilePatch = args.assignments.into_iter().collect();
    reconciler.edit(&patch)?;
    reconciler
        .save()
        .await
        .context("profile changes were not saved")?;

    let profile = reconciler
        .displayed()
        .ok_or_else(|| anyhow!("profile could not be loaded"))?;
    if !options.json {
        println!("Profile updated.");
    }
    render(&profile, options)
}

fn render(profile: &Profile, options: &GlobalOptions) -> Result<()> {
    if options.json {
        return print_json(&profile.to_payload());
    }

    println!(
        "{} ({} profile, user {})",
        or_dash(Some(profile.name.as_str())),
        profile.kind(),
        profile.user_id
    );
    for &field in profile.kind().fields() {
        if field == ProfileField::Name {
            continue;
        }
        println!("  {:<14} {}", field.as_str(), or_dash(profile.get(field)));
    }
    if !profile.profile_pic.is_empty() {
        println!("  {:<14} {}", "picture", profile.profile_pic);
    }
    Ok(())
}

/// Parses `field=value`. Field names accept the wire spellings and their aliases.
fn parse_assignment(raw: &str) -> Result<(ProfileField, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{raw}`"))?;
    let field = field
        .trim()
        .parse::<ProfileField>()
        .map_err(|err| err.to_string())?;
    Ok((field, value.to_string()))
}
